use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{Mutex as FlightMutex, OwnedMutexGuard};
use tracing::debug;
use skyfare_core::repository::{BookingRepository, FareHistoryRepository, FlightLocks, FlightRepository, FlightTransaction};
use skyfare_core::search::FlightSearch;
use skyfare_core::{Booking, BookingStatus, CoreError, CoreResult, FareHistoryEntry, FarePoint, Flight, NewBooking, NewFlight};

#[derive(Default)]
struct Tables {
    flights: BTreeMap<i64, Flight>,
    bookings: BTreeMap<i64, Booking>,
    // (append sequence, entry); the sequence breaks timestamp ties
    fares: Vec<(u64, FareHistoryEntry)>,
}

type SharedTables = Arc<RwLock<Tables>>;

fn read(tables: &SharedTables) -> CoreResult<RwLockReadGuard<'_, Tables>> {
    tables
        .read()
        .map_err(|_| CoreError::InternalError("in-memory tables poisoned".to_string()))
}

fn write(tables: &SharedTables) -> CoreResult<RwLockWriteGuard<'_, Tables>> {
    tables
        .write()
        .map_err(|_| CoreError::InternalError("in-memory tables poisoned".to_string()))
}

/// Process-local store used by tests and by `storage = "memory"` deployments.
///
/// Per-flight exclusion comes from one `tokio::sync::Mutex` per flight id,
/// created lazily. Table access itself sits behind a short-lived `RwLock`
/// that is never held across an await.
pub struct InMemoryStore {
    tables: SharedTables,
    flight_locks: Mutex<HashMap<i64, Arc<FlightMutex<()>>>>,
    next_flight_id: AtomicI64,
    next_booking_id: Arc<AtomicI64>,
    next_fare_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            flight_locks: Mutex::new(HashMap::new()),
            next_flight_id: AtomicI64::new(1),
            next_booking_id: Arc::new(AtomicI64::new(1)),
            next_fare_seq: AtomicU64::new(0),
        }
    }

    fn flight_lock(&self, flight_id: i64) -> CoreResult<Arc<FlightMutex<()>>> {
        let mut locks = self
            .flight_locks
            .lock()
            .map_err(|_| CoreError::InternalError("flight lock map poisoned".to_string()))?;
        Ok(locks
            .entry(flight_id)
            .or_insert_with(|| Arc::new(FlightMutex::new(())))
            .clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlightRepository for InMemoryStore {
    async fn list_flights(&self) -> CoreResult<Vec<Flight>> {
        Ok(read(&self.tables)?.flights.values().cloned().collect())
    }

    async fn get_flight(&self, flight_id: i64) -> CoreResult<Option<Flight>> {
        Ok(read(&self.tables)?.flights.get(&flight_id).cloned())
    }

    async fn get_flight_by_no(&self, flight_no: &str) -> CoreResult<Option<Flight>> {
        Ok(read(&self.tables)?
            .flights
            .values()
            .find(|f| f.flight_no == flight_no)
            .cloned())
    }

    async fn search_flights(&self, search: &FlightSearch) -> CoreResult<Vec<Flight>> {
        Ok(read(&self.tables)?
            .flights
            .values()
            .filter(|f| search.matches(f))
            .cloned()
            .collect())
    }

    async fn create_flight(&self, flight: &NewFlight) -> CoreResult<Flight> {
        let mut tables = write(&self.tables)?;
        if tables.flights.values().any(|f| f.flight_no == flight.flight_no) {
            return Err(CoreError::DuplicateFlight(flight.flight_no.clone()));
        }

        let flight_id = self.next_flight_id.fetch_add(1, Ordering::SeqCst);
        let created = flight.clone().into_flight(flight_id);
        tables.flights.insert(flight_id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn list_bookings(&self) -> CoreResult<Vec<Booking>> {
        Ok(read(&self.tables)?.bookings.values().cloned().collect())
    }

    async fn get_booking(&self, pnr: &str) -> CoreResult<Option<Booking>> {
        Ok(read(&self.tables)?
            .bookings
            .values()
            .find(|b| b.pnr == pnr)
            .cloned())
    }

    async fn pnr_exists(&self, pnr: &str) -> CoreResult<bool> {
        Ok(read(&self.tables)?.bookings.values().any(|b| b.pnr == pnr))
    }

    async fn trans_id_exists(&self, trans_id: &str) -> CoreResult<bool> {
        Ok(read(&self.tables)?.bookings.values().any(|b| b.trans_id == trans_id))
    }
}

#[async_trait]
impl FareHistoryRepository for InMemoryStore {
    async fn append_fare(&self, entry: &FareHistoryEntry) -> CoreResult<()> {
        let seq = self.next_fare_seq.fetch_add(1, Ordering::SeqCst);
        write(&self.tables)?.fares.push((seq, entry.clone()));
        Ok(())
    }

    async fn recent_fares(&self, flight_no: &str, limit: usize) -> CoreResult<Vec<FarePoint>> {
        let tables = read(&self.tables)?;
        let mut rows: Vec<&(u64, FareHistoryEntry)> = tables
            .fares
            .iter()
            .filter(|(_, entry)| entry.flight_no == flight_no)
            .collect();
        rows.sort_by(|(seq_a, a), (seq_b, b)| b.timestamp.cmp(&a.timestamp).then(seq_b.cmp(seq_a)));

        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(_, entry)| FarePoint::from(entry.clone()))
            .collect())
    }

    async fn has_fare_history(&self, flight_no: &str) -> CoreResult<bool> {
        Ok(read(&self.tables)?
            .fares
            .iter()
            .any(|(_, entry)| entry.flight_no == flight_no))
    }
}

#[async_trait]
impl FlightLocks for InMemoryStore {
    async fn lock_flight(&self, flight_id: i64, wait: Duration) -> CoreResult<Box<dyn FlightTransaction>> {
        if !read(&self.tables)?.flights.contains_key(&flight_id) {
            return Err(CoreError::FlightNotFound(flight_id.to_string()));
        }

        let lock = self.flight_lock(flight_id)?;
        let guard = tokio::time::timeout(wait, lock.lock_owned())
            .await
            .map_err(|_| CoreError::Busy(format!("flight {} is locked by another operation", flight_id)))?;

        // Re-read under the lock: the previous holder may have changed it.
        let flight = read(&self.tables)?
            .flights
            .get(&flight_id)
            .cloned()
            .ok_or_else(|| CoreError::FlightNotFound(flight_id.to_string()))?;

        debug!(flight_id, "flight locked");
        Ok(Box::new(MemoryFlightTransaction {
            _guard: guard,
            tables: self.tables.clone(),
            next_booking_id: self.next_booking_id.clone(),
            flight,
            seats_dirty: false,
            staged: BTreeMap::new(),
        }))
    }
}

/// Unit of work over one flight. Writes are staged locally and applied in
/// one step by `commit`; dropping it discards them.
struct MemoryFlightTransaction {
    _guard: OwnedMutexGuard<()>,
    tables: SharedTables,
    next_booking_id: Arc<AtomicI64>,
    flight: Flight,
    seats_dirty: bool,
    // inserted or updated bookings, keyed by booking id
    staged: BTreeMap<i64, Booking>,
}

impl MemoryFlightTransaction {
    /// Current view of this flight's bookings: staged rows shadow committed ones.
    fn find<P>(&self, predicate: P) -> CoreResult<Option<Booking>>
    where
        P: Fn(&Booking) -> bool,
    {
        if let Some(b) = self.staged.values().find(|b| predicate(*b)) {
            return Ok(Some(b.clone()));
        }

        let tables = read(&self.tables)?;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.flight_id == self.flight.flight_id && !self.staged.contains_key(&b.booking_id))
            .find(|b| predicate(*b))
            .cloned())
    }
}

#[async_trait]
impl FlightTransaction for MemoryFlightTransaction {
    fn flight(&self) -> &Flight {
        &self.flight
    }

    async fn set_seats_available(&mut self, seats_available: i32) -> CoreResult<()> {
        if seats_available < 0 || seats_available > self.flight.total_seats {
            return Err(CoreError::InternalError(format!(
                "seats_available {} out of bounds for flight {}",
                seats_available, self.flight.flight_no
            )));
        }
        self.flight.seats_available = seats_available;
        self.seats_dirty = true;
        Ok(())
    }

    async fn seat_holder(&mut self, seat_no: i32) -> CoreResult<Option<Booking>> {
        self.find(|b| b.seat_no == seat_no && b.status.holds_seat())
    }

    async fn find_booking(&mut self, pnr: &str) -> CoreResult<Option<Booking>> {
        self.find(|b| b.pnr == pnr)
    }

    async fn insert_booking(&mut self, booking: NewBooking) -> CoreResult<Booking> {
        if booking.flight_id != self.flight.flight_id {
            return Err(CoreError::InternalError(format!(
                "booking for flight {} written through lock on flight {}",
                booking.flight_id, self.flight.flight_id
            )));
        }
        let booking_id = self.next_booking_id.fetch_add(1, Ordering::SeqCst);
        let booking = booking.into_booking(booking_id);
        self.staged.insert(booking_id, booking.clone());
        Ok(booking)
    }

    async fn update_booking_status(&mut self, booking_id: i64, status: BookingStatus) -> CoreResult<Booking> {
        let mut booking = self
            .find(|b| b.booking_id == booking_id)?
            .ok_or_else(|| CoreError::BookingNotFound(booking_id.to_string()))?;
        booking.status = status;
        booking.updated_at = Utc::now();
        self.staged.insert(booking_id, booking.clone());
        Ok(booking)
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let this = *self;
        let mut tables = write(&this.tables)?;

        // Identifier uniqueness is enforced here, as a unique index would.
        for booking in this.staged.values() {
            let clash = tables.bookings.values().find(|existing| {
                existing.booking_id != booking.booking_id
                    && (existing.pnr == booking.pnr || existing.trans_id == booking.trans_id)
            });
            if let Some(existing) = clash {
                let id = if existing.pnr == booking.pnr { &booking.pnr } else { &booking.trans_id };
                return Err(CoreError::IdentifierCollision(id.clone()));
            }
        }

        if this.seats_dirty {
            tables.flights.insert(this.flight.flight_id, this.flight.clone());
        }
        for (booking_id, booking) in this.staged {
            tables.bookings.insert(booking_id, booking);
        }
        Ok(())
    }
}
