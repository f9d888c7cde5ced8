use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::models::Flight;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Price,
    Duration,
}

/// Flight search criteria. Every field is optional; an empty search lists
/// the whole schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightSearch {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>, // UTC departure date
    pub sort_by: Option<SortBy>,
}

impl FlightSearch {
    pub fn matches(&self, flight: &Flight) -> bool {
        if let Some(origin) = &self.origin {
            if !same_place(&flight.origin, origin) {
                return false;
            }
        }
        if let Some(destination) = &self.destination {
            if !same_place(&flight.destination, destination) {
                return false;
            }
        }
        if let Some(date) = self.date {
            if flight.departure.date_naive() != date {
                return false;
            }
        }
        true
    }
}

// Full Unicode case folding, same as Postgres `lower()`.
fn same_place(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn flight() -> Flight {
        let departure = Utc.with_ymd_and_hms(2024, 12, 25, 22, 30, 0).unwrap();
        Flight {
            flight_id: 1,
            flight_no: "AI101".to_string(),
            origin: "Delhi".to_string(),
            destination: "Mumbai".to_string(),
            departure,
            arrival: departure + chrono::Duration::hours(2),
            base_fare_cents: 500_000,
            total_seats: 100,
            seats_available: 100,
            airline_name: "Air India".to_string(),
        }
    }

    #[test]
    fn test_search_deserialization() {
        let json = r#"
            {
                "origin": "delhi",
                "destination": "MUMBAI",
                "date": "2024-12-25",
                "sort_by": "price"
            }
        "#;
        let search: FlightSearch = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(search.date, NaiveDate::from_ymd_opt(2024, 12, 25));
        assert_eq!(search.sort_by, Some(SortBy::Price));
        assert!(search.matches(&flight()));
    }

    #[test]
    fn test_search_filters() {
        let f = flight();
        assert!(FlightSearch::default().matches(&f));

        let wrong_route = FlightSearch { origin: Some("Chennai".into()), ..Default::default() };
        assert!(!wrong_route.matches(&f));

        // arrival is on the 26th, departure date is what counts
        let next_day = FlightSearch { date: NaiveDate::from_ymd_opt(2024, 12, 26), ..Default::default() };
        assert!(!next_day.matches(&f));
    }

    #[test]
    fn test_city_match_folds_non_ascii_case() {
        let mut f = flight();
        f.origin = "Zürich".to_string();
        f.destination = "Ålesund".to_string();

        let search = FlightSearch {
            origin: Some("ZÜRICH".into()),
            destination: Some("ålesund".into()),
            ..Default::default()
        };
        assert!(search.matches(&f));
    }
}
