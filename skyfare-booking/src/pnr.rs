use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub const PNR_LEN: usize = 6;
const PNR_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Issues booking identifiers. Uniqueness is checked by the caller.
pub trait IdSource: Send + Sync {
    fn pnr(&self) -> String;

    fn trans_id(&self) -> String;
}

/// PNRs from a seedable RNG, transaction ids as v4 UUIDs drawn from the same RNG.
pub struct RandomIds {
    rng: Mutex<StdRng>,
}

impl RandomIds {
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl IdSource for RandomIds {
    fn pnr(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        (0..PNR_LEN)
            .map(|_| PNR_ALPHABET[rng.gen_range(0..PNR_ALPHABET.len())] as char)
            .collect()
    }

    fn trans_id(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let bytes: [u8; 16] = rng.gen();
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}

pub fn is_valid_pnr(pnr: &str) -> bool {
    pnr.len() == PNR_LEN && pnr.bytes().all(|b| PNR_ALPHABET.contains(&b))
}
