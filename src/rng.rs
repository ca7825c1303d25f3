//! Random number streams.
//!
//! Every photon history gets its own generator, seeded from the simulation
//! seed and the photon's index. A run is therefore reproducible regardless
//! of how photons are distributed over threads.

use rand::{RngCore, SeedableRng, rngs::StdRng};
use rand_isaac::Isaac64Rng;
use serde::{Deserialize, Serialize};

use crate::types::PhotonIndex;

/// Which generator backs the per-photon streams
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RngType {
    #[default]
    Isaac64,
    Std,
}

pub enum McRng {
    Isaac64(Isaac64Rng),
    Std(StdRng),
}

impl McRng {

    pub fn seed_from_u64(kind: RngType, seed: u64) -> Self {
        match kind {
            RngType::Isaac64 => Self::Isaac64(Isaac64Rng::seed_from_u64(seed)),
            RngType::Std     => Self::Std    (    StdRng::seed_from_u64(seed)),
        }
    }

    /// Independent stream for photon number `index` of a run seeded with `seed`
    pub fn for_photon(kind: RngType, seed: u64, index: PhotonIndex) -> Self {
        Self::seed_from_u64(kind, photon_seed(seed, index))
    }
}

impl RngCore for McRng {
    fn next_u32(&mut self) -> u32 {
        match self { Self::Isaac64(r) => r.next_u32(), Self::Std(r) => r.next_u32() }
    }

    fn next_u64(&mut self) -> u64 {
        match self { Self::Isaac64(r) => r.next_u64(), Self::Std(r) => r.next_u64() }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self { Self::Isaac64(r) => r.fill_bytes(dest), Self::Std(r) => r.fill_bytes(dest) }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        match self { Self::Isaac64(r) => r.try_fill_bytes(dest), Self::Std(r) => r.try_fill_bytes(dest) }
    }
}

/// SplitMix64 finalizer applied to the run seed combined with the photon
/// index: neighbouring indices give unrelated seeds.
pub fn photon_seed(seed: u64, index: PhotonIndex) -> u64 {
    let mut z = seed ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Use the requested seed, or draw one from the OS. The seed actually used is
/// logged so that any run can be repeated.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => seed,
        None => {
            // Echoed into TOML, whose integers are signed
            let seed = rand::random::<u64>() >> 1;
            log::info!("No seed given: using {seed}");
            seed
        }
    }
}
