//! Share identifier generation
//!
//! Identifiers combine a random component with the creation time and pass the
//! result through SHA-1, keeping a short hex prefix. Collisions are tolerated:
//! the cache resolves them as last writer wins.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha1::{Digest, Sha1};

use crate::clock::{Clock, SystemClock};
use crate::content::ContentId;

/// Number of hex characters kept from the digest.
pub const DEFAULT_ID_LENGTH: usize = 10;

/// Number of random base-36 characters mixed into each identifier.
const RANDOM_COMPONENT_LENGTH: usize = 8;

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Produces identifiers for new shares.
pub trait IdGenerator {
    /// Generates a fresh identifier. Never fails.
    fn generate_id(&mut self) -> ContentId;
}

/// Random plus time based generator hashed down to a short hex token.
#[derive(Debug)]
pub struct RandomIdGenerator<C = SystemClock> {
    rng: StdRng,
    clock: C,
}

impl RandomIdGenerator<SystemClock> {
    /// Creates a generator seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            clock: SystemClock,
        }
    }
}

impl Default for RandomIdGenerator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RandomIdGenerator<C> {
    /// Creates a reproducible generator from a fixed seed and clock.
    pub fn seeded(seed: u64, clock: C) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            clock,
        }
    }

    fn random_component(&mut self) -> String {
        (0..RANDOM_COMPONENT_LENGTH)
            .map(|_| char::from(BASE36_ALPHABET[self.rng.random_range(0..BASE36_ALPHABET.len())]))
            .collect()
    }
}

impl<C: Clock> IdGenerator for RandomIdGenerator<C> {
    fn generate_id(&mut self) -> ContentId {
        let millis = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or_default();
        let seed_material = format!("{}{}", self.random_component(), to_base36(millis));

        let digest = hex::encode(Sha1::digest(seed_material.as_bytes()));
        let token = &digest[..DEFAULT_ID_LENGTH];

        tracing::trace!("Generated content id {token}");

        ContentId::from_digest_prefix(token)
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
