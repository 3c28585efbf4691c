use blake2::{digest::consts::U32, Blake2b, Digest};
use rand::SeedableRng;

type Blake2b256 = Blake2b<U32>;

/// Hash an arbitrary string into a 32 byte seed, so a run can be reproduced from a human-friendly seed like "42".
pub fn hash_str(input: &str) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(input.as_bytes());
    hasher.finalize().into()
}

pub fn rng_from_str(input: &str) -> rand_chacha::ChaCha20Rng {
    rand_chacha::ChaCha20Rng::from_seed(hash_str(input))
}
