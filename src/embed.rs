//! Deterministic placeholder embeddings.
//!
//! The collection is created with vectorizer "none", so every insert must
//! carry an explicit vector. Real embeddings are out of scope here; instead
//! each text gets a reproducible pseudo-random vector seeded from its char
//! codes, which keeps add/update idempotent across restarts.

use crate::defaults::VECTOR_DIM;

/// 384-dim vector in [0, 1), fully determined by the input text.
pub fn seeded_vector(text: &str) -> Vec<f32> {
    seeded_vector_dim(text, VECTOR_DIM)
}

pub fn seeded_vector_dim(text: &str, dim: usize) -> Vec<f32> {
    let mut state: u64 = text.chars().map(|c| c as u64).sum();
    (0..dim).map(|_| next_unit(&mut state)).collect()
}

// splitmix64 step, mapped to [0, 1).
fn next_unit(state: &mut u64) -> f32 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    ((z >> 11) as f64 / (1u64 << 53) as f64) as f32
}
