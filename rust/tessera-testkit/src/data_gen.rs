//! Seeded generators for tensor shapes and element data.

use tessera_tensor::TensorElement;

/// Generates a random shape of rank `0..=max_rank` whose dimensions are each in
/// `0..=max_dim`.
pub fn random_dims(rng: &mut fastrand::Rng, max_rank: usize, max_dim: u64) -> Vec<u64> {
    let rank = rng.usize(0..=max_rank);
    (0..rank).map(|_| rng.u64(0..=max_dim)).collect()
}

/// Element values that can be drawn at random.
pub trait RandomElement: TensorElement {
    fn random(rng: &mut fastrand::Rng) -> Self;
}

impl RandomElement for i32 {
    fn random(rng: &mut fastrand::Rng) -> Self {
        rng.i32(..)
    }
}

impl RandomElement for i64 {
    fn random(rng: &mut fastrand::Rng) -> Self {
        rng.i64(..)
    }
}

impl RandomElement for f32 {
    fn random(rng: &mut fastrand::Rng) -> Self {
        rng.f32() * 2000.0 - 1000.0
    }
}

impl RandomElement for f64 {
    fn random(rng: &mut fastrand::Rng) -> Self {
        rng.f64() * 2e6 - 1e6
    }
}

/// Generates `count` random values of `T`.
pub fn random_values<T: RandomElement>(rng: &mut fastrand::Rng, count: usize) -> Vec<T> {
    (0..count).map(|_| T::random(rng)).collect()
}

/// Generates `count` short ASCII strings, including the occasional empty one.
pub fn random_strings(rng: &mut fastrand::Rng, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let len = rng.usize(0..12);
            (0..len).map(|_| rng.alphanumeric()).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use tessera_tensor::shape::element_count;

    use super::*;

    #[test]
    fn test_random_dims_bounds() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..100 {
            let dims = random_dims(&mut rng, 3, 4);
            assert!(dims.len() <= 3);
            assert!(dims.iter().all(|&d| d <= 4));
            assert!(element_count(&dims).unwrap() <= 64);
        }
    }
}
