//! Sampler
//!
//! Strategies for drawing the bag before fitting new trees, allowing for stochastic
//! gradient boosting and out-of-sample improvement estimates.
use crate::bag::Bag;
use rand::rngs::StdRng;
use rand::seq::index;

// A sampler decides which training rows the next tree sees.
pub trait Sampler {
    /// Draw the bag for `n` training rows.
    fn sample(&mut self, rng: &mut StdRng, n: usize) -> Bag;
}

/// Every row in bag, every iteration.
pub struct FullSampler;

impl Sampler for FullSampler {
    fn sample(&mut self, _rng: &mut StdRng, n: usize) -> Bag {
        Bag::full(n)
    }
}

/// Sample a fixed share of the rows without replacement.
pub struct RandomSampler {
    fraction: f64,
}

impl RandomSampler {
    pub fn new(fraction: f64) -> Self {
        RandomSampler { fraction }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, rng: &mut StdRng, n: usize) -> Bag {
        if n == 0 {
            return Bag::full(0);
        }
        let amount = ((self.fraction * n as f64).round() as usize).clamp(1, n);
        let chosen = index::sample(rng, n, amount).into_vec();
        let mut mask = vec![false; n];
        for i in chosen {
            mask[i] = true;
        }
        Bag::from_mask(&mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_random_sampler() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut sampler = RandomSampler::new(0.5);
        let bag = sampler.sample(&mut rng, 10);
        assert_eq!(bag.len(), 10);
        assert_eq!(bag.count(), 5);

        // Test with fraction 1.0 (all should be chosen)
        let mut sampler_all = RandomSampler::new(1.0);
        assert_eq!(sampler_all.sample(&mut rng, 10).count(), 10);

        // A tiny fraction still keeps one row in bag
        let mut sampler_tiny = RandomSampler::new(0.01);
        assert_eq!(sampler_tiny.sample(&mut rng, 10).count(), 1);
    }

    #[test]
    fn test_random_sampler_is_seeded() {
        let a = RandomSampler::new(0.3).sample(&mut StdRng::seed_from_u64(7), 50);
        let b = RandomSampler::new(0.3).sample(&mut StdRng::seed_from_u64(7), 50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_full_sampler() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(FullSampler.sample(&mut rng, 4), Bag::full(4));
    }
}
