//! Bag
//!
//! Per-observation membership of the subsample used in one boosting iteration.
use crate::errors::DistributionError;

/// Inclusion value per training row.
///
/// A value of 0 means out-of-bag. Any positive value means in-bag and scales
/// that row's case weight, so a boolean bag is simply a bag of zeros and ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Bag {
    values: Vec<f64>,
}

impl Bag {
    /// Every row in bag with full weight.
    pub fn full(n: usize) -> Self {
        Bag { values: vec![1.0; n] }
    }

    /// Boolean bag from an inclusion mask.
    pub fn from_mask(mask: &[bool]) -> Self {
        Bag {
            values: mask.iter().map(|m| if *m { 1.0 } else { 0.0 }).collect(),
        }
    }

    /// Boolean bag of length `n` holding only the listed rows.
    pub fn from_indices(n: usize, index: &[usize]) -> Result<Self, DistributionError> {
        let mut values = vec![0.0; n];
        for &i in index {
            match values.get_mut(i) {
                Some(v) => *v = 1.0,
                None => {
                    return Err(DistributionError::InvalidInput(format!(
                        "bag index {} out of range for {} rows",
                        i, n
                    )))
                }
            }
        }
        Ok(Bag { values })
    }

    /// Fractional bag; every value must lie in `[0, 1]`.
    pub fn from_fractions(values: Vec<f64>) -> Result<Self, DistributionError> {
        if let Some(i) = values.iter().position(|v| !(0.0..=1.0).contains(v)) {
            return Err(DistributionError::InvalidInput(format!(
                "bag value {} at index {} is outside [0, 1]",
                values[i], i
            )));
        }
        Ok(Bag { values })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn in_bag(&self, i: usize) -> bool {
        self.values[i] > 0.0
    }

    /// Multiplier applied to the case weight of row `i`.
    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Number of in-bag rows.
    pub fn count(&self) -> usize {
        self.values.iter().filter(|v| **v > 0.0).count()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
