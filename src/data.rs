//! Data
//!
//! Read-only views over the feature matrix and the per-observation vectors
//! (response, case weights, offset) that distribution strategies consume.
use crate::errors::DistributionError;
use crate::utils::{validate_finite, validate_len, validate_weights};
use std::ops::Range;

/// Contiguous Column Major Matrix view.
///
/// The distribution strategies never look at features; they are carried so
/// the tree grower receives the same [`Dataset`] the strategy was built from.
#[derive(Debug, Clone, Copy)]
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new column major Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix { data, rows, cols }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[j * self.rows + i]
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &'a [T] {
        let start = col * self.rows;
        &self.data[start..start + self.rows]
    }
}

/// Immutable view of one fitting problem.
///
/// Rows `[0, n_train)` are training rows, rows `[n_train, n_rows)` are held out
/// for validation. Weights default to 1 and the offset to 0 when absent.
#[derive(Debug, Clone, Copy)]
pub struct Dataset<'a> {
    features: Matrix<'a, f64>,
    y: &'a [f64],
    weights: Option<&'a [f64]>,
    offset: Option<&'a [f64]>,
    n_train: usize,
}

impl<'a> Dataset<'a> {
    /// Create a dataset view.
    ///
    /// * `features` - Column major feature matrix with one row per observation.
    /// * `y` - Response vector.
    /// * `n_train` - Number of leading rows used for training.
    pub fn new(features: Matrix<'a, f64>, y: &'a [f64], n_train: usize) -> Result<Self, DistributionError> {
        if features.rows != y.len() {
            return Err(DistributionError::InvalidInput(format!(
                "feature matrix has {} rows but the response has {} values",
                features.rows,
                y.len()
            )));
        }
        if features.data.len() < features.rows * features.cols {
            return Err(DistributionError::InvalidInput(format!(
                "feature buffer holds {} values, expected {}x{}",
                features.data.len(),
                features.rows,
                features.cols
            )));
        }
        if n_train == 0 || n_train > y.len() {
            return Err(DistributionError::InvalidInput(format!(
                "n_train must be in [1, {}], got {}",
                y.len(),
                n_train
            )));
        }
        Ok(Dataset {
            features,
            y,
            weights: None,
            offset: None,
            n_train,
        })
    }

    /// Attach case weights; they must be finite and non-negative.
    pub fn with_weights(mut self, weights: &'a [f64]) -> Result<Self, DistributionError> {
        validate_len("weights", weights.len(), self.y.len())?;
        validate_weights(weights)?;
        self.weights = Some(weights);
        Ok(self)
    }

    /// Attach a link-scale offset added to every prediction.
    pub fn with_offset(mut self, offset: &'a [f64]) -> Result<Self, DistributionError> {
        validate_len("offset", offset.len(), self.y.len())?;
        validate_finite("offset", offset)?;
        self.offset = Some(offset);
        Ok(self)
    }

    pub fn features(&self) -> &Matrix<'a, f64> {
        &self.features
    }

    pub fn y(&self) -> &'a [f64] {
        self.y
    }

    pub fn weights(&self) -> Option<&'a [f64]> {
        self.weights
    }

    pub fn offset(&self) -> Option<&'a [f64]> {
        self.offset
    }

    /// Case weight of row `i`.
    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        match self.weights {
            Some(w) => w[i],
            None => 1.0,
        }
    }

    /// Offset of row `i`.
    #[inline]
    pub fn offset_at(&self, i: usize) -> f64 {
        match self.offset {
            Some(o) => o[i],
            None => 0.0,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.y.len()
    }

    pub fn n_train(&self) -> usize {
        self.n_train
    }

    pub fn n_valid(&self) -> usize {
        self.y.len() - self.n_train
    }

    /// Absolute row range covered by `length` observations of the selected set.
    pub(crate) fn row_range(&self, length: usize, is_validation_set: bool) -> Result<Range<usize>, DistributionError> {
        let (start, available) = if is_validation_set {
            (self.n_train, self.n_valid())
        } else {
            (0, self.n_train)
        };
        if length > available {
            return Err(DistributionError::InvalidInput(format!(
                "requested {} rows but the {} set has {}",
                length,
                if is_validation_set { "validation" } else { "training" },
                available
            )));
        }
        Ok(start..start + length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_get() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get(0, 0), &1.0);
        assert_eq!(m.get(2, 1), &6.0);
        assert_eq!(m.get_col(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_dataset_defaults() {
        let x = vec![0.0; 4];
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let data = Dataset::new(Matrix::new(&x, 4, 1), &y, 3).unwrap();
        assert_eq!(data.n_train(), 3);
        assert_eq!(data.n_valid(), 1);
        assert_eq!(data.weight(2), 1.0);
        assert_eq!(data.offset_at(2), 0.0);
        assert_eq!(data.row_range(1, true).unwrap(), 3..4);
        assert!(data.row_range(2, true).is_err());
    }

    #[test]
    fn test_dataset_rejects_bad_inputs() {
        let x = vec![0.0; 3];
        let y = vec![1.0, 2.0, 3.0];
        assert!(Dataset::new(Matrix::new(&x, 3, 1), &y, 0).is_err());
        assert!(Dataset::new(Matrix::new(&x, 2, 1), &y, 2).is_err());

        let data = Dataset::new(Matrix::new(&x, 3, 1), &y, 3).unwrap();
        let negative = vec![1.0, -1.0, 1.0];
        assert!(matches!(
            data.with_weights(&negative),
            Err(DistributionError::InvalidInput(_))
        ));
        let short = vec![1.0, 1.0];
        assert!(data.with_weights(&short).is_err());
        let nan_offset = vec![0.0, f64::NAN, 0.0];
        assert!(data.with_offset(&nan_offset).is_err());
    }
}
