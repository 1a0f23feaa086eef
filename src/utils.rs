use crate::errors::DistributionError;

// Validation
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), DistributionError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(DistributionError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Fail unless a slice holds at least `needed` values.
#[inline]
pub fn validate_len(name: &str, len: usize, needed: usize) -> Result<(), DistributionError> {
    if len < needed {
        Err(DistributionError::InvalidInput(format!(
            "{} has length {}, expected at least {}",
            name, len, needed
        )))
    } else {
        Ok(())
    }
}

pub fn validate_finite(name: &str, values: &[f64]) -> Result<(), DistributionError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(DistributionError::InvalidInput(format!(
            "{} contains non-finite value {} at index {}",
            name, values[i], i
        ))),
        None => Ok(()),
    }
}

/// Case weights must be finite and non-negative.
pub fn validate_weights(weights: &[f64]) -> Result<(), DistributionError> {
    match weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
        Some(i) => Err(DistributionError::InvalidInput(format!(
            "weight {} at index {} is negative or non-finite",
            weights[i], i
        ))),
        None => Ok(()),
    }
}

/// Pass a value through, or report where it stopped being finite.
#[inline]
pub fn ensure_finite(value: f64, operation: &'static str, index: usize) -> Result<f64, DistributionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DistributionError::NonFinite { operation, index })
    }
}

/// Compare to metric values, determining if b is better.
/// If one of them is NaN favor the non NaN value.
/// If both are NaN, consider the first value to be better.
pub fn is_comparison_better(value: f64, comparison: f64, maximize: bool) -> bool {
    match (value.is_nan(), comparison.is_nan()) {
        // Both nan, comparison is not better,
        // Or comparison is nan, also not better
        (true, true) | (false, true) => false,
        // comparison is not Nan, it's better
        (true, false) => true,
        // Perform numerical comparison.
        (false, false) => {
            if maximize {
                value < comparison
            } else {
                value > comparison
            }
        }
    }
}

#[inline]
pub fn logistic(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// `ln(1 + e^v)` without overflow for large `v`.
#[inline]
pub fn log1p_exp(v: f64) -> f64 {
    if v > 0.0 {
        v + (-v).exp().ln_1p()
    } else {
        v.exp().ln_1p()
    }
}
