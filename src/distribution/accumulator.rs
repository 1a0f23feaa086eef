//! Per-node scratch space for fitting terminal-node constants.
use crate::bag::Bag;
use crate::constants::{MAX_LINK_SCORE, MIN_LINK_SCORE};
use crate::data::Dataset;
use crate::errors::DistributionError;
use crate::utils::validate_len;

/// Newton-step sums for every terminal node of the tree being fitted.
///
/// One buffer can be kept by the caller and handed to every
/// `fit_best_constant` call: it is resized and reset to neutral values at the
/// start of each call, and keeps its capacity in between.
#[derive(Debug, Clone, Default)]
pub struct NodeAccumulator {
    /// Weighted numerator of the Newton ratio.
    pub num: Vec<f64>,
    /// Weighted denominator of the Newton ratio.
    pub den: Vec<f64>,
    /// Largest per-observation ratio seen in the node.
    pub max: Vec<f64>,
    /// Smallest per-observation ratio seen in the node.
    pub min: Vec<f64>,
    /// Observations with positive effective weight.
    pub count: Vec<usize>,
    /// Largest link-scale score (prediction plus offset) in the node.
    pub score_max: Vec<f64>,
    /// Smallest link-scale score in the node.
    pub score_min: Vec<f64>,
}

impl NodeAccumulator {
    pub fn new() -> Self {
        NodeAccumulator::default()
    }

    pub fn with_capacity(n_nodes: usize) -> Self {
        NodeAccumulator {
            num: Vec::with_capacity(n_nodes),
            den: Vec::with_capacity(n_nodes),
            max: Vec::with_capacity(n_nodes),
            min: Vec::with_capacity(n_nodes),
            count: Vec::with_capacity(n_nodes),
            score_max: Vec::with_capacity(n_nodes),
            score_min: Vec::with_capacity(n_nodes),
        }
    }

    /// Size the buffer for `n_nodes` nodes and reset every entry.
    pub fn reset(&mut self, n_nodes: usize) {
        reset_to(&mut self.num, n_nodes, 0.0);
        reset_to(&mut self.den, n_nodes, 0.0);
        reset_to(&mut self.max, n_nodes, f64::NEG_INFINITY);
        reset_to(&mut self.min, n_nodes, f64::INFINITY);
        reset_to(&mut self.score_max, n_nodes, f64::NEG_INFINITY);
        reset_to(&mut self.score_min, n_nodes, f64::INFINITY);
        self.count.clear();
        self.count.resize(n_nodes, 0);
    }

    pub fn n_nodes(&self) -> usize {
        self.num.len()
    }

    #[inline]
    pub fn add(&mut self, node: usize, num: f64, den: f64, ratio: f64, score: f64) {
        self.num[node] += num;
        self.den[node] += den;
        self.max[node] = self.max[node].max(ratio);
        self.min[node] = self.min[node].min(ratio);
        self.score_max[node] = self.score_max[node].max(score);
        self.score_min[node] = self.score_min[node].min(score);
        self.count[node] += 1;
    }

    /// Whether node `k` has enough support to receive a fitted constant.
    #[inline]
    pub fn is_fittable(&self, k: usize, min_obs_in_node: usize) -> bool {
        self.count[k] > 0 && self.count[k] >= min_obs_in_node && self.den[k] != 0.0
    }

    /// Every populated node must hold finite sums.
    pub fn check_finite(&self) -> Result<(), DistributionError> {
        for k in 0..self.n_nodes() {
            if self.count[k] == 0 {
                continue;
            }
            let finite = self.num[k].is_finite()
                && self.den[k].is_finite()
                && self.max[k].is_finite()
                && self.min[k].is_finite()
                && self.score_max[k].is_finite()
                && self.score_min[k].is_finite();
            if !finite {
                return Err(DistributionError::NonFinite {
                    operation: "fit_best_constant",
                    index: k,
                });
            }
        }
        Ok(())
    }

    /// Accumulate every in-bag training row into its node.
    ///
    /// `row` maps `(i, score, effective_weight)` to the row's
    /// `(numerator, denominator, ratio)` contribution. Rows whose case weight
    /// times bag value is zero do not contribute.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn accumulate<R>(
        &mut self,
        data: &Dataset,
        f: &[f64],
        node_assign: &[usize],
        n_train: usize,
        n_nodes: usize,
        bag: &Bag,
        row: R,
    ) -> Result<(), DistributionError>
    where
        R: Fn(usize, f64, f64) -> (f64, f64, f64),
    {
        validate_len("predictions", f.len(), n_train)?;
        validate_len("node assignment", node_assign.len(), n_train)?;
        validate_len("bag", bag.len(), n_train)?;
        validate_len("dataset training rows", data.n_train(), n_train)?;

        self.reset(n_nodes);
        for i in 0..n_train {
            if !bag.in_bag(i) {
                continue;
            }
            let v = data.weight(i) * bag.weight(i);
            if v == 0.0 {
                continue;
            }
            let k = node_assign[i];
            if k >= n_nodes {
                return Err(DistributionError::InvalidInput(format!(
                    "row {} assigned to node {} but only {} terminal nodes were given",
                    i, k, n_nodes
                )));
            }
            let s = f[i] + data.offset_at(i);
            let (num, den, ratio) = row(i, s, v);
            self.add(k, num, den, ratio, s);
        }
        self.check_finite()
    }
}

fn reset_to(v: &mut Vec<f64>, n: usize, value: f64) {
    v.clear();
    v.resize(n, value);
}

/// Shrink a leaf step so no member's score leaves `[MIN_LINK_SCORE, MAX_LINK_SCORE]`.
#[inline]
pub(crate) fn bound_link_step(step: f64, score_min: f64, score_max: f64) -> f64 {
    let mut step = step;
    if score_max + step > MAX_LINK_SCORE {
        step = MAX_LINK_SCORE - score_max;
    }
    if score_min + step < MIN_LINK_SCORE {
        step = MIN_LINK_SCORE - score_min;
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_capacity() {
        let mut acc = NodeAccumulator::with_capacity(8);
        acc.reset(3);
        acc.add(1, 2.0, 1.0, 2.0, 0.5);
        assert_eq!(acc.count, vec![0, 1, 0]);
        acc.reset(2);
        assert_eq!(acc.n_nodes(), 2);
        assert_eq!(acc.num, vec![0.0, 0.0]);
        assert_eq!(acc.max, vec![f64::NEG_INFINITY; 2]);
        assert!(acc.num.capacity() >= 8);
    }

    #[test]
    fn test_check_finite() {
        let mut acc = NodeAccumulator::new();
        acc.reset(2);
        acc.add(0, 1.0, 1.0, 1.0, 0.0);
        assert!(acc.check_finite().is_ok());
        acc.add(1, f64::INFINITY, 1.0, f64::INFINITY, 0.0);
        assert!(matches!(
            acc.check_finite(),
            Err(DistributionError::NonFinite { index: 1, .. })
        ));
    }

    #[test]
    fn test_bound_link_step() {
        assert_eq!(bound_link_step(1.0, 0.0, 2.0), 1.0);
        assert_eq!(bound_link_step(5.0, 0.0, 18.0), 1.0);
        assert_eq!(bound_link_step(-5.0, -17.0, 0.0), -2.0);
    }
}
