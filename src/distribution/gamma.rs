//! Gamma deviance on the log link.
//!
//! For a strictly positive response with multiplicative error the score is
//! `F = log(mu)`. With `s = F + offset` and the ratio `r = y * exp(-s)`:
//!
//! * working response: `r - 1`
//! * unit deviance: `2 * (r - 1 - log(r))`, i.e. `2 * (y*exp(-s) - 1 - log(y) + s)`
//! * leaf step: `log(sum(w*r) / sum(w))`, clamped to the node's ratio range and
//!   kept inside the link-scale bounds
//!
//! The shape parameter cancels from all of these and is never estimated.
use super::accumulator::{bound_link_step, NodeAccumulator};
use super::strategy::{fill_working_response, mean_deviance, mean_improvement, weighted_sums};
use super::{DistributionFamily, DistributionStrategy};
use crate::bag::Bag;
use crate::data::Dataset;
use crate::errors::DistributionError;
use crate::tree::TerminalNode;
use crate::utils::ensure_finite;
use log::trace;

#[derive(Debug, Clone, Copy)]
pub struct GammaDistribution<'a> {
    data: Dataset<'a>,
}

impl<'a> GammaDistribution<'a> {
    /// Fails with `UnsupportedConfiguration` unless every response is finite and positive.
    pub fn new(data: Dataset<'a>) -> Result<Self, DistributionError> {
        if let Some(i) = data.y().iter().position(|y| !(y.is_finite() && *y > 0.0)) {
            return Err(DistributionError::UnsupportedConfiguration(format!(
                "gamma distribution requires strictly positive responses, found {} at row {}",
                data.y()[i],
                i
            )));
        }
        Ok(GammaDistribution { data })
    }
}

#[inline]
fn unit_deviance(y: f64, s: f64) -> f64 {
    let r = y * (-s).exp();
    2.0 * (r - 1.0 - r.ln())
}

impl DistributionStrategy for GammaDistribution<'_> {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::Gamma
    }

    fn compute_working_response(
        &self,
        f: &[f64],
        z: &mut [f64],
        bag: &Bag,
        n_train: usize,
    ) -> Result<(), DistributionError> {
        let y = self.data.y();
        fill_working_response(&self.data, f, z, bag, n_train, |i, s| y[i] * (-s).exp() - 1.0)
    }

    fn init_f(&self, n_obs: usize) -> Result<f64, DistributionError> {
        let y = self.data.y();
        let (num, den) = weighted_sums(&self.data, n_obs, |i| y[i] * (-self.data.offset_at(i)).exp(), |_| 1.0)?;
        if den <= 0.0 {
            return Err(DistributionError::InvalidInput(format!(
                "initial score requested over {} rows with zero total weight",
                n_obs
            )));
        }
        ensure_finite((num / den).ln(), "init_f", n_obs)
    }

    fn fit_best_constant<N: TerminalNode>(
        &self,
        f: &[f64],
        _z: &[f64],
        node_assign: &[usize],
        n_train: usize,
        term_nodes: &mut [N],
        min_obs_in_node: usize,
        bag: &Bag,
        _f_adj: &[f64],
        scratch: &mut NodeAccumulator,
    ) -> Result<(), DistributionError> {
        let y = self.data.y();
        scratch.accumulate(&self.data, f, node_assign, n_train, term_nodes.len(), bag, |i, s, v| {
            let r = y[i] * (-s).exp();
            (v * r, v, r)
        })?;

        for (k, node) in term_nodes.iter_mut().enumerate() {
            let step = if scratch.is_fittable(k, min_obs_in_node) {
                let ratio = (scratch.num[k] / scratch.den[k]).clamp(scratch.min[k], scratch.max[k]);
                let step = bound_link_step(ratio.ln(), scratch.score_min[k], scratch.score_max[k]);
                if step != ratio.ln() {
                    trace!("gamma node {} step {} bounded to {}", k, ratio.ln(), step);
                }
                step
            } else {
                trace!("gamma node {} left at 0 with {} rows", k, scratch.count[k]);
                0.0
            };
            node.set_prediction(ensure_finite(step, "fit_best_constant", k)?);
        }
        Ok(())
    }

    fn deviance(&self, f: &[f64], length: usize, is_validation_set: bool) -> Result<f64, DistributionError> {
        mean_deviance(&self.data, f, length, is_validation_set, unit_deviance)
    }

    fn bag_improvement(
        &self,
        f: &[f64],
        f_adj: &[f64],
        bag: &Bag,
        step_size: f64,
        n_train: usize,
    ) -> Result<f64, DistributionError> {
        mean_improvement(&self.data, f, f_adj, bag, step_size, n_train, |y, s, step| {
            // dev(s) - dev(s + step)
            2.0 * (y * (-s).exp() * -(-step).exp_m1() - step)
        })
    }
}
