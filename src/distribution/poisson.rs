//! Poisson deviance on the log link, for non-negative counts.
use super::accumulator::{bound_link_step, NodeAccumulator};
use super::strategy::{fill_working_response, mean_deviance, mean_improvement, weighted_sums};
use super::{DistributionFamily, DistributionStrategy};
use crate::bag::Bag;
use crate::constants::MIN_LINK_SCORE;
use crate::data::Dataset;
use crate::errors::DistributionError;
use crate::tree::TerminalNode;
use crate::utils::ensure_finite;
use log::trace;

#[derive(Debug, Clone, Copy)]
pub struct PoissonDistribution<'a> {
    data: Dataset<'a>,
}

impl<'a> PoissonDistribution<'a> {
    pub fn new(data: Dataset<'a>) -> Result<Self, DistributionError> {
        if let Some(i) = data
            .y()
            .iter()
            .position(|y| !(y.is_finite() && *y >= 0.0 && y.fract() == 0.0))
        {
            return Err(DistributionError::UnsupportedConfiguration(format!(
                "poisson distribution requires non-negative integer responses, found {} at row {}",
                data.y()[i],
                i
            )));
        }
        Ok(PoissonDistribution { data })
    }
}

#[inline]
fn unit_deviance(y: f64, s: f64) -> f64 {
    let mu = s.exp();
    if y > 0.0 {
        2.0 * (y * (y.ln() - s) - (y - mu))
    } else {
        2.0 * mu
    }
}

impl DistributionStrategy for PoissonDistribution<'_> {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::Poisson
    }

    fn compute_working_response(
        &self,
        f: &[f64],
        z: &mut [f64],
        bag: &Bag,
        n_train: usize,
    ) -> Result<(), DistributionError> {
        let y = self.data.y();
        fill_working_response(&self.data, f, z, bag, n_train, |i, s| y[i] - s.exp())
    }

    fn init_f(&self, n_obs: usize) -> Result<f64, DistributionError> {
        let y = self.data.y();
        let (num, den) = weighted_sums(&self.data, n_obs, |i| y[i], |i| self.data.offset_at(i).exp())?;
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
            (v * y[i], v * s.exp(), y[i] * (-s).exp())
        })?;

        for (k, node) in term_nodes.iter_mut().enumerate() {
            let step = if !scratch.is_fittable(k, min_obs_in_node) {
                0.0
            } else if scratch.num[k] == 0.0 {
                // No events: push the node to the bottom of the link range.
                trace!("poisson node {} has no events", k);
                MIN_LINK_SCORE - scratch.score_min[k]
            } else {
                bound_link_step(
                    (scratch.num[k] / scratch.den[k]).ln(),
                    scratch.score_min[k],
                    scratch.score_max[k],
                )
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
            2.0 * (y * step - s.exp() * step.exp_m1())
        })
    }
}
