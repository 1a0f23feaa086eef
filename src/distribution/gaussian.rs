//! Squared error on the identity link.
use super::accumulator::NodeAccumulator;
use super::strategy::{fill_working_response, mean_deviance, mean_improvement, weighted_sums};
use super::{DistributionFamily, DistributionStrategy};
use crate::bag::Bag;
use crate::data::Dataset;
use crate::errors::DistributionError;
use crate::tree::TerminalNode;
use crate::utils::{ensure_finite, validate_len};

#[derive(Debug, Clone, Copy)]
pub struct GaussianDistribution<'a> {
    data: Dataset<'a>,
}

impl<'a> GaussianDistribution<'a> {
    pub fn new(data: Dataset<'a>) -> Result<Self, DistributionError> {
        if let Some(i) = data.y().iter().position(|y| !y.is_finite()) {
            return Err(DistributionError::UnsupportedConfiguration(format!(
                "gaussian distribution requires finite responses, found {} at row {}",
                data.y()[i],
                i
            )));
        }
        Ok(GaussianDistribution { data })
    }
}

impl DistributionStrategy for GaussianDistribution<'_> {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::Gaussian
    }

    fn compute_working_response(
        &self,
        f: &[f64],
        z: &mut [f64],
        bag: &Bag,
        n_train: usize,
    ) -> Result<(), DistributionError> {
        let y = self.data.y();
        fill_working_response(&self.data, f, z, bag, n_train, |i, s| y[i] - s)
    }

    fn init_f(&self, n_obs: usize) -> Result<f64, DistributionError> {
        let y = self.data.y();
        let (num, den) = weighted_sums(&self.data, n_obs, |i| y[i] - self.data.offset_at(i), |_| 1.0)?;
        if den <= 0.0 {
            return Err(DistributionError::InvalidInput(format!(
                "initial score requested over {} rows with zero total weight",
                n_obs
            )));
        }
        ensure_finite(num / den, "init_f", n_obs)
    }

    fn fit_best_constant<N: TerminalNode>(
        &self,
        f: &[f64],
        z: &[f64],
        node_assign: &[usize],
        n_train: usize,
        term_nodes: &mut [N],
        min_obs_in_node: usize,
        bag: &Bag,
        _f_adj: &[f64],
        scratch: &mut NodeAccumulator,
    ) -> Result<(), DistributionError> {
        validate_len("working response", z.len(), n_train)?;
        scratch.accumulate(&self.data, f, node_assign, n_train, term_nodes.len(), bag, |i, _s, v| {
            (v * z[i], v, z[i])
        })?;

        for (k, node) in term_nodes.iter_mut().enumerate() {
            let step = if scratch.is_fittable(k, min_obs_in_node) {
                (scratch.num[k] / scratch.den[k]).clamp(scratch.min[k], scratch.max[k])
            } else {
                0.0
            };
            node.set_prediction(ensure_finite(step, "fit_best_constant", k)?);
        }
        Ok(())
    }

    fn deviance(&self, f: &[f64], length: usize, is_validation_set: bool) -> Result<f64, DistributionError> {
        mean_deviance(&self.data, f, length, is_validation_set, |y, s| (y - s) * (y - s))
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
            step * (2.0 * (y - s) - step)
        })
    }
}
