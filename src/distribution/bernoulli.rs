//! Binomial deviance on the logit link, for 0/1 responses.
use super::accumulator::{bound_link_step, NodeAccumulator};
use super::strategy::{fill_working_response, mean_deviance, mean_improvement, weighted_sums};
use super::{DistributionFamily, DistributionStrategy};
use crate::bag::Bag;
use crate::constants::INIT_NEWTON_ITERATIONS;
use crate::data::Dataset;
use crate::errors::DistributionError;
use crate::tree::TerminalNode;
use crate::utils::{ensure_finite, log1p_exp, logistic, validate_len};

#[derive(Debug, Clone, Copy)]
pub struct BernoulliDistribution<'a> {
    data: Dataset<'a>,
}

impl<'a> BernoulliDistribution<'a> {
    pub fn new(data: Dataset<'a>) -> Result<Self, DistributionError> {
        if let Some(i) = data.y().iter().position(|y| *y != 0.0 && *y != 1.0) {
            return Err(DistributionError::UnsupportedConfiguration(format!(
                "bernoulli distribution requires 0/1 responses, found {} at row {}",
                data.y()[i],
                i
            )));
        }
        Ok(BernoulliDistribution { data })
    }
}

#[inline]
fn unit_deviance(y: f64, s: f64) -> f64 {
    2.0 * (log1p_exp(s) - y * s)
}

impl DistributionStrategy for BernoulliDistribution<'_> {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::Bernoulli
    }

    fn compute_working_response(
        &self,
        f: &[f64],
        z: &mut [f64],
        bag: &Bag,
        n_train: usize,
    ) -> Result<(), DistributionError> {
        let y = self.data.y();
        fill_working_response(&self.data, f, z, bag, n_train, |i, s| y[i] - logistic(s))
    }

    fn init_f(&self, n_obs: usize) -> Result<f64, DistributionError> {
        let y = self.data.y();
        let (pos, total) = weighted_sums(&self.data, n_obs, |i| y[i], |_| 1.0)?;
        if total <= 0.0 {
            return Err(DistributionError::InvalidInput(format!(
                "initial score requested over {} rows with zero total weight",
                n_obs
            )));
        }
        if pos == 0.0 || pos == total {
            // All-0 or all-1 responses: the optimum is at infinity.
            return Err(DistributionError::NonFinite {
                operation: "init_f",
                index: n_obs,
            });
        }
        if self.data.offset().is_none() {
            return ensure_finite((pos / (total - pos)).ln(), "init_f", n_obs);
        }
        // Newton iterations on the offset model, starting from 0.
        let mut f0 = 0.0;
        for _ in 0..INIT_NEWTON_ITERATIONS {
            let (num, den) = weighted_sums(
                &self.data,
                n_obs,
                |i| y[i] - logistic(f0 + self.data.offset_at(i)),
                |i| {
                    let p = logistic(f0 + self.data.offset_at(i));
                    p * (1.0 - p)
                },
            )?;
            if den <= 0.0 {
                break;
            }
            f0 += num / den;
        }
        ensure_finite(f0, "init_f", n_obs)
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
        let y = self.data.y();
        scratch.accumulate(&self.data, f, node_assign, n_train, term_nodes.len(), bag, |i, _s, v| {
            // y - z is the fitted probability
            let p = y[i] - z[i];
            (v * z[i], v * p * (1.0 - p), z[i])
        })?;

        for (k, node) in term_nodes.iter_mut().enumerate() {
            let step = if scratch.is_fittable(k, min_obs_in_node) {
                bound_link_step(scratch.num[k] / scratch.den[k], scratch.score_min[k], scratch.score_max[k])
            } else {
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
            2.0 * (y * step - log1p_exp(s + step) + log1p_exp(s))
        })
    }
}
