use crate::bag::Bag;
use crate::constants::PARALLEL_MIN_ROWS;
use crate::data::Dataset;
use crate::distribution::{
    BernoulliDistribution, GammaDistribution, GaussianDistribution, NodeAccumulator, PoissonDistribution,
};
use crate::errors::DistributionError;
use crate::tree::TerminalNode;
use crate::utils::{ensure_finite, validate_len};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The loss a boosting model optimizes, seen from the boosting loop.
///
/// Every per-observation slice is indexed from 0 and must hold at least the
/// stated number of rows. Scores are on the link scale; a dataset offset is
/// added to them internally.
pub trait DistributionStrategy: Send + Sync {
    fn family(&self) -> DistributionFamily;

    /// Write the negative gradient of the loss for the first `n_train` rows into `z`.
    /// Out-of-bag rows are computed the same way as in-bag rows.
    fn compute_working_response(&self, f: &[f64], z: &mut [f64], bag: &Bag, n_train: usize)
        -> Result<(), DistributionError>;

    /// Constant score minimizing the weighted loss of the first `n_obs` training rows.
    fn init_f(&self, n_obs: usize) -> Result<f64, DistributionError>;

    /// Replace every terminal node's prediction with one Newton step toward its
    /// loss-minimizing constant, using only in-bag rows assigned to it. Nodes
    /// with fewer than `min_obs_in_node` contributing rows, or no weight, get 0.
    #[allow(clippy::too_many_arguments)]
    fn fit_best_constant<N: TerminalNode>(
        &self,
        f: &[f64],
        z: &[f64],
        node_assign: &[usize],
        n_train: usize,
        term_nodes: &mut [N],
        min_obs_in_node: usize,
        bag: &Bag,
        f_adj: &[f64],
        scratch: &mut NodeAccumulator,
    ) -> Result<(), DistributionError>;

    /// Weighted mean deviance of the first `length` rows of the training set,
    /// or of the validation set when `is_validation_set` is true. `f` is
    /// aligned with the selected set.
    fn deviance(&self, f: &[f64], length: usize, is_validation_set: bool) -> Result<f64, DistributionError>;

    /// Decrease in in-bag weighted mean deviance from moving `f` to
    /// `f + step_size * f_adj`. Zero when the bag carries no weight.
    fn bag_improvement(
        &self,
        f: &[f64],
        f_adj: &[f64],
        bag: &Bag,
        step_size: f64,
        n_train: usize,
    ) -> Result<f64, DistributionError>;
}

/// Supported response families.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributionFamily {
    #[default]
    Gaussian,
    Bernoulli,
    Poisson,
    Gamma,
}

impl FromStr for DistributionFamily {
    type Err = DistributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" => Ok(DistributionFamily::Gaussian),
            "bernoulli" => Ok(DistributionFamily::Bernoulli),
            "poisson" => Ok(DistributionFamily::Poisson),
            "gamma" => Ok(DistributionFamily::Gamma),
            _ => Err(DistributionError::UnsupportedConfiguration(format!(
                "unknown distribution {}, expected one of {}",
                s,
                ["gaussian", "bernoulli", "poisson", "gamma"].join(", ")
            ))),
        }
    }
}

impl fmt::Display for DistributionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistributionFamily::Gaussian => "gaussian",
            DistributionFamily::Bernoulli => "bernoulli",
            DistributionFamily::Poisson => "poisson",
            DistributionFamily::Gamma => "gamma",
        };
        f.write_str(name)
    }
}

/// A constructed strategy, one variant per family.
#[derive(Debug, Clone, Copy)]
pub enum Distribution<'a> {
    Gaussian(GaussianDistribution<'a>),
    Bernoulli(BernoulliDistribution<'a>),
    Poisson(PoissonDistribution<'a>),
    Gamma(GammaDistribution<'a>),
}

/// Build the strategy for `family` over `data`.
///
/// Returns the strategy, the number of response groups and the number of
/// training rows the strategy works on.
pub fn create(
    data: Dataset<'_>,
    family: DistributionFamily,
) -> Result<(Distribution<'_>, usize, usize), DistributionError> {
    let distribution = match family {
        DistributionFamily::Gaussian => Distribution::Gaussian(GaussianDistribution::new(data)?),
        DistributionFamily::Bernoulli => Distribution::Bernoulli(BernoulliDistribution::new(data)?),
        DistributionFamily::Poisson => Distribution::Poisson(PoissonDistribution::new(data)?),
        DistributionFamily::Gamma => Distribution::Gamma(GammaDistribution::new(data)?),
    };
    let n_groups = 1;
    let n_train = data.n_train();
    debug!(
        "created {} distribution over {} training and {} validation rows",
        family,
        n_train,
        data.n_valid()
    );
    Ok((distribution, n_groups, n_train))
}

impl DistributionStrategy for Distribution<'_> {
    fn family(&self) -> DistributionFamily {
        match self {
            Distribution::Gaussian(d) => d.family(),
            Distribution::Bernoulli(d) => d.family(),
            Distribution::Poisson(d) => d.family(),
            Distribution::Gamma(d) => d.family(),
        }
    }

    fn compute_working_response(
        &self,
        f: &[f64],
        z: &mut [f64],
        bag: &Bag,
        n_train: usize,
    ) -> Result<(), DistributionError> {
        match self {
            Distribution::Gaussian(d) => d.compute_working_response(f, z, bag, n_train),
            Distribution::Bernoulli(d) => d.compute_working_response(f, z, bag, n_train),
            Distribution::Poisson(d) => d.compute_working_response(f, z, bag, n_train),
            Distribution::Gamma(d) => d.compute_working_response(f, z, bag, n_train),
        }
    }

    fn init_f(&self, n_obs: usize) -> Result<f64, DistributionError> {
        match self {
            Distribution::Gaussian(d) => d.init_f(n_obs),
            Distribution::Bernoulli(d) => d.init_f(n_obs),
            Distribution::Poisson(d) => d.init_f(n_obs),
            Distribution::Gamma(d) => d.init_f(n_obs),
        }
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
        f_adj: &[f64],
        scratch: &mut NodeAccumulator,
    ) -> Result<(), DistributionError> {
        match self {
            Distribution::Gaussian(d) => d.fit_best_constant(
                f,
                z,
                node_assign,
                n_train,
                term_nodes,
                min_obs_in_node,
                bag,
                f_adj,
                scratch,
            ),
            Distribution::Bernoulli(d) => d.fit_best_constant(
                f,
                z,
                node_assign,
                n_train,
                term_nodes,
                min_obs_in_node,
                bag,
                f_adj,
                scratch,
            ),
            Distribution::Poisson(d) => d.fit_best_constant(
                f,
                z,
                node_assign,
                n_train,
                term_nodes,
                min_obs_in_node,
                bag,
                f_adj,
                scratch,
            ),
            Distribution::Gamma(d) => d.fit_best_constant(
                f,
                z,
                node_assign,
                n_train,
                term_nodes,
                min_obs_in_node,
                bag,
                f_adj,
                scratch,
            ),
        }
    }

    fn deviance(&self, f: &[f64], length: usize, is_validation_set: bool) -> Result<f64, DistributionError> {
        match self {
            Distribution::Gaussian(d) => d.deviance(f, length, is_validation_set),
            Distribution::Bernoulli(d) => d.deviance(f, length, is_validation_set),
            Distribution::Poisson(d) => d.deviance(f, length, is_validation_set),
            Distribution::Gamma(d) => d.deviance(f, length, is_validation_set),
        }
    }

    fn bag_improvement(
        &self,
        f: &[f64],
        f_adj: &[f64],
        bag: &Bag,
        step_size: f64,
        n_train: usize,
    ) -> Result<f64, DistributionError> {
        match self {
            Distribution::Gaussian(d) => d.bag_improvement(f, f_adj, bag, step_size, n_train),
            Distribution::Bernoulli(d) => d.bag_improvement(f, f_adj, bag, step_size, n_train),
            Distribution::Poisson(d) => d.bag_improvement(f, f_adj, bag, step_size, n_train),
            Distribution::Gamma(d) => d.bag_improvement(f, f_adj, bag, step_size, n_train),
        }
    }
}

// Row passes shared by the families.

/// Fill `z[..n_train]` with `row(i, score_i)`, failing on the first non-finite value.
pub(crate) fn fill_working_response<R>(
    data: &Dataset,
    f: &[f64],
    z: &mut [f64],
    bag: &Bag,
    n_train: usize,
    row: R,
) -> Result<(), DistributionError>
where
    R: Fn(usize, f64) -> f64 + Sync + Send,
{
    validate_len("predictions", f.len(), n_train)?;
    validate_len("working response", z.len(), n_train)?;
    validate_len("bag", bag.len(), n_train)?;
    validate_len("dataset training rows", data.n_train(), n_train)?;

    let z = &mut z[..n_train];
    if n_train >= PARALLEL_MIN_ROWS {
        z.par_iter_mut()
            .enumerate()
            .for_each(|(i, z_)| *z_ = row(i, f[i] + data.offset_at(i)));
    } else {
        z.iter_mut()
            .enumerate()
            .for_each(|(i, z_)| *z_ = row(i, f[i] + data.offset_at(i)));
    }
    match z.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(DistributionError::NonFinite {
            operation: "compute_working_response",
            index: i,
        }),
        None => Ok(()),
    }
}

/// Weighted mean of `unit(y, score)` over the selected rows.
///
/// Above `PARALLEL_MIN_ROWS` the sum runs on rayon, whose split points are
/// not fixed, so the result may differ from the serial sum in the last bits.
pub(crate) fn mean_deviance<U>(
    data: &Dataset,
    f: &[f64],
    length: usize,
    is_validation_set: bool,
    unit: U,
) -> Result<f64, DistributionError>
where
    U: Fn(f64, f64) -> f64 + Sync + Send,
{
    let rows = data.row_range(length, is_validation_set)?;
    validate_len("predictions", f.len(), length)?;
    let start = rows.start;
    let y = data.y();
    let term = |j: usize| {
        let i = start + j;
        let w = data.weight(i);
        (w * unit(y[i], f[j] + data.offset_at(i)), w)
    };
    let (total, w_sum) = if length >= PARALLEL_MIN_ROWS {
        (0..length)
            .into_par_iter()
            .map(term)
            .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
    } else {
        (0..length).map(term).fold((0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
    };
    if w_sum <= 0.0 {
        return Err(DistributionError::InvalidInput(format!(
            "deviance requested over {} rows with zero total weight",
            length
        )));
    }
    if !total.is_finite() {
        let j = (0..length).position(|j| !term(j).0.is_finite()).unwrap_or(0);
        return Err(DistributionError::NonFinite {
            operation: "deviance",
            index: j,
        });
    }
    Ok(total / w_sum)
}

/// Weighted mean of `unit_gain(y, score, step)` over in-bag training rows,
/// where `step = step_size * f_adj[i]`.
pub(crate) fn mean_improvement<U>(
    data: &Dataset,
    f: &[f64],
    f_adj: &[f64],
    bag: &Bag,
    step_size: f64,
    n_train: usize,
    unit_gain: U,
) -> Result<f64, DistributionError>
where
    U: Fn(f64, f64, f64) -> f64,
{
    validate_len("predictions", f.len(), n_train)?;
    validate_len("adjustments", f_adj.len(), n_train)?;
    validate_len("bag", bag.len(), n_train)?;
    validate_len("dataset training rows", data.n_train(), n_train)?;

    let y = data.y();
    let mut total = 0.0;
    let mut w_sum = 0.0;
    for i in 0..n_train {
        if !bag.in_bag(i) {
            continue;
        }
        let v = data.weight(i) * bag.weight(i);
        let gain = unit_gain(y[i], f[i] + data.offset_at(i), step_size * f_adj[i]);
        total += v * ensure_finite(gain, "bag_improvement", i)?;
        w_sum += v;
    }
    if w_sum <= 0.0 {
        return Ok(0.0);
    }
    Ok(total / w_sum)
}

/// Sum of `w_i * num(i)` and of `w_i * den(i)` over the first `n_obs` training rows.
pub(crate) fn weighted_sums<N, D>(
    data: &Dataset,
    n_obs: usize,
    num: N,
    den: D,
) -> Result<(f64, f64), DistributionError>
where
    N: Fn(usize) -> f64,
    D: Fn(usize) -> f64,
{
    let rows = data.row_range(n_obs, false)?;
    let mut num_sum = 0.0;
    let mut den_sum = 0.0;
    for i in rows {
        let w = data.weight(i);
        num_sum += w * num(i);
        den_sum += w * den(i);
    }
    Ok((num_sum, den_sum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Matrix;
    use crate::tree::LeafNode;

    #[test]
    fn test_family_from_str() {
        assert_eq!("Gamma".parse::<DistributionFamily>().unwrap(), DistributionFamily::Gamma);
        assert_eq!(
            "bernoulli".parse::<DistributionFamily>().unwrap(),
            DistributionFamily::Bernoulli
        );
        assert!(matches!(
            "tweedie".parse::<DistributionFamily>(),
            Err(DistributionError::UnsupportedConfiguration(_))
        ));
        assert_eq!(DistributionFamily::Poisson.to_string(), "poisson");
        match "tweedie".parse::<DistributionFamily>() {
            Err(e) => assert!(e.to_string().ends_with("expected one of gaussian, bernoulli, poisson, gamma")),
            Ok(_) => panic!("tweedie is not a supported family"),
        }
    }

    #[test]
    fn test_create_reports_counts() {
        let x = vec![0.0; 4];
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let data = Dataset::new(Matrix::new(&x, 4, 1), &y, 3).unwrap();
        let (dist, n_groups, n_train) = create(data, DistributionFamily::Gamma).unwrap();
        assert_eq!(n_groups, 1);
        assert_eq!(n_train, 3);
        assert_eq!(dist.family(), DistributionFamily::Gamma);
    }

    #[test]
    fn test_create_rejects_incompatible_data() {
        let x = vec![0.0; 3];
        let y = vec![1.0, 0.0, 3.0];
        let data = Dataset::new(Matrix::new(&x, 3, 1), &y, 3).unwrap();
        assert!(matches!(
            create(data, DistributionFamily::Gamma),
            Err(DistributionError::UnsupportedConfiguration(_))
        ));
        assert!(matches!(
            create(data, DistributionFamily::Bernoulli),
            Err(DistributionError::UnsupportedConfiguration(_))
        ));
        assert!(create(data, DistributionFamily::Poisson).is_ok());
        assert!(create(data, DistributionFamily::Gaussian).is_ok());
    }

    #[test]
    fn test_enum_dispatch_matches_family() {
        let x = vec![0.0; 3];
        let y = vec![2.0, 4.0, 6.0];
        let data = Dataset::new(Matrix::new(&x, 3, 1), &y, 3).unwrap();
        let (dist, _, n_train) = create(data, DistributionFamily::Gamma).unwrap();
        let gamma = GammaDistribution::new(data).unwrap();
        let f = vec![dist.init_f(n_train).unwrap(); n_train];
        assert_eq!(dist.init_f(n_train).unwrap(), gamma.init_f(n_train).unwrap());

        let bag = Bag::full(n_train);
        let mut z = vec![0.0; n_train];
        dist.compute_working_response(&f, &mut z, &bag, n_train).unwrap();
        let mut leaves = vec![LeafNode::default()];
        let mut scratch = NodeAccumulator::new();
        dist.fit_best_constant(&f, &z, &[0, 0, 0], n_train, &mut leaves, 1, &bag, &[], &mut scratch)
            .unwrap();
        assert!(leaves[0].prediction.abs() < 1e-12);
        assert_eq!(
            dist.deviance(&f, n_train, false).unwrap(),
            gamma.deviance(&f, n_train, false).unwrap()
        );
    }

    #[test]
    fn test_parallel_and_serial_passes_agree() {
        let n = PARALLEL_MIN_ROWS + 10;
        let x = vec![0.0; n];
        let y: Vec<f64> = (0..n).map(|i| 1.0 + (i % 7) as f64).collect();
        let data = Dataset::new(Matrix::new(&x, n, 1), &y, n).unwrap();
        let gamma = GammaDistribution::new(data).unwrap();
        let f = vec![1.0; n];
        let mut z = vec![0.0; n];
        gamma.compute_working_response(&f, &mut z, &Bag::full(n), n).unwrap();
        for i in [0, 5, n - 1] {
            assert_eq!(z[i], y[i] * (-1.0_f64).exp() - 1.0);
        }

        let small = Dataset::new(Matrix::new(&x[..100], 100, 1), &y[..100], 100).unwrap();
        let dev_small = GammaDistribution::new(small).unwrap().deviance(&f[..100], 100, false).unwrap();
        let dev_head = gamma.deviance(&f, 100, false).unwrap();
        assert_eq!(dev_small, dev_head);
        let dev_all = gamma.deviance(&f, n, false).unwrap();
        assert!(dev_all.is_finite() && dev_all > 0.0);
    }
}
