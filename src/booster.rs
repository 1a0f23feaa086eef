//! Booster
//!
//! A plain gradient-boosting loop around a distribution strategy. The loop
//! owns iteration count, shrinkage and bag sampling; tree growing is delegated
//! to a caller supplied [`TreeGrower`].
use crate::config::BoosterConfig;
use crate::data::Dataset;
use crate::distribution::{create, DistributionFamily, DistributionStrategy, NodeAccumulator};
use crate::errors::DistributionError;
use crate::sampler::{FullSampler, RandomSampler, Sampler};
use crate::tree::TreeGrower;
use crate::utils::is_comparison_better;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

/// What happened in one boosting iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Rows drawn into the bag.
    pub n_in_bag: usize,
    /// In-bag deviance decrease of the shrunken tree.
    pub improvement: f64,
    pub train_deviance: f64,
    pub valid_deviance: Option<f64>,
}

/// Result of [`DistributionBooster::fit`].
#[derive(Debug, Clone)]
pub struct BoostingFit {
    pub family: DistributionFamily,
    /// Constant score every row started from.
    pub init_f: f64,
    /// Final link-scale score of every row, training rows first.
    pub predictions: Vec<f64>,
    pub history: Vec<IterationRecord>,
    /// Iteration with the lowest validation deviance, when there are validation rows.
    pub best_iteration: Option<usize>,
}

/// Drives a distribution strategy through the boosting iterations.
#[derive(Debug, Clone)]
pub struct DistributionBooster {
    pub cfg: BoosterConfig,
}

impl DistributionBooster {
    pub fn new(cfg: BoosterConfig) -> Result<Self, DistributionError> {
        cfg.validate()?;
        Ok(DistributionBooster { cfg })
    }

    /// Fit `n_trees` iterations on `data`, growing each tree with `grower`.
    ///
    /// Every iteration draws a bag, computes the working response, grows a
    /// tree, replaces its leaf values with the strategy's constants, records
    /// the bag improvement and finally moves all rows by `shrinkage` times
    /// their leaf value.
    pub fn fit<G>(&self, data: Dataset<'_>, grower: &mut G) -> Result<BoostingFit, DistributionError>
    where
        G: TreeGrower + Send,
    {
        match self.cfg.num_threads {
            Some(num_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .map_err(|e| {
                        DistributionError::InvalidParameter(
                            "num_threads".to_string(),
                            "a buildable thread pool".to_string(),
                            e.to_string(),
                        )
                    })?;
                pool.install(|| self.fit_iterations(data, grower))
            }
            None => self.fit_iterations(data, grower),
        }
    }

    fn fit_iterations<G: TreeGrower>(
        &self,
        data: Dataset<'_>,
        grower: &mut G,
    ) -> Result<BoostingFit, DistributionError> {
        let start = Instant::now();
        let cfg = &self.cfg;

        let (distribution, _n_groups, n_train) = create(data, cfg.family)?;
        let n_rows = data.n_rows();
        let n_valid = data.n_valid();

        let init_f = distribution.init_f(n_train)?;
        let mut f = vec![init_f; n_rows];
        let mut z = vec![0.0; n_train];
        let mut scratch = NodeAccumulator::new();

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut sampler: Box<dyn Sampler> = if cfg.bag_fraction >= 1.0 {
            Box::new(FullSampler)
        } else {
            Box::new(RandomSampler::new(cfg.bag_fraction))
        };

        let mut history = Vec::with_capacity(cfg.n_trees);
        let mut best: Option<(usize, f64)> = None;
        let mut rounds_without_improvement = 0;

        for i in 0..cfg.n_trees {
            let verbose = if cfg.log_iterations == 0 {
                false
            } else {
                i % cfg.log_iterations == 0
            };

            let bag = sampler.sample(&mut rng, n_train);
            distribution.compute_working_response(&f[..n_train], &mut z, &bag, n_train)?;

            let mut tree = grower.grow(&data, &z, &bag)?;
            tree.validate(n_rows)?;
            let naive_adj = tree.row_adjustments();
            distribution.fit_best_constant(
                &f[..n_train],
                &z,
                &tree.node_assign[..n_train],
                n_train,
                &mut tree.leaves,
                cfg.min_obs_in_node,
                &bag,
                &naive_adj[..n_train],
                &mut scratch,
            )?;

            let f_adj = tree.row_adjustments();
            let improvement =
                distribution.bag_improvement(&f[..n_train], &f_adj[..n_train], &bag, cfg.shrinkage, n_train)?;
            f.iter_mut().zip(&f_adj).for_each(|(f_, adj)| *f_ += cfg.shrinkage * adj);

            let train_deviance = distribution.deviance(&f[..n_train], n_train, false)?;
            let valid_deviance = if n_valid > 0 {
                Some(distribution.deviance(&f[n_train..], n_valid, true)?)
            } else {
                None
            };

            if verbose {
                info!(
                    "round {:0?}, leaves: {:1?}, improvement: {:2?}, train deviance: {:3?}, valid deviance: {:4?}",
                    i,
                    tree.leaves.len(),
                    improvement,
                    train_deviance,
                    valid_deviance,
                );
            }

            history.push(IterationRecord {
                iteration: i,
                n_in_bag: bag.count(),
                improvement,
                train_deviance,
                valid_deviance,
            });

            if let Some(vd) = valid_deviance {
                match best {
                    Some((_, best_value)) if !is_comparison_better(best_value, vd, false) => {
                        rounds_without_improvement += 1;
                    }
                    _ => {
                        best = Some((i, vd));
                        rounds_without_improvement = 0;
                    }
                }
                if let Some(rounds) = cfg.early_stopping_rounds {
                    if rounds_without_improvement >= rounds {
                        warn!(
                            "Stopping early at round {}: validation deviance has not improved for {} rounds.",
                            i, rounds
                        );
                        break;
                    }
                }
            }
        }

        if cfg.log_iterations > 0 {
            info!(
                "Finished boosting {0} trees for the {1} distribution in {2:.3} seconds.",
                history.len(),
                cfg.family,
                start.elapsed().as_secs_f32()
            );
        }

        Ok(BoostingFit {
            family: cfg.family,
            init_f,
            predictions: f,
            history,
            best_iteration: best.map(|(i, _)| i),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::Bag;
    use crate::data::Matrix;
    use crate::tree::{GrownTree, LeafNode};

    /// Two leaves split on the first feature; leaf values start at the mean working response.
    struct ThresholdGrower {
        threshold: f64,
    }

    impl TreeGrower for ThresholdGrower {
        fn grow(&mut self, data: &Dataset, z: &[f64], bag: &Bag) -> Result<GrownTree, DistributionError> {
            let x = data.features().get_col(0);
            let node_assign: Vec<usize> = x.iter().map(|v| usize::from(*v >= self.threshold)).collect();
            let mut sums = [0.0; 2];
            let mut counts = [0.0; 2];
            for (i, z_) in z.iter().enumerate() {
                if bag.in_bag(i) {
                    sums[node_assign[i]] += z_;
                    counts[node_assign[i]] += 1.0;
                }
            }
            let leaves = (0..2)
                .map(|k| LeafNode::new(if counts[k] > 0.0 { sums[k] / counts[k] } else { 0.0 }))
                .collect();
            Ok(GrownTree { node_assign, leaves })
        }
    }

    fn two_group_data() -> (Vec<f64>, Vec<f64>) {
        let x = vec![0.1, 0.2, 0.3, 0.4, 0.6, 0.7, 0.8, 0.9, 0.25, 0.75];
        let y = vec![2.0, 2.0, 2.0, 2.0, 8.0, 8.0, 8.0, 8.0, 2.0, 8.0];
        (x, y)
    }

    #[test]
    fn test_gamma_boosting_converges_to_group_means() {
        let (x, y) = two_group_data();
        let data = Dataset::new(Matrix::new(&x, 10, 1), &y, 8).unwrap();
        let cfg = BoosterConfig::new(DistributionFamily::Gamma)
            .set_n_trees(40)
            .set_shrinkage(0.5)
            .set_bag_fraction(1.0)
            .set_min_obs_in_node(1)
            .set_log_iterations(10);
        let booster = DistributionBooster::new(cfg).unwrap();
        let fit = booster.fit(data, &mut ThresholdGrower { threshold: 0.5 }).unwrap();

        assert!((fit.init_f - 5.0_f64.ln()).abs() < 1e-12);
        assert_eq!(fit.history.len(), 40);
        for pair in fit.history.windows(2) {
            assert!(pair[1].train_deviance <= pair[0].train_deviance + 1e-12);
        }
        assert!(fit.history.iter().all(|r| r.improvement >= -1e-12));
        assert!((fit.predictions[0] - 2.0_f64.ln()).abs() < 1e-6);
        assert!((fit.predictions[7] - 8.0_f64.ln()).abs() < 1e-6);
        // validation rows follow the same pattern
        assert!((fit.predictions[8] - 2.0_f64.ln()).abs() < 1e-6);
        assert!(fit.history[39].valid_deviance.unwrap() < 1e-9);
        assert!(fit.best_iteration.unwrap() > 20);
    }

    #[test]
    fn test_early_stopping_on_validation_deviance() {
        let (x, mut y) = two_group_data();
        // validation rows contradict the training pattern
        y[8] = 8.0;
        y[9] = 2.0;
        let data = Dataset::new(Matrix::new(&x, 10, 1), &y, 8).unwrap();
        let cfg = BoosterConfig::new(DistributionFamily::Gamma)
            .set_n_trees(50)
            .set_shrinkage(0.5)
            .set_bag_fraction(1.0)
            .set_min_obs_in_node(1)
            .set_early_stopping_rounds(Some(2));
        let fit = DistributionBooster::new(cfg)
            .unwrap()
            .fit(data, &mut ThresholdGrower { threshold: 0.5 })
            .unwrap();
        assert_eq!(fit.history.len(), 3);
        assert_eq!(fit.best_iteration, Some(0));
    }

    #[test]
    fn test_bagged_boosting_on_a_pool() {
        let (x, y) = two_group_data();
        let data = Dataset::new(Matrix::new(&x, 10, 1), &y, 10).unwrap();
        let cfg = BoosterConfig::new(DistributionFamily::Poisson)
            .set_n_trees(5)
            .set_bag_fraction(0.5)
            .set_min_obs_in_node(2)
            .set_seed(3)
            .set_num_threads(Some(2));
        let fit = DistributionBooster::new(cfg)
            .unwrap()
            .fit(data, &mut ThresholdGrower { threshold: 0.5 })
            .unwrap();
        assert_eq!(fit.history.len(), 5);
        assert!(fit.history.iter().all(|r| r.n_in_bag == 5 && r.valid_deviance.is_none()));
        assert!(fit.predictions.iter().all(|p| p.is_finite()));
        assert_eq!(fit.best_iteration, None);
    }

    #[test]
    fn test_incompatible_family_fails_before_iterating() {
        let (x, y) = two_group_data();
        let data = Dataset::new(Matrix::new(&x, 10, 1), &y, 10).unwrap();
        let booster = DistributionBooster::new(BoosterConfig::new(DistributionFamily::Bernoulli)).unwrap();
        assert!(matches!(
            booster.fit(data, &mut ThresholdGrower { threshold: 0.5 }),
            Err(DistributionError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_grower_with_bad_assignment_is_rejected() {
        struct BrokenGrower;
        impl TreeGrower for BrokenGrower {
            fn grow(&mut self, _data: &Dataset, z: &[f64], _bag: &Bag) -> Result<GrownTree, DistributionError> {
                Ok(GrownTree {
                    node_assign: vec![0; z.len()],
                    leaves: vec![LeafNode::default()],
                })
            }
        }
        let (x, y) = two_group_data();
        let data = Dataset::new(Matrix::new(&x, 10, 1), &y, 8).unwrap();
        let booster = DistributionBooster::new(BoosterConfig::new(DistributionFamily::Gamma)).unwrap();
        assert!(matches!(
            booster.fit(data, &mut BrokenGrower),
            Err(DistributionError::InvalidInput(_))
        ));
    }
}
