// Modules
pub mod bag;
pub mod booster;
pub mod config;
pub mod constants;
pub mod data;
pub mod distribution;
pub mod errors;
pub mod sampler;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use bag::Bag;
pub use booster::{BoostingFit, DistributionBooster, IterationRecord};
pub use config::BoosterConfig;
pub use data::{Dataset, Matrix};
pub use distribution::{
    create, BernoulliDistribution, Distribution, DistributionFamily, DistributionStrategy, GammaDistribution,
    GaussianDistribution, NodeAccumulator, PoissonDistribution,
};
pub use errors::DistributionError;
pub use tree::{GrownTree, LeafNode, TerminalNode, TreeGrower};
