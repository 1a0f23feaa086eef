//! Distributions
//!
//! The loss-function strategies a boosting loop plugs in: working responses,
//! initial scores, terminal-node Newton steps, deviance and bag improvement.
// import modules
mod accumulator;
mod bernoulli;
mod gamma;
mod gaussian;
mod poisson;

// make distributions public
pub use accumulator::NodeAccumulator;
pub use bernoulli::BernoulliDistribution;
pub use gamma::GammaDistribution;
pub use gaussian::GaussianDistribution;
pub use poisson::PoissonDistribution;

pub mod strategy;

pub use strategy::create;
pub use strategy::Distribution;
pub use strategy::DistributionFamily;
pub use strategy::DistributionStrategy;
