//! Tree
//!
//! The boundary with the external tree grower. Strategies only ever see an
//! ordered slice of terminal nodes and a row to node assignment.
use crate::bag::Bag;
use crate::data::Dataset;
use crate::errors::DistributionError;
use serde::{Deserialize, Serialize};

/// A terminal node whose scalar prediction a strategy overwrites.
pub trait TerminalNode {
    fn prediction(&self) -> f64;
    fn set_prediction(&mut self, value: f64);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct LeafNode {
    pub prediction: f64,
}

impl LeafNode {
    pub fn new(prediction: f64) -> Self {
        LeafNode { prediction }
    }
}

impl TerminalNode for LeafNode {
    #[inline]
    fn prediction(&self) -> f64 {
        self.prediction
    }

    #[inline]
    fn set_prediction(&mut self, value: f64) {
        self.prediction = value;
    }
}

/// Output of one call to a [`TreeGrower`].
#[derive(Debug, Clone)]
pub struct GrownTree {
    /// Terminal node of every row, training rows first then validation rows.
    pub node_assign: Vec<usize>,
    /// Terminal nodes, indexed by the values of `node_assign`.
    pub leaves: Vec<LeafNode>,
}

impl GrownTree {
    /// Check that every row has a valid node.
    pub fn validate(&self, n_rows: usize) -> Result<(), DistributionError> {
        if self.node_assign.len() != n_rows {
            return Err(DistributionError::InvalidInput(format!(
                "tree assigns {} rows, dataset has {}",
                self.node_assign.len(),
                n_rows
            )));
        }
        if let Some(i) = self.node_assign.iter().position(|k| *k >= self.leaves.len()) {
            return Err(DistributionError::InvalidInput(format!(
                "row {} assigned to node {} but the tree has {} terminal nodes",
                i,
                self.node_assign[i],
                self.leaves.len()
            )));
        }
        Ok(())
    }

    /// Per-row adjustment: the prediction of the node each row falls in.
    pub fn row_adjustments(&self) -> Vec<f64> {
        self.node_assign.iter().map(|k| self.leaves[*k].prediction).collect()
    }
}

/// Grows one regression tree against the working response.
///
/// Implementations own the splitting algorithm. The initial leaf predictions
/// are irrelevant: the strategy replaces them with loss-minimizing constants.
pub trait TreeGrower {
    fn grow(&mut self, data: &Dataset, z: &[f64], bag: &Bag) -> Result<GrownTree, DistributionError>;
}
