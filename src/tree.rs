use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Shape;

/// A binary split on the difference of two sampled pixel intensities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Index into the stage's feature pixel values.
    pub idx1: u32,
    pub idx2: u32,
    pub threshold: f32,
}

/// A complete binary regression tree stored breadth-first.
///
/// Split `i` has children `2i + 1` and `2i + 2`. Indices past the last split
/// address `leaves[index - splits.len()]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    splits: Vec<Split>,
    leaves: Vec<Shape>,
}

impl RegressionTree {
    pub fn new(splits: Vec<Split>, leaves: Vec<Shape>) -> Result<Self> {
        let tree = Self { splits, leaves };
        tree.check_leaf_count()?;
        Ok(tree)
    }

    fn check_leaf_count(&self) -> Result<()> {
        if self.leaves.len() != self.splits.len() + 1 {
            return Err(Error::InvalidModel(format!(
                "tree with {} splits needs {} leaves, got {}",
                self.splits.len(),
                self.splits.len() + 1,
                self.leaves.len()
            )));
        }
        Ok(())
    }

    /// Check that evaluating against `num_features` pixel values cannot index
    /// out of range and that every leaf moves `num_landmarks` points.
    pub fn validate(&self, num_features: usize, num_landmarks: usize) -> Result<()> {
        self.check_leaf_count()?;
        if let Some(split) = self
            .splits
            .iter()
            .find(|s| s.idx1 as usize >= num_features || s.idx2 as usize >= num_features)
        {
            return Err(Error::InvalidModel(format!(
                "split reads features {} and {} but only {} are sampled",
                split.idx1, split.idx2, num_features
            )));
        }
        if let Some(leaf) = self
            .leaves
            .iter()
            .find(|l| l.num_landmarks() != num_landmarks)
        {
            return Err(Error::InvalidModel(format!(
                "leaf moves {} points, expected {}",
                leaf.num_landmarks(),
                num_landmarks
            )));
        }
        Ok(())
    }

    /// A tree that always returns `delta`.
    pub fn leaf(delta: Shape) -> Self {
        Self {
            splits: Vec::new(),
            leaves: vec![delta],
        }
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Walk the tree using the stage's sampled pixel values.
    ///
    /// Goes left when `pixels[idx1] - pixels[idx2] > threshold`, as dlib does.
    pub fn evaluate(&self, pixels: &[f32]) -> &Shape {
        let mut node = 0usize;
        while node < self.splits.len() {
            let split = &self.splits[node];
            let diff = pixels[split.idx1 as usize] - pixels[split.idx2 as usize];
            node = if diff > split.threshold {
                2 * node + 1
            } else {
                2 * node + 2
            };
        }
        &self.leaves[node - self.splits.len()]
    }

    pub fn depth(&self) -> usize {
        // A complete tree with n splits has n + 1 leaves.
        let mut depth = 1;
        while (1usize << (depth - 1)) < self.leaves.len() {
            depth += 1;
        }
        depth
    }
}
