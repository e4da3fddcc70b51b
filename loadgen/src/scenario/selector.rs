//! Weighted scenario selection
//!
//! Each scenario owns a half-open slice `[cum[i-1], cum[i])` of
//! `[0, total_weight)`. A draw picks a uniform integer in that range and
//! binary-searches the cumulative table, so selection is O(log n) and every
//! call is an independent weighted draw.

use rand::Rng;

/// Cumulative-weight table built once when a registry is finalized
#[derive(Debug, Clone)]
pub struct WeightedSelector {
    /// `cumulative[i]` is the sum of weights `0..=i`
    cumulative: Vec<u64>,
    total_weight: u64,
}

impl WeightedSelector {
    /// Build the table from positive weights. Returns `None` when the total is zero.
    pub(crate) fn from_weights(weights: impl IntoIterator<Item = u32>) -> Option<Self> {
        let mut cumulative = Vec::new();
        let mut total_weight = 0u64;
        for weight in weights {
            total_weight += u64::from(weight);
            cumulative.push(total_weight);
        }

        if total_weight == 0 {
            return None;
        }

        Some(Self {
            cumulative,
            total_weight,
        })
    }

    /// Draw a scenario index using the calling thread's generator
    pub fn select(&self) -> usize {
        self.select_with(&mut rand::rng())
    }

    /// Draw a scenario index using a caller-owned generator
    pub fn select_with<R: Rng>(&self, rng: &mut R) -> usize {
        if self.cumulative.len() == 1 {
            return 0;
        }
        let point = rng.random_range(0..self.total_weight);
        self.index_for(point)
    }

    /// Locate the scenario covering `point` in `[0, total_weight)`
    fn index_for(&self, point: u64) -> usize {
        // First entry whose upper bound is strictly above the point.
        self.cumulative.partition_point(|&upper| upper <= point)
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }
}
