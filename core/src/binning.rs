//! Quantile binning with duplicate-edge collapse.
//!
//! Edges are the B+1 empirical quantiles of the metric (linear
//! interpolation between order statistics). Equal edges are merged, so a
//! metric with heavy ties yields fewer than B effective bins. Intervals are
//! right-closed, and the first interval also holds its lower edge.

use crate::{
    error::{RfmaError, RfmaResult, Stage},
    types::Score,
};

/// Fitted bin edges for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileBins {
    edges: Vec<f64>,
}

impl QuantileBins {
    /// Fit `bins` quantile bins to `values`. `metric` names the column in
    /// error messages.
    pub fn fit(metric: &str, values: &[f64], bins: Score) -> RfmaResult<Self> {
        if bins < 2 {
            return Err(RfmaError::config(format!("bin count must be >= 2, got {bins}")));
        }
        if values.is_empty() {
            return Err(RfmaError::data(
                Stage::Score,
                format!("{metric}: no values to bin"),
            ));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(RfmaError::data(
                Stage::Score,
                format!("{metric}: non-finite value {bad}"),
            ));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut edges: Vec<f64> = (0..=bins)
            .map(|i| quantile(&sorted, f64::from(i) / f64::from(bins)))
            .collect();
        edges.dedup();

        if edges.len() < 3 {
            return Err(RfmaError::data(
                Stage::Score,
                format!(
                    "{metric}: all {} values collapse into a single bin; \
                     quantile binning needs at least two distinct edges",
                    values.len()
                ),
            ));
        }

        if edges.len() - 1 < bins as usize {
            log::warn!(
                "{metric}: {} of {bins} bins after merging duplicate edges",
                edges.len() - 1
            );
        }
        log::debug!("{metric}: bin edges {edges:?}");

        Ok(Self { edges })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins left after duplicate edges were merged.
    pub fn effective_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Zero-based bin index. Values outside the fitted range clamp to the
    /// first or last bin.
    pub fn bin_of(&self, value: f64) -> usize {
        let upper_edges = &self.edges[1..];
        upper_edges
            .partition_point(|edge| *edge < value)
            .min(self.effective_bins() - 1)
    }

    /// Score where higher raw values score higher: bin j → j + 1.
    pub fn direct_score(&self, value: f64) -> Score {
        (self.bin_of(value) + 1) as Score
    }

    /// Score where lower raw values score higher: bin j → k − j.
    pub fn inverted_score(&self, value: f64) -> Score {
        (self.effective_bins() - self.bin_of(value)) as Score
    }
}

/// Quantile of an ascending slice at probability `p` in [0, 1], linearly
/// interpolated between neighbouring order statistics.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let last = sorted.len() - 1;
    let position = last as f64 * p;
    let lower = position.floor() as usize;
    if lower >= last {
        return sorted[last];
    }
    let fraction = position - lower as f64;
    sorted[lower] + fraction * (sorted[lower + 1] - sorted[lower])
}
