//! Weighted histogramming of reconstructed events in momentum transfer.

use reflred_core::{EventTable, Histogram1D, Result};

/// Logarithmically spaced edges from `q_min` to `q_max`.
///
/// # Errors
/// Returns `InvalidBinEdges` if the range is empty, non-positive or `n_bins` is zero.
#[allow(clippy::cast_precision_loss)]
pub fn log_edges(q_min: f64, q_max: f64, n_bins: usize) -> Result<Vec<f64>> {
    if q_min.is_nan() || q_min <= 0.0 {
        return Err(reflred_core::Error::InvalidBinEdges(format!(
            "logarithmic bins need q_min > 0, got {q_min}"
        )));
    }
    let edges = spaced_edges(q_min.ln(), q_max.ln(), n_bins, f64::exp);
    reflred_core::histogram::validate_edges(&edges)?;
    Ok(edges)
}

/// Evenly spaced edges from `q_min` to `q_max`.
///
/// # Errors
/// Returns `InvalidBinEdges` if the range is empty or `n_bins` is zero.
pub fn linear_edges(q_min: f64, q_max: f64, n_bins: usize) -> Result<Vec<f64>> {
    let edges = spaced_edges(q_min, q_max, n_bins, |x| x);
    reflred_core::histogram::validate_edges(&edges)?;
    Ok(edges)
}

#[allow(clippy::cast_precision_loss)]
fn spaced_edges(start: f64, stop: f64, n_bins: usize, map: impl Fn(f64) -> f64) -> Vec<f64> {
    if n_bins == 0 {
        return vec![map(start)];
    }
    let step = (stop - start) / n_bins as f64;
    let mut edges: Vec<f64> = (0..n_bins).map(|i| map(start + i as f64 * step)).collect();
    // pin the last edge so q_max is exact
    edges.push(map(stop));
    edges
}

/// Histograms the unmasked events by `qz`, summing weights and variances.
///
/// Bins are half-open `[lo, hi)`; events outside the edges are dropped.
/// Accumulation is sequential so the result does not depend on thread count.
///
/// # Errors
/// Returns `InvalidBinEdges` for unusable edges and `LengthMismatch` if the
/// table's columns disagree in length.
pub fn histogram_events(events: &EventTable, edges: &[f64]) -> Result<Histogram1D> {
    events.validate()?;
    let mut histogram = Histogram1D::new(edges.to_vec())?;
    for idx in 0..events.len() {
        if events.masks.is_masked(idx) {
            continue;
        }
        histogram.fill(events.qz[idx], events.weight[idx], events.variance[idx]);
    }
    Ok(histogram)
}
