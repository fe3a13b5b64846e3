//! One-dimensional histograms in momentum transfer and the reflectivity curve.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Checks that bin edges are finite, strictly increasing and at least two.
///
/// # Errors
/// Returns `InvalidBinEdges` describing the first problem found.
pub fn validate_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::InvalidBinEdges(format!(
            "need at least 2 edges, got {}",
            edges.len()
        )));
    }
    if let Some(idx) = edges.iter().position(|e| !e.is_finite()) {
        return Err(Error::InvalidBinEdges(format!(
            "edge {idx} is not finite ({})",
            edges[idx]
        )));
    }
    if let Some(idx) = edges.windows(2).position(|w| w[1] <= w[0]) {
        return Err(Error::InvalidBinEdges(format!(
            "edges must increase strictly; edge {} ({}) <= edge {idx} ({})",
            idx + 1,
            edges[idx + 1],
            edges[idx]
        )));
    }
    Ok(())
}

/// Bin centres of a set of edges.
#[must_use]
pub fn bin_centers(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| w[0] + 0.5 * (w[1] - w[0])).collect()
}

/// Weighted histogram with per-bin variance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram1D {
    /// Bin edges, strictly increasing.
    pub edges: Vec<f64>,
    /// Sum of weights per bin.
    pub values: Vec<f64>,
    /// Sum of weight variances per bin.
    pub variances: Vec<f64>,
}

impl Histogram1D {
    /// Creates an empty histogram over `edges`.
    ///
    /// # Errors
    /// Returns `InvalidBinEdges` if the edges are unusable.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        validate_edges(&edges)?;
        let n_bins = edges.len() - 1;
        Ok(Self {
            edges,
            values: vec![0.0; n_bins],
            variances: vec![0.0; n_bins],
        })
    }

    /// Number of bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.values.len()
    }

    /// Bin centres.
    #[must_use]
    pub fn centers(&self) -> Vec<f64> {
        bin_centers(&self.edges)
    }

    /// Index of the bin holding `x`, with bins half-open `[lo, hi)`.
    #[must_use]
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        let first = *self.edges.first()?;
        let last = *self.edges.last()?;
        if !(x >= first && x < last) {
            return None;
        }
        // partition_point gives the count of edges <= x, which is >= 1 here
        Some(self.edges.partition_point(|&e| e <= x) - 1)
    }

    /// Adds one weighted entry; entries outside the edges are dropped.
    pub fn fill(&mut self, x: f64, weight: f64, variance: f64) -> bool {
        match self.bin_index(x) {
            Some(bin) => {
                self.values[bin] += weight;
                self.variances[bin] += variance;
                true
            }
            None => false,
        }
    }

    /// Standard deviation per bin.
    #[must_use]
    pub fn std_devs(&self) -> Vec<f64> {
        self.variances.iter().map(|v| v.sqrt()).collect()
    }

    /// Divides bin `i` by `divisors[i]`, scaling variances by its square.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if `divisors` does not match the bin count.
    pub fn divide_by(&mut self, divisors: &[f64]) -> Result<()> {
        if divisors.len() != self.n_bins() {
            return Err(Error::LengthMismatch {
                what: "histogram divisors",
                expected: self.n_bins(),
                found: divisors.len(),
            });
        }
        for ((value, variance), &d) in self
            .values
            .iter_mut()
            .zip(self.variances.iter_mut())
            .zip(divisors)
        {
            *value /= d;
            *variance /= d * d;
        }
        Ok(())
    }
}

/// A bin whose reference intensity was zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DegenerateBin {
    pub index: usize,
    pub q_center: f64,
}

/// Reflectivity versus momentum transfer.
///
/// Bins where the reference was zero hold NaN in both `reflectivity` and
/// `variance` and are listed in `zero_reference`. A NaN elsewhere comes from
/// the inputs, not from the division.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReflectivityCurve {
    /// Momentum-transfer bin edges in 1/angstrom.
    pub q_edges: Vec<f64>,
    pub reflectivity: Vec<f64>,
    pub variance: Vec<f64>,
    /// Indices of bins whose reference intensity was exactly zero.
    #[cfg_attr(feature = "serde", serde(default))]
    pub zero_reference: Vec<usize>,
}

impl ReflectivityCurve {
    /// Bin-by-bin ratio `numerator / denominator` of two independent histograms.
    ///
    /// Variance follows first-order propagation for a ratio of independent
    /// quantities: `(var_a + var_b * (a / b)^2) / b^2`.
    ///
    /// # Errors
    /// Returns `InvalidBinEdges` if the histograms are not on the same edges.
    #[allow(clippy::float_cmp)]
    pub fn ratio(numerator: &Histogram1D, denominator: &Histogram1D) -> Result<Self> {
        if numerator.edges != denominator.edges {
            return Err(Error::InvalidBinEdges(
                "numerator and denominator are binned differently".to_string(),
            ));
        }

        let n_bins = numerator.n_bins();
        let mut reflectivity = Vec::with_capacity(n_bins);
        let mut variance = Vec::with_capacity(n_bins);
        let mut zero_reference = Vec::new();
        for bin in 0..n_bins {
            let a = numerator.values[bin];
            let b = denominator.values[bin];
            if b == 0.0 {
                reflectivity.push(f64::NAN);
                variance.push(f64::NAN);
                zero_reference.push(bin);
                continue;
            }
            let r = a / b;
            reflectivity.push(r);
            variance.push((numerator.variances[bin] + denominator.variances[bin] * r * r) / (b * b));
        }

        Ok(Self {
            q_edges: numerator.edges.clone(),
            reflectivity,
            variance,
            zero_reference,
        })
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reflectivity.len()
    }

    /// Returns true if the curve has no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reflectivity.is_empty()
    }

    /// Bin centres in 1/angstrom.
    #[must_use]
    pub fn q_centers(&self) -> Vec<f64> {
        bin_centers(&self.q_edges)
    }

    /// Standard deviation per bin.
    #[must_use]
    pub fn uncertainty(&self) -> Vec<f64> {
        self.variance.iter().map(|v| v.sqrt()).collect()
    }

    /// Bins that are undefined because the reference was zero there.
    #[must_use]
    pub fn degenerate_bins(&self) -> Vec<DegenerateBin> {
        let centers = self.q_centers();
        self.zero_reference
            .iter()
            .filter_map(|&index| {
                centers.get(index).map(|&q_center| DegenerateBin { index, q_center })
            })
            .collect()
    }
}
