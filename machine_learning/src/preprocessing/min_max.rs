use std::{fs, path::Path};

use ndarray::{Array1, ArrayView1, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// The only scaler artifact layout understood by this version.
pub const SCALER_FORMAT_VERSION: u32 = 1;

/// Linearly maps every feature into `feature_range` using the bounds observed at fit time.
///
/// Values outside the fitted bounds are extrapolated with the same linear map, they are never
/// clamped. A constant feature (`max == min`) uses a range of one so it doesn't divide by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    feature_range: (f64, f64),
    data_min: Array1<f64>,
    data_max: Array1<f64>,
    n_samples_seen: usize,
}

impl MinMaxScaler {
    /// Fits a new scaler over the rows of `x`.
    ///
    /// # Arguments
    /// * `x` - The samples, one per row.
    /// * `feature_range` - The output range `(lo, hi)`, `lo < hi`.
    ///
    /// # Returns
    /// The fitted scaler or an error if `x` is empty, not finite or the range is inverted.
    pub fn fit(x: ArrayView2<f64>, feature_range: (f64, f64)) -> Result<Self> {
        check_range(feature_range)?;

        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(MlErr::EmptyDataset);
        }

        if x.iter().any(|v| !v.is_finite()) {
            return Err(MlErr::NonFinite {
                what: "a fitted sample",
            });
        }

        let data_min = x.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        let data_max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));

        Ok(Self {
            feature_range,
            data_min,
            data_max,
            n_samples_seen: x.nrows(),
        })
    }

    /// Returns the amount of features this scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    pub fn feature_range(&self) -> (f64, f64) {
        self.feature_range
    }

    pub fn data_min(&self) -> ArrayView1<'_, f64> {
        self.data_min.view()
    }

    pub fn data_max(&self) -> ArrayView1<'_, f64> {
        self.data_max.view()
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    /// Scales a single sample.
    ///
    /// # Arguments
    /// * `x` - The sample, must have `n_features` values.
    ///
    /// # Returns
    /// The scaled sample.
    pub fn transform(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        if x.len() != self.n_features() {
            return Err(MlErr::SizeMismatch {
                what: "scaler input",
                got: x.len(),
                expected: self.n_features(),
            });
        }

        let (lo, hi) = self.feature_range;
        let mut out = Array1::zeros(x.len());
        Zip::from(&mut out)
            .and(&x)
            .and(&self.data_min)
            .and(&self.data_max)
            .for_each(|out, &x, &min, &max| {
                let range = if max == min { 1.0 } else { max - min };
                *out = lo + (hi - lo) * (x - min) / range;
            });

        Ok(out)
    }

    /// Returns whether both scalers map every input to the same output.
    pub fn same_bounds(&self, other: &Self) -> bool {
        self.feature_range == other.feature_range
            && self.data_min == other.data_min
            && self.data_max == other.data_max
    }

    /// Builds the persistable form of this scaler.
    pub fn to_artifact(&self, feature_names: &[&str]) -> ScalerArtifact {
        ScalerArtifact {
            format_version: SCALER_FORMAT_VERSION,
            feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
            feature_range: self.feature_range,
            data_min: self.data_min.to_vec(),
            data_max: self.data_max.to_vec(),
            n_samples_seen: self.n_samples_seen,
        }
    }
}

/// Versioned, on-disk form of a fitted [`MinMaxScaler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub format_version: u32,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub feature_range: (f64, f64),
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
    #[serde(default)]
    pub n_samples_seen: usize,
}

impl ScalerArtifact {
    /// Reads an artifact from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the artifact as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validates the artifact and turns it into a scaler.
    pub fn into_scaler(self) -> Result<MinMaxScaler> {
        if self.format_version != SCALER_FORMAT_VERSION {
            return Err(MlErr::InvalidArtifact(format!(
                "unsupported scaler format version {} (expected {SCALER_FORMAT_VERSION})",
                self.format_version
            )));
        }

        check_range(self.feature_range)?;

        if self.data_min.is_empty() {
            return Err(MlErr::InvalidArtifact("scaler has no features".into()));
        }

        if self.data_min.len() != self.data_max.len() {
            return Err(MlErr::SizeMismatch {
                what: "scaler bounds",
                got: self.data_max.len(),
                expected: self.data_min.len(),
            });
        }

        if !self.feature_names.is_empty() && self.feature_names.len() != self.data_min.len() {
            return Err(MlErr::SizeMismatch {
                what: "scaler feature names",
                got: self.feature_names.len(),
                expected: self.data_min.len(),
            });
        }

        for (i, (min, max)) in self.data_min.iter().zip(&self.data_max).enumerate() {
            if !min.is_finite() || !max.is_finite() {
                return Err(MlErr::NonFinite {
                    what: "a scaler bound",
                });
            }
            if min > max {
                return Err(MlErr::InvalidArtifact(format!(
                    "feature {i}: min {min} is greater than max {max}"
                )));
            }
        }

        Ok(MinMaxScaler {
            feature_range: self.feature_range,
            data_min: Array1::from(self.data_min),
            data_max: Array1::from(self.data_max),
            n_samples_seen: self.n_samples_seen,
        })
    }
}

fn check_range((lo, hi): (f64, f64)) -> Result<()> {
    if !lo.is_finite() || !hi.is_finite() {
        return Err(MlErr::NonFinite {
            what: "the feature range",
        });
    }

    if lo >= hi {
        return Err(MlErr::InvalidArtifact(format!(
            "feature range ({lo}, {hi}) must be increasing"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};

    use super::*;

    fn fitted() -> MinMaxScaler {
        let x: Array2<f64> = array![[10.0, 0.0, 5.0], [20.0, 4.0, 5.0], [15.0, 2.0, 5.0]];
        MinMaxScaler::fit(x.view(), (-1.0, 1.0)).unwrap()
    }

    #[test]
    fn fit_tracks_column_bounds() {
        let scaler = fitted();
        assert_eq!(scaler.data_min().to_vec(), vec![10.0, 0.0, 5.0]);
        assert_eq!(scaler.data_max().to_vec(), vec![20.0, 4.0, 5.0]);
        assert_eq!(scaler.n_samples_seen(), 3);
    }

    #[test]
    fn bounds_map_to_range_ends() {
        let scaler = fitted();
        let lo = scaler.transform(array![10.0, 0.0, 5.0].view()).unwrap();
        let hi = scaler.transform(array![20.0, 4.0, 7.0].view()).unwrap();
        assert_eq!(lo.to_vec(), vec![-1.0, -1.0, -1.0]);
        assert_eq!(hi.to_vec()[..2], [1.0, 1.0]);
    }

    #[test]
    fn midpoint_maps_to_zero() {
        let scaler = fitted();
        let out = scaler.transform(array![15.0, 2.0, 5.0].view()).unwrap();
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn out_of_range_extrapolates() {
        let scaler = fitted();
        let out = scaler.transform(array![30.0, -4.0, 5.0].view()).unwrap();
        assert_eq!(out[0], 3.0);
        assert_eq!(out[1], -3.0);
    }

    #[test]
    fn transform_rejects_wrong_width() {
        let scaler = fitted();
        let res = scaler.transform(array![1.0, 2.0].view());
        assert!(matches!(res, Err(MlErr::SizeMismatch { got: 2, expected: 3, .. })));
    }

    #[test]
    fn fit_rejects_inverted_range() {
        let x: Array2<f64> = array![[1.0], [2.0]];
        assert!(MinMaxScaler::fit(x.view(), (1.0, -1.0)).is_err());
    }

    #[test]
    fn artifact_keeps_bounds() {
        let scaler = fitted();
        let restored = scaler.to_artifact(&["a", "b", "c"]).into_scaler().unwrap();
        assert!(scaler.same_bounds(&restored));
    }

    #[test]
    fn artifact_rejects_unknown_version() {
        let mut artifact = fitted().to_artifact(&[]);
        artifact.format_version = 7;
        assert!(matches!(
            artifact.into_scaler(),
            Err(MlErr::InvalidArtifact(_))
        ));
    }

    #[test]
    fn artifact_rejects_inverted_bounds() {
        let mut artifact = fitted().to_artifact(&[]);
        artifact.data_min[0] = 100.0;
        assert!(matches!(
            artifact.into_scaler(),
            Err(MlErr::InvalidArtifact(_))
        ));
    }
}
