use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Overrides the model artifact path.
pub const ENV_MODEL: &str = "MTEST_MODEL";
/// Overrides the scaler artifact path.
pub const ENV_SCALER: &str = "MTEST_SCALER";
/// Overrides the reference dataset path.
pub const ENV_DATASET: &str = "MTEST_DATASET";

const DEFAULT_MODEL_PATH: &str = "model.json";
const DEFAULT_SCALER_PATH: &str = "scaler.json";

/// Where the scaling bounds come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalingSource {
    /// Bounds persisted next to the model when it was trained.
    Artifact { path: PathBuf },
    /// Bounds refit from a reference dataset when the pipeline starts.
    Dataset { path: PathBuf },
}

/// Everything the pipeline needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub model: PathBuf,
    pub scaling: ScalingSource,
    /// Dataset compared against the scaler artifact to detect drifted bounds.
    #[serde(default)]
    pub reference_dataset: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL_PATH.into(),
            scaling: ScalingSource::Artifact {
                path: DEFAULT_SCALER_PATH.into(),
            },
            reference_dataset: None,
        }
    }
}

impl PipelineConfig {
    /// Loads a `PipelineConfig` from a JSON file.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    ///
    /// # Errors
    /// Returns `PipelineError::Configuration` if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("cannot read '{}'", path.display()), e))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PipelineError::config(format!("invalid '{}'", path.display()), e))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolved_against(base))
    }

    /// Applies the `MTEST_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides looked up through `var`.
    ///
    /// `MTEST_DATASET` alone switches scaling to a dataset refit; together with `MTEST_SCALER`
    /// it only becomes the drift check reference.
    pub fn with_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = var(ENV_MODEL) {
            self.model = model.into();
        }

        match (var(ENV_SCALER), var(ENV_DATASET)) {
            (Some(scaler), dataset) => {
                self.scaling = ScalingSource::Artifact {
                    path: scaler.into(),
                };
                if let Some(dataset) = dataset {
                    self.reference_dataset = Some(dataset.into());
                }
            }
            (None, Some(dataset)) => {
                self.scaling = ScalingSource::Dataset {
                    path: dataset.into(),
                };
                self.reference_dataset = None;
            }
            (None, None) => {}
        }

        self
    }

    /// Checks the config is consistent before any resource is loaded.
    ///
    /// # Errors
    /// Returns `PipelineError::Configuration` if a reference dataset is set while the bounds are
    /// already refit from a dataset, since it would never be read.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let (ScalingSource::Dataset { path }, Some(reference)) =
            (&self.scaling, &self.reference_dataset)
        {
            return Err(PipelineError::Configuration(format!(
                "reference dataset '{}' only applies to a scaler artifact, bounds are refit from '{}'",
                reference.display(),
                path.display()
            )));
        }

        Ok(())
    }

    fn resolved_against(mut self, base: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.model);
        match &mut self.scaling {
            ScalingSource::Artifact { path } | ScalingSource::Dataset { path } => resolve(path),
        }
        if let Some(dataset) = &mut self.reference_dataset {
            resolve(dataset);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_uses_artifacts() {
        let config = PipelineConfig::default();
        assert_eq!(config.model, PathBuf::from("model.json"));
        assert_eq!(
            config.scaling,
            ScalingSource::Artifact {
                path: "scaler.json".into()
            }
        );
    }

    #[test]
    fn dataset_override_alone_switches_to_refit() {
        let config = PipelineConfig::default().with_overrides(vars(&[(ENV_DATASET, "d.csv")]));
        assert_eq!(config.scaling, ScalingSource::Dataset { path: "d.csv".into() });
        assert_eq!(config.reference_dataset, None);
    }

    #[test]
    fn dataset_override_with_scaler_is_a_reference() {
        let config = PipelineConfig::default().with_overrides(vars(&[
            (ENV_MODEL, "m.json"),
            (ENV_SCALER, "s.json"),
            (ENV_DATASET, "d.csv"),
        ]));
        assert_eq!(config.model, PathBuf::from("m.json"));
        assert_eq!(config.scaling, ScalingSource::Artifact { path: "s.json".into() });
        assert_eq!(config.reference_dataset, Some("d.csv".into()));
    }

    #[test]
    fn file_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(
            &path,
            r#"{"model": "gb.json", "scaling": {"kind": "dataset", "path": "ref.csv"}}"#,
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.model, dir.path().join("gb.json"));
        assert_eq!(
            config.scaling,
            ScalingSource::Dataset {
                path: dir.path().join("ref.csv")
            }
        );
    }

    #[test]
    fn reference_dataset_needs_an_artifact() {
        let config = PipelineConfig {
            model: "m.json".into(),
            scaling: ScalingSource::Dataset { path: "d.csv".into() },
            reference_dataset: Some("r.csv".into()),
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn dataset_override_drops_file_reference() {
        let config = PipelineConfig {
            reference_dataset: Some("r.csv".into()),
            ..PipelineConfig::default()
        }
        .with_overrides(vars(&[(ENV_DATASET, "d.csv")]));

        assert_eq!(config.reference_dataset, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unreadable_file_is_a_configuration_error() {
        let res = PipelineConfig::from_file("/definitely/not/here.json");
        assert!(matches!(res, Err(PipelineError::Configuration(_))));
    }
}
