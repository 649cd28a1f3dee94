use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Config, CoreError, RelationKind};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub data_dir: Option<String>,
    pub output_dir: Option<String>,
    pub term_extraction: Option<TermExtractionConfig>,
    pub association_analysis: Option<AssociationConfig>,
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermExtractionConfig {
    pub similarity_threshold: Option<f64>,
    pub max_definition_length: Option<usize>,
    pub min_definition_length: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Relationship kinds by label, e.g. `["主从关系", "因果关系"]`.
    pub relationship_types: Option<Vec<String>>,
    pub min_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub strict: Option<bool>,
    pub parallel: Option<bool>,
}

/// Platform config directory path: `<config_dir>/oceanterm/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("oceanterm").join("config.toml"))
}

/// Load config by cascading CWD `.oceanterm.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".oceanterm.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Load a config the user named explicitly. Unlike the cascade, a missing
/// or malformed file here is a hard error.
pub fn load_explicit(path: &Path) -> Result<ConfigFile, CoreError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&content)
        .map_err(|e| CoreError::Config(format!("cannot parse {}: {e}", path.display())))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        data_dir: overlay.data_dir.or(base.data_dir),
        output_dir: overlay.output_dir.or(base.output_dir),
        term_extraction: Some(TermExtractionConfig {
            similarity_threshold: overlay
                .term_extraction
                .as_ref()
                .and_then(|t| t.similarity_threshold)
                .or_else(|| {
                    base.term_extraction
                        .as_ref()
                        .and_then(|t| t.similarity_threshold)
                }),
            max_definition_length: overlay
                .term_extraction
                .as_ref()
                .and_then(|t| t.max_definition_length)
                .or_else(|| {
                    base.term_extraction
                        .as_ref()
                        .and_then(|t| t.max_definition_length)
                }),
            min_definition_length: overlay
                .term_extraction
                .as_ref()
                .and_then(|t| t.min_definition_length)
                .or_else(|| {
                    base.term_extraction
                        .as_ref()
                        .and_then(|t| t.min_definition_length)
                }),
        }),
        association_analysis: Some(AssociationConfig {
            relationship_types: overlay
                .association_analysis
                .as_ref()
                .and_then(|a| a.relationship_types.clone())
                .or_else(|| {
                    base.association_analysis
                        .as_ref()
                        .and_then(|a| a.relationship_types.clone())
                }),
            min_confidence: overlay
                .association_analysis
                .as_ref()
                .and_then(|a| a.min_confidence)
                .or_else(|| {
                    base.association_analysis
                        .as_ref()
                        .and_then(|a| a.min_confidence)
                }),
        }),
        pipeline: Some(PipelineConfig {
            strict: overlay
                .pipeline
                .as_ref()
                .and_then(|p| p.strict)
                .or_else(|| base.pipeline.as_ref().and_then(|p| p.strict)),
            parallel: overlay
                .pipeline
                .as_ref()
                .and_then(|p| p.parallel)
                .or_else(|| base.pipeline.as_ref().and_then(|p| p.parallel)),
        }),
    }
}

impl ConfigFile {
    /// Apply file values over a base runtime configuration.
    pub fn into_config(self, base: Config) -> Result<Config, CoreError> {
        let mut config = base;
        if let Some(dir) = self.data_dir {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(extraction) = self.term_extraction {
            if let Some(v) = extraction.similarity_threshold {
                config.similarity_threshold = v;
            }
            if let Some(v) = extraction.max_definition_length {
                config.max_definition_length = v;
            }
            if let Some(v) = extraction.min_definition_length {
                config.min_definition_length = v;
            }
        }
        if let Some(association) = self.association_analysis {
            if let Some(labels) = association.relationship_types {
                let mut kinds = Vec::new();
                for label in &labels {
                    let kind = RelationKind::from_label(label).ok_or_else(|| {
                        CoreError::Config(format!("unknown relationship type: {label}"))
                    })?;
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                config.relationship_types = kinds;
            }
            if let Some(v) = association.min_confidence {
                config.min_confidence = v;
            }
        }
        if let Some(pipeline) = self.pipeline {
            if let Some(v) = pipeline.strict {
                config.strict = v;
            }
            if let Some(v) = pipeline.parallel {
                config.parallel = v;
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_round_trip_toml() {
        let config = ConfigFile {
            term_extraction: Some(TermExtractionConfig {
                similarity_threshold: Some(0.85),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.term_extraction.unwrap().similarity_threshold.unwrap(),
            0.85
        );
    }

    #[test]
    fn absent_fields_deserialize_as_none() {
        let toml_str = "[term_extraction]\nmax_definition_length = 300\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let extraction = parsed.term_extraction.unwrap();
        assert_eq!(extraction.max_definition_length, Some(300));
        assert!(extraction.similarity_threshold.is_none());
        assert!(parsed.data_dir.is_none());
        assert!(parsed.association_analysis.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            data_dir: Some("data/base".to_string()),
            association_analysis: Some(AssociationConfig {
                min_confidence: Some(0.6),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            data_dir: Some("data/overlay".to_string()),
            association_analysis: Some(AssociationConfig {
                min_confidence: Some(0.75),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        assert_eq!(merged.data_dir.unwrap(), "data/overlay");
        assert_eq!(
            merged.association_analysis.unwrap().min_confidence.unwrap(),
            0.75
        );
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            output_dir: Some("out/base".to_string()),
            pipeline: Some(PipelineConfig {
                strict: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.output_dir.unwrap(), "out/base");
        assert_eq!(merged.pipeline.unwrap().strict, Some(true));
    }

    #[test]
    fn file_values_apply_over_defaults() {
        let file = ConfigFile {
            data_dir: Some("corpus".to_string()),
            term_extraction: Some(TermExtractionConfig {
                min_definition_length: Some(5),
                ..Default::default()
            }),
            association_analysis: Some(AssociationConfig {
                relationship_types: Some(vec!["因果关系".to_string()]),
                min_confidence: Some(0.8),
            }),
            ..Default::default()
        };
        let config = file.into_config(Config::default()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("corpus"));
        assert_eq!(config.min_definition_length, 5);
        assert_eq!(config.max_definition_length, 500);
        assert_eq!(config.relationship_types, vec![RelationKind::Causal]);
        assert_eq!(config.min_confidence, 0.8);
    }

    #[test]
    fn unknown_relationship_label_is_an_error() {
        let file = ConfigFile {
            association_analysis: Some(AssociationConfig {
                relationship_types: Some(vec!["同义关系".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(file.into_config(Config::default()).is_err());
    }

    #[test]
    fn explicit_load_of_missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/oceanterm.toml");
        assert!(load_explicit(missing).is_err());
    }
}
