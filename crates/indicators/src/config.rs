use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::composition::CompositionRule;
use crate::domain::{Domain, PlaceholderPolicy};
use crate::error::IndicatorError;
use crate::parallel::DEFAULT_CHUNK_LEN;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorConfig {
    pub name: String,
    #[serde(default)]
    pub treatments: DomainConfig,
    #[serde(default = "default_subset_domain")]
    pub subsets: DomainConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub composition: Option<CompositionConfig>,
}

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

/// `values` absent = open domain.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub placeholder: PlaceholderPolicy,
}

/// Unassigned units get their own row unless configured otherwise.
fn default_subset_domain() -> DomainConfig {
    DomainConfig {
        values: None,
        placeholder: PlaceholderPolicy::Tabulate,
    }
}

impl DomainConfig {
    pub fn to_domain(&self) -> Domain<String> {
        let domain = match &self.values {
            Some(values) => Domain::closed(values.iter().cloned()),
            None => Domain::open(),
        };
        domain.with_placeholder(self.placeholder)
    }
}

// ---------------------------------------------------------------------------
// Input column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    #[serde(default = "default_subset_column")]
    pub subset: String,
    #[serde(default = "default_treatment_column")]
    pub treatment: String,
    #[serde(default)]
    pub unit_id: Option<String>,
    /// Cell values read as the placeholder.
    #[serde(default = "default_missing")]
    pub missing: Vec<String>,
}

fn default_subset_column() -> String {
    "subset".into()
}

fn default_treatment_column() -> String {
    "treatment".into()
}

fn default_missing() -> Vec<String> {
    vec![String::new(), "NA".into()]
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            subset: default_subset_column(),
            treatment: default_treatment_column(),
            unit_id: None,
            missing: default_missing(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parallel + Composition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParallelConfig {
    /// Inputs shorter than this are tabulated sequentially.
    #[serde(default = "default_min_units")]
    pub min_units: usize,
    #[serde(default = "default_chunk_len")]
    pub chunk_len: usize,
}

fn default_min_units() -> usize {
    100_000
}

fn default_chunk_len() -> usize {
    DEFAULT_CHUNK_LEN
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_units: default_min_units(),
            chunk_len: default_chunk_len(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositionConfig {
    #[serde(default)]
    pub min_size: usize,
    #[serde(default)]
    pub min_per_label: BTreeMap<String, usize>,
}

impl CompositionConfig {
    pub fn to_rule(&self) -> CompositionRule<String> {
        CompositionRule {
            min_size: self.min_size,
            min_per_label: self
                .min_per_label
                .iter()
                .map(|(label, &min)| (Some(label.clone()), min))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl IndicatorConfig {
    pub fn from_toml(input: &str) -> Result<Self, IndicatorError> {
        let config: IndicatorConfig =
            toml::from_str(input).map_err(|e| IndicatorError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IndicatorError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| IndicatorError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), IndicatorError> {
        if self.parallel.chunk_len == 0 {
            return Err(IndicatorError::ConfigValidation(
                "parallel.chunk_len must be positive".into(),
            ));
        }

        if self.input.subset == self.input.treatment {
            return Err(IndicatorError::ConfigValidation(format!(
                "input.subset and input.treatment both name column '{}'",
                self.input.subset
            )));
        }

        self.validate_domain("treatments", &self.treatments)?;
        self.validate_domain("subsets", &self.subsets)?;

        // Composition labels must be real arms when the arms are enumerated
        if let (Some(composition), Some(arms)) = (&self.composition, &self.treatments.values) {
            for label in composition.min_per_label.keys() {
                if !arms.contains(label) {
                    return Err(IndicatorError::ConfigValidation(format!(
                        "composition.min_per_label: '{label}' is not a configured treatment"
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_domain(&self, section: &str, domain: &DomainConfig) -> Result<(), IndicatorError> {
        let Some(values) = &domain.values else {
            return Ok(());
        };
        if values.is_empty() {
            return Err(IndicatorError::ConfigValidation(format!(
                "{section}.values must not be empty (omit it for an open domain)"
            )));
        }
        let mut seen = FxHashSet::default();
        for value in values {
            if !seen.insert(value) {
                return Err(IndicatorError::ConfigValidation(format!(
                    "{section}.values: duplicate value '{value}'"
                )));
            }
            if self.input.missing.contains(value) {
                return Err(IndicatorError::ConfigValidation(format!(
                    "{section}.values: '{value}' is also a missing-value token"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
