use crate::aggregate::tabulate;
use crate::composition::{check_composition, Violation};
use crate::config::{IndicatorConfig, InputConfig};
use crate::error::{IndicatorError, Result};
use crate::model::IndicatorTable;
use crate::parallel::tabulate_par;

/// Aligned unit columns read from a unit file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Units {
    /// Unit identifiers when `input.unit_id` is configured, else empty.
    pub ids: Vec<String>,
    pub subsets: Vec<Option<String>>,
    pub treatments: Vec<Option<String>>,
}

impl Units {
    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }
}

/// Tabulate units per config. Large inputs go through the parallel path.
pub fn run(config: &IndicatorConfig, units: &Units) -> Result<IndicatorTable<String, String>> {
    log::info!("indicator job '{}': {} unit(s)", config.name, units.len());

    let subset_domain = config.subsets.to_domain();
    let treatment_domain = config.treatments.to_domain();

    let table = if units.len() >= config.parallel.min_units {
        tabulate_par(
            &units.subsets,
            &units.treatments,
            &subset_domain,
            &treatment_domain,
            config.parallel.chunk_len,
        )?
    } else {
        tabulate(&units.subsets, &units.treatments, &subset_domain, &treatment_domain)?
    };

    if table.skipped() > 0 {
        log::warn!(
            "indicator job '{}': {} unit(s) left out of the table",
            config.name,
            table.skipped()
        );
    }
    Ok(table)
}

/// [`run`], then evaluate the configured composition rule (if any).
pub fn run_checked(
    config: &IndicatorConfig,
    units: &Units,
) -> Result<(IndicatorTable<String, String>, Vec<Violation<String, String>>)> {
    let table = run(config, units)?;
    let violations = match &config.composition {
        Some(composition) => check_composition(&table, &composition.to_rule()),
        None => Vec::new(),
    };
    if !violations.is_empty() {
        log::warn!(
            "indicator job '{}': {} composition violation(s)",
            config.name,
            violations.len()
        );
    }
    Ok((table, violations))
}

/// Load unit columns from CSV text, applying the column mapping and
/// missing-value tokens.
pub fn load_csv_units(csv_data: &str, input: &InputConfig) -> Result<Units> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IndicatorError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let idx = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IndicatorError::MissingColumn { column: name.into() })
    };

    let subset_idx = idx(&input.subset)?;
    let treatment_idx = idx(&input.treatment)?;
    let id_idx = match &input.unit_id {
        Some(col) => Some(idx(col)?),
        None => None,
    };

    let cell = |value: &str| -> Option<String> {
        if input.missing.iter().any(|m| m == value) {
            None
        } else {
            Some(value.to_string())
        }
    };

    let mut units = Units::default();
    for record in reader.records() {
        let record = record.map_err(|e| IndicatorError::Csv(e.to_string()))?;

        units.subsets.push(cell(record.get(subset_idx).unwrap_or("")));
        units.treatments.push(cell(record.get(treatment_idx).unwrap_or("")));
        if let Some(i) = id_idx {
            units.ids.push(record.get(i).unwrap_or("").to_string());
        }
    }

    log::debug!("loaded {} unit(s) from CSV", units.len());
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::ViolationKind;
    use crate::error::Sequence;

    const UNITS: &str = "\
id,matched_set,arm
u1,A,treated
u2,A,control
u3,B,treated
u4,B,treated
u5,B,control
u6,NA,control
";

    const CONFIG: &str = r#"
name = "Unit Test"

[treatments]
values = ["treated", "control"]

[input]
subset = "matched_set"
treatment = "arm"
unit_id = "id"
"#;

    #[test]
    fn load_csv_basic() {
        let config = IndicatorConfig::from_toml(CONFIG).unwrap();
        let units = load_csv_units(UNITS, &config.input).unwrap();
        assert_eq!(units.len(), 6);
        assert_eq!(units.ids[0], "u1");
        assert_eq!(units.subsets[2].as_deref(), Some("B"));
        assert_eq!(units.subsets[5], None);
        assert_eq!(units.treatments[5].as_deref(), Some("control"));
    }

    #[test]
    fn load_csv_without_ids() {
        let input = InputConfig {
            subset: "matched_set".into(),
            treatment: "arm".into(),
            ..InputConfig::default()
        };
        let units = load_csv_units(UNITS, &input).unwrap();
        assert!(units.ids.is_empty());
        assert_eq!(units.len(), 6);
    }

    #[test]
    fn load_csv_missing_column() {
        let input = InputConfig::default();
        let err = load_csv_units(UNITS, &input).unwrap_err();
        assert!(matches!(err, IndicatorError::MissingColumn { ref column } if column == "subset"));
    }

    #[test]
    fn load_csv_header_only() {
        let config = IndicatorConfig::from_toml(CONFIG).unwrap();
        let units = load_csv_units("id,matched_set,arm\n", &config.input).unwrap();
        assert!(units.is_empty());
        let table = run(&config, &units).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn run_tabulates_unassigned_by_default() {
        let config = IndicatorConfig::from_toml(CONFIG).unwrap();
        let units = load_csv_units(UNITS, &config.input).unwrap();
        let table = run(&config, &units).unwrap();
        assert_eq!(table.num_subsets(), 3);
        assert_eq!(table.skipped(), 0);
        assert_eq!(table.total(), units.len());
        assert_eq!(table.get(&None, &Some("control".to_string())), Some(1));
        assert_eq!(table.count(&"B".to_string(), &"treated".to_string()), Some(2));
    }

    #[test]
    fn default_config_conserves_units() {
        let config = IndicatorConfig::from_toml(r#"name = "Defaults""#).unwrap();
        let units = Units {
            ids: Vec::new(),
            subsets: vec![Some("A".into()), None, Some("A".into())],
            treatments: vec![Some("t".into()), Some("c".into()), Some("t".into())],
        };
        let table = run(&config, &units).unwrap();
        assert_eq!(table.total(), units.len());
        assert_eq!(table.skipped(), 0);
        assert_eq!(table.label_total(&Some("c".to_string())), Some(1));
        assert_eq!(table.label_total(&Some("t".to_string())), Some(2));
        assert_eq!(table.subset_size(&None), Some(1));
    }

    #[test]
    fn run_skip_is_opt_in() {
        let mut config = IndicatorConfig::from_toml(CONFIG).unwrap();
        config.subsets.placeholder = crate::domain::PlaceholderPolicy::Skip;
        let units = load_csv_units(UNITS, &config.input).unwrap();
        let table = run(&config, &units).unwrap();
        assert_eq!(table.num_subsets(), 2);
        assert_eq!(table.skipped(), 1);
        assert_eq!(table.total() + table.skipped(), units.len());
    }

    #[test]
    fn run_parallel_path_agrees() {
        let mut config = IndicatorConfig::from_toml(CONFIG).unwrap();
        let units = load_csv_units(UNITS, &config.input).unwrap();
        let sequential = run(&config, &units).unwrap();
        config.parallel.min_units = 0;
        config.parallel.chunk_len = 2;
        let parallel = run(&config, &units).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn run_rejects_unknown_arm() {
        let config = IndicatorConfig::from_toml(CONFIG).unwrap();
        let units = Units {
            ids: Vec::new(),
            subsets: vec![Some("A".into())],
            treatments: vec![Some("placebo".into())],
        };
        let err = run(&config, &units).unwrap_err();
        assert!(matches!(
            err,
            IndicatorError::DomainViolation { sequence: Sequence::Treatment, index: 0, .. }
        ));
    }

    #[test]
    fn run_checked_reports_violations() {
        let toml = format!(
            "{CONFIG}\n[composition]\nmin_size = 3\n[composition.min_per_label]\ncontrol = 1\n"
        );
        let config = IndicatorConfig::from_toml(&toml).unwrap();
        let units = load_csv_units(UNITS, &config.input).unwrap();
        let (_, violations) = run_checked(&config, &units).unwrap();
        // A (2 units) and the unassigned row (u6 only) are too small
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].subset.as_deref(), Some("A"));
        assert_eq!(
            violations[0].kind,
            ViolationKind::TooSmall { size: 2, required: 3 }
        );
        assert_eq!(violations[1].subset, None);
        assert_eq!(
            violations[1].kind,
            ViolationKind::TooSmall { size: 1, required: 3 }
        );
    }
}
