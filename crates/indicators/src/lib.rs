//! `gmatch-indicators` — Subset/treatment indicator tables for generalized matching.
//!
//! Pure engine crate: receives a candidate partition and per-unit treatment
//! labels, returns how many units of each treatment sit in each subset.
//! Searching for partitions and estimating effects live with the caller.

pub mod aggregate;
pub mod composition;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod model;
pub mod parallel;
pub mod targets;

pub use aggregate::tabulate;
pub use composition::{check_composition, satisfies, CompositionRule, Violation, ViolationKind};
pub use config::IndicatorConfig;
pub use domain::{Domain, PlaceholderPolicy};
pub use engine::{load_csv_units, run, run_checked, Units};
pub use error::{IndicatorError, Result, Sequence};
pub use model::IndicatorTable;
pub use parallel::tabulate_par;
pub use targets::target_units;
