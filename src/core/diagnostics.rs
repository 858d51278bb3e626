use std::fmt;

use super::error::{FireError, InputField};

/// Non-fatal findings raised while evaluating a plan.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// Allocation weights do not sum to 100%. The engine still uses them as given.
    AllocationDrift { total: f64 },
    /// A required field was unset when `operation` first needed it.
    MissingInput {
        field: InputField,
        operation: &'static str,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AllocationDrift { total } => {
                write!(f, "Allocations sum to {total}%, not 100%")
            }
            Diagnostic::MissingInput { field, operation } => {
                write!(f, "Cannot calculate {operation}: {field} is required")
            }
        }
    }
}

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects distinct diagnostics in the order they were first reported.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    pub fn emit(&self) {
        for entry in &self.entries {
            tracing::warn!("{entry}");
        }
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report(&mut self, diagnostic: Diagnostic) {
        if !self.entries.contains(&diagnostic) {
            self.entries.push(diagnostic);
        }
    }
}

/// Keeps every report, repeats included.
impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl DiagnosticSink for Silent {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Unwraps a required field, reporting it at the point of first detection.
pub(crate) fn require(
    value: Option<f64>,
    field: InputField,
    operation: &'static str,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<f64, FireError> {
    match value {
        Some(v) => Ok(v),
        None => {
            diagnostics.report(Diagnostic::MissingInput { field, operation });
            Err(FireError::MissingInput(field))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_first_occurrence_only() {
        let mut log = DiagnosticLog::new();
        log.report(Diagnostic::AllocationDrift { total: 90.0 });
        log.report(Diagnostic::AllocationDrift { total: 90.0 });
        log.report(Diagnostic::MissingInput {
            field: InputField::AnnualIncome,
            operation: "yearly contribution",
        });
        log.report(Diagnostic::AllocationDrift { total: 90.0 });

        assert_eq!(log.entries().len(), 2);
        assert_eq!(
            log.messages(),
            vec![
                "Allocations sum to 90%, not 100%".to_string(),
                "Cannot calculate yearly contribution: annual income is required".to_string(),
            ]
        );
    }

    #[test]
    fn require_reports_missing_field() {
        let mut log = DiagnosticLog::new();
        let err = require(None, InputField::CurrentAge, "FIRE age", &mut log)
            .expect_err("missing value must fail");
        assert_eq!(err, FireError::MissingInput(InputField::CurrentAge));
        assert_eq!(log.entries().len(), 1);

        let ok = require(Some(42.0), InputField::CurrentAge, "FIRE age", &mut log);
        assert_eq!(ok, Ok(42.0));
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn silent_sink_accepts_anything() {
        let mut sink = Silent;
        let err = require(None, InputField::InvestedAssets, "projection", &mut sink);
        assert!(err.is_err());
    }
}
