//! Data-quality findings collected while a scenario runs.
//!
//! Validation findings are never fatal and never block the pipeline: modules
//! append them as they inspect their inputs, and the collector is drained
//! once at the end of a scenario run into the persistent validation log.
//!
//! # Example
//!
//! ```
//! use capx_core::diagnostics::{ValidationCollector, ValidationSeverity};
//!
//! let mut collector = ValidationCollector::new();
//! collector.collect(
//!     "gen_var",
//!     "variable_profiles",
//!     ValidationSeverity::Mid,
//!     ["capacity factor above 1 for plant_a at t4".to_string()],
//! );
//! assert_eq!(collector.count(), 1);
//! assert!(collector.has_findings());
//! ```

use serde::Serialize;

/// Severity tag for a data-quality finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    /// Cosmetic or informational.
    Low,
    /// Suspicious data that probably distorts results.
    Mid,
    /// Almost certainly wrong data, though the solve may still complete.
    High,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationSeverity::Low => "low",
            ValidationSeverity::Mid => "mid",
            ValidationSeverity::High => "high",
        }
    }
}

/// A single finding: which module raised it, against which input table.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationFinding {
    pub module: String,
    pub table: String,
    pub severity: ValidationSeverity,
    pub message: String,
}

impl std::fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}:{}] {}: {}",
            self.severity.as_str(),
            self.module,
            self.table,
            self.message
        )
    }
}

/// Append-only collection of validation findings for one scenario run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationCollector {
    findings: Vec<ValidationFinding>,
}

impl ValidationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of findings from one module against one table.
    pub fn collect<I>(&mut self, module: &str, table: &str, severity: ValidationSeverity, messages: I)
    where
        I: IntoIterator<Item = String>,
    {
        for message in messages {
            self.findings.push(ValidationFinding {
                module: module.to_string(),
                table: table.to_string(),
                severity,
                message,
            });
        }
    }

    pub fn add(&mut self, finding: ValidationFinding) {
        self.findings.push(finding);
    }

    pub fn merge(&mut self, other: ValidationCollector) {
        self.findings.extend(other.findings);
    }

    pub fn count(&self) -> usize {
        self.findings.len()
    }

    pub fn count_at(&self, severity: ValidationSeverity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    /// Take all findings, leaving the collector empty.
    pub fn drain(&mut self) -> Vec<ValidationFinding> {
        std::mem::take(&mut self.findings)
    }

    pub fn summary(&self) -> String {
        if self.findings.is_empty() {
            return "no findings".to_string();
        }
        let low = self.count_at(ValidationSeverity::Low);
        let mid = self.count_at(ValidationSeverity::Mid);
        let high = self.count_at(ValidationSeverity::High);
        let mut parts = Vec::new();
        for (count, label) in [(high, "high"), (mid, "mid"), (low, "low")] {
            if count > 0 {
                parts.push(format!("{count} {label}"));
            }
        }
        parts.join(", ")
    }
}

impl std::fmt::Display for ValidationCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Validation: {}", self.summary())?;
        for finding in &self.findings {
            writeln!(f, "  {finding}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_appends_tagged_findings() {
        let mut collector = ValidationCollector::new();
        collector.collect(
            "gen_var",
            "variable_profiles",
            ValidationSeverity::High,
            ["negative capacity factor".to_string(), "missing t7".to_string()],
        );
        collector.collect(
            "loads",
            "loads",
            ValidationSeverity::Low,
            ["zero load at t1".to_string()],
        );
        assert_eq!(collector.count(), 3);
        assert_eq!(collector.count_at(ValidationSeverity::High), 2);
        assert_eq!(collector.summary(), "2 high, 1 low");
    }

    #[test]
    fn drain_empties_the_collector() {
        let mut collector = ValidationCollector::new();
        collector.collect(
            "projects",
            "projects",
            ValidationSeverity::Mid,
            ["duplicate project row".to_string()],
        );
        let drained = collector.drain();
        assert_eq!(drained.len(), 1);
        assert!(!collector.has_findings());
        assert_eq!(collector.summary(), "no findings");
    }

    #[test]
    fn findings_serialize_with_severity_tag() {
        let finding = ValidationFinding {
            module: "gen_var".into(),
            table: "variable_profiles".into(),
            severity: ValidationSeverity::Mid,
            message: "gap in profile".into(),
        };
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("\"mid\""));
        assert!(json.contains("variable_profiles"));
    }
}
