//! Text report for a finished run: one line per cell, then the validation
//! section. The validation section always renders, so a clean run says so
//! explicitly instead of omitting it.

use crate::orchestrator::RunSummary;
use capx_core::CellState;
use std::fmt::Write;

pub fn render_report(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "scenario: {}", summary.scenario_id);
    let _ = writeln!(
        out,
        "cells: {} succeeded, {} failed",
        summary.succeeded(),
        summary.failed()
    );
    for record in &summary.records {
        match &record.state {
            CellState::Failed(reason) => {
                let _ = writeln!(out, "  {}  failed: {}", record.id, reason);
            }
            state => {
                let objective = record
                    .objective
                    .map(|o| format!(", objective {o}"))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  {}  {} in {}ms{}",
                    record.id,
                    state.label(),
                    record.solve_time_ms,
                    objective
                );
            }
        }
    }
    let _ = writeln!(out, "validation: {}", summary.validation.summary());
    for finding in summary.validation.findings() {
        let _ = writeln!(
            out,
            "  [{}] {} ({}): {}",
            finding.severity.as_str(),
            finding.module,
            finding.table,
            finding.message
        );
    }
    out
}
