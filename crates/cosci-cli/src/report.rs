//! Run summaries for the terminal

use cosci_orchestrator::{RunMetrics, RunReport, RunStatus};
use serde::Serialize;
use std::fmt::Write as _;

/// One ranked hypothesis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RankedEntry {
    pub(crate) rank: usize,
    pub(crate) id: String,
    pub(crate) rating: f64,
    pub(crate) overall_score: Option<f64>,
    pub(crate) reflection: Option<&'static str>,
    pub(crate) ungrounded: bool,
    pub(crate) text: String,
}

/// Condensed view of a [`RunReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Summary {
    pub(crate) goal: String,
    pub(crate) status: RunStatus,
    pub(crate) iterations: u32,
    pub(crate) metrics: RunMetrics,
    pub(crate) warnings: usize,
    pub(crate) ranked: Vec<RankedEntry>,
}

impl Summary {
    pub(crate) fn from_report(report: &RunReport, top: usize) -> Self {
        let state = &report.state;
        let ranked = report
            .ranked()
            .into_iter()
            .take(top)
            .enumerate()
            .map(|(position, hypothesis)| RankedEntry {
                rank: position + 1,
                id: hypothesis.id().to_string(),
                rating: hypothesis.rating(),
                overall_score: hypothesis.review().map(|r| r.overall_score),
                reflection: hypothesis.reflection().map(|n| n.classification.name()),
                ungrounded: hypothesis.is_ungrounded(),
                text: hypothesis.text().to_string(),
            })
            .collect();
        Self {
            goal: state.research_goal().to_string(),
            status: report.status,
            iterations: state.iteration(),
            metrics: *state.metrics(),
            warnings: state.warnings().count(),
            ranked,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn to_text(&self) -> String {
        let mut out = String::new();
        let status = match self.status {
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
        };
        let _ = writeln!(out, "goal:       {}", self.goal);
        let _ = writeln!(out, "status:     {status} after iteration {}", self.iterations);
        let _ = writeln!(
            out,
            "population: {} generated, {} evolved, {} folded, {} eliminated",
            self.metrics.hypotheses_generated,
            self.metrics.hypotheses_evolved,
            self.metrics.duplicates_removed,
            self.metrics.eliminated
        );
        let _ = writeln!(
            out,
            "matches:    {} played, {} skipped",
            self.metrics.matches_played, self.metrics.matches_skipped
        );
        if self.warnings > 0 {
            let _ = writeln!(out, "warnings:   {}", self.warnings);
        }
        out.push('\n');
        for entry in &self.ranked {
            let score = entry
                .overall_score
                .map_or_else(|| "-".to_string(), |s| format!("{s:.2}"));
            let marker = if entry.ungrounded { " (ungrounded)" } else { "" };
            let _ = writeln!(
                out,
                "{:>3}. [{}] elo {:>7.1}  review {score:>4}  {}{marker}",
                entry.rank, entry.id, entry.rating, entry.text
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn summary() -> Summary {
        Summary {
            goal: "sleep".to_string(),
            status: RunStatus::Completed,
            iterations: 1,
            metrics: RunMetrics::default(),
            warnings: 0,
            ranked: vec![RankedEntry {
                rank: 1,
                id: "H1".to_string(),
                rating: 1212.0,
                overall_score: None,
                reflection: None,
                ungrounded: false,
                text: "gut flora gate REM".to_string(),
            }],
        }
    }

    #[test]
    fn text_lists_ranked_entries() {
        let text = summary().to_text();
        assert!(text.contains("status:     completed after iteration 1"));
        assert!(text.contains("  1. [H1] elo  1212.0  review    -  gut flora gate REM"));
        assert!(!text.contains("warnings"));
    }

    #[test]
    fn text_marks_ungrounded_entries() {
        let mut summary = summary();
        summary.ranked[0].ungrounded = true;
        assert!(summary.to_text().contains("gut flora gate REM (ungrounded)"));
    }

    #[test]
    fn json_carries_status_and_ranking() {
        let value: serde_json::Value = serde_json::from_str(&summary().to_json().unwrap()).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["ranked"][0]["rank"], 1);
        assert_eq!(value["ranked"][0]["overall_score"], serde_json::Value::Null);
        assert_eq!(value["ranked"][0]["ungrounded"], false);
    }
}
