use crate::error::{FailureKind, GradingError};
use crate::store::StoredResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of grading one portfolio: a full success or a full failure, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradingOutcome {
    pub portfolio_id: i64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_review_report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl GradingOutcome {
    pub fn success(stored: StoredResult) -> Self {
        Self {
            portfolio_id: stored.portfolio_id,
            ok: true,
            ai_grade: stored.ai_grade,
            ai_review_report: stored.ai_review_report,
            graded_at: Some(stored.graded_at),
            error: None,
            failure: None,
        }
    }

    pub fn failure(portfolio_id: i64, err: &GradingError) -> Self {
        Self {
            portfolio_id,
            ok: false,
            ai_grade: None,
            ai_review_report: None,
            graded_at: None,
            error: Some(err.to_string()),
            failure: Some(err.failure_kind()),
        }
    }
}

/// Outcomes of one batch, in portfolio enumeration order. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub assignment_id: i64,
    pub outcomes: Vec<GradingOutcome>,
}

impl BatchReport {
    pub fn empty(assignment_id: i64) -> Self {
        Self {
            assignment_id,
            outcomes: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_serializes_without_grade_fields() {
        let outcome = GradingOutcome::failure(12, &GradingError::Cancelled);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "portfolio_id": 12,
                "ok": false,
                "error": "grading cancelled before dispatch",
                "failure": "cancelled"
            })
        );
    }

    #[test]
    fn counts_split_by_ok_flag() {
        let ok = GradingOutcome::success(StoredResult {
            portfolio_id: 1,
            ai_grade: Some(90.0),
            ai_review_report: None,
            graded_at: Utc::now(),
        });
        let bad = GradingOutcome::failure(2, &GradingError::Internal("boom".into()));
        let report = BatchReport {
            assignment_id: 3,
            outcomes: vec![ok, bad.clone(), bad],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(BatchReport::empty(9).outcomes.len(), 0);
    }
}
