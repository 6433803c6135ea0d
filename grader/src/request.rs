use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// One unit of grading work. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeRequest {
    portfolio_id: i64,
    file_path: PathBuf,
    rubric_text: Option<String>,
}

impl GradeRequest {
    /// Blank rubric text counts as no rubric; the service then applies its own default.
    pub fn new(portfolio_id: i64, file_path: PathBuf, rubric_text: Option<String>) -> Self {
        Self {
            portfolio_id,
            file_path,
            rubric_text: rubric_text.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn portfolio_id(&self) -> i64 {
        self.portfolio_id
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn rubric_text(&self) -> Option<&str> {
        self.rubric_text.as_deref()
    }

    /// JSON body for `POST /grade`.
    pub(crate) fn payload(&self) -> GradePayload<'_> {
        GradePayload {
            portfolio_id: self.portfolio_id,
            file_path: self.file_path.to_string_lossy().into_owned(),
            rubric: self.rubric_text(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GradePayload<'a> {
    pub portfolio_id: i64,
    pub file_path: String,
    /// Always present; `null` when there is no rubric.
    pub rubric: Option<&'a str>,
}

/// What the scoring service returned for one portfolio.
///
/// Either field may be absent when the service could not score.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GradeResult {
    #[serde(default)]
    pub ai_grade: Option<f64>,
    #[serde(default, deserialize_with = "report_as_text")]
    pub ai_review_report: Option<String>,
}

/// Reports come back either as text or as structured JSON; both are stored as text.
fn report_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
