use serde::{Deserialize, Serialize};

use super::row::{
    bool_cell, cell, cell_bool, cell_i64, cell_opt_i64, cell_string, opt_i64_cell, Row,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyKind {
    Pre,
    Post,
}

impl SurveyKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pre" => Some(SurveyKind::Pre),
            "post" => Some(SurveyKind::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SurveyKind::Pre => "pre",
            SurveyKind::Post => "post",
        }
    }

    /// Sheet in the per-seminar spreadsheet holding this survey's responses.
    pub fn response_sheet(self) -> &'static str {
        match self {
            SurveyKind::Pre => "pre_survey",
            SurveyKind::Post => "post_survey",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Rating,
    Text,
    Select,
    Nps,
}

impl QuestionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "rating" => Some(QuestionType::Rating),
            "text" => Some(QuestionType::Text),
            "select" => Some(QuestionType::Select),
            "nps" => Some(QuestionType::Nps),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Rating => "rating",
            QuestionType::Text => "text",
            QuestionType::Select => "select",
            QuestionType::Nps => "nps",
        }
    }
}

// ============================================================================
// Questions
// ============================================================================

pub mod question_col {
    pub const ID: usize = 0;
    pub const SURVEY_TYPE: usize = 1;
    pub const LABEL: usize = 2;
    pub const TYPE: usize = 3;
    pub const REQUIRED: usize = 4;
    pub const OPTIONS: usize = 5;
    pub const MIN: usize = 6;
    pub const MAX: usize = 7;
    pub const PLACEHOLDER: usize = 8;
    pub const ORDER: usize = 9;
}

pub const QUESTION_HEADER: [&str; 10] = [
    "id",
    "survey_type",
    "label",
    "type",
    "required",
    "options",
    "min",
    "max",
    "placeholder",
    "order",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: String,
    pub survey_type: SurveyKind,
    pub label: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub order: i64,
}

impl SurveyQuestion {
    /// `None` for rows with an unknown survey or question type; those are skipped.
    pub fn from_row(row: &[String]) -> Option<Self> {
        Some(SurveyQuestion {
            id: cell_string(row, question_col::ID),
            survey_type: SurveyKind::from_str(cell(row, question_col::SURVEY_TYPE))?,
            label: cell_string(row, question_col::LABEL),
            question_type: QuestionType::from_str(cell(row, question_col::TYPE))?,
            required: cell_bool(row, question_col::REQUIRED),
            options: split_options(cell(row, question_col::OPTIONS)),
            min: cell_opt_i64(row, question_col::MIN),
            max: cell_opt_i64(row, question_col::MAX),
            placeholder: cell_string(row, question_col::PLACEHOLDER),
            order: cell_i64(row, question_col::ORDER),
        })
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.id.clone(),
            self.survey_type.as_str().to_string(),
            self.label.clone(),
            self.question_type.as_str().to_string(),
            bool_cell(self.required),
            self.options.join("|"),
            opt_i64_cell(self.min),
            opt_i64_cell(self.max),
            self.placeholder.clone(),
            self.order.to_string(),
        ]
    }

    /// Inclusive numeric bounds for rating / nps questions.
    pub fn bounds(&self) -> (i64, i64) {
        let (default_min, default_max) = match self.question_type {
            QuestionType::Nps => (0, 10),
            _ => (1, 5),
        };
        (self.min.unwrap_or(default_min), self.max.unwrap_or(default_max))
    }
}

/// Options are edited by hand in the sheet, either one per line or `|` separated.
fn split_options(raw: &str) -> Vec<String> {
    raw.split(['\n', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Responses
// ============================================================================

pub mod response_col {
    pub const ID: usize = 0;
    pub const RESERVATION_ID: usize = 1;
    pub const SUBMITTED_AT: usize = 2;
    pub const ANSWERS: usize = 3;
}

pub const RESPONSE_HEADER: [&str; 4] = ["id", "reservation_id", "submitted_at", "answers_json"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: String,
    pub reservation_id: String,
    pub submitted_at: String,
    pub answers: serde_json::Map<String, serde_json::Value>,
}

impl SurveyResponse {
    pub fn from_row(row: &[String]) -> Self {
        let answers = serde_json::from_str::<serde_json::Value>(cell(row, response_col::ANSWERS))
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();

        SurveyResponse {
            id: cell_string(row, response_col::ID),
            reservation_id: cell_string(row, response_col::RESERVATION_ID),
            submitted_at: cell_string(row, response_col::SUBMITTED_AT),
            answers,
        }
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.id.clone(),
            self.reservation_id.clone(),
            self.submitted_at.clone(),
            serde_json::Value::Object(self.answers.clone()).to_string(),
        ]
    }
}
