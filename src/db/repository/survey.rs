use crate::db::models::row::{cell, Row};
use crate::db::models::survey::{question_col, QUESTION_HEADER, RESPONSE_HEADER};
use crate::db::models::{SurveyKind, SurveyQuestion, SurveyResponse};
use crate::error::AppResult;
use crate::services::sheets::{SheetSpec, SheetStore};

pub const QUESTIONS_SHEET: &str = "survey_questions";

// ============================================================================
// Survey Repository (per-seminar spreadsheet)
// ============================================================================

pub struct SurveyRepository;

impl SurveyRepository {
    pub fn sheet_specs() -> Vec<SheetSpec> {
        vec![
            SheetSpec::new(SurveyKind::Pre.response_sheet(), &RESPONSE_HEADER),
            SheetSpec::new(SurveyKind::Post.response_sheet(), &RESPONSE_HEADER),
            SheetSpec::new(QUESTIONS_SHEET, &QUESTION_HEADER),
        ]
    }

    /// Configured questions for one survey, sorted by display order.
    pub async fn questions(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        kind: SurveyKind,
    ) -> AppResult<Vec<SurveyQuestion>> {
        let rows = sheets.read_rows(spreadsheet_id, QUESTIONS_SHEET).await?;
        let mut questions: Vec<SurveyQuestion> = rows
            .iter()
            .skip(1)
            .filter_map(|row| SurveyQuestion::from_row(row))
            .filter(|q| q.survey_type == kind && !q.id.is_empty())
            .collect();
        questions.sort_by_key(|q| q.order);
        Ok(questions)
    }

    /// Replace one survey's questions, keeping the other survey's rows.
    ///
    /// The sheet API has no row deletion, so the table is rewritten in place and
    /// rows left over from a longer previous table are blanked.
    pub async fn replace_questions(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        kind: SurveyKind,
        questions: &[SurveyQuestion],
    ) -> AppResult<()> {
        let existing = sheets.read_rows(spreadsheet_id, QUESTIONS_SHEET).await?;

        let mut table: Vec<Row> = existing
            .iter()
            .skip(1)
            .filter(|row| {
                !cell(row, question_col::ID).trim().is_empty()
                    && SurveyKind::from_str(cell(row, question_col::SURVEY_TYPE)) != Some(kind)
            })
            .cloned()
            .collect();
        table.extend(questions.iter().map(|q| SurveyQuestion {
            survey_type: kind,
            ..q.clone()
        }.to_row()));

        let old_len = existing.len().saturating_sub(1);
        for (offset, row) in table.iter().enumerate() {
            sheets
                .update_row(spreadsheet_id, QUESTIONS_SHEET, offset + 2, pad(row.clone()))
                .await?;
        }
        for offset in table.len()..old_len {
            sheets
                .update_row(
                    spreadsheet_id,
                    QUESTIONS_SHEET,
                    offset + 2,
                    vec![String::new(); QUESTION_HEADER.len()],
                )
                .await?;
        }

        tracing::info!(
            "Replaced {} survey questions in spreadsheet {} ({} rows written)",
            kind.as_str(),
            spreadsheet_id,
            table.len()
        );
        Ok(())
    }

    pub async fn responses(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        kind: SurveyKind,
    ) -> AppResult<Vec<SurveyResponse>> {
        let rows = sheets.read_rows(spreadsheet_id, kind.response_sheet()).await?;
        Ok(rows
            .iter()
            .skip(1)
            .map(|row| SurveyResponse::from_row(row))
            .filter(|r| !r.id.is_empty())
            .collect())
    }

    pub async fn insert_response(
        sheets: &dyn SheetStore,
        spreadsheet_id: &str,
        kind: SurveyKind,
        response: &SurveyResponse,
    ) -> AppResult<()> {
        sheets
            .append_row(spreadsheet_id, kind.response_sheet(), response.to_row())
            .await
    }
}

/// Rows read back from the sheet lose trailing empty cells; pad so a rewrite
/// clears whatever the previous occupant of the row had there.
fn pad(mut row: Row) -> Row {
    row.resize(QUESTION_HEADER.len().max(row.len()), String::new());
    row
}
