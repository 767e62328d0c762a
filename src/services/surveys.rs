use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::TenantConfig;
use crate::db::models::{QuestionType, SeminarStatus, SurveyKind, SurveyQuestion, SurveyResponse};
use crate::db::{ReservationRepository, SurveyRepository};
use crate::error::{AppError, AppResult};
use crate::i18n::{resolve_language, tr};
use crate::services::booking::BookingService;
use crate::services::seminars::SeminarService;
use crate::AppState;

const MAX_TEXT_ANSWER_CHARS: usize = 2000;
const MAX_QUESTIONS: usize = 50;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SurveySubmission {
    pub reservation_number: String,
    pub email: String,
    pub answers: Map<String, Value>,
    pub lang: Option<String>,
}

/// Admin-side question definition; kind and display order come from the request.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    #[serde(default)]
    pub id: String,
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
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionSet {
    pub kind: SurveyKind,
    pub questions: Vec<SurveyQuestion>,
    /// No questions are configured for this seminar; the built-in set applies.
    pub is_default: bool,
}

// ============================================================================
// Default questions
// ============================================================================

fn question(
    kind: SurveyKind,
    order: i64,
    id: &str,
    label: &str,
    question_type: QuestionType,
    required: bool,
) -> SurveyQuestion {
    SurveyQuestion {
        id: id.to_string(),
        survey_type: kind,
        label: label.to_string(),
        question_type,
        required,
        options: Vec::new(),
        min: None,
        max: None,
        placeholder: String::new(),
        order,
    }
}

pub fn default_questions(kind: SurveyKind) -> Vec<SurveyQuestion> {
    match kind {
        SurveyKind::Pre => vec![
            SurveyQuestion {
                placeholder: "例: 実務での活用方法を知りたい".to_string(),
                ..question(
                    kind,
                    1,
                    "expectations",
                    "このセミナーに期待することを教えてください",
                    QuestionType::Text,
                    false,
                )
            },
            SurveyQuestion {
                options: vec![
                    "業務で導入を検討している".to_string(),
                    "情報収集".to_string(),
                    "スキルアップ".to_string(),
                    "その他".to_string(),
                ],
                ..question(
                    kind,
                    2,
                    "interest",
                    "参加の目的を選択してください",
                    QuestionType::Select,
                    true,
                )
            },
            SurveyQuestion {
                min: Some(1),
                max: Some(5),
                ..question(
                    kind,
                    3,
                    "prior_knowledge",
                    "このテーマに関する現在の知識レベル",
                    QuestionType::Rating,
                    true,
                )
            },
        ],
        SurveyKind::Post => vec![
            SurveyQuestion {
                min: Some(1),
                max: Some(5),
                ..question(
                    kind,
                    1,
                    "satisfaction",
                    "セミナーの満足度",
                    QuestionType::Rating,
                    true,
                )
            },
            SurveyQuestion {
                min: Some(0),
                max: Some(10),
                ..question(
                    kind,
                    2,
                    "nps",
                    "このセミナーを同僚に勧める可能性はどのくらいありますか",
                    QuestionType::Nps,
                    true,
                )
            },
            question(
                kind,
                3,
                "comments",
                "ご意見・ご感想をお聞かせください",
                QuestionType::Text,
                false,
            ),
        ],
    }
}

// ============================================================================
// Validation
// ============================================================================

fn answer_error(lang: &str, key: &str, params: &[(&str, &str)]) -> AppError {
    AppError::Validation(tr(Some(lang), key, Some(params)))
}

fn integer_answer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Check answers against the questions and return them normalised, keyed by
/// question id. Answers to unknown questions are dropped.
pub fn validate_answers(
    questions: &[SurveyQuestion],
    answers: &Map<String, Value>,
    lang: &str,
) -> AppResult<Map<String, Value>> {
    let mut out = Map::new();

    for q in questions {
        let value = answers.get(&q.id);
        if is_blank(value) {
            if q.required {
                return Err(answer_error(lang, "survey.required", &[("label", q.label.as_str())]));
            }
            continue;
        }
        let Some(value) = value else { continue };

        let normalised = match q.question_type {
            QuestionType::Rating | QuestionType::Nps => {
                let (min, max) = q.bounds();
                let out_of_range = || {
                    answer_error(
                        lang,
                        "survey.out_of_range",
                        &[
                            ("label", q.label.as_str()),
                            ("min", min.to_string().as_str()),
                            ("max", max.to_string().as_str()),
                        ],
                    )
                };
                let n = integer_answer(value).ok_or_else(out_of_range)?;
                if n < min || n > max {
                    return Err(out_of_range());
                }
                Value::from(n)
            }
            QuestionType::Select => {
                let choice = value.as_str().map(str::trim).unwrap_or_default();
                if !q.options.iter().any(|o| o == choice) {
                    return Err(answer_error(
                        lang,
                        "survey.invalid_option",
                        &[("label", q.label.as_str())],
                    ));
                }
                Value::from(choice)
            }
            QuestionType::Text => {
                let text = match value {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                };
                if text.chars().count() > MAX_TEXT_ANSWER_CHARS {
                    return Err(answer_error(
                        lang,
                        "survey.too_long",
                        &[("label", q.label.as_str())],
                    ));
                }
                Value::from(text)
            }
        };
        out.insert(q.id.clone(), normalised);
    }

    Ok(out)
}

fn invalid_questions(reason: &str) -> AppError {
    AppError::Validation(tr(None, "survey.invalid_questions", Some(&[("reason", reason)])))
}

/// Turn admin input into stored questions: assigns kind, order and missing ids.
pub fn build_questions(
    kind: SurveyKind,
    input: Vec<QuestionInput>,
) -> AppResult<Vec<SurveyQuestion>> {
    if input.len() > MAX_QUESTIONS {
        return Err(invalid_questions("too many questions"));
    }

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(input.len());

    for (idx, q) in input.into_iter().enumerate() {
        let id = match q.id.trim() {
            "" => format!("{}-{}", kind.as_str(), Uuid::new_v4().simple()),
            id => id.to_string(),
        };
        if !seen.insert(id.clone()) {
            return Err(invalid_questions(&format!("duplicate id {}", id)));
        }

        let label = q.label.trim().to_string();
        if label.is_empty() {
            return Err(invalid_questions(&format!("question {} has no label", idx + 1)));
        }

        let options: Vec<String> = q
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if q.question_type == QuestionType::Select && options.is_empty() {
            return Err(invalid_questions(&format!("{} needs options", label)));
        }

        let question = SurveyQuestion {
            id,
            survey_type: kind,
            label,
            question_type: q.question_type,
            required: q.required,
            options,
            min: q.min,
            max: q.max,
            placeholder: q.placeholder.trim().to_string(),
            order: idx as i64 + 1,
        };
        let (min, max) = question.bounds();
        if min > max {
            return Err(invalid_questions(&format!("{} has min above max", question.label)));
        }
        questions.push(question);
    }

    Ok(questions)
}

// ============================================================================
// Survey Service
// ============================================================================

pub struct SurveyService;

impl SurveyService {
    /// Configured questions, or the built-in set when none are configured.
    /// A failed read is an error, never an empty configuration.
    pub async fn resolve_questions(
        state: &AppState,
        spreadsheet_id: &str,
        kind: SurveyKind,
    ) -> AppResult<QuestionSet> {
        let configured = if spreadsheet_id.is_empty() {
            Vec::new()
        } else {
            SurveyRepository::questions(state.sheets.as_ref(), spreadsheet_id, kind).await?
        };

        Ok(if configured.is_empty() {
            QuestionSet {
                kind,
                questions: default_questions(kind),
                is_default: true,
            }
        } else {
            QuestionSet {
                kind,
                questions: configured,
                is_default: false,
            }
        })
    }

    /// Questions shown to attendees; drafts are hidden.
    pub async fn public_questions(
        state: &AppState,
        tenant: &TenantConfig,
        seminar_id: &str,
        kind: SurveyKind,
    ) -> AppResult<QuestionSet> {
        let seminar = SeminarService::get_public(state, tenant, seminar_id).await?;
        Self::resolve_questions(state, &seminar.spreadsheet_id, kind).await
    }

    pub async fn admin_questions(
        state: &AppState,
        tenant: &TenantConfig,
        seminar_id: &str,
        kind: SurveyKind,
    ) -> AppResult<QuestionSet> {
        let (_, seminar) = SeminarService::get(state, tenant, seminar_id).await?;
        Self::resolve_questions(state, &seminar.spreadsheet_id, kind).await
    }

    /// Replace a seminar's questions for one survey. An empty list reverts to
    /// the built-in set.
    pub async fn replace_questions(
        state: &AppState,
        tenant: &TenantConfig,
        seminar_id: &str,
        kind: SurveyKind,
        input: Vec<QuestionInput>,
    ) -> AppResult<QuestionSet> {
        let (_, seminar) = SeminarService::get(state, tenant, seminar_id).await?;
        if seminar.spreadsheet_id.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "seminar {} has no spreadsheet",
                seminar.id
            )));
        }

        let questions = build_questions(kind, input)?;
        SurveyRepository::replace_questions(
            state.sheets.as_ref(),
            &seminar.spreadsheet_id,
            kind,
            &questions,
        )
        .await?;
        Self::resolve_questions(state, &seminar.spreadsheet_id, kind).await
    }

    pub async fn responses(
        state: &AppState,
        tenant: &TenantConfig,
        seminar_id: &str,
        kind: SurveyKind,
    ) -> AppResult<Vec<SurveyResponse>> {
        let (_, seminar) = SeminarService::get(state, tenant, seminar_id).await?;
        if seminar.spreadsheet_id.is_empty() {
            return Ok(Vec::new());
        }
        SurveyRepository::responses(state.sheets.as_ref(), &seminar.spreadsheet_id, kind).await
    }

    /// Record a survey answer for a reservation identified by number and email.
    ///
    /// Rejected when the reservation is not confirmed, the survey was already
    /// submitted, or (post surveys) the seminar has neither completed nor started.
    pub async fn submit(
        state: &AppState,
        tenant: &TenantConfig,
        kind: SurveyKind,
        submission: SurveySubmission,
    ) -> AppResult<SurveyResponse> {
        let lang = resolve_language(submission.lang.as_deref());
        let located = BookingService::find_reservation(
            state,
            tenant,
            &submission.reservation_number,
            &submission.email,
            lang,
        )
        .await?;
        let seminar = &located.seminar;
        let reservation = &located.reservation;

        if !reservation.is_confirmed() {
            return Err(AppError::Conflict(tr(Some(lang), "survey.not_confirmed", None)));
        }
        let already_submitted = match kind {
            SurveyKind::Pre => reservation.pre_survey_completed,
            SurveyKind::Post => reservation.post_survey_completed,
        };
        if already_submitted {
            return Err(AppError::Conflict(tr(Some(lang), "survey.already_submitted", None)));
        }

        let open = match (kind, seminar.status) {
            (_, SeminarStatus::Cancelled | SeminarStatus::Draft) => false,
            (SurveyKind::Pre, _) => true,
            (SurveyKind::Post, SeminarStatus::Completed) => true,
            (SurveyKind::Post, _) => seminar
                .starts_at()
                .is_some_and(|start| start <= Utc::now()),
        };
        if !open {
            return Err(AppError::Conflict(tr(Some(lang), "survey.not_open", None)));
        }

        let questions = Self::resolve_questions(state, &seminar.spreadsheet_id, kind).await?;
        let answers = validate_answers(&questions.questions, &submission.answers, lang)?;

        let response = SurveyResponse {
            id: Uuid::new_v4().to_string(),
            reservation_id: reservation.id.clone(),
            submitted_at: Utc::now().to_rfc3339(),
            answers,
        };
        let sheets = state.sheets.as_ref();
        SurveyRepository::insert_response(sheets, &seminar.spreadsheet_id, kind, &response).await?;
        ReservationRepository::mark_survey_completed(
            sheets,
            &seminar.spreadsheet_id,
            located.row,
            kind,
        )
        .await?;

        tracing::info!(
            "Recorded {} survey for reservation {}",
            kind.as_str(),
            reservation.reservation_number
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TENANT;
    use crate::db::models::reservation::sample_reservation;
    use crate::db::models::seminar::sample_seminar;
    use crate::db::models::{Reservation, Seminar};
    use crate::services::testing::Harness;
    use serde_json::json;

    fn tenant(h: &Harness) -> TenantConfig {
        h.state.config.tenants.get(DEFAULT_TENANT).unwrap().clone()
    }

    fn seed(h: &Harness, seminar: Seminar, reservation: Reservation) {
        h.seed_seminar(&seminar);
        let mut rows = h.sheets.rows("sheet-1", "reservations");
        rows.push(reservation.to_row());
        h.sheets.seed("sheet-1", "reservations", rows);
    }

    fn answers(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn submission(answers_json: Value) -> SurveySubmission {
        SurveySubmission {
            reservation_number: "3f2a9c1e-k7qx2m".to_string(),
            email: "Kenji@Example.com".to_string(),
            answers: answers(answers_json),
            lang: Some("en".to_string()),
        }
    }

    fn pre_answers() -> Value {
        json!({"interest": "情報収集", "prior_knowledge": "3", "expectations": "  hands-on  "})
    }

    #[test]
    fn answers_are_validated_and_normalised() {
        let questions = default_questions(SurveyKind::Pre);
        let out = validate_answers(&questions, &answers(pre_answers()), "en").unwrap();
        assert_eq!(out["prior_knowledge"], json!(3));
        assert_eq!(out["expectations"], json!("hands-on"));

        let missing = answers(json!({"prior_knowledge": 3}));
        assert!(validate_answers(&questions, &missing, "en").is_err());

        let bad_option = answers(json!({"interest": "nope", "prior_knowledge": 3}));
        assert!(validate_answers(&questions, &bad_option, "en").is_err());

        let post = default_questions(SurveyKind::Post);
        let nps_ok = answers(json!({"satisfaction": 5, "nps": 0, "extra": "dropped"}));
        let out = validate_answers(&post, &nps_ok, "en").unwrap();
        assert!(!out.contains_key("extra"));
        let nps_high = answers(json!({"satisfaction": 5, "nps": 11}));
        assert!(matches!(
            validate_answers(&post, &nps_high, "en"),
            Err(AppError::Validation(_))
        ));
        let too_long = answers(json!({"satisfaction": 5, "nps": 9, "comments": "x".repeat(2001)}));
        assert!(validate_answers(&post, &too_long, "en").is_err());
    }

    #[test]
    fn question_input_is_checked() {
        let input = |json: Value| -> Vec<QuestionInput> { serde_json::from_value(json).unwrap() };

        let built = build_questions(
            SurveyKind::Post,
            input(json!([
                {"label": "Pace", "type": "rating", "required": true},
                {"id": "track", "label": "Track", "type": "select", "options": ["A", " ", "B"]}
            ])),
        )
        .unwrap();
        assert_eq!(built[0].order, 1);
        assert!(built[0].id.starts_with("post-"));
        assert_eq!(built[1].options, vec!["A", "B"]);

        for bad in [
            json!([{"label": "", "type": "text"}]),
            json!([{"label": "Pick", "type": "select"}]),
            json!([{"label": "Score", "type": "rating", "min": 5, "max": 1}]),
            json!([
                {"id": "a", "label": "A", "type": "text"},
                {"id": "a", "label": "B", "type": "text"}
            ]),
        ] {
            assert!(build_questions(SurveyKind::Pre, input(bad)).is_err());
        }
    }

    #[tokio::test]
    async fn pre_survey_submission_sets_flag_once() {
        let h = Harness::new();
        seed(&h, sample_seminar(), sample_reservation());

        let tenant = tenant(&h);
        let submit =
            || SurveyService::submit(&h.state, &tenant, SurveyKind::Pre, submission(pre_answers()));
        let response = submit().await.unwrap();
        assert_eq!(response.reservation_id, "r-1");
        assert_eq!(h.sheets.rows("sheet-1", "pre_survey").len(), 2);
        let stored = Reservation::from_row(&h.sheets.rows("sheet-1", "reservations")[1]);
        assert!(stored.pre_survey_completed);
        assert!(!stored.post_survey_completed);

        let again = submit().await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn cancelled_reservations_cannot_answer() {
        let h = Harness::new();
        seed(
            &h,
            sample_seminar(),
            Reservation {
                status: crate::db::models::ReservationStatus::Cancelled,
                ..sample_reservation()
            },
        );
        let result =
            SurveyService::submit(&h.state, &tenant(&h), SurveyKind::Pre, submission(pre_answers()))
                .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(h.sheets.rows("sheet-1", "pre_survey").len(), 1);
    }

    #[tokio::test]
    async fn post_survey_opens_after_start_or_completion() {
        let post = || submission(json!({"satisfaction": 4, "nps": 8}));

        let h = Harness::new();
        seed(
            &h,
            Seminar {
                date: "2099-01-01T10:00:00+09:00".to_string(),
                end_time: String::new(),
                ..sample_seminar()
            },
            sample_reservation(),
        );
        let early = SurveyService::submit(&h.state, &tenant(&h), SurveyKind::Post, post()).await;
        assert!(matches!(early, Err(AppError::Conflict(_))));

        let h = Harness::new();
        seed(
            &h,
            Seminar {
                date: "2099-01-01T10:00:00+09:00".to_string(),
                end_time: String::new(),
                status: SeminarStatus::Completed,
                ..sample_seminar()
            },
            sample_reservation(),
        );
        SurveyService::submit(&h.state, &tenant(&h), SurveyKind::Post, post())
            .await
            .unwrap();

        let h = Harness::new();
        seed(
            &h,
            Seminar {
                date: "2020-01-01T10:00:00+09:00".to_string(),
                end_time: String::new(),
                ..sample_seminar()
            },
            sample_reservation(),
        );
        SurveyService::submit(&h.state, &tenant(&h), SurveyKind::Post, post())
            .await
            .unwrap();
        let stored = Reservation::from_row(&h.sheets.rows("sheet-1", "reservations")[1]);
        assert!(stored.post_survey_completed);
    }

    #[tokio::test]
    async fn configured_questions_replace_defaults() {
        let h = Harness::new();
        let tenant = tenant(&h);
        h.seed_seminar(&sample_seminar());
        let id = sample_seminar().id;

        let before = SurveyService::admin_questions(&h.state, &tenant, &id, SurveyKind::Pre)
            .await
            .unwrap();
        assert!(before.is_default);

        let input: Vec<QuestionInput> = serde_json::from_value(json!([
            {"id": "role", "label": "Role", "type": "text", "required": true}
        ]))
        .unwrap();
        let after = SurveyService::replace_questions(&h.state, &tenant, &id, SurveyKind::Pre, input)
            .await
            .unwrap();
        assert!(!after.is_default);
        assert_eq!(after.questions.len(), 1);

        // Post survey is untouched.
        let post = SurveyService::public_questions(&h.state, &tenant, &id, SurveyKind::Post)
            .await
            .unwrap();
        assert!(post.is_default);

        let reverted =
            SurveyService::replace_questions(&h.state, &tenant, &id, SurveyKind::Pre, Vec::new())
                .await
                .unwrap();
        assert!(reverted.is_default);
    }

    #[tokio::test]
    async fn unreadable_questions_fail_submission_without_completing() {
        let h = Harness::new();
        seed(&h, sample_seminar(), sample_reservation());
        h.sheets.remove_tab("sheet-1", "survey_questions");

        let result =
            SurveyService::submit(&h.state, &tenant(&h), SurveyKind::Pre, submission(pre_answers()))
                .await;
        assert!(matches!(result, Err(AppError::Sheets(_))));
        assert_eq!(h.sheets.rows("sheet-1", "pre_survey").len(), 1);
        let stored = Reservation::from_row(&h.sheets.rows("sheet-1", "reservations")[1]);
        assert!(!stored.pre_survey_completed);

        let id = sample_seminar().id;
        let admin =
            SurveyService::admin_questions(&h.state, &tenant(&h), &id, SurveyKind::Pre).await;
        assert!(matches!(admin, Err(AppError::Sheets(_))));
    }

    #[tokio::test]
    async fn draft_questions_are_hidden_from_attendees() {
        let h = Harness::new();
        let draft = Seminar {
            status: SeminarStatus::Draft,
            ..sample_seminar()
        };
        h.seed_seminar(&draft);
        let result =
            SurveyService::public_questions(&h.state, &tenant(&h), &draft.id, SurveyKind::Pre)
                .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
