use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TenantConfig;
use crate::db::models::{
    ParticipationMethod, PublicSeminar, Reservation, ReservationStatus, Seminar, SeminarFormat,
    SeminarStatus, SeminarTarget,
};
use crate::db::{ReservationRepository, SeminarRepository, SurveyRepository};
use crate::error::{AppError, AppResult};
use crate::i18n::{t, t_with, DEFAULT_LANG};
use crate::services::booking::BookingService;
use crate::services::calendar::CalendarEventInput;
use crate::services::email::ReservationEmail;
use crate::AppState;

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 10_000;
/// Concurrent sends when notifying attendees of a cancelled seminar.
const NOTIFY_CONCURRENCY: usize = 4;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewSeminar {
    pub title: String,
    pub description: String,
    pub date: String,
    pub end_time: String,
    pub capacity: i64,
    pub speaker: String,
    pub speaker_title: String,
    pub speaker_reference_url: String,
    pub meeting_url: String,
    pub format: Option<SeminarFormat>,
    pub target: Option<SeminarTarget>,
    pub invitation_code: String,
    pub image_url: String,
    /// Publish immediately instead of creating a draft.
    pub publish: bool,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeminarPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub end_time: Option<String>,
    pub capacity: Option<i64>,
    pub speaker: Option<String>,
    pub speaker_title: Option<String>,
    pub speaker_reference_url: Option<String>,
    pub meeting_url: Option<String>,
    pub format: Option<SeminarFormat>,
    pub target: Option<SeminarTarget>,
    pub invitation_code: Option<String>,
    pub image_url: Option<String>,
}

/// Booking counter next to what the reservation sheet actually holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeminarStats {
    pub seminar_id: String,
    pub capacity: i64,
    pub current_bookings: i64,
    pub remaining_seats: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub venue: i64,
    pub online: i64,
    pub pre_survey_completed: i64,
    pub post_survey_completed: i64,
    /// `current_bookings - confirmed`; non-zero means the counter drifted.
    pub counter_drift: i64,
}

// ============================================================================
// Validation
// ============================================================================

fn invalid(key: &str) -> AppError {
    AppError::Validation(t(key))
}

fn check_url(value: &str, field: &str) -> AppResult<()> {
    if value.is_empty() {
        return Ok(());
    }
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::Validation(t_with("validation.url", &[("field", field)]))),
    }
}

pub fn validate_seminar(seminar: &Seminar) -> AppResult<()> {
    if seminar.title.is_empty() {
        return Err(invalid("validation.title_required"));
    }
    if seminar.title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(t_with("validation.too_long", &[("field", "title")])));
    }
    if seminar.description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::Validation(t_with(
            "validation.too_long",
            &[("field", "description")],
        )));
    }
    if seminar.capacity < 1 {
        return Err(invalid("validation.capacity"));
    }

    let start = seminar.starts_at().ok_or_else(|| invalid("validation.date"))?;
    if !seminar.end_time.is_empty() {
        let end = DateTime::parse_from_rfc3339(&seminar.end_time)
            .map_err(|_| invalid("validation.end_time"))?;
        if end <= start {
            return Err(invalid("validation.end_time"));
        }
    }

    check_url(&seminar.speaker_reference_url, "speaker_reference_url")?;
    check_url(&seminar.meeting_url, "meeting_url")?;
    check_url(&seminar.image_url, "image_url")?;
    Ok(())
}

fn seminar_not_found() -> AppError {
    AppError::NotFound(t("seminar.not_found"))
}

fn count(reservations: &[Reservation], f: impl Fn(&Reservation) -> bool) -> i64 {
    reservations.iter().filter(|r| f(r)).count() as i64
}

fn sort_by_date(seminars: &mut [Seminar]) {
    seminars.sort_by(|a, b| match (a.starts_at(), b.starts_at()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.date.cmp(&b.date),
    });
}

// ============================================================================
// Seminar Service
// ============================================================================

pub struct SeminarService;

impl SeminarService {
    pub async fn list_all(state: &AppState, tenant: &TenantConfig) -> AppResult<Vec<Seminar>> {
        let mut seminars =
            SeminarRepository::list(state.sheets.as_ref(), &tenant.master_spreadsheet_id).await?;
        sort_by_date(&mut seminars);
        Ok(seminars)
    }

    /// Published and completed seminars, soonest first.
    pub async fn list_public(
        state: &AppState,
        tenant: &TenantConfig,
    ) -> AppResult<Vec<PublicSeminar>> {
        Ok(Self::list_all(state, tenant)
            .await?
            .iter()
            .filter(|s| matches!(s.status, SeminarStatus::Published | SeminarStatus::Completed))
            .map(PublicSeminar::from)
            .collect())
    }

    pub async fn get(
        state: &AppState,
        tenant: &TenantConfig,
        id: &str,
    ) -> AppResult<(usize, Seminar)> {
        SeminarRepository::find_by_id(state.sheets.as_ref(), &tenant.master_spreadsheet_id, id)
            .await?
            .ok_or_else(seminar_not_found)
    }

    /// Public view; drafts are indistinguishable from missing seminars.
    pub async fn get_public(
        state: &AppState,
        tenant: &TenantConfig,
        id: &str,
    ) -> AppResult<Seminar> {
        let (_, seminar) = Self::get(state, tenant, id).await?;
        if seminar.status == SeminarStatus::Draft {
            return Err(seminar_not_found());
        }
        Ok(seminar)
    }

    /// Validate, create the per-seminar spreadsheet, create the calendar event
    /// (best effort, online/hybrid only) and append the master row.
    pub async fn create(
        state: &AppState,
        tenant: &TenantConfig,
        input: NewSeminar,
    ) -> AppResult<Seminar> {
        let now = Utc::now().to_rfc3339();
        let mut seminar = Seminar {
            id: Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            date: input.date.trim().to_string(),
            end_time: input.end_time.trim().to_string(),
            capacity: input.capacity,
            current_bookings: 0,
            speaker: input.speaker.trim().to_string(),
            speaker_title: input.speaker_title.trim().to_string(),
            speaker_reference_url: input.speaker_reference_url.trim().to_string(),
            meeting_url: input.meeting_url.trim().to_string(),
            calendar_event_id: String::new(),
            status: if input.publish {
                SeminarStatus::Published
            } else {
                SeminarStatus::Draft
            },
            format: input.format.unwrap_or(SeminarFormat::Online),
            target: input.target.unwrap_or(SeminarTarget::Public),
            invitation_code: input.invitation_code.trim().to_string(),
            image_url: input.image_url.trim().to_string(),
            spreadsheet_id: String::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        validate_seminar(&seminar)?;

        let mut sheet_specs = vec![ReservationRepository::sheet_spec()];
        sheet_specs.extend(SurveyRepository::sheet_specs());
        seminar.spreadsheet_id = state
            .sheets
            .create_spreadsheet(
                &format!("{} ({})", seminar.title, seminar.id),
                tenant.drive_folder_id.as_deref(),
                &sheet_specs,
            )
            .await?;

        if seminar.format.has_online_part() {
            Self::sync_calendar(state, &mut seminar).await;
        }

        SeminarRepository::insert(state.sheets.as_ref(), &tenant.master_spreadsheet_id, &seminar)
            .await?;

        tracing::info!(
            "Created seminar {} ({}) for tenant {}",
            seminar.id,
            seminar.status.as_str(),
            tenant.key
        );
        Ok(seminar)
    }

    pub async fn update(
        state: &AppState,
        tenant: &TenantConfig,
        id: &str,
        patch: SeminarPatch,
    ) -> AppResult<Seminar> {
        let (row, mut seminar) = Self::get(state, tenant, id).await?;
        if matches!(seminar.status, SeminarStatus::Cancelled | SeminarStatus::Completed) {
            return Err(AppError::Conflict(t("seminar.cannot_edit")));
        }

        if let Some(title) = patch.title {
            seminar.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            seminar.description = description;
        }
        if let Some(date) = patch.date {
            seminar.date = date.trim().to_string();
        }
        if let Some(end_time) = patch.end_time {
            seminar.end_time = end_time.trim().to_string();
        }
        if let Some(capacity) = patch.capacity {
            if capacity < seminar.current_bookings {
                return Err(AppError::Validation(t_with(
                    "validation.capacity_below_bookings",
                    &[("count", seminar.current_bookings.to_string().as_str())],
                )));
            }
            seminar.capacity = capacity;
        }
        if let Some(speaker) = patch.speaker {
            seminar.speaker = speaker.trim().to_string();
        }
        if let Some(speaker_title) = patch.speaker_title {
            seminar.speaker_title = speaker_title.trim().to_string();
        }
        if let Some(url) = patch.speaker_reference_url {
            seminar.speaker_reference_url = url.trim().to_string();
        }
        if let Some(url) = patch.meeting_url {
            seminar.meeting_url = url.trim().to_string();
        }
        if let Some(format) = patch.format {
            seminar.format = format;
        }
        if let Some(target) = patch.target {
            seminar.target = target;
        }
        if let Some(code) = patch.invitation_code {
            seminar.invitation_code = code.trim().to_string();
        }
        if let Some(url) = patch.image_url {
            seminar.image_url = url.trim().to_string();
        }
        validate_seminar(&seminar)?;

        if seminar.format.has_online_part() || !seminar.calendar_event_id.is_empty() {
            Self::sync_calendar(state, &mut seminar).await;
        }

        seminar.updated_at = Utc::now().to_rfc3339();
        SeminarRepository::update(
            state.sheets.as_ref(),
            &tenant.master_spreadsheet_id,
            row,
            &seminar,
        )
        .await?;

        tracing::info!("Updated seminar {}", seminar.id);
        Ok(seminar)
    }

    /// Create or patch the calendar event. Failures are logged and the seminar
    /// keeps whatever event id and meeting link it had.
    async fn sync_calendar(state: &AppState, seminar: &mut Seminar) {
        let Some(input) = CalendarEventInput::from_seminar(seminar) else {
            return;
        };

        let result = if seminar.calendar_event_id.is_empty() {
            state.calendar.create_event(&input).await
        } else {
            state.calendar.update_event(&seminar.calendar_event_id, &input).await
        };

        match result {
            Ok(event) => {
                seminar.calendar_event_id = event.event_id;
                if seminar.meeting_url.is_empty() && !event.meeting_url.is_empty() {
                    seminar.meeting_url = event.meeting_url;
                }
            }
            Err(e) => tracing::warn!(
                "Calendar sync failed for seminar {}: {:?}",
                seminar.id,
                e
            ),
        }
    }

    async fn set_status(
        state: &AppState,
        tenant: &TenantConfig,
        row: usize,
        seminar: &mut Seminar,
        status: SeminarStatus,
    ) -> AppResult<()> {
        seminar.status = status;
        seminar.updated_at = Utc::now().to_rfc3339();
        SeminarRepository::update(
            state.sheets.as_ref(),
            &tenant.master_spreadsheet_id,
            row,
            seminar,
        )
        .await?;
        tracing::info!("Seminar {} is now {}", seminar.id, status.as_str());
        Ok(())
    }

    /// Draft -> published. Publishing twice is a no-op.
    pub async fn publish(state: &AppState, tenant: &TenantConfig, id: &str) -> AppResult<Seminar> {
        let (row, mut seminar) = Self::get(state, tenant, id).await?;
        match seminar.status {
            SeminarStatus::Published => Ok(seminar),
            SeminarStatus::Draft => {
                Self::set_status(state, tenant, row, &mut seminar, SeminarStatus::Published).await?;
                Ok(seminar)
            }
            SeminarStatus::Cancelled | SeminarStatus::Completed => {
                Err(AppError::Conflict(t("seminar.cannot_publish")))
            }
        }
    }

    /// Published -> completed. Opens post-event surveys.
    pub async fn complete(state: &AppState, tenant: &TenantConfig, id: &str) -> AppResult<Seminar> {
        let (row, mut seminar) = Self::get(state, tenant, id).await?;
        if seminar.status != SeminarStatus::Published {
            return Err(AppError::Conflict(t("seminar.cannot_complete")));
        }
        Self::set_status(state, tenant, row, &mut seminar, SeminarStatus::Completed).await?;
        Ok(seminar)
    }

    /// Soft-cancel: flip the status, then delete the calendar event and tell
    /// every confirmed attendee, both best-effort. Returns the number of
    /// attendees an email was attempted for.
    pub async fn cancel(
        state: &AppState,
        tenant: &TenantConfig,
        id: &str,
    ) -> AppResult<(Seminar, usize)> {
        let (row, mut seminar) = Self::get(state, tenant, id).await?;
        match seminar.status {
            SeminarStatus::Cancelled => {
                return Err(AppError::Conflict(t("seminar.already_cancelled")))
            }
            SeminarStatus::Completed => {
                return Err(AppError::Conflict(t("seminar.cannot_cancel")))
            }
            SeminarStatus::Draft | SeminarStatus::Published => {}
        }
        Self::set_status(state, tenant, row, &mut seminar, SeminarStatus::Cancelled).await?;

        if !seminar.calendar_event_id.is_empty() {
            match state.calendar.delete_event(&seminar.calendar_event_id).await {
                Ok(()) => {
                    seminar.calendar_event_id.clear();
                    if let Err(e) = SeminarRepository::update(
                        state.sheets.as_ref(),
                        &tenant.master_spreadsheet_id,
                        row,
                        &seminar,
                    )
                    .await
                    {
                        tracing::warn!(
                            "Failed to clear calendar event of seminar {}: {:?}",
                            seminar.id,
                            e
                        );
                    }
                }
                Err(e) => tracing::warn!(
                    "Failed to delete calendar event {} for seminar {}: {:?}",
                    seminar.calendar_event_id,
                    seminar.id,
                    e
                ),
            }
        }

        let attendees = if seminar.spreadsheet_id.is_empty() {
            Vec::new()
        } else {
            let listed =
                ReservationRepository::list(state.sheets.as_ref(), &seminar.spreadsheet_id).await;
            match listed {
                Ok(list) => list.into_iter().filter(|r| r.is_confirmed()).collect(),
                Err(e) => {
                    tracing::warn!(
                        "Failed to read attendees of cancelled seminar {}: {:?}",
                        seminar.id,
                        e
                    );
                    Vec::new()
                }
            }
        };

        let notified = attendees.len();
        stream::iter(attendees)
            .for_each_concurrent(NOTIFY_CONCURRENCY, |reservation| {
                let seminar = &seminar;
                async move {
                    BookingService::notify(
                        state,
                        tenant,
                        ReservationEmail::SeminarCancelled,
                        seminar,
                        &reservation,
                        DEFAULT_LANG,
                    )
                    .await;
                }
            })
            .await;

        tracing::info!("Notified {} attendees of cancelled seminar {}", notified, seminar.id);
        Ok((seminar, notified))
    }

    /// Read-only comparison of the counter against the reservation rows.
    pub async fn stats(
        state: &AppState,
        tenant: &TenantConfig,
        id: &str,
    ) -> AppResult<SeminarStats> {
        let (_, seminar) = Self::get(state, tenant, id).await?;
        let reservations = if seminar.spreadsheet_id.is_empty() {
            Vec::new()
        } else {
            ReservationRepository::list(state.sheets.as_ref(), &seminar.spreadsheet_id).await?
        };

        let confirmed = count(&reservations, |r| r.is_confirmed());

        Ok(SeminarStats {
            seminar_id: seminar.id.clone(),
            capacity: seminar.capacity,
            current_bookings: seminar.current_bookings,
            remaining_seats: seminar.remaining_seats(),
            confirmed,
            cancelled: count(&reservations, |r| r.status == ReservationStatus::Cancelled),
            venue: count(&reservations, |r| {
                r.is_confirmed() && r.participation_method == Some(ParticipationMethod::Venue)
            }),
            online: count(&reservations, |r| {
                r.is_confirmed() && r.participation_method == Some(ParticipationMethod::Online)
            }),
            pre_survey_completed: count(&reservations, |r| r.pre_survey_completed),
            post_survey_completed: count(&reservations, |r| r.post_survey_completed),
            counter_drift: seminar.current_bookings - confirmed,
        })
    }
}
