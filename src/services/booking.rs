use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{Config, TenantConfig, DEFAULT_TENANT};
use crate::db::models::member_domain::{is_member_email, normalize_domain};
use crate::db::models::reservation::{generate_reservation_number, reservation_number_prefix};
use crate::db::models::{
    ParticipationMethod, PublicSeminar, Reservation, ReservationStatus, Seminar, SeminarFormat,
    SeminarStatus, SeminarTarget,
};
use crate::db::{MemberDomainRepository, ReservationRepository, SeminarRepository};
use crate::error::{AppError, AppResult};
use crate::i18n::{resolve_language, tr};
use crate::services::email::{render_reservation_email, EmailContext, ReservationEmail};
use crate::AppState;

const MAX_FIELD_CHARS: usize = 200;
const MAX_NOTE_CHARS: usize = 2000;
const MAX_EMAIL_CHARS: usize = 254;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookingRequest {
    pub name: String,
    pub email: String,
    pub company: String,
    pub department: String,
    pub phone: String,
    pub participation_method: Option<String>,
    pub invitation_code: Option<String>,
    pub note: String,
    pub lang: Option<String>,
}

/// Attendee self-service change. `email` authenticates the request and cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReservationEdit {
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub participation_method: Option<String>,
    pub note: Option<String>,
    pub lang: Option<String>,
}

/// A reservation as shown back to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationView {
    pub reservation: Reservation,
    pub seminar: PublicSeminar,
    /// Join link, only for confirmed online participation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_url: Option<String>,
}

impl ReservationView {
    pub fn new(seminar: &Seminar, reservation: Reservation) -> Self {
        let meeting_url = (reservation.is_confirmed()
            && reservation.participation_method == Some(ParticipationMethod::Online)
            && !seminar.meeting_url.is_empty())
        .then(|| seminar.meeting_url.clone());

        Self {
            reservation,
            seminar: PublicSeminar::from(seminar),
            meeting_url,
        }
    }
}

/// A reservation together with its seminar and both sheet rows.
#[derive(Debug, Clone)]
pub struct LocatedReservation {
    pub seminar_row: usize,
    pub seminar: Seminar,
    pub row: usize,
    pub reservation: Reservation,
}

// ============================================================================
// Validation
// ============================================================================

fn msg(lang: &str, key: &str) -> String {
    tr(Some(lang), key, None)
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_CHARS || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !local.contains('@') && normalize_domain(domain).is_some()
        }
        None => false,
    }
}

fn check_length(value: &str, max: usize, field: &str, lang: &str) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(tr(
            Some(lang),
            "validation.too_long",
            Some(&[("field", field)]),
        )));
    }
    Ok(())
}

fn validate_reservation(reservation: &Reservation, lang: &str) -> AppResult<()> {
    if reservation.name.is_empty() {
        return Err(AppError::Validation(msg(lang, "validation.name_required")));
    }
    if !is_valid_email(&reservation.email) {
        return Err(AppError::Validation(msg(lang, "validation.email_invalid")));
    }
    check_length(&reservation.name, MAX_FIELD_CHARS, "name", lang)?;
    check_length(&reservation.company, MAX_FIELD_CHARS, "company", lang)?;
    check_length(&reservation.department, MAX_FIELD_CHARS, "department", lang)?;
    check_length(&reservation.phone, MAX_FIELD_CHARS, "phone", lang)?;
    check_length(&reservation.note, MAX_NOTE_CHARS, "note", lang)?;
    Ok(())
}

/// Single-format seminars only accept their own method; hybrid seminars accept
/// either and default to online.
pub fn resolve_method(
    format: SeminarFormat,
    requested: Option<&str>,
    lang: &str,
) -> AppResult<ParticipationMethod> {
    let invalid = || AppError::Validation(msg(lang, "validation.participation_method"));

    let requested = match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(ParticipationMethod::from_str(raw).ok_or_else(invalid)?),
        None => None,
    };

    match (format, requested) {
        (SeminarFormat::Venue, None | Some(ParticipationMethod::Venue)) => {
            Ok(ParticipationMethod::Venue)
        }
        (SeminarFormat::Online, None | Some(ParticipationMethod::Online)) => {
            Ok(ParticipationMethod::Online)
        }
        (SeminarFormat::Hybrid, Some(method)) => Ok(method),
        (SeminarFormat::Hybrid, None) => Ok(ParticipationMethod::Online),
        _ => Err(invalid()),
    }
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// Self-service page link included in attendee emails.
pub fn manage_url(config: &Config, tenant: &TenantConfig, number: &str) -> String {
    let base = config.server.public_base_url.trim_end_matches('/');
    let scope = if tenant.key == DEFAULT_TENANT {
        String::new()
    } else {
        format!("/t/{}", tenant.key)
    };
    format!(
        "{}{}/reservations?number={}",
        base,
        scope,
        urlencoding::encode(number)
    )
}

// ============================================================================
// Booking Service
// ============================================================================

pub struct BookingService;

impl BookingService {
    /// Book a seat: append the reservation row, bump the master counter, then
    /// send the confirmation email best-effort.
    pub async fn book(
        state: &AppState,
        tenant: &TenantConfig,
        seminar_id: &str,
        request: BookingRequest,
    ) -> AppResult<ReservationView> {
        let lang = resolve_language(request.lang.as_deref());
        let sheets = state.sheets.as_ref();
        let master = &tenant.master_spreadsheet_id;

        let (seminar_row, mut seminar) = SeminarRepository::find_by_id(sheets, master, seminar_id)
            .await?
            .ok_or_else(|| AppError::NotFound(msg(lang, "booking.seminar_not_found")))?;

        if seminar.status != SeminarStatus::Published {
            return Err(AppError::Conflict(msg(lang, "booking.not_open")));
        }

        let method = resolve_method(seminar.format, request.participation_method.as_deref(), lang)?;
        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            name: trimmed(&request.name),
            email: trimmed(&request.email),
            company: trimmed(&request.company),
            department: trimmed(&request.department),
            phone: trimmed(&request.phone),
            status: ReservationStatus::Confirmed,
            pre_survey_completed: false,
            post_survey_completed: false,
            reservation_number: generate_reservation_number(&seminar.id),
            participation_method: Some(method),
            created_at: Utc::now().to_rfc3339(),
            note: trimmed(&request.note),
        };
        validate_reservation(&reservation, lang)?;

        if seminar.is_full() {
            return Err(AppError::Conflict(msg(lang, "booking.full")));
        }

        if seminar.target == SeminarTarget::MembersOnly {
            let code_ok = !seminar.invitation_code.is_empty()
                && request.invitation_code.as_deref().map(str::trim)
                    == Some(seminar.invitation_code.as_str());

            if !code_ok {
                let domains = MemberDomainRepository::list(sheets, master).await?;
                if !is_member_email(&reservation.email, &domains) {
                    tracing::debug!(
                        "Rejected non-member booking for members-only seminar {}",
                        seminar.id
                    );
                    return Err(AppError::Forbidden(msg(lang, "booking.members_only")));
                }
            }
        }

        if seminar.spreadsheet_id.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Seminar {} has no reservation spreadsheet",
                seminar.id
            )));
        }

        let duplicate = ReservationRepository::find_confirmed_by_email(
            sheets,
            &seminar.spreadsheet_id,
            &reservation.email,
        )
        .await?;
        if duplicate.is_some() {
            return Err(AppError::Conflict(msg(lang, "booking.duplicate")));
        }

        ReservationRepository::insert(sheets, &seminar.spreadsheet_id, &reservation).await?;
        SeminarRepository::set_current_bookings(
            sheets,
            master,
            seminar_row,
            seminar.current_bookings + 1,
        )
        .await?;
        seminar.current_bookings += 1;

        tracing::info!(
            "Booked {} for seminar {} ({}/{})",
            reservation.reservation_number,
            seminar.id,
            seminar.current_bookings,
            seminar.capacity
        );

        Self::notify(
            state,
            tenant,
            ReservationEmail::Confirmation,
            &seminar,
            &reservation,
            lang,
        )
        .await;

        Ok(ReservationView::new(&seminar, reservation))
    }

    /// Locate a reservation by number and owner email.
    ///
    /// Malformed numbers, unknown seminars, unknown numbers and email mismatches
    /// all produce the same 404.
    pub async fn find_reservation(
        state: &AppState,
        tenant: &TenantConfig,
        number: &str,
        email: &str,
        lang: &str,
    ) -> AppResult<LocatedReservation> {
        let not_found = || AppError::NotFound(msg(lang, "reservation.not_found"));
        let sheets = state.sheets.as_ref();

        let prefix = reservation_number_prefix(number).ok_or_else(not_found)?;
        let (seminar_row, seminar) =
            SeminarRepository::find_by_number_prefix(sheets, &tenant.master_spreadsheet_id, &prefix)
                .await?
                .ok_or_else(not_found)?;
        if seminar.spreadsheet_id.is_empty() {
            return Err(not_found());
        }

        let (row, reservation) =
            ReservationRepository::find_by_number(sheets, &seminar.spreadsheet_id, number)
                .await?
                .ok_or_else(not_found)?;

        if !reservation.email_matches(email) {
            tracing::debug!("Reservation lookup for {} with mismatched email", number.trim());
            return Err(not_found());
        }

        Ok(LocatedReservation {
            seminar_row,
            seminar,
            row,
            reservation,
        })
    }

    pub async fn lookup(
        state: &AppState,
        tenant: &TenantConfig,
        number: &str,
        email: &str,
        lang: Option<&str>,
    ) -> AppResult<ReservationView> {
        let lang = resolve_language(lang);
        let located = Self::find_reservation(state, tenant, number, email, lang).await?;
        Ok(ReservationView::new(&located.seminar, located.reservation))
    }

    pub async fn edit(
        state: &AppState,
        tenant: &TenantConfig,
        number: &str,
        edit: ReservationEdit,
    ) -> AppResult<ReservationView> {
        let lang = resolve_language(edit.lang.as_deref());
        let LocatedReservation {
            seminar,
            row,
            mut reservation,
            ..
        } = Self::find_reservation(state, tenant, number, &edit.email, lang).await?;

        if !reservation.is_confirmed()
            || matches!(seminar.status, SeminarStatus::Cancelled | SeminarStatus::Completed)
        {
            return Err(AppError::Conflict(msg(lang, "reservation.not_editable")));
        }

        if let Some(name) = edit.name {
            reservation.name = trimmed(&name);
        }
        if let Some(company) = edit.company {
            reservation.company = trimmed(&company);
        }
        if let Some(department) = edit.department {
            reservation.department = trimmed(&department);
        }
        if let Some(phone) = edit.phone {
            reservation.phone = trimmed(&phone);
        }
        if let Some(note) = edit.note {
            reservation.note = trimmed(&note);
        }
        if let Some(method) = edit.participation_method.as_deref() {
            reservation.participation_method =
                Some(resolve_method(seminar.format, Some(method), lang)?);
        }
        validate_reservation(&reservation, lang)?;

        ReservationRepository::update(
            state.sheets.as_ref(),
            &seminar.spreadsheet_id,
            row,
            &reservation,
        )
        .await?;
        tracing::info!("Updated reservation {}", reservation.reservation_number);

        Self::notify(state, tenant, ReservationEmail::Update, &seminar, &reservation, lang).await;

        Ok(ReservationView::new(&seminar, reservation))
    }

    /// Attendee self-cancel.
    pub async fn cancel_by_number(
        state: &AppState,
        tenant: &TenantConfig,
        number: &str,
        email: &str,
        lang: Option<&str>,
    ) -> AppResult<ReservationView> {
        let lang = resolve_language(lang);
        let located = Self::find_reservation(state, tenant, number, email, lang).await?;
        let (seminar, reservation) = Self::cancel_located(state, tenant, located, lang).await?;
        Ok(ReservationView::new(&seminar, reservation))
    }

    /// Organizer-initiated cancel of a single reservation.
    pub async fn admin_cancel(
        state: &AppState,
        tenant: &TenantConfig,
        seminar_id: &str,
        reservation_id: &str,
    ) -> AppResult<Reservation> {
        let lang = resolve_language(None);
        let sheets = state.sheets.as_ref();

        let (seminar_row, seminar) =
            SeminarRepository::find_by_id(sheets, &tenant.master_spreadsheet_id, seminar_id)
                .await?
                .ok_or_else(|| AppError::NotFound(msg(lang, "seminar.not_found")))?;

        let (row, reservation) =
            ReservationRepository::find_by_id(sheets, &seminar.spreadsheet_id, reservation_id)
                .await?
                .ok_or_else(|| AppError::NotFound(msg(lang, "reservation.not_found")))?;

        let located = LocatedReservation {
            seminar_row,
            seminar,
            row,
            reservation,
        };
        let (_, reservation) = Self::cancel_located(state, tenant, located, lang).await?;
        Ok(reservation)
    }

    /// Flip the status, decrement the counter (never below zero), then send the
    /// cancellation email best-effort. A second cancel is rejected so the counter
    /// is decremented once per reservation.
    async fn cancel_located(
        state: &AppState,
        tenant: &TenantConfig,
        located: LocatedReservation,
        lang: &str,
    ) -> AppResult<(Seminar, Reservation)> {
        let LocatedReservation {
            seminar_row,
            mut seminar,
            row,
            mut reservation,
        } = located;
        let sheets = state.sheets.as_ref();

        if !reservation.is_confirmed() {
            return Err(AppError::Conflict(msg(lang, "reservation.already_cancelled")));
        }

        ReservationRepository::set_status(
            sheets,
            &seminar.spreadsheet_id,
            row,
            ReservationStatus::Cancelled,
        )
        .await?;
        reservation.status = ReservationStatus::Cancelled;

        let remaining = (seminar.current_bookings - 1).max(0);
        SeminarRepository::set_current_bookings(
            sheets,
            &tenant.master_spreadsheet_id,
            seminar_row,
            remaining,
        )
        .await?;
        seminar.current_bookings = remaining;

        tracing::info!(
            "Cancelled reservation {} for seminar {} ({}/{})",
            reservation.reservation_number,
            seminar.id,
            seminar.current_bookings,
            seminar.capacity
        );

        Self::notify(
            state,
            tenant,
            ReservationEmail::Cancellation,
            &seminar,
            &reservation,
            lang,
        )
        .await;

        Ok((seminar, reservation))
    }

    pub async fn list_reservations(
        state: &AppState,
        tenant: &TenantConfig,
        seminar_id: &str,
    ) -> AppResult<Vec<Reservation>> {
        let sheets = state.sheets.as_ref();
        let (_, seminar) =
            SeminarRepository::find_by_id(sheets, &tenant.master_spreadsheet_id, seminar_id)
                .await?
                .ok_or_else(|| AppError::NotFound(tr(None, "seminar.not_found", None)))?;
        if seminar.spreadsheet_id.is_empty() {
            return Ok(Vec::new());
        }
        ReservationRepository::list(sheets, &seminar.spreadsheet_id).await
    }

    /// Render and send an attendee email. Failures are logged and swallowed.
    pub async fn notify(
        state: &AppState,
        tenant: &TenantConfig,
        kind: ReservationEmail,
        seminar: &Seminar,
        reservation: &Reservation,
        lang: &str,
    ) {
        let manage_url = manage_url(&state.config, tenant, &reservation.reservation_number);
        let rendered = render_reservation_email(
            kind,
            seminar,
            reservation,
            &EmailContext {
                lang,
                organizer: &tenant.name,
                manage_url: &manage_url,
            },
        );
        let message = match rendered {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Failed to render {:?} email: {:?}", kind, e);
                return;
            }
        };

        if let Err(e) = state.mailer.send(message).await {
            tracing::warn!(
                "Failed to send {:?} email for reservation {}: {:?}",
                kind,
                reservation.reservation_number,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::seminar::sample_seminar;
    use crate::services::testing::{Harness, MASTER_ID};

    fn tenant(h: &Harness) -> TenantConfig {
        h.state.config.tenants.get(DEFAULT_TENANT).unwrap().clone()
    }

    fn request(email: &str) -> BookingRequest {
        BookingRequest {
            name: "Kenji Sato".to_string(),
            email: email.to_string(),
            company: "Example KK".to_string(),
            ..Default::default()
        }
    }

    fn seeded(seminar: Seminar) -> (Harness, Seminar) {
        let h = Harness::new();
        h.seed_seminar(&seminar);
        (h, seminar)
    }

    #[tokio::test]
    async fn booking_increments_counter_by_one_and_sends_confirmation() {
        let (h, seminar) = seeded(sample_seminar());

        let view =
            BookingService::book(&h.state, &tenant(&h), &seminar.id, request("a@example.com"))
                .await
                .unwrap();

        assert_eq!(h.seminar(&seminar.id).unwrap().current_bookings, 5);
        assert_eq!(view.seminar.current_bookings, 5);

        let rows = h.sheets.rows("sheet-1", "reservations");
        assert_eq!(rows.len(), 2);
        let stored = Reservation::from_row(&rows[1]);
        assert!(stored.is_confirmed());
        assert_eq!(stored.name, "Kenji Sato");
        assert!(stored.reservation_number.starts_with("3F2A9C1E-"));
        assert_eq!(stored.participation_method, Some(ParticipationMethod::Online));
        assert!(!stored.created_at.is_empty());

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@example.com");
        assert!(sent[0].html.contains(&stored.reservation_number));
    }

    #[tokio::test]
    async fn full_or_unpublished_seminars_reject_bookings() {
        let (h, full) = seeded(Seminar {
            current_bookings: 30,
            ..sample_seminar()
        });
        let err = BookingService::book(&h.state, &tenant(&h), &full.id, request("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(h.seminar(&full.id).unwrap().current_bookings, 30);

        let (h, draft) = seeded(Seminar {
            status: SeminarStatus::Draft,
            ..sample_seminar()
        });
        let err = BookingService::book(&h.state, &tenant(&h), &draft.id, request("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn members_only_requires_member_domain_or_code() {
        let (h, seminar) = seeded(Seminar {
            target: SeminarTarget::MembersOnly,
            invitation_code: "SPRING26".to_string(),
            ..sample_seminar()
        });
        h.seed_member_domain("example.com");
        let tenant = tenant(&h);

        let err = BookingService::book(&h.state, &tenant, &seminar.id, request("x@other.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        BookingService::book(&h.state, &tenant, &seminar.id, request("y@sub.example.com"))
            .await
            .unwrap();

        let with_code = BookingRequest {
            invitation_code: Some(" SPRING26 ".to_string()),
            ..request("z@other.org")
        };
        BookingService::book(&h.state, &tenant, &seminar.id, with_code)
            .await
            .unwrap();

        assert_eq!(h.seminar(&seminar.id).unwrap().current_bookings, 6);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (h, seminar) = seeded(sample_seminar());
        let tenant = tenant(&h);
        BookingService::book(&h.state, &tenant, &seminar.id, request("a@example.com"))
            .await
            .unwrap();
        let err = BookingService::book(&h.state, &tenant, &seminar.id, request("A@Example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(h.seminar(&seminar.id).unwrap().current_bookings, 5);
    }

    #[tokio::test]
    async fn invalid_input_is_a_validation_error() {
        let (h, seminar) = seeded(Seminar {
            format: SeminarFormat::Venue,
            ..sample_seminar()
        });
        let tenant = tenant(&h);

        let err = BookingService::book(&h.state, &tenant, &seminar.id, request("not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let online = BookingRequest {
            participation_method: Some("online".to_string()),
            ..request("a@example.com")
        };
        let err = BookingService::book(&h.state, &tenant, &seminar.id, online)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let nameless = BookingRequest {
            name: "   ".to_string(),
            ..request("a@example.com")
        };
        let err = BookingService::book(&h.state, &tenant, &seminar.id, nameless)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn email_failure_does_not_fail_booking() {
        let (h, seminar) = seeded(sample_seminar());
        h.mailer.fail(true);
        let view =
            BookingService::book(&h.state, &tenant(&h), &seminar.id, request("a@example.com"))
                .await
                .unwrap();
        assert!(view.reservation.is_confirmed());
        assert_eq!(h.seminar(&seminar.id).unwrap().current_bookings, 5);
    }

    #[tokio::test]
    async fn second_cancel_is_rejected_without_double_decrement() {
        let (h, seminar) = seeded(sample_seminar());
        let tenant = tenant(&h);
        let view = BookingService::book(&h.state, &tenant, &seminar.id, request("a@example.com"))
            .await
            .unwrap();
        let number = view.reservation.reservation_number.clone();

        let cancelled =
            BookingService::cancel_by_number(&h.state, &tenant, &number, "a@example.com", None)
                .await
                .unwrap();
        assert_eq!(cancelled.reservation.status, ReservationStatus::Cancelled);
        assert_eq!(h.seminar(&seminar.id).unwrap().current_bookings, 4);

        let err =
            BookingService::cancel_by_number(&h.state, &tenant, &number, "a@example.com", None)
                .await
                .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(h.seminar(&seminar.id).unwrap().current_bookings, 4);
    }

    #[tokio::test]
    async fn counter_never_goes_negative() {
        let (h, seminar) = seeded(Seminar {
            current_bookings: 1,
            ..sample_seminar()
        });
        let tenant = tenant(&h);
        let view = BookingService::book(&h.state, &tenant, &seminar.id, request("a@example.com"))
            .await
            .unwrap();
        // Simulate drift: the counter was reset by hand in the sheet.
        SeminarRepository::set_current_bookings(h.sheets.as_ref(), MASTER_ID, 2, 0)
            .await
            .unwrap();

        BookingService::admin_cancel(&h.state, &tenant, &seminar.id, &view.reservation.id)
            .await
            .unwrap();
        assert_eq!(h.seminar(&seminar.id).unwrap().current_bookings, 0);
    }

    #[tokio::test]
    async fn lookup_requires_matching_email() {
        let (h, seminar) = seeded(sample_seminar());
        let tenant = tenant(&h);
        let view = BookingService::book(&h.state, &tenant, &seminar.id, request("a@example.com"))
            .await
            .unwrap();
        let number = view.reservation.reservation_number.to_lowercase();

        let found = BookingService::lookup(&h.state, &tenant, &number, " A@example.com ", None)
            .await
            .unwrap();
        assert_eq!(found.reservation.id, view.reservation.id);
        assert_eq!(found.meeting_url.as_deref(), Some("https://meet.example.com/abc-defg-hij"));

        for (number, email) in [
            (number.as_str(), "b@example.com"),
            ("3F2A9C1E-ZZZZZZ", "a@example.com"),
            ("FFFFFFFF-ZZZZZZ", "a@example.com"),
            ("garbage", "a@example.com"),
        ] {
            let err = BookingService::lookup(&h.state, &tenant, number, email, None)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn edit_updates_fields_and_notifies() {
        let (h, seminar) = seeded(sample_seminar());
        let tenant = tenant(&h);
        let view = BookingService::book(&h.state, &tenant, &seminar.id, request("a@example.com"))
            .await
            .unwrap();

        let edit = ReservationEdit {
            email: "a@example.com".to_string(),
            name: Some("Kenji S.".to_string()),
            participation_method: Some("venue".to_string()),
            lang: Some("en".to_string()),
            ..Default::default()
        };
        let number = view.reservation.reservation_number.clone();
        let updated = BookingService::edit(&h.state, &tenant, &number, edit)
            .await
            .unwrap();

        assert_eq!(updated.reservation.name, "Kenji S.");
        assert_eq!(updated.meeting_url, None);
        let stored = Reservation::from_row(&h.sheets.rows("sheet-1", "reservations")[1]);
        assert_eq!(stored.participation_method, Some(ParticipationMethod::Venue));
        assert_eq!(stored.company, "Example KK");

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].subject.starts_with("Booking updated"));
    }

    #[test]
    fn hybrid_defaults_to_online() {
        assert_eq!(
            resolve_method(SeminarFormat::Hybrid, None, "en").unwrap(),
            ParticipationMethod::Online
        );
        assert_eq!(
            resolve_method(SeminarFormat::Hybrid, Some("venue"), "en").unwrap(),
            ParticipationMethod::Venue
        );
        assert!(resolve_method(SeminarFormat::Online, Some("venue"), "en").is_err());
        assert!(resolve_method(SeminarFormat::Hybrid, Some("carrier pigeon"), "en").is_err());
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("taro@example.co.jp"));
        assert!(!is_valid_email("taro@localhost"));
        assert!(!is_valid_email("taro example@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@@example.com"));
    }

    #[test]
    fn manage_url_is_tenant_scoped() {
        let config = Config::default();
        let mut tenant = config.tenants.get(DEFAULT_TENANT).unwrap().clone();
        assert_eq!(
            manage_url(&config, &tenant, "3F2A9C1E-K7QX2M"),
            "http://localhost:3000/reservations?number=3F2A9C1E-K7QX2M"
        );
        tenant.key = "acme".to_string();
        assert_eq!(
            manage_url(&config, &tenant, "X-1"),
            "http://localhost:3000/t/acme/reservations?number=X-1"
        );
    }
}
