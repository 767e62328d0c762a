use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::DateTime;
use handlebars::Handlebars;
use reqwest::Client;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::db::models::{ParticipationMethod, Reservation, Seminar};
use crate::error::{AppError, AppResult};
use crate::i18n::tr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Transactional email collaborator.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Resend-compatible `POST /emails` API.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
    reply_to: Option<String>,
}

impl HttpMailer {
    pub fn new(client: Client, config: &EmailConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            reply_to: config.reply_to.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("Email API not configured".to_string()))?;

        let request = SendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            reply_to: self.reply_to.as_deref(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!(
                "Email API error ({}): {}",
                status, error_text
            )));
        }

        tracing::debug!("Email '{}' sent to {}", message.subject, message.to);
        Ok(())
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Which attendee notification to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationEmail {
    Confirmation,
    Update,
    Cancellation,
    SeminarCancelled,
}

impl ReservationEmail {
    fn key(self) -> &'static str {
        match self {
            ReservationEmail::Confirmation => "email.confirmation",
            ReservationEmail::Update => "email.update",
            ReservationEmail::Cancellation => "email.cancellation",
            ReservationEmail::SeminarCancelled => "email.seminar_cancelled",
        }
    }

    /// Only active reservations get the join link and the self-service link.
    fn is_active(self) -> bool {
        matches!(self, ReservationEmail::Confirmation | ReservationEmail::Update)
    }
}

/// Everything a template needs beyond the records themselves.
#[derive(Debug, Clone)]
pub struct EmailContext<'a> {
    pub lang: &'a str,
    pub organizer: &'a str,
    pub manage_url: &'a str,
}

/// `2026-11-20T14:00:00+09:00` -> `2026/11/20 14:00`, in the seminar's own offset.
fn display_time(seminar: &Seminar) -> String {
    let Some(start) = seminar.starts_at() else {
        return seminar.date.clone();
    };
    let mut out = start.format("%Y/%m/%d %H:%M").to_string();
    if let Ok(end) = DateTime::parse_from_rfc3339(&seminar.end_time) {
        out.push_str(&end.format(" - %H:%M").to_string());
    }
    out
}

const RESERVATION_TEMPLATE: &str = "reservation";

const RESERVATION_HTML: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family:sans-serif;line-height:1.6">
<p>{{greeting}}</p>
<p>{{body}}</p>
<table>
{{#each rows}}
<tr>
<th style="text-align:left;padding:4px 12px 4px 0;white-space:nowrap">{{label}}</th>
<td style="padding:4px 0">
{{#if link}}<a href="{{value}}">{{value}}</a>
{{else}}{{#if strong}}<strong>{{value}}</strong>{{else}}{{value}}{{/if}}{{/if}}
</td>
</tr>
{{/each}}
</table>
{{#if manage_url}}
<p>{{manage_hint}}<br><a href="{{manage_url}}">{{manage_url}}</a></p>
{{/if}}
<hr>
<p style="color:#666;font-size:12px">{{organizer}}<br>{{footer}}</p>
</body>
</html>"#;

static TEMPLATES: OnceLock<Result<Handlebars<'static>, String>> = OnceLock::new();

fn build_templates() -> Result<Handlebars<'static>, String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(|value| html_escape::encode_safe(value).into_owned());
    handlebars
        .register_template_string(RESERVATION_TEMPLATE, RESERVATION_HTML)
        .map_err(|e| e.to_string())?;
    Ok(handlebars)
}

fn templates() -> AppResult<&'static Handlebars<'static>> {
    TEMPLATES
        .get_or_init(build_templates)
        .as_ref()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid email template: {}", e)))
}

#[derive(Debug, Serialize)]
struct TemplateRow {
    label: String,
    value: String,
    strong: bool,
    link: bool,
}

impl TemplateRow {
    fn text(label: String, value: String) -> Self {
        Self {
            label,
            value,
            strong: false,
            link: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReservationTemplate<'a> {
    greeting: String,
    body: String,
    rows: Vec<TemplateRow>,
    manage_hint: String,
    manage_url: Option<&'a str>,
    organizer: &'a str,
    footer: String,
}

pub fn render_reservation_email(
    kind: ReservationEmail,
    seminar: &Seminar,
    reservation: &Reservation,
    ctx: &EmailContext<'_>,
) -> AppResult<EmailMessage> {
    let lang = Some(ctx.lang);
    let key = kind.key();

    let subject = tr(
        lang,
        &format!("{}.subject", key),
        Some(&[("title", seminar.title.as_str())]),
    );

    let mut rows = vec![
        TemplateRow::text(tr(lang, "email.label.seminar", None), seminar.title.clone()),
        TemplateRow::text(tr(lang, "email.label.date", None), display_time(seminar)),
        TemplateRow {
            strong: true,
            ..TemplateRow::text(
                tr(lang, "email.label.number", None),
                reservation.reservation_number.clone(),
            )
        },
    ];

    if let Some(method) = reservation.participation_method {
        let label = match method {
            ParticipationMethod::Venue => tr(lang, "email.method.venue", None),
            ParticipationMethod::Online => tr(lang, "email.method.online", None),
        };
        rows.push(TemplateRow::text(tr(lang, "email.label.method", None), label));

        if kind.is_active()
            && method == ParticipationMethod::Online
            && !seminar.meeting_url.is_empty()
        {
            rows.push(TemplateRow {
                link: true,
                ..TemplateRow::text(
                    tr(lang, "email.label.meeting_url", None),
                    seminar.meeting_url.clone(),
                )
            });
        }
    }

    let data = ReservationTemplate {
        greeting: tr(
            lang,
            "email.greeting",
            Some(&[("name", reservation.name.as_str())]),
        ),
        body: tr(lang, &format!("{}.body", key), None),
        rows,
        manage_hint: tr(lang, "email.manage_hint", None),
        manage_url: (kind.is_active() && !ctx.manage_url.is_empty()).then_some(ctx.manage_url),
        organizer: ctx.organizer,
        footer: tr(lang, "email.footer", None),
    };

    let html = templates()?
        .render(RESERVATION_TEMPLATE, &data)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to render email: {}", e)))?;

    Ok(EmailMessage {
        to: reservation.email.clone(),
        subject,
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::reservation::sample_reservation;
    use crate::db::models::seminar::sample_seminar;
    use html_escape::encode_safe;

    fn ctx() -> EmailContext<'static> {
        EmailContext {
            lang: "en",
            organizer: "Example Seminars",
            manage_url: "https://seminars.example.com/reservations",
        }
    }

    #[test]
    fn confirmation_includes_number_link_and_meeting_url() {
        let message = render_reservation_email(
            ReservationEmail::Confirmation,
            &sample_seminar(),
            &sample_reservation(),
            &ctx(),
        )
        .unwrap();
        assert_eq!(message.to, "kenji@example.com");
        assert_eq!(message.subject, "Booking confirmed: Rust for Operators");
        assert!(message.html.contains("3F2A9C1E-K7QX2M"));
        assert!(message
            .html
            .contains(&*encode_safe("https://meet.example.com/abc-defg-hij")));
        assert!(message
            .html
            .contains(&*encode_safe("https://seminars.example.com/reservations")));
        assert!(message.html.contains(&*encode_safe("2026/11/20 14:00 - 16:00")));
    }

    #[test]
    fn cancellation_omits_meeting_url_and_manage_link() {
        let message = render_reservation_email(
            ReservationEmail::Cancellation,
            &sample_seminar(),
            &sample_reservation(),
            &ctx(),
        )
        .unwrap();
        assert!(!message.html.contains("meet.example.com"));
        assert!(!message.html.contains("seminars.example.com"));
        assert!(message.html.contains("3F2A9C1E-K7QX2M"));
    }

    #[test]
    fn venue_attendees_do_not_get_meeting_url() {
        let reservation = Reservation {
            participation_method: Some(ParticipationMethod::Venue),
            ..sample_reservation()
        };
        let message = render_reservation_email(
            ReservationEmail::Confirmation,
            &sample_seminar(),
            &reservation,
            &ctx(),
        )
        .unwrap();
        assert!(!message.html.contains("meet.example.com"));
    }

    #[test]
    fn user_input_is_escaped() {
        let reservation = Reservation {
            name: "<script>alert(1)</script>".to_string(),
            ..sample_reservation()
        };
        let message = render_reservation_email(
            ReservationEmail::Update,
            &sample_seminar(),
            &reservation,
            &ctx(),
        )
        .unwrap();
        assert!(!message.html.contains("<script>"));
        assert!(message.html.contains(&*encode_safe("<script>alert(1)</script>")));
    }

    #[test]
    fn seminar_fields_are_escaped() {
        let seminar = Seminar {
            title: "Ops & \"SRE\" <Live>".to_string(),
            meeting_url: "https://meet.example.com/x?a=1&b=\"2\"".to_string(),
            ..sample_seminar()
        };
        let message = render_reservation_email(
            ReservationEmail::Confirmation,
            &seminar,
            &sample_reservation(),
            &EmailContext {
                organizer: "<Org>",
                ..ctx()
            },
        )
        .unwrap();
        assert!(!message.html.contains("<Live>"));
        assert!(!message.html.contains("<Org>"));
        assert!(message.html.contains(&*encode_safe("Ops & \"SRE\" <Live>")));
        assert!(message
            .html
            .contains(&format!("href=\"{}\"", encode_safe(&seminar.meeting_url))));
        // Subjects are plain text.
        assert_eq!(message.subject, "Booking confirmed: Ops & \"SRE\" <Live>");
    }

    #[test]
    fn default_language_is_japanese() {
        let message = render_reservation_email(
            ReservationEmail::Confirmation,
            &sample_seminar(),
            &sample_reservation(),
            &EmailContext { lang: "ja", ..ctx() },
        )
        .unwrap();
        assert_eq!(message.subject, "【予約確定】Rust for Operators");
    }
}
