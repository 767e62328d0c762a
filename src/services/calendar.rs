use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::GoogleConfig;
use crate::db::models::Seminar;
use crate::error::{AppError, AppResult};
use crate::services::google::GoogleAuth;

/// Events without an explicit end time are booked for this long.
const DEFAULT_EVENT_HOURS: i64 = 2;

/// What the calendar needs to know about a seminar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEventInput {
    pub summary: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Ask the calendar to generate a video-conference link.
    pub with_conference: bool,
}

impl CalendarEventInput {
    /// `None` when the seminar date cannot be parsed.
    pub fn from_seminar(seminar: &Seminar) -> Option<Self> {
        let start = seminar.starts_at()?;
        let end = seminar
            .ends_at()
            .filter(|end| *end > start)
            .unwrap_or(start + Duration::hours(DEFAULT_EVENT_HOURS));

        let mut description = seminar.description.clone();
        if !seminar.speaker.is_empty() {
            if !description.is_empty() {
                description.push_str("\n\n");
            }
            description.push_str(&seminar.speaker);
            if !seminar.speaker_title.is_empty() {
                description.push_str(&format!(" ({})", seminar.speaker_title));
            }
        }

        Some(Self {
            summary: seminar.title.clone(),
            description,
            start,
            end,
            with_conference: seminar.format.has_online_part(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub event_id: String,
    /// Generated video-conference link, empty when none was created.
    pub meeting_url: String,
}

/// Calendar / video-conferencing collaborator.
#[async_trait]
pub trait CalendarProvider: Send + Sync + 'static {
    async fn create_event(&self, input: &CalendarEventInput) -> AppResult<CreatedEvent>;

    async fn update_event(
        &self,
        event_id: &str,
        input: &CalendarEventInput,
    ) -> AppResult<CreatedEvent>;

    async fn delete_event(&self, event_id: &str) -> AppResult<()>;
}

// ============================================================================
// Google Calendar
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    id: String,
    hangout_link: Option<String>,
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    #[serde(default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryPoint {
    entry_point_type: String,
    uri: String,
}

impl EventResponse {
    fn meeting_url(&self) -> String {
        self.hangout_link
            .clone()
            .or_else(|| {
                self.conference_data.as_ref().and_then(|c| {
                    c.entry_points
                        .iter()
                        .find(|e| e.entry_point_type == "video")
                        .map(|e| e.uri.clone())
                })
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    auth: GoogleAuth,
    api_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(client: Client, auth: GoogleAuth, config: &GoogleConfig) -> Self {
        Self {
            client,
            auth,
            api_url: config.calendar_api_url.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_body(input: &CalendarEventInput, conference: bool) -> serde_json::Value {
        let mut body = json!({
            "summary": input.summary,
            "description": input.description,
            "start": EventTime { date_time: input.start.to_rfc3339() },
            "end": EventTime { date_time: input.end.to_rfc3339() },
        });
        if conference {
            body["conferenceData"] = json!({
                "createRequest": {
                    "requestId": Uuid::new_v4().to_string(),
                    "conferenceSolutionKey": { "type": "hangoutsMeet" }
                }
            });
        }
        body
    }

    async fn parse_event(response: reqwest::Response, action: &str) -> AppResult<CreatedEvent> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Calendar(format!(
                "Failed to {} ({}): {}",
                action, status, error_text
            )));
        }

        let event: EventResponse = response
            .json()
            .await
            .map_err(|e| AppError::Calendar(format!("Failed to parse event response: {}", e)))?;

        Ok(CreatedEvent {
            meeting_url: event.meeting_url(),
            event_id: event.id,
        })
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn create_event(&self, input: &CalendarEventInput) -> AppResult<CreatedEvent> {
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(token)
            .query(&[("conferenceDataVersion", "1"), ("sendUpdates", "none")])
            .json(&Self::event_body(input, input.with_conference))
            .send()
            .await?;

        let created = Self::parse_event(response, "create event").await?;
        tracing::info!("Created calendar event {}", created.event_id);
        Ok(created)
    }

    async fn update_event(
        &self,
        event_id: &str,
        input: &CalendarEventInput,
    ) -> AppResult<CreatedEvent> {
        let token = self.auth.access_token().await?;
        // A patch that includes a createRequest would replace an existing link, so only
        // existing events without a link get one.
        let response = self
            .client
            .patch(format!("{}/{}", self.events_url(), urlencoding::encode(event_id)))
            .bearer_auth(token)
            .query(&[("conferenceDataVersion", "1"), ("sendUpdates", "none")])
            .json(&Self::event_body(input, false))
            .send()
            .await?;

        let mut updated = Self::parse_event(response, "update event").await?;

        if input.with_conference && updated.meeting_url.is_empty() {
            let token = self.auth.access_token().await?;
            let response = self
                .client
                .patch(format!("{}/{}", self.events_url(), urlencoding::encode(event_id)))
                .bearer_auth(token)
                .query(&[("conferenceDataVersion", "1"), ("sendUpdates", "none")])
                .json(&Self::event_body(input, true))
                .send()
                .await?;
            updated = Self::parse_event(response, "add conference to event").await?;
        }

        Ok(updated)
    }

    async fn delete_event(&self, event_id: &str) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .delete(format!("{}/{}", self.events_url(), urlencoding::encode(event_id)))
            .bearer_auth(token)
            .query(&[("sendUpdates", "none")])
            .send()
            .await?;

        // Already deleted counts as deleted.
        if response.status().is_success() || response.status() == StatusCode::GONE {
            tracing::info!("Deleted calendar event {}", event_id);
            return Ok(());
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(AppError::Calendar(format!(
            "Failed to delete event ({}): {}",
            status, error_text
        )))
    }
}
