use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::row::{cell, cell_i64, cell_string, Row};

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeminarStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

impl SeminarStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(SeminarStatus::Draft),
            "published" => Some(SeminarStatus::Published),
            "cancelled" | "canceled" => Some(SeminarStatus::Cancelled),
            "completed" => Some(SeminarStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeminarStatus::Draft => "draft",
            SeminarStatus::Published => "published",
            SeminarStatus::Cancelled => "cancelled",
            SeminarStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeminarFormat {
    Venue,
    Online,
    Hybrid,
}

impl SeminarFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "venue" => Some(SeminarFormat::Venue),
            "online" => Some(SeminarFormat::Online),
            "hybrid" => Some(SeminarFormat::Hybrid),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeminarFormat::Venue => "venue",
            SeminarFormat::Online => "online",
            SeminarFormat::Hybrid => "hybrid",
        }
    }

    /// Whether the seminar needs a video-conference link.
    pub fn has_online_part(self) -> bool {
        matches!(self, SeminarFormat::Online | SeminarFormat::Hybrid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeminarTarget {
    MembersOnly,
    Public,
}

impl SeminarTarget {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "members_only" => Some(SeminarTarget::MembersOnly),
            "public" => Some(SeminarTarget::Public),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeminarTarget::MembersOnly => "members_only",
            SeminarTarget::Public => "public",
        }
    }
}

// ============================================================================
// Row layout
// ============================================================================

/// Column offsets in the master `seminars` sheet.
pub mod col {
    pub const ID: usize = 0;
    pub const TITLE: usize = 1;
    pub const DESCRIPTION: usize = 2;
    pub const DATE: usize = 3;
    pub const END_TIME: usize = 4;
    pub const CAPACITY: usize = 5;
    pub const CURRENT_BOOKINGS: usize = 6;
    pub const SPEAKER: usize = 7;
    pub const SPEAKER_TITLE: usize = 8;
    pub const SPEAKER_REFERENCE_URL: usize = 9;
    pub const MEETING_URL: usize = 10;
    pub const CALENDAR_EVENT_ID: usize = 11;
    pub const STATUS: usize = 12;
    // Offsets from here on depend on the layout.
    pub const FORMAT: usize = 13;
    pub const TARGET: usize = 14;
    pub const INVITATION_CODE: usize = 15;
    pub const IMAGE_URL: usize = 16;
    pub const SPREADSHEET_ID: usize = 17;
    pub const CREATED_AT: usize = 18;
    pub const UPDATED_AT: usize = 19;

    pub const LEGACY_INVITATION_CODE: usize = 13;
    pub const LEGACY_IMAGE_URL: usize = 14;
    pub const LEGACY_SPREADSHEET_ID: usize = 15;
    pub const LEGACY_CREATED_AT: usize = 16;
    pub const LEGACY_UPDATED_AT: usize = 17;
}

pub const CURRENT_WIDTH: usize = 20;
pub const LEGACY_WIDTH: usize = 18;

pub const HEADER: [&str; CURRENT_WIDTH] = [
    "id",
    "title",
    "description",
    "date",
    "end_time",
    "capacity",
    "current_bookings",
    "speaker",
    "speaker_title",
    "speaker_reference_url",
    "meeting_url",
    "calendar_event_id",
    "status",
    "format",
    "target",
    "invitation_code",
    "image_url",
    "spreadsheet_id",
    "created_at",
    "updated_at",
];

/// Historical column layouts of the `seminars` sheet.
///
/// `Legacy` rows predate the `format` / `target` columns (18 cells);
/// `Current` rows carry them at offsets 13 and 14 (20 cells).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeminarLayout {
    Legacy,
    Current,
}

impl SeminarLayout {
    pub fn detect(row: &[String]) -> Self {
        if SeminarFormat::from_str(cell(row, col::FORMAT)).is_some() || row.len() >= CURRENT_WIDTH {
            SeminarLayout::Current
        } else {
            SeminarLayout::Legacy
        }
    }
}

// ============================================================================
// Seminar record
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seminar {
    pub id: String,
    pub title: String,
    pub description: String,
    /// RFC3339 start time.
    pub date: String,
    /// RFC3339 end time, empty when open-ended.
    pub end_time: String,
    pub capacity: i64,
    pub current_bookings: i64,
    pub speaker: String,
    pub speaker_title: String,
    pub speaker_reference_url: String,
    pub meeting_url: String,
    pub calendar_event_id: String,
    pub status: SeminarStatus,
    pub format: SeminarFormat,
    pub target: SeminarTarget,
    pub invitation_code: String,
    pub image_url: String,
    pub spreadsheet_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Seminar {
    pub fn from_row(row: &[String]) -> Self {
        let layout = SeminarLayout::detect(row);

        let (format, target, invitation, image, spreadsheet, created, updated) = match layout {
            SeminarLayout::Current => (
                SeminarFormat::from_str(cell(row, col::FORMAT)).unwrap_or(SeminarFormat::Online),
                SeminarTarget::from_str(cell(row, col::TARGET)).unwrap_or(SeminarTarget::Public),
                col::INVITATION_CODE,
                col::IMAGE_URL,
                col::SPREADSHEET_ID,
                col::CREATED_AT,
                col::UPDATED_AT,
            ),
            SeminarLayout::Legacy => (
                SeminarFormat::Online,
                SeminarTarget::Public,
                col::LEGACY_INVITATION_CODE,
                col::LEGACY_IMAGE_URL,
                col::LEGACY_SPREADSHEET_ID,
                col::LEGACY_CREATED_AT,
                col::LEGACY_UPDATED_AT,
            ),
        };

        Seminar {
            id: cell_string(row, col::ID),
            title: cell_string(row, col::TITLE),
            description: cell(row, col::DESCRIPTION).to_string(),
            date: cell_string(row, col::DATE),
            end_time: cell_string(row, col::END_TIME),
            capacity: cell_i64(row, col::CAPACITY),
            current_bookings: cell_i64(row, col::CURRENT_BOOKINGS),
            speaker: cell_string(row, col::SPEAKER),
            speaker_title: cell_string(row, col::SPEAKER_TITLE),
            speaker_reference_url: cell_string(row, col::SPEAKER_REFERENCE_URL),
            meeting_url: cell_string(row, col::MEETING_URL),
            calendar_event_id: cell_string(row, col::CALENDAR_EVENT_ID),
            status: SeminarStatus::from_str(cell(row, col::STATUS)).unwrap_or(SeminarStatus::Draft),
            format,
            target,
            invitation_code: cell_string(row, invitation),
            image_url: cell_string(row, image),
            spreadsheet_id: cell_string(row, spreadsheet),
            created_at: cell_string(row, created),
            updated_at: cell_string(row, updated),
        }
    }

    /// Encode in the current layout; all writes use it.
    pub fn to_row(&self) -> Row {
        self.to_row_with(SeminarLayout::Current)
    }

    pub fn to_row_with(&self, layout: SeminarLayout) -> Row {
        let mut row = vec![
            self.id.clone(),
            self.title.clone(),
            self.description.clone(),
            self.date.clone(),
            self.end_time.clone(),
            self.capacity.to_string(),
            self.current_bookings.to_string(),
            self.speaker.clone(),
            self.speaker_title.clone(),
            self.speaker_reference_url.clone(),
            self.meeting_url.clone(),
            self.calendar_event_id.clone(),
            self.status.as_str().to_string(),
        ];
        if layout == SeminarLayout::Current {
            row.push(self.format.as_str().to_string());
            row.push(self.target.as_str().to_string());
        }
        row.extend([
            self.invitation_code.clone(),
            self.image_url.clone(),
            self.spreadsheet_id.clone(),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]);
        row
    }

    pub fn starts_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date).ok()
    }

    pub fn ends_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.end_time).ok()
    }

    pub fn is_full(&self) -> bool {
        self.current_bookings >= self.capacity
    }

    pub fn remaining_seats(&self) -> i64 {
        (self.capacity - self.current_bookings).max(0)
    }
}

/// Seminar as shown to attendees: no invitation code, calendar or storage ids,
/// and no meeting link (that is only sent in the confirmation email).
#[derive(Debug, Clone, Serialize)]
pub struct PublicSeminar {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub end_time: String,
    pub capacity: i64,
    pub current_bookings: i64,
    pub remaining_seats: i64,
    pub speaker: String,
    pub speaker_title: String,
    pub speaker_reference_url: String,
    pub status: SeminarStatus,
    pub format: SeminarFormat,
    pub target: SeminarTarget,
    pub requires_invitation_code: bool,
    pub image_url: String,
}

impl From<&Seminar> for PublicSeminar {
    fn from(s: &Seminar) -> Self {
        PublicSeminar {
            id: s.id.clone(),
            title: s.title.clone(),
            description: s.description.clone(),
            date: s.date.clone(),
            end_time: s.end_time.clone(),
            capacity: s.capacity,
            current_bookings: s.current_bookings,
            remaining_seats: s.remaining_seats(),
            speaker: s.speaker.clone(),
            speaker_title: s.speaker_title.clone(),
            speaker_reference_url: s.speaker_reference_url.clone(),
            status: s.status,
            format: s.format,
            target: s.target,
            requires_invitation_code: s.target == SeminarTarget::MembersOnly
                && !s.invitation_code.is_empty(),
            image_url: s.image_url.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_seminar() -> Seminar {
    Seminar {
        id: "3f2a9c1e-0000-4000-8000-000000000001".to_string(),
        title: "Rust for Operators".to_string(),
        description: "Hands-on introduction".to_string(),
        date: "2026-11-20T14:00:00+09:00".to_string(),
        end_time: "2026-11-20T16:00:00+09:00".to_string(),
        capacity: 30,
        current_bookings: 4,
        speaker: "Aiko Tanaka".to_string(),
        speaker_title: "Principal Engineer".to_string(),
        speaker_reference_url: "https://example.com/aiko".to_string(),
        meeting_url: "https://meet.example.com/abc-defg-hij".to_string(),
        calendar_event_id: "evt123".to_string(),
        status: SeminarStatus::Published,
        format: SeminarFormat::Hybrid,
        target: SeminarTarget::Public,
        invitation_code: String::new(),
        image_url: String::new(),
        spreadsheet_id: "sheet-1".to_string(),
        created_at: "2026-10-01T09:00:00+00:00".to_string(),
        updated_at: "2026-10-02T09:00:00+00:00".to_string(),
    }
}
