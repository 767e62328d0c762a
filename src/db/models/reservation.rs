use rand::Rng;
use serde::{Deserialize, Serialize};

use super::row::{bool_cell, cell, cell_bool, cell_string, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    /// Rows written before the status column existed have an empty cell; they count as confirmed.
    pub fn from_cell(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "cancelled" | "canceled" => ReservationStatus::Cancelled,
            _ => ReservationStatus::Confirmed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationMethod {
    Venue,
    Online,
}

impl ParticipationMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "venue" => Some(ParticipationMethod::Venue),
            "online" => Some(ParticipationMethod::Online),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParticipationMethod::Venue => "venue",
            ParticipationMethod::Online => "online",
        }
    }
}

/// Column offsets in a per-seminar `reservations` sheet.
pub mod col {
    pub const ID: usize = 0;
    pub const NAME: usize = 1;
    pub const EMAIL: usize = 2;
    pub const COMPANY: usize = 3;
    pub const DEPARTMENT: usize = 4;
    pub const PHONE: usize = 5;
    pub const STATUS: usize = 6;
    pub const PRE_SURVEY_COMPLETED: usize = 7;
    pub const POST_SURVEY_COMPLETED: usize = 8;
    pub const RESERVATION_NUMBER: usize = 9;
    pub const PARTICIPATION_METHOD: usize = 10;
    pub const CREATED_AT: usize = 11;
    pub const NOTE: usize = 12;
}

pub const HEADER: [&str; 13] = [
    "id",
    "name",
    "email",
    "company",
    "department",
    "phone",
    "status",
    "pre_survey_completed",
    "post_survey_completed",
    "reservation_number",
    "participation_method",
    "created_at",
    "note",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub department: String,
    pub phone: String,
    pub status: ReservationStatus,
    pub pre_survey_completed: bool,
    pub post_survey_completed: bool,
    pub reservation_number: String,
    pub participation_method: Option<ParticipationMethod>,
    pub created_at: String,
    pub note: String,
}

impl Reservation {
    pub fn from_row(row: &[String]) -> Self {
        Reservation {
            id: cell_string(row, col::ID),
            name: cell_string(row, col::NAME),
            email: cell_string(row, col::EMAIL),
            company: cell_string(row, col::COMPANY),
            department: cell_string(row, col::DEPARTMENT),
            phone: cell_string(row, col::PHONE),
            status: ReservationStatus::from_cell(cell(row, col::STATUS)),
            pre_survey_completed: cell_bool(row, col::PRE_SURVEY_COMPLETED),
            post_survey_completed: cell_bool(row, col::POST_SURVEY_COMPLETED),
            reservation_number: cell_string(row, col::RESERVATION_NUMBER),
            participation_method: ParticipationMethod::from_str(cell(
                row,
                col::PARTICIPATION_METHOD,
            )),
            created_at: cell_string(row, col::CREATED_AT),
            note: cell(row, col::NOTE).to_string(),
        }
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            self.company.clone(),
            self.department.clone(),
            self.phone.clone(),
            self.status.as_str().to_string(),
            bool_cell(self.pre_survey_completed),
            bool_cell(self.post_survey_completed),
            self.reservation_number.clone(),
            self.participation_method
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            self.created_at.clone(),
            self.note.clone(),
        ]
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

// ============================================================================
// Reservation numbers
// ============================================================================

/// Length of the seminar-id prefix embedded in a reservation number.
pub const NUMBER_PREFIX_LEN: usize = 8;
const NUMBER_SUFFIX_LEN: usize = 6;
// No I, O, 0 or 1: numbers are read aloud and typed from printed emails.
const NUMBER_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate `<SEMINAR-ID-PREFIX>-<SUFFIX>`, e.g. `3F2A9C1E-K7QX2M`.
///
/// The prefix lets a lookup go straight to the owning seminar's spreadsheet
/// instead of scanning every per-seminar sheet.
pub fn generate_reservation_number(seminar_id: &str) -> String {
    let prefix: String = seminar_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(NUMBER_PREFIX_LEN)
        .collect::<String>()
        .to_uppercase();

    let mut rng = rand::thread_rng();
    let suffix: String = (0..NUMBER_SUFFIX_LEN)
        .map(|_| NUMBER_CHARSET[rng.gen_range(0..NUMBER_CHARSET.len())] as char)
        .collect();

    format!("{}-{}", prefix, suffix)
}

/// Seminar-id prefix of a reservation number (lowercased to match uuid text),
/// or `None` when the number is not shaped like one we issued.
pub fn reservation_number_prefix(number: &str) -> Option<String> {
    let (prefix, suffix) = number.trim().split_once('-')?;
    if prefix.is_empty()
        || suffix.len() != NUMBER_SUFFIX_LEN
        || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        || !suffix.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(prefix.to_lowercase())
}

/// Whether a seminar id owns the given reservation-number prefix.
pub fn seminar_id_has_prefix(seminar_id: &str, prefix: &str) -> bool {
    let compact: String = seminar_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(NUMBER_PREFIX_LEN)
        .collect::<String>()
        .to_lowercase();
    !prefix.is_empty() && compact == prefix
}

#[cfg(test)]
pub(crate) fn sample_reservation() -> Reservation {
    Reservation {
        id: "r-1".to_string(),
        name: "Kenji Sato".to_string(),
        email: "kenji@example.com".to_string(),
        company: "Example KK".to_string(),
        department: "Platform".to_string(),
        phone: "03-0000-0000".to_string(),
        status: ReservationStatus::Confirmed,
        pre_survey_completed: false,
        post_survey_completed: false,
        reservation_number: "3F2A9C1E-K7QX2M".to_string(),
        participation_method: Some(ParticipationMethod::Online),
        created_at: "2026-10-05T10:00:00+00:00".to_string(),
        note: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_round_trips() {
        let reservation = Reservation {
            pre_survey_completed: true,
            note: "wheelchair access".to_string(),
            ..sample_reservation()
        };
        assert_eq!(Reservation::from_row(&reservation.to_row()), reservation);
    }

    #[test]
    fn short_row_defaults_to_confirmed() {
        let row: Row = ["r-9", "A", "a@example.com"].iter().map(|s| s.to_string()).collect();
        let reservation = Reservation::from_row(&row);
        assert!(reservation.is_confirmed());
        assert!(!reservation.pre_survey_completed);
        assert_eq!(reservation.participation_method, None);
    }

    #[test]
    fn generated_number_points_back_to_seminar() {
        let seminar_id = "3f2a9c1e-0000-4000-8000-000000000001";
        let number = generate_reservation_number(seminar_id);
        assert!(number.starts_with("3F2A9C1E-"));
        assert!(!number.contains('I') && !number.contains('O'));

        let prefix = reservation_number_prefix(&number).unwrap();
        assert!(seminar_id_has_prefix(seminar_id, &prefix));
        assert!(!seminar_id_has_prefix("ffffffff-0000", &prefix));
    }

    #[test]
    fn malformed_numbers_have_no_prefix() {
        assert_eq!(reservation_number_prefix(""), None);
        assert_eq!(reservation_number_prefix("NODASH"), None);
        assert_eq!(reservation_number_prefix("-ABCDEF"), None);
        assert_eq!(reservation_number_prefix("3F2A9C1E-SHORT"), None);
        assert_eq!(reservation_number_prefix("3F2A9C1E-AB CD!"), None);
        assert_eq!(
            reservation_number_prefix(" 3f2a9c1e-k7qx2m "),
            Some("3f2a9c1e".to_string())
        );
    }

    #[test]
    fn email_match_ignores_case_and_whitespace() {
        let reservation = sample_reservation();
        assert!(reservation.email_matches(" Kenji@Example.com"));
        assert!(!reservation.email_matches("kenji@example.org"));
    }
}
