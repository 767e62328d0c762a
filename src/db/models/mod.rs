//! Typed records for the spreadsheet-backed store and their positional row codecs.
//!
//! Column offsets and header rows stay namespaced per module (`seminar::col`,
//! `reservation::HEADER`, ...) since every sheet has its own layout.

pub mod member_domain;
pub mod reservation;
pub mod row;
pub mod seminar;
pub mod survey;

pub use self::member_domain::MemberDomain;
pub use self::reservation::{ParticipationMethod, Reservation, ReservationStatus};
pub use self::row::Row;
pub use self::seminar::{PublicSeminar, Seminar, SeminarFormat, SeminarStatus, SeminarTarget};
pub use self::survey::{QuestionType, SurveyKind, SurveyQuestion, SurveyResponse};
