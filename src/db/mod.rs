pub mod models;
pub mod repository;

pub use repository::{
    MemberDomainRepository, ReservationRepository, SeminarRepository, SurveyRepository,
};
