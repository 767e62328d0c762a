pub mod member_domain;
pub mod reservation;
pub mod seminar;
pub mod survey;

pub use member_domain::MemberDomainRepository;
pub use reservation::ReservationRepository;
pub use seminar::SeminarRepository;
pub use survey::SurveyRepository;
