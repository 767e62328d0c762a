pub mod auth;
pub mod booking;
pub mod calendar;
pub mod email;
pub mod google;
pub mod seminars;
pub mod sheets;
pub mod surveys;
pub mod tenancy;

#[cfg(test)]
pub mod testing;
