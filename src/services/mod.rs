//! Workflows that span more than one record or enforce ownership rules.
//! Handlers stay thin and call into these.

pub mod accounts;
pub mod booking;
pub mod freelancers;
pub mod meetings;
pub mod mentors;
pub mod projects;
