pub mod auth;
pub mod freelancers;
pub mod meetings;
pub mod mentors;
pub mod projects;
