use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::domain::{AvailabilityMap, Interval, ProjectState};

use super::models::{
    Freelancer, FreelancerProfile, Meeting, MeetingWithCounterpart, Mentor, MentorWithUser,
    NewMeeting, NewProject, NewUser, Project, UpdateMentorProfile, User,
};
use super::DatabaseError;

pub type StoreResult<T> = Result<T, DatabaseError>;

/// Record storage used by the request handlers and services.
///
/// Lookups return `Ok(None)` for missing records; updates of a missing record
/// return `DatabaseError::NotFound`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    /// Fails with `DatabaseError::Duplicate` when the email is taken.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn create_mentor(&self, user_id: Uuid) -> StoreResult<Mentor>;
    async fn get_mentor(&self, mentor_id: Uuid) -> StoreResult<Option<Mentor>>;
    async fn get_mentor_by_user(&self, user_id: Uuid) -> StoreResult<Option<Mentor>>;
    async fn list_mentors(&self, limit: i64) -> StoreResult<Vec<MentorWithUser>>;
    async fn update_mentor_profile(
        &self,
        mentor_id: Uuid,
        profile: &UpdateMentorProfile,
    ) -> StoreResult<Mentor>;
    /// Overwrite the whole availability map (the mentor's own editor).
    ///
    /// `read_at` is the `updated_at` of the copy the edit was based on; if the
    /// record changed since, for example because a slot got booked, the write
    /// is refused with `DatabaseError::Conflict`.
    async fn save_availability(
        &self,
        mentor_id: Uuid,
        availability: &AvailabilityMap,
        read_at: OffsetDateTime,
    ) -> StoreResult<Mentor>;

    /// Book one slot and record the meeting as a single atomic step.
    ///
    /// The slot is set to booked only if it is open at the time of the
    /// write; otherwise nothing is written and `DatabaseError::Conflict` is
    /// returned.
    async fn book_slot(
        &self,
        meeting: NewMeeting,
        date: Date,
        interval: Interval,
    ) -> StoreResult<Meeting>;

    async fn get_meeting(&self, meeting_id: Uuid) -> StoreResult<Option<Meeting>>;
    async fn list_meetings_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<MeetingWithCounterpart>>;
    async fn list_meetings_for_mentor(
        &self,
        mentor_id: Uuid,
    ) -> StoreResult<Vec<MeetingWithCounterpart>>;

    async fn create_freelancer(&self, user_id: Uuid) -> StoreResult<Freelancer>;
    async fn get_freelancer(&self, freelancer_id: Uuid) -> StoreResult<Option<Freelancer>>;
    async fn get_freelancer_by_user(&self, user_id: Uuid) -> StoreResult<Option<Freelancer>>;
    async fn list_freelancers(&self) -> StoreResult<Vec<Freelancer>>;
    async fn update_freelancer(
        &self,
        freelancer_id: Uuid,
        profile: &FreelancerProfile,
    ) -> StoreResult<Freelancer>;

    async fn create_project(&self, project: NewProject) -> StoreResult<Project>;
    async fn get_project(&self, project_id: Uuid) -> StoreResult<Option<Project>>;
    async fn list_projects_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Project>>;
    async fn list_projects_for_freelancer(
        &self,
        freelancer_id: Uuid,
        state: Option<ProjectState>,
    ) -> StoreResult<Vec<Project>>;
    /// Move a project from `expected` to `next`, optionally setting the amount.
    /// Returns `DatabaseError::Conflict` if the stored state is not `expected`.
    async fn transition_project(
        &self,
        project_id: Uuid,
        expected: ProjectState,
        next: ProjectState,
        amount: Option<f64>,
    ) -> StoreResult<Project>;
    async fn record_advance_payment(
        &self,
        project_id: Uuid,
        payment_id: &str,
    ) -> StoreResult<Project>;
}
