use std::collections::BTreeMap;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{AvailabilityMap, Interval, ProjectState, Skills};

use super::models::{
    Freelancer, FreelancerProfile, Meeting, MeetingWithCounterpart, Mentor, MentorWithUser,
    NewMeeting, NewProject, NewUser, Project, UpdateMentorProfile, User, UserSummary,
};
use super::store::{Store, StoreResult};
use super::DatabaseError;

#[derive(Default)]
struct Tables {
    // UUIDv7 keys keep every table in creation order.
    users: BTreeMap<Uuid, User>,
    mentors: BTreeMap<Uuid, Mentor>,
    meetings: BTreeMap<Uuid, Meeting>,
    freelancers: BTreeMap<Uuid, Freelancer>,
    projects: BTreeMap<Uuid, Project>,
}

/// Mirrors the postgres version bump: wall clock, but strictly past `previous`.
fn next_version(previous: OffsetDateTime) -> OffsetDateTime {
    OffsetDateTime::now_utc().max(previous + time::Duration::MICROSECOND)
}

impl Tables {
    fn user_name(&self, user_id: Uuid) -> Option<String> {
        self.users.get(&user_id).and_then(|user| user.name.clone())
    }
}

/// Process-local store for tests and database-less development runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let email = new_user.email.to_lowercase();
        if tables.users.values().any(|user| user.email == email) {
            return Err(DatabaseError::Duplicate);
        }
        let user = User {
            id: Uuid::now_v7(),
            email,
            password_hash: new_user.password_hash,
            name: new_user.name,
            avatar: None,
            role: new_user.role,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }

    async fn create_mentor(&self, user_id: Uuid) -> StoreResult<Mentor> {
        let mut tables = self.tables.write().await;
        if tables.mentors.values().any(|mentor| mentor.user_id == user_id) {
            return Err(DatabaseError::Duplicate);
        }
        let now = OffsetDateTime::now_utc();
        let mentor = Mentor {
            id: Uuid::now_v7(),
            user_id,
            bio: None,
            domain: None,
            sessions_took: 0,
            rating: 0.0,
            availability: AvailabilityMap::new(),
            created_at: now,
            updated_at: now,
        };
        tables.mentors.insert(mentor.id, mentor.clone());
        Ok(mentor)
    }

    async fn get_mentor(&self, mentor_id: Uuid) -> StoreResult<Option<Mentor>> {
        Ok(self.tables.read().await.mentors.get(&mentor_id).cloned())
    }

    async fn get_mentor_by_user(&self, user_id: Uuid) -> StoreResult<Option<Mentor>> {
        let tables = self.tables.read().await;
        Ok(tables.mentors.values().find(|m| m.user_id == user_id).cloned())
    }

    async fn list_mentors(&self, limit: i64) -> StoreResult<Vec<MentorWithUser>> {
        let tables = self.tables.read().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(tables
            .mentors
            .values()
            .take(limit)
            .map(|mentor| MentorWithUser {
                mentor: mentor.clone(),
                user: tables.users.get(&mentor.user_id).map(UserSummary::from),
            })
            .collect())
    }

    async fn update_mentor_profile(
        &self,
        mentor_id: Uuid,
        profile: &UpdateMentorProfile,
    ) -> StoreResult<Mentor> {
        let mut tables = self.tables.write().await;
        let mentor = tables.mentors.get_mut(&mentor_id).ok_or(DatabaseError::NotFound)?;
        if let Some(bio) = &profile.bio {
            mentor.bio = Some(bio.clone());
        }
        if let Some(domain) = &profile.domain {
            mentor.domain = Some(domain.clone());
        }
        mentor.updated_at = next_version(mentor.updated_at);
        Ok(mentor.clone())
    }

    async fn save_availability(
        &self,
        mentor_id: Uuid,
        availability: &AvailabilityMap,
        read_at: OffsetDateTime,
    ) -> StoreResult<Mentor> {
        let mut tables = self.tables.write().await;
        let mentor = tables.mentors.get_mut(&mentor_id).ok_or(DatabaseError::NotFound)?;
        if mentor.updated_at != read_at {
            return Err(DatabaseError::Conflict(
                "availability changed since it was loaded, reload and try again".to_string(),
            ));
        }
        mentor.availability = availability.clone();
        mentor.updated_at = next_version(mentor.updated_at);
        Ok(mentor.clone())
    }

    async fn book_slot(
        &self,
        meeting: NewMeeting,
        date: Date,
        interval: Interval,
    ) -> StoreResult<Meeting> {
        let mut tables = self.tables.write().await;
        let mentor = tables
            .mentors
            .get_mut(&meeting.mentor_id)
            .ok_or(DatabaseError::NotFound)?;
        mentor
            .availability
            .mark_booked(date, interval)
            .map_err(|e| DatabaseError::Conflict(e.to_string()))?;
        let now = OffsetDateTime::now_utc();
        mentor.updated_at = next_version(mentor.updated_at);

        let meeting = Meeting {
            id: Uuid::now_v7(),
            user_id: meeting.user_id,
            mentor_id: meeting.mentor_id,
            start_time: meeting.start_time,
            end_time: meeting.end_time,
            created_at: now,
        };
        tables.meetings.insert(meeting.id, meeting.clone());
        Ok(meeting)
    }

    async fn get_meeting(&self, meeting_id: Uuid) -> StoreResult<Option<Meeting>> {
        Ok(self.tables.read().await.meetings.get(&meeting_id).cloned())
    }

    async fn list_meetings_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<MeetingWithCounterpart>> {
        let tables = self.tables.read().await;
        Ok(tables
            .meetings
            .values()
            .filter(|meeting| meeting.user_id == user_id)
            .map(|meeting| MeetingWithCounterpart {
                counterpart_name: tables
                    .mentors
                    .get(&meeting.mentor_id)
                    .and_then(|mentor| tables.user_name(mentor.user_id)),
                meeting: meeting.clone(),
            })
            .collect())
    }

    async fn list_meetings_for_mentor(
        &self,
        mentor_id: Uuid,
    ) -> StoreResult<Vec<MeetingWithCounterpart>> {
        let tables = self.tables.read().await;
        Ok(tables
            .meetings
            .values()
            .filter(|meeting| meeting.mentor_id == mentor_id)
            .map(|meeting| MeetingWithCounterpart {
                counterpart_name: tables.user_name(meeting.user_id),
                meeting: meeting.clone(),
            })
            .collect())
    }

    async fn create_freelancer(&self, user_id: Uuid) -> StoreResult<Freelancer> {
        let mut tables = self.tables.write().await;
        if tables.freelancers.values().any(|f| f.user_id == user_id) {
            return Err(DatabaseError::Duplicate);
        }
        let now = OffsetDateTime::now_utc();
        let freelancer = Freelancer {
            id: Uuid::now_v7(),
            user_id,
            experience: 0,
            projects_completed: 0,
            skills: Skills::new(),
            contact: None,
            advance: 0,
            created_at: now,
            updated_at: now,
        };
        tables.freelancers.insert(freelancer.id, freelancer.clone());
        Ok(freelancer)
    }

    async fn get_freelancer(&self, freelancer_id: Uuid) -> StoreResult<Option<Freelancer>> {
        Ok(self.tables.read().await.freelancers.get(&freelancer_id).cloned())
    }

    async fn get_freelancer_by_user(&self, user_id: Uuid) -> StoreResult<Option<Freelancer>> {
        let tables = self.tables.read().await;
        Ok(tables.freelancers.values().find(|f| f.user_id == user_id).cloned())
    }

    async fn list_freelancers(&self) -> StoreResult<Vec<Freelancer>> {
        Ok(self.tables.read().await.freelancers.values().cloned().collect())
    }

    async fn update_freelancer(
        &self,
        freelancer_id: Uuid,
        profile: &FreelancerProfile,
    ) -> StoreResult<Freelancer> {
        let mut tables = self.tables.write().await;
        let freelancer = tables
            .freelancers
            .get_mut(&freelancer_id)
            .ok_or(DatabaseError::NotFound)?;
        freelancer.experience = profile.experience;
        freelancer.projects_completed = profile.projects_completed;
        freelancer.skills = profile.skills.clone();
        freelancer.contact = profile.contact.clone();
        freelancer.advance = profile.advance;
        freelancer.updated_at = OffsetDateTime::now_utc();
        Ok(freelancer.clone())
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        if !tables.freelancers.contains_key(&project.freelancer_id) {
            return Err(DatabaseError::NotFound);
        }
        let now = OffsetDateTime::now_utc();
        let project = Project {
            id: Uuid::now_v7(),
            user_id: project.user_id,
            freelancer_id: project.freelancer_id,
            description: project.description,
            amount: 0.0,
            state: ProjectState::Open,
            advance_payment_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, project_id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&project_id).cloned())
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .filter(|project| project.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_projects_for_freelancer(
        &self,
        freelancer_id: Uuid,
        state: Option<ProjectState>,
    ) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .filter(|project| project.freelancer_id == freelancer_id)
            .filter(|project| state.map_or(true, |state| project.state == state))
            .cloned()
            .collect())
    }

    async fn transition_project(
        &self,
        project_id: Uuid,
        expected: ProjectState,
        next: ProjectState,
        amount: Option<f64>,
    ) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        let project = tables.projects.get_mut(&project_id).ok_or(DatabaseError::NotFound)?;
        if project.state != expected {
            return Err(DatabaseError::Conflict(format!(
                "project is {} instead of {}",
                project.state, expected
            )));
        }
        project.state = next;
        if let Some(amount) = amount {
            project.amount = amount;
        }
        project.updated_at = OffsetDateTime::now_utc();
        Ok(project.clone())
    }

    async fn record_advance_payment(
        &self,
        project_id: Uuid,
        payment_id: &str,
    ) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        let project = tables.projects.get_mut(&project_id).ok_or(DatabaseError::NotFound)?;
        project.advance_payment_id = Some(payment_id.to_string());
        project.updated_at = OffsetDateTime::now_utc();
        Ok(project.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::UserRole;
    use serde_json::json;
    use std::sync::Arc;
    use time::macros::{date, datetime};

    async fn mentor_with_open_slot(store: &MemoryStore) -> Mentor {
        let user = store
            .create_user(NewUser {
                email: "mentor@example.com".to_string(),
                password_hash: "hash".to_string(),
                name: Some("Ada".to_string()),
                role: UserRole::Mentor,
            })
            .await
            .unwrap();
        let mentor = store.create_mentor(user.id).await.unwrap();
        let availability: AvailabilityMap =
            serde_json::from_value(json!({ "2025-05-01": { "10 - 11": true } })).unwrap();
        store
            .save_availability(mentor.id, &availability, mentor.updated_at)
            .await
            .unwrap()
    }

    fn new_meeting(mentor_id: Uuid) -> NewMeeting {
        NewMeeting {
            user_id: Uuid::now_v7(),
            mentor_id,
            start_time: datetime!(2025-05-01 10:00 UTC),
            end_time: datetime!(2025-05-01 11:00 UTC),
        }
    }

    #[tokio::test]
    async fn emails_are_unique_case_insensitively() {
        let store = MemoryStore::new();
        let new_user = |email: &str| NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: None,
            role: UserRole::User,
        };
        store.create_user(new_user("a@example.com")).await.unwrap();
        let dup = store.create_user(new_user("A@Example.com")).await;
        assert!(matches!(dup, Err(DatabaseError::Duplicate)));
    }

    #[tokio::test]
    async fn concurrent_bookings_of_one_slot_produce_one_meeting() {
        let store = Arc::new(MemoryStore::new());
        let mentor = mentor_with_open_slot(&store).await;

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let meeting = new_meeting(mentor.id);
                tokio::spawn(async move {
                    store
                        .book_slot(meeting, date!(2025 - 05 - 01), "10 - 11".parse().unwrap())
                        .await
                })
            })
            .collect();

        let mut booked = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => booked += 1,
                Err(DatabaseError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(booked, 1);
        assert_eq!(store.list_meetings_for_mentor(mentor.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_availability_save_cannot_undo_a_booking() {
        let store = MemoryStore::new();
        let mentor = mentor_with_open_slot(&store).await;

        store
            .book_slot(new_meeting(mentor.id), date!(2025 - 05 - 01), "10 - 11".parse().unwrap())
            .await
            .unwrap();

        let stale = store
            .save_availability(mentor.id, &mentor.availability, mentor.updated_at)
            .await;
        assert!(matches!(stale, Err(DatabaseError::Conflict(_))));

        let current = store.get_mentor(mentor.id).await.unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&current.availability).unwrap(),
            json!({ "2025-05-01": { "10 - 11": "booked" } })
        );
    }

    #[tokio::test]
    async fn every_mentor_write_moves_the_version_forward() {
        let store = MemoryStore::new();
        let mentor = mentor_with_open_slot(&store).await;

        let mut seen = vec![mentor.updated_at];
        let mut availability = mentor.availability.clone();
        for _ in 0..50 {
            let saved = store
                .save_availability(mentor.id, &availability, *seen.last().unwrap())
                .await
                .unwrap();
            availability = saved.availability;
            seen.push(saved.updated_at);
        }
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));

        // An earlier read can never match a later version.
        let stale = store
            .save_availability(mentor.id, &availability, seen[seen.len() - 2])
            .await;
        assert!(matches!(stale, Err(DatabaseError::Conflict(_))));
    }

    #[test]
    fn next_version_never_repeats_a_future_stamp() {
        let ahead = OffsetDateTime::now_utc() + time::Duration::hours(1);
        assert_eq!(next_version(ahead), ahead + time::Duration::MICROSECOND);
    }

    #[tokio::test]
    async fn transition_checks_the_stored_state() {
        let store = MemoryStore::new();
        let freelancer = store.create_freelancer(Uuid::now_v7()).await.unwrap();
        let project = store
            .create_project(NewProject {
                user_id: Uuid::now_v7(),
                freelancer_id: freelancer.id,
                description: "landing page".to_string(),
            })
            .await
            .unwrap();

        let accepted = store
            .transition_project(project.id, ProjectState::Open, ProjectState::Accepted, Some(900.0))
            .await
            .unwrap();
        assert_eq!(accepted.state, ProjectState::Accepted);
        assert_eq!(accepted.amount, 900.0);

        let again = store
            .transition_project(project.id, ProjectState::Open, ProjectState::Accepted, Some(1.0))
            .await;
        assert!(matches!(again, Err(DatabaseError::Conflict(_))));
    }
}
