use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::domain::availability::format_date;
use crate::domain::{AvailabilityMap, Interval, ProjectState, Skills};

use super::models::{
    Freelancer, FreelancerProfile, Meeting, MeetingWithCounterpart, Mentor, MentorWithUser,
    NewMeeting, NewProject, NewUser, Project, UpdateMentorProfile, User, UserSummary,
};
use super::store::{Store, StoreResult};
use super::DatabaseError;

const USER_COLUMNS: &str = "id, email, password_hash, name, avatar, role, created_at";
const MENTOR_COLUMNS: &str =
    "id, user_id, bio, domain, sessions_took, rating, availability, created_at, updated_at";
const MEETING_COLUMNS: &str = "id, user_id, mentor_id, start_time, end_time, created_at";
const FREELANCER_COLUMNS: &str =
    "id, user_id, experience, projects_completed, skills, contact, advance, created_at, updated_at";
// Wall-clock rather than transaction time, and always past the stored value,
// so every write yields a fresh availability version.
const NEXT_MENTOR_VERSION: &str =
    "GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')";
const PROJECT_COLUMNS: &str = "id, user_id, freelancer_id, description, amount, state, \
     advance_payment_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct MentorListRow {
    #[sqlx(flatten)]
    mentor: Mentor,
    owner_id: Option<Uuid>,
    owner_name: Option<String>,
    owner_avatar: Option<String>,
}

#[derive(sqlx::FromRow)]
struct MeetingListRow {
    #[sqlx(flatten)]
    meeting: Meeting,
    counterpart_name: Option<String>,
}

impl From<MeetingListRow> for MeetingWithCounterpart {
    fn from(row: MeetingListRow) -> Self {
        Self {
            meeting: row.meeting,
            counterpart_name: row.counterpart_name,
        }
    }
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, password_hash, name, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(new_user.email.to_lowercase())
        .bind(new_user.password_hash)
        .bind(new_user.name)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn create_mentor(&self, user_id: Uuid) -> StoreResult<Mentor> {
        sqlx::query_as::<_, Mentor>(&format!(
            "INSERT INTO mentors (id, user_id, availability) VALUES ($1, $2, '{{}}'::jsonb) \
             RETURNING {MENTOR_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn get_mentor(&self, mentor_id: Uuid) -> StoreResult<Option<Mentor>> {
        sqlx::query_as::<_, Mentor>(&format!("SELECT {MENTOR_COLUMNS} FROM mentors WHERE id = $1"))
            .bind(mentor_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn get_mentor_by_user(&self, user_id: Uuid) -> StoreResult<Option<Mentor>> {
        sqlx::query_as::<_, Mentor>(&format!(
            "SELECT {MENTOR_COLUMNS} FROM mentors WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn list_mentors(&self, limit: i64) -> StoreResult<Vec<MentorWithUser>> {
        let rows = sqlx::query_as::<_, MentorListRow>(
            r#"
            SELECT m.id, m.user_id, m.bio, m.domain, m.sessions_took, m.rating, m.availability,
                   m.created_at, m.updated_at,
                   u.id AS owner_id, u.name AS owner_name, u.avatar AS owner_avatar
            FROM mentors m
            LEFT JOIN users u ON u.id = m.user_id
            ORDER BY m.id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| MentorWithUser {
                user: row.owner_id.map(|id| UserSummary {
                    id,
                    name: row.owner_name,
                    avatar: row.owner_avatar,
                }),
                mentor: row.mentor,
            })
            .collect())
    }

    async fn update_mentor_profile(
        &self,
        mentor_id: Uuid,
        profile: &UpdateMentorProfile,
    ) -> StoreResult<Mentor> {
        sqlx::query_as::<_, Mentor>(&format!(
            "UPDATE mentors SET bio = COALESCE($1, bio), domain = COALESCE($2, domain), \
             updated_at = {NEXT_MENTOR_VERSION} WHERE id = $3 RETURNING {MENTOR_COLUMNS}"
        ))
        .bind(profile.bio.as_deref())
        .bind(profile.domain.as_deref())
        .bind(mentor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn save_availability(
        &self,
        mentor_id: Uuid,
        availability: &AvailabilityMap,
        read_at: OffsetDateTime,
    ) -> StoreResult<Mentor> {
        let saved = sqlx::query_as::<_, Mentor>(&format!(
            "UPDATE mentors SET availability = $1, updated_at = {NEXT_MENTOR_VERSION} \
             WHERE id = $2 AND updated_at = $3 RETURNING {MENTOR_COLUMNS}"
        ))
        .bind(Json(availability))
        .bind(mentor_id)
        .bind(read_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        match saved {
            Some(mentor) => Ok(mentor),
            None if self.get_mentor(mentor_id).await?.is_some() => Err(DatabaseError::Conflict(
                "availability changed since it was loaded, reload and try again".to_string(),
            )),
            None => Err(DatabaseError::NotFound),
        }
    }

    async fn book_slot(
        &self,
        meeting: NewMeeting,
        date: Date,
        interval: Interval,
    ) -> StoreResult<Meeting> {
        let date_key = format_date(date);
        let interval_key = interval.label();

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        // Only an open slot (`true`) may flip to booked.
        let claimed = sqlx::query(&format!(
            r#"
            UPDATE mentors
            SET availability = jsonb_set(
                    availability, ARRAY[$2::text, $3::text], '"booked"'::jsonb),
                updated_at = {NEXT_MENTOR_VERSION}
            WHERE id = $1 AND availability -> $2::text -> $3::text = 'true'::jsonb
            "#
        ))
        .bind(meeting.mentor_id)
        .bind(&date_key)
        .bind(&interval_key)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
            debug!(
                mentor_id = %meeting.mentor_id,
                date = %date_key,
                interval = %interval_key,
                "slot no longer open"
            );
            return Err(DatabaseError::Conflict(format!(
                "the slot {date_key} {interval_key} is not open for booking"
            )));
        }

        let created = sqlx::query_as::<_, Meeting>(&format!(
            "INSERT INTO meetings (id, user_id, mentor_id, start_time, end_time) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {MEETING_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(meeting.user_id)
        .bind(meeting.mentor_id)
        .bind(meeting.start_time)
        .bind(meeting.end_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;
        Ok(created)
    }

    async fn get_meeting(&self, meeting_id: Uuid) -> StoreResult<Option<Meeting>> {
        sqlx::query_as::<_, Meeting>(&format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1"
        ))
        .bind(meeting_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn list_meetings_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<MeetingWithCounterpart>> {
        let rows = sqlx::query_as::<_, MeetingListRow>(
            r#"
            SELECT mt.id, mt.user_id, mt.mentor_id, mt.start_time, mt.end_time, mt.created_at,
                   u.name AS counterpart_name
            FROM meetings mt
            JOIN mentors m ON m.id = mt.mentor_id
            LEFT JOIN users u ON u.id = m.user_id
            WHERE mt.user_id = $1
            ORDER BY mt.start_time
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_meetings_for_mentor(
        &self,
        mentor_id: Uuid,
    ) -> StoreResult<Vec<MeetingWithCounterpart>> {
        let rows = sqlx::query_as::<_, MeetingListRow>(
            r#"
            SELECT mt.id, mt.user_id, mt.mentor_id, mt.start_time, mt.end_time, mt.created_at,
                   u.name AS counterpart_name
            FROM meetings mt
            LEFT JOIN users u ON u.id = mt.user_id
            WHERE mt.mentor_id = $1
            ORDER BY mt.start_time
            "#,
        )
        .bind(mentor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_freelancer(&self, user_id: Uuid) -> StoreResult<Freelancer> {
        sqlx::query_as::<_, Freelancer>(&format!(
            "INSERT INTO freelancers (id, user_id, skills) VALUES ($1, $2, $3) \
             RETURNING {FREELANCER_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(Json(Skills::new()))
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn get_freelancer(&self, freelancer_id: Uuid) -> StoreResult<Option<Freelancer>> {
        sqlx::query_as::<_, Freelancer>(&format!(
            "SELECT {FREELANCER_COLUMNS} FROM freelancers WHERE id = $1"
        ))
        .bind(freelancer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn get_freelancer_by_user(&self, user_id: Uuid) -> StoreResult<Option<Freelancer>> {
        sqlx::query_as::<_, Freelancer>(&format!(
            "SELECT {FREELANCER_COLUMNS} FROM freelancers WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn list_freelancers(&self) -> StoreResult<Vec<Freelancer>> {
        sqlx::query_as::<_, Freelancer>(&format!(
            "SELECT {FREELANCER_COLUMNS} FROM freelancers ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn update_freelancer(
        &self,
        freelancer_id: Uuid,
        profile: &FreelancerProfile,
    ) -> StoreResult<Freelancer> {
        sqlx::query_as::<_, Freelancer>(&format!(
            "UPDATE freelancers SET experience = $1, projects_completed = $2, skills = $3, \
             contact = $4, advance = $5, updated_at = NOW() WHERE id = $6 \
             RETURNING {FREELANCER_COLUMNS}"
        ))
        .bind(profile.experience)
        .bind(profile.projects_completed)
        .bind(Json(&profile.skills))
        .bind(profile.contact.as_deref())
        .bind(profile.advance)
        .bind(freelancer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<Project> {
        let result = sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (id, user_id, freelancer_id, description, amount, state) \
             VALUES ($1, $2, $3, $4, 0, 'OPEN') RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(project.user_id)
        .bind(project.freelancer_id)
        .bind(project.description)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(project) => Ok(project),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(DatabaseError::NotFound)
            }
            Err(err) => Err(DatabaseError::from_sqlx(err)),
        }
    }

    async fn get_project(&self, project_id: Uuid) -> StoreResult<Option<Project>> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn list_projects_for_freelancer(
        &self,
        freelancer_id: Uuid,
        state: Option<ProjectState>,
    ) -> StoreResult<Vec<Project>> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE freelancer_id = $1 AND ($2::project_state IS NULL OR state = $2) ORDER BY id"
        ))
        .bind(freelancer_id)
        .bind(state)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn transition_project(
        &self,
        project_id: Uuid,
        expected: ProjectState,
        next: ProjectState,
        amount: Option<f64>,
    ) -> StoreResult<Project> {
        let updated = sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects SET state = $1, amount = COALESCE($2, amount), updated_at = NOW() \
             WHERE id = $3 AND state = $4 RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(next)
        .bind(amount)
        .bind(project_id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        match updated {
            Some(project) => Ok(project),
            None => match self.get_project(project_id).await? {
                Some(current) => Err(DatabaseError::Conflict(format!(
                    "project is {} instead of {}",
                    current.state, expected
                ))),
                None => Err(DatabaseError::NotFound),
            },
        }
    }

    async fn record_advance_payment(
        &self,
        project_id: Uuid,
        payment_id: &str,
    ) -> StoreResult<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects SET advance_payment_id = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(payment_id)
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

