use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::{DatabaseError, Mentor, MentorWithUser, Store, UpdateMentorProfile, UserSummary};
use crate::domain::availability::{format_date, parse_date};
use crate::domain::{AvailabilityMap, Interval, SlotStatus};
use crate::error::{AppError, AppResult};

/// Upper bound on a mentor listing page.
pub const MENTOR_PAGE_SIZE: i64 = 500;

/// A mentor as shown on its booking page: the profile plus what can still
/// be booked.
#[derive(Debug, Clone, Serialize)]
pub struct MentorDetail {
    #[serde(flatten)]
    pub mentor: MentorWithUser,
    pub bookable: BTreeMap<String, Vec<Interval>>,
}

/// Body of a whole-day save: interval label to offered or not.
#[derive(Debug, Deserialize)]
pub struct DayEdit {
    pub slots: BTreeMap<Interval, bool>,
    /// `updated_at` of the availability the edit was made on.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub date: String,
    pub interval: Interval,
    pub status: Option<SlotStatus>,
    pub mentor: Mentor,
}

pub async fn list(store: &dyn Store) -> AppResult<Vec<MentorWithUser>> {
    Ok(store.list_mentors(MENTOR_PAGE_SIZE).await?)
}

async fn load(store: &dyn Store, mentor_id: Uuid) -> AppResult<Mentor> {
    store
        .get_mentor(mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Mentor {mentor_id} not found")))
}

fn bookable(
    availability: &AvailabilityMap,
    now: OffsetDateTime,
) -> BTreeMap<String, Vec<Interval>> {
    availability
        .future_dates(now)
        .into_iter()
        .filter_map(|date| {
            let open = availability.open_intervals(date);
            (!open.is_empty()).then(|| (format_date(date), open))
        })
        .collect()
}

pub async fn detail(
    store: &dyn Store,
    mentor_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<MentorDetail> {
    let mentor = load(store, mentor_id).await?;
    let user = store.get_user(mentor.user_id).await?;
    let bookable = bookable(&mentor.availability, now);
    Ok(MentorDetail {
        mentor: MentorWithUser {
            mentor,
            user: user.as_ref().map(UserSummary::from),
        },
        bookable,
    })
}

pub async fn own(store: &dyn Store, mentor_id: Uuid) -> AppResult<Mentor> {
    load(store, mentor_id).await
}

#[instrument(skip(store, profile))]
pub async fn update_profile(
    store: &dyn Store,
    mentor_id: Uuid,
    profile: UpdateMentorProfile,
) -> AppResult<Mentor> {
    profile.validate()?;
    Ok(store.update_mentor_profile(mentor_id, &profile).await?)
}

fn stale_edit(err: DatabaseError) -> AppError {
    match err {
        DatabaseError::Conflict(_) => AppError::Conflict(
            "Your availability changed since it was loaded. Reload and try again.".to_string(),
        ),
        other => other.into(),
    }
}

/// Save the mentor's edit of one day. Booked and already started slots are
/// never changed by the edit.
#[instrument(skip(store, edit))]
pub async fn save_day(
    store: &dyn Store,
    mentor_id: Uuid,
    date: &str,
    edit: DayEdit,
    now: OffsetDateTime,
) -> AppResult<Mentor> {
    let date = parse_date(date)?;
    let mentor = load(store, mentor_id).await?;
    let read_at = edit.read_at.unwrap_or(mentor.updated_at);

    let mut availability = mentor.availability;
    availability.apply_day_edit(date, &edit.slots, now)?;

    let mentor = store
        .save_availability(mentor_id, &availability, read_at)
        .await
        .map_err(stale_edit)?;
    info!(mentor_id = %mentor_id, date = %date, "Availability saved");
    Ok(mentor)
}

#[instrument(skip(store))]
pub async fn toggle(
    store: &dyn Store,
    mentor_id: Uuid,
    date: &str,
    interval: &str,
    now: OffsetDateTime,
) -> AppResult<ToggleOutcome> {
    let date = parse_date(date)?;
    let interval: Interval = interval.parse()?;
    let mentor = load(store, mentor_id).await?;

    let mut availability = mentor.availability;
    let status = availability.toggle(date, interval, now)?;

    let mentor = store
        .save_availability(mentor_id, &availability, mentor.updated_at)
        .await
        .map_err(stale_edit)?;
    Ok(ToggleOutcome {
        date: format_date(date),
        interval,
        status,
        mentor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NewUser, UserRole};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use time::macros::datetime;

    async fn mentor(store: &MemoryStore) -> Mentor {
        let user = store
            .create_user(NewUser {
                email: "m@example.com".into(),
                password_hash: "x".into(),
                name: Some("Ada".into()),
                role: UserRole::Mentor,
            })
            .await
            .unwrap();
        store.create_mentor(user.id).await.unwrap()
    }

    fn edit(value: serde_json::Value) -> DayEdit {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn save_day_then_detail_lists_bookable_slots() {
        let store = MemoryStore::new();
        let mentor = mentor(&store).await;
        let now = datetime!(2025-04-20 09:00 UTC);

        save_day(
            &store,
            mentor.id,
            "2025-05-01",
            edit(json!({"slots": {"10 - 11": true, "11 - 12": true, "12 - 13": false}})),
            now,
        )
        .await
        .unwrap();

        let detail = detail(&store, mentor.id, now).await.unwrap();
        let labels: Vec<String> = detail.bookable["2025-05-01"].iter().map(|i| i.label()).collect();
        assert_eq!(labels, vec!["10 - 11", "11 - 12"]);
        assert_eq!(detail.mentor.user.unwrap().name.as_deref(), Some("Ada"));

        let later = datetime!(2025-05-02 00:00 UTC);
        assert!(super::detail(&store, mentor.id, later).await.unwrap().bookable.is_empty());
    }

    #[tokio::test]
    async fn edit_based_on_a_stale_copy_is_a_conflict() {
        let store = MemoryStore::new();
        let mentor = mentor(&store).await;
        let now = datetime!(2025-04-20 09:00 UTC);

        toggle(&store, mentor.id, "2025-05-01", "10 - 11", now).await.unwrap();
        let err = save_day(
            &store,
            mentor.id,
            "2025-05-01",
            DayEdit {
                slots: BTreeMap::new(),
                read_at: Some(mentor.updated_at),
            },
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn toggle_flips_and_refuses_past_slots() {
        let store = MemoryStore::new();
        let mentor = mentor(&store).await;
        let now = datetime!(2025-05-01 10:30 UTC);

        let opened = toggle(&store, mentor.id, "2025-05-01", "11 - 12", now).await.unwrap();
        assert_eq!(opened.status, Some(SlotStatus::Open));
        let closed = toggle(&store, mentor.id, "2025-05-01", "11 - 12", now).await.unwrap();
        assert_eq!(closed.status, None);

        let err = toggle(&store, mentor.id, "2025-05-01", "10 - 11", now).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = toggle(&store, mentor.id, "2025-05-01", "10 - 12", now).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
