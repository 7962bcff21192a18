//! Booking a mentor's open slot.

use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{DatabaseError, Meeting, Mentor, NewMeeting, Store};
use crate::domain::availability::parse_date;
use crate::domain::{Interval, SlotStatus};
use crate::error::{AppError, AppResult};
use crate::session::Session;

#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub meeting: Meeting,
    /// The mentor as stored after the booking.
    pub mentor: Mentor,
}

fn selected(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Book `interval` on `date` with the given mentor for the logged-in user.
///
/// The slot is claimed by the store in the same step that records the
/// meeting, so two concurrent bookings of one slot produce exactly one
/// meeting; the loser gets `AppError::Conflict`.
#[instrument(skip(store, principal), fields(user_id = ?principal.map(|p| p.user_id)))]
pub async fn book(
    store: &dyn Store,
    mentor_id: Uuid,
    date: Option<&str>,
    interval: Option<&str>,
    principal: Option<&Session>,
) -> AppResult<BookingOutcome> {
    let (Some(date), Some(interval)) = (selected(date), selected(interval)) else {
        return Err(AppError::Validation(
            "please select both a date and time".to_string(),
        ));
    };
    let date = parse_date(date)?;
    let interval: Interval = interval.parse()?;

    let principal =
        principal.ok_or_else(|| AppError::Authentication("You must be logged in.".to_string()))?;

    let mentor = store
        .get_mentor(mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Mentor {mentor_id} not found")))?;

    if mentor.availability.status(date, interval) != Some(SlotStatus::Open) {
        return Err(AppError::Validation(format!(
            "The slot {} {} is not available",
            date, interval
        )));
    }

    let (start_time, end_time) = interval.window(date)?;

    let meeting = store
        .book_slot(
            NewMeeting {
                user_id: principal.user_id,
                mentor_id,
                start_time,
                end_time,
            },
            date,
            interval,
        )
        .await
        .map_err(|e| match e {
            DatabaseError::Conflict(_) => {
                AppError::Conflict("This slot was just booked by someone else.".to_string())
            }
            other => other.into(),
        })?;

    let mentor = store
        .get_mentor(mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Mentor {mentor_id} not found")))?;

    info!(meeting_id = %meeting.id, mentor_id = %mentor_id, "Session booked");
    Ok(BookingOutcome { meeting, mentor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NewUser, UserRole};
    use crate::domain::AvailabilityMap;
    use serde_json::json;
    use time::macros::datetime;
    use time::OffsetDateTime;

    const NOW: OffsetDateTime = datetime!(2025-04-20 09:00 UTC);

    async fn setup() -> (MemoryStore, Mentor, Session) {
        let store = MemoryStore::new();
        let mentor_user = store
            .create_user(NewUser {
                email: "mentor@example.com".into(),
                password_hash: "x".into(),
                name: Some("Ada".into()),
                role: UserRole::Mentor,
            })
            .await
            .unwrap();
        let mentor = store.create_mentor(mentor_user.id).await.unwrap();
        let availability: AvailabilityMap =
            serde_json::from_value(json!({"2025-05-01": {"10 - 11": true, "11 - 12": "booked"}}))
                .unwrap();
        let mentor = store
            .save_availability(mentor.id, &availability, mentor.updated_at)
            .await
            .unwrap();

        let session = Session {
            token: "token".into(),
            user_id: Uuid::now_v7(),
            role: UserRole::User,
            mentor_id: None,
            freelancer_id: None,
            issued_at: NOW,
            expires_at: NOW + time::Duration::hours(1),
        };
        (store, mentor, session)
    }

    #[tokio::test]
    async fn unselected_date_or_time_is_a_validation_error() {
        let (store, mentor, session) = setup().await;
        let selections = [
            (None, Some("10 - 11")),
            (Some("2025-05-01"), None),
            (Some(" "), Some("10 - 11")),
        ];
        for (date, interval) in selections {
            let err = book(&store, mentor.id, date, interval, Some(&session))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                AppError::Validation(ref m) if m == "please select both a date and time"
            ));
        }
    }

    #[tokio::test]
    async fn anonymous_booking_is_refused() {
        let (store, mentor, _) = setup().await;
        let err = book(&store, mentor.id, Some("2025-05-01"), Some("10 - 11"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn booking_marks_the_slot_and_creates_the_meeting() {
        let (store, mentor, session) = setup().await;
        let outcome = book(&store, mentor.id, Some("2025-05-01"), Some("10 - 11"), Some(&session))
            .await
            .unwrap();

        assert_eq!(outcome.meeting.start_time, datetime!(2025-05-01 10:00 UTC));
        assert_eq!(outcome.meeting.end_time, datetime!(2025-05-01 11:00 UTC));
        assert_eq!(outcome.meeting.user_id, session.user_id);

        let date = parse_date("2025-05-01").unwrap();
        let interval: Interval = "10 - 11".parse().unwrap();
        assert_eq!(outcome.mentor.availability.status(date, interval), Some(SlotStatus::Booked));

        let again = book(&store, mentor.id, Some("2025-05-01"), Some("10 - 11"), Some(&session))
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::Validation(_)));
        assert_eq!(store.list_meetings_for_mentor(mentor.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn absent_and_booked_slots_are_refused() {
        let (store, mentor, session) = setup().await;
        for interval in ["11 - 12", "12 - 13"] {
            let err = book(&store, mentor.id, Some("2025-05-01"), Some(interval), Some(&session))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert!(store.list_meetings_for_mentor(mentor.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn slot_without_a_representable_end_is_refused() {
        let (store, mentor, session) = setup().await;
        let availability: AvailabilityMap =
            serde_json::from_value(json!({"9999-12-31": {"23 - 24": true}})).unwrap();
        store
            .save_availability(mentor.id, &availability, mentor.updated_at)
            .await
            .unwrap();

        let err = book(&store, mentor.id, Some("9999-12-31"), Some("23 - 24"), Some(&session))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_meetings_for_mentor(mentor.id).await.unwrap().is_empty());
    }
}
