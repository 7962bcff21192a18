use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One booked one-hour session between a user and a mentor.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mentor_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub user_id: Uuid,
    pub mentor_id: Uuid,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
}

/// A meeting as listed for one participant, with the other side's name.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingWithCounterpart {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub counterpart_name: Option<String>,
}
