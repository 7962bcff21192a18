use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::domain::AvailabilityMap;

use super::UserSummary;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Mentor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub domain: Option<String>,
    pub sessions_took: i32,
    pub rating: f64,
    #[sqlx(json)]
    pub availability: AvailabilityMap,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A mentor together with the public fields of its user account.
#[derive(Debug, Clone, Serialize)]
pub struct MentorWithUser {
    #[serde(flatten)]
    pub mentor: Mentor,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMentorProfile {
    #[validate(length(max = 2000, message = "Bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    #[validate(length(min = 1, max = 120, message = "Domain must be between 1 and 120 characters"))]
    pub domain: Option<String>,
}
