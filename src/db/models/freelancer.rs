use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::domain::Skills;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Freelancer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub experience: i32,
    pub projects_completed: i32,
    #[sqlx(json)]
    pub skills: Skills,
    pub contact: Option<String>,
    /// Upfront payment in whole rupees; 0 means none configured.
    pub advance: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Editable part of a freelancer profile, as written to the store.
#[derive(Debug, Clone)]
pub struct FreelancerProfile {
    pub experience: i32,
    pub projects_completed: i32,
    pub skills: Skills,
    pub contact: Option<String>,
    pub advance: i64,
}

impl From<&Freelancer> for FreelancerProfile {
    fn from(freelancer: &Freelancer) -> Self {
        Self {
            experience: freelancer.experience,
            projects_completed: freelancer.projects_completed,
            skills: freelancer.skills.clone(),
            contact: freelancer.contact.clone(),
            advance: freelancer.advance,
        }
    }
}

/// Partial profile update. `skills` is taken raw and normalized by the service.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateFreelancerProfile {
    #[validate(range(min = 0, max = 80, message = "Experience must be between 0 and 80 years"))]
    pub experience: Option<i32>,
    #[validate(range(min = 0, message = "Projects completed cannot be negative"))]
    pub projects_completed: Option<i32>,
    pub skills: Option<serde_json::Value>,
    #[validate(length(max = 200, message = "Contact must be at most 200 characters"))]
    pub contact: Option<String>,
    #[validate(range(min = 0, message = "Advance cannot be negative"))]
    pub advance: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewSkill {
    #[validate(length(min = 1, message = "Please enter both a key and value."))]
    pub key: String,
    #[validate(length(min = 1, message = "Please enter both a key and value."))]
    pub value: String,
}
