use std::borrow::Cow;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::db::{DatabaseError, NewUser, Store, User, UserRole};
use crate::error::{AppError, AppResult};
use crate::session::{Session, SessionStore};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "check_passwords"))]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    pub password: SecretBox<String>,
    pub confirm_password: SecretBox<String>,
    pub role: UserRole,
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: Option<String>,
}

// Secrets are not `Serialize`, so the password rules run at struct level.
fn check_passwords(request: &RegisterRequest) -> Result<(), ValidationError> {
    if request.password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
        let mut err = ValidationError::new("password_length");
        err.message = Some(Cow::Borrowed("Password must be at least 8 characters"));
        return Err(err);
    }
    if request.password.expose_secret() != request.confirm_password.expose_secret() {
        let mut err = ValidationError::new("password_mismatch");
        err.message = Some(Cow::Borrowed("Passwords do not match"));
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    pub password: SecretBox<String>,
}

/// The logged-in user plus the ids of its role-specific profile.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user: User,
    pub mentor_id: Option<Uuid>,
    pub freelancer_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub principal: Principal,
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {e}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

async fn run_blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Background task failed: {e}")))?
}

/// Create an account and, for mentors and freelancers, their empty profile.
#[instrument(skip(store, request), fields(role = ?request.role))]
pub async fn register(store: &dyn Store, request: RegisterRequest) -> AppResult<User> {
    request.validate()?;

    let password = request.password.expose_secret().clone();
    let password_hash = run_blocking(move || hash_password(&password)).await?;

    let user = store
        .create_user(NewUser {
            email: request.email.trim().to_lowercase(),
            password_hash,
            name: request.name,
            role: request.role,
        })
        .await
        .map_err(|e| match e {
            DatabaseError::Duplicate => AppError::Conflict(
                "Email is already registered. Please use a different email.".to_string(),
            ),
            other => other.into(),
        })?;

    match user.role {
        UserRole::Mentor => {
            store.create_mentor(user.id).await?;
        }
        UserRole::Freelancer => {
            store.create_freelancer(user.id).await?;
        }
        UserRole::User => {}
    }

    info!(user_id = %user.id, "Account registered");
    Ok(user)
}

async fn principal_for(store: &dyn Store, user: User) -> AppResult<Principal> {
    let mentor_id = match user.role {
        UserRole::Mentor => store.get_mentor_by_user(user.id).await?.map(|m| m.id),
        _ => None,
    };
    let freelancer_id = match user.role {
        UserRole::Freelancer => store.get_freelancer_by_user(user.id).await?.map(|f| f.id),
        _ => None,
    };
    Ok(Principal {
        user,
        mentor_id,
        freelancer_id,
    })
}

#[instrument(skip(store, sessions, request))]
pub async fn login(
    store: &dyn Store,
    sessions: &SessionStore,
    request: LoginRequest,
) -> AppResult<LoginResponse> {
    request.validate()?;
    let invalid = || AppError::Authentication("Invalid email or password".to_string());

    let user = store
        .get_user_by_email(&request.email.trim().to_lowercase())
        .await?
        .ok_or_else(invalid)?;

    let password = request.password.expose_secret().clone();
    let stored_hash = user.password_hash.clone();
    let verified = run_blocking(move || Ok(verify_password(&password, &stored_hash))).await?;
    if !verified {
        return Err(invalid());
    }

    let principal = principal_for(store, user).await?;
    let session = sessions
        .issue(
            principal.user.id,
            principal.user.role,
            principal.mentor_id,
            principal.freelancer_id,
        )
        .await;

    info!(user_id = %principal.user.id, "Logged in");
    Ok(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        principal,
    })
}

pub async fn current_principal(store: &dyn Store, session: &Session) -> AppResult<Principal> {
    let user = store
        .get_user(session.user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))?;
    principal_for(store, user).await
}
