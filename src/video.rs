//! Video room gate.
//!
//! The conferencing SDK renders the call; this service only decides whether
//! a participant may enter right now and, if so, hands out a signed pass.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::VideoConfig;
use crate::db::Meeting;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("The meeting is not active at this time.")]
    NotActive,

    #[error("failed to encode room pass")]
    Encoding,

    #[error("video service is not configured")]
    NotConfigured,
}

/// Entry is allowed from the meeting's start until its end, inclusive.
pub fn check_room_access(meeting: &Meeting, now: OffsetDateTime) -> Result<(), RoomError> {
    if now < meeting.start_time || now > meeting.end_time {
        return Err(RoomError::NotActive);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomClaims {
    pub app_id: u32,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub max_users: u8,
    /// Unix timestamp after which the pass is void.
    pub expires_at: i64,
}

/// What a client needs to join a room through the SDK.
#[derive(Debug, Clone, Serialize)]
pub struct RoomPass {
    #[serde(flatten)]
    pub claims: RoomClaims,
    pub token: String,
}

pub fn issue_room_pass(
    config: &VideoConfig,
    meeting: &Meeting,
    user_id: Uuid,
    user_name: String,
) -> Result<RoomPass, RoomError> {
    let claims = RoomClaims {
        app_id: config.app_id,
        room_id: meeting.id,
        user_id,
        user_name,
        max_users: config.max_users,
        expires_at: meeting.end_time.unix_timestamp(),
    };
    let token = sign(config, &claims)?;
    Ok(RoomPass { claims, token })
}

fn mac(config: &VideoConfig) -> Result<HmacSha256, RoomError> {
    let secret = config.server_secret.expose_secret();
    if secret.is_empty() {
        return Err(RoomError::NotConfigured);
    }
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| RoomError::NotConfigured)
}

fn sign(config: &VideoConfig, claims: &RoomClaims) -> Result<String, RoomError> {
    let payload = serde_json::to_vec(claims).map_err(|_| RoomError::Encoding)?;
    let mut mac = mac(config)?;
    mac.update(&payload);
    let signature = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&payload),
        URL_SAFE_NO_PAD.encode(signature)
    ))
}
