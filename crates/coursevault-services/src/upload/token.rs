//! Signed bearer token for upload sessions.
//!
//! Payload: expiry_ts (u64 BE) || owner (16 bytes) || session_id (16 bytes)
//! || declared_size (u64 BE) || SHA-256(file_name)[..16] = 64 bytes.
//! Token = base64url(payload || HMAC-SHA256(secret, payload)).
//!
//! The token is verifiable offline (signature + expiry) without a database
//! round trip; the authoritative session record is still looked up by token
//! before any state transition, so a forged token alone cannot bypass the
//! session-existence check.

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use coursevault_core::AppError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const NAME_DIGEST_LEN: usize = 16;
const PAYLOAD_LEN: usize = 8 + 16 + 16 + 8 + NAME_DIGEST_LEN;
const MAC_LEN: usize = 32; // SHA256
const TOKEN_LEN: usize = PAYLOAD_LEN + MAC_LEN;

/// Claims carried by a verified upload token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTokenClaims {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub declared_size: u64,
    pub name_digest: [u8; NAME_DIGEST_LEN],
    pub expires_at: DateTime<Utc>,
}

/// Truncated SHA-256 digest binding the declared filename into the token
pub fn name_digest(file_name: &str) -> [u8; NAME_DIGEST_LEN] {
    let digest = Sha256::digest(file_name.as_bytes());
    let mut out = [0u8; NAME_DIGEST_LEN];
    out.copy_from_slice(&digest[..NAME_DIGEST_LEN]);
    out
}

/// Build a signed upload token binding owner, session, filename and size.
pub fn create(
    user_id: Uuid,
    session_id: Uuid,
    file_name: &str,
    declared_size: u64,
    expires_at: DateTime<Utc>,
    secret: &[u8],
) -> String {
    let expiry_ts = expires_at.timestamp().max(0) as u64;

    let mut payload = [0u8; PAYLOAD_LEN];
    payload[0..8].copy_from_slice(&expiry_ts.to_be_bytes());
    payload[8..24].copy_from_slice(user_id.as_bytes());
    payload[24..40].copy_from_slice(session_id.as_bytes());
    payload[40..48].copy_from_slice(&declared_size.to_be_bytes());
    payload[48..64].copy_from_slice(&name_digest(file_name));

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(&payload);
    let tag = mac.finalize().into_bytes();

    let mut token_bytes = [0u8; TOKEN_LEN];
    token_bytes[0..PAYLOAD_LEN].copy_from_slice(&payload);
    token_bytes[PAYLOAD_LEN..].copy_from_slice(&tag);

    base64_url_encode(&token_bytes)
}

/// Verify signature and expiry, returning the claims.
///
/// `TokenInvalid` covers malformed encodings and bad signatures;
/// `TokenExpired` a valid signature past its window.
pub fn verify(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<UploadTokenClaims, AppError> {
    let decoded = base64_url_decode(token).map_err(|_| AppError::TokenInvalid)?;
    if decoded.len() != TOKEN_LEN {
        return Err(AppError::TokenInvalid);
    }
    let (payload, tag) = decoded.split_at(PAYLOAD_LEN);
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(payload);
    mac.verify_slice(tag).map_err(|_| AppError::TokenInvalid)?;

    let expiry_ts = u64::from_be_bytes(payload[0..8].try_into().expect("fixed slice"));
    let expires_at = Utc
        .timestamp_opt(expiry_ts as i64, 0)
        .single()
        .ok_or(AppError::TokenInvalid)?;
    // The payload stores whole seconds; compare at the same granularity
    if now.timestamp() > expires_at.timestamp() {
        return Err(AppError::TokenExpired);
    }

    let user_id = Uuid::from_bytes(payload[8..24].try_into().expect("fixed slice"));
    let session_id = Uuid::from_bytes(payload[24..40].try_into().expect("fixed slice"));
    let declared_size = u64::from_be_bytes(payload[40..48].try_into().expect("fixed slice"));
    let mut digest = [0u8; NAME_DIGEST_LEN];
    digest.copy_from_slice(&payload[48..64]);

    Ok(UploadTokenClaims {
        user_id,
        session_id,
        declared_size,
        name_digest: digest,
        expires_at,
    })
}

fn base64_url_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
}
