//! Capability codec.
//!
//! A grant travels as two query parameters:
//! `access = base64url(json(grant))` and `sig = base64url(HMAC-SHA256(key, access))`.
//! The MAC is computed over the *encoded* payload string, so verification never
//! has to re-serialize anything.

use crate::models::AccessGrant;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    #[error("grant payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("grant payload is not a valid grant: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("signing key rejected")]
    InvalidKey,
}

/// Query parameters that carry a signed grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    pub username: String,
    pub sig: String,
    pub access: String,
}

impl SignedQuery {
    /// `username=..&sig=..&access=..`; every value is already URL-safe.
    pub fn to_query_string(&self) -> String {
        format!(
            "username={}&sig={}&access={}",
            percent_encode_username(&self.username),
            self.sig,
            self.access
        )
    }
}

/// RFC 3986 unreserved characters stay as-is.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn percent_encode_username(username: &str) -> String {
    utf8_percent_encode(username, QUERY_VALUE).to_string()
}

fn mac(key: &[u8], encoded_payload: &str) -> Result<HmacSha256, GrantError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| GrantError::InvalidKey)?;
    mac.update(encoded_payload.as_bytes());
    Ok(mac)
}

/// Serialize and base64-encode a grant.
pub fn encode(grant: &AccessGrant) -> Result<String, GrantError> {
    let json = serde_json::to_vec(grant)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Signature (base64url) of an encoded payload.
pub fn signature(key: &[u8], encoded_payload: &str) -> Result<String, GrantError> {
    let tag = mac(key, encoded_payload)?.finalize().into_bytes();
    Ok(URL_SAFE_NO_PAD.encode(tag))
}

/// Encode and sign a grant for `username`.
pub fn sign(username: &str, key: &[u8], grant: &AccessGrant) -> Result<SignedQuery, GrantError> {
    let access = encode(grant)?;
    let sig = signature(key, &access)?;
    Ok(SignedQuery {
        username: username.to_string(),
        sig,
        access,
    })
}

/// Inverse of [`encode`].
pub fn decode(encoded_payload: &str) -> Result<AccessGrant, GrantError> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded_payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Constant-time check of `supplied_sig` against the MAC of `encoded_payload`.
pub fn verify(key: &[u8], encoded_payload: &str, supplied_sig: &str) -> bool {
    let Ok(supplied) = URL_SAFE_NO_PAD.decode(supplied_sig) else {
        return false;
    };
    match mac(key, encoded_payload) {
        Ok(mac) => mac.verify_slice(&supplied).is_ok(),
        Err(_) => false,
    }
}
