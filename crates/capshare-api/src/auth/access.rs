//! Access validation for capability URLs.
//!
//! Turns the `username`, `sig` and `access` query parameters into a verified
//! grant bound to one resolved path, or a rejection reason. The reason is only
//! ever logged; clients see a uniform 403.

use axum::extract::{rejection::QueryRejection, Query};
use capshare_core::grant::{self, GrantError};
use capshare_core::{AccessGrant, AppError, Permission, ResolvedPath, UserKeys};
use serde::Deserialize;

/// Query parameters carrying a capability.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AccessQuery {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub sig: String,
    #[serde(default)]
    pub access: String,
    /// Upload only: serve inline instead of as an attachment.
    #[serde(default)]
    pub preview: Option<String>,
}

impl AccessQuery {
    pub fn wants_preview(&self) -> bool {
        self.preview.as_deref() == Some("true")
    }

    /// Unwrap the `Query` extractor. A query string that does not
    /// deserialize (a duplicated key, say) is a rejected grant.
    pub fn from_extractor(
        query: Result<Query<AccessQuery>, QueryRejection>,
    ) -> Result<Self, AccessDenied> {
        query
            .map(|Query(query)| query)
            .map_err(|e| AccessDenied::BadQuery(e.body_text()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccessDenied {
    #[error("unreadable query string: {0}")]
    BadQuery(String),

    #[error("unknown user")]
    UnknownUser,

    #[error("signature mismatch")]
    BadSignature,

    #[error("malformed grant: {0}")]
    Malformed(#[from] GrantError),

    #[error("grant expired")]
    Expired,

    #[error("grant does not allow this operation")]
    WrongPermission,

    #[error("token is not a safe path component")]
    UnsafeToken,
}

impl From<AccessDenied> for AppError {
    fn from(reason: AccessDenied) -> Self {
        AppError::Forbidden(reason.to_string())
    }
}

/// A verified grant and the key it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAccess {
    pub username: String,
    pub grant: AccessGrant,
    pub path: ResolvedPath,
}

/// Validate a capability for `required` at time `now` (Unix seconds).
///
/// Checks run in a fixed order and stop at the first failure: user lookup,
/// signature, payload decoding, expiry, permission, token safety.
pub fn validate_access(
    users: &UserKeys,
    query: &AccessQuery,
    required: Permission,
    now: i64,
) -> Result<ValidatedAccess, AccessDenied> {
    let key = users
        .get(&query.username)
        .ok_or(AccessDenied::UnknownUser)?;

    if !grant::verify(key, &query.access, &query.sig) {
        return Err(AccessDenied::BadSignature);
    }

    let grant = grant::decode(&query.access)?;

    if grant.is_expired_at(now) {
        return Err(AccessDenied::Expired);
    }

    if grant.permission != required {
        return Err(AccessDenied::WrongPermission);
    }

    if !grant.has_safe_token() {
        return Err(AccessDenied::UnsafeToken);
    }

    let path = ResolvedPath::resolve(&query.username, &grant.token);

    Ok(ValidatedAccess {
        username: query.username.clone(),
        grant,
        path,
    })
}
