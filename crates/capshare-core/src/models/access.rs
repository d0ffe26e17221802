use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Operation a grant authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "r",
            Permission::Write => "w",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" | "read" => Ok(Permission::Read),
            "w" | "write" => Ok(Permission::Write),
            other => Err(anyhow::anyhow!(
                "unsupported permission \"{}\", should be either \"w\" or \"r\"",
                other
            )),
        }
    }
}

/// Access grant carried, signed and base64-encoded, in the `access` query parameter.
///
/// The short field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Opaque resource identifier chosen by the issuer.
    #[serde(rename = "t")]
    pub token: String,
    /// Absolute expiry, Unix seconds.
    #[serde(rename = "u")]
    pub until: i64,
    /// Byte ceiling, enforced on write grants only.
    #[serde(rename = "s")]
    pub max_size: u64,
    #[serde(rename = "p")]
    pub permission: Permission,
}

impl AccessGrant {
    /// `now >= until` counts as expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.until
    }

    /// Whether `token` can be used as a single path component.
    pub fn has_safe_token(&self) -> bool {
        let token = self.token.as_str();
        !token.is_empty()
            && token != "."
            && token != ".."
            && !token.contains(['/', '\\', '\0'])
    }
}

#[derive(Serialize)]
struct PathParts<'a> {
    u: &'a str,
    a: &'a str,
}

/// Storage, metadata and lock key derived from `(username, token)`.
///
/// Encoded as base64url (no padding) of `{"u": username, "a": token}`, so two
/// distinct pairs never collide and the result never contains a separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedPath(String);

impl ResolvedPath {
    pub fn resolve(username: &str, token: &str) -> Self {
        let json = serde_json::to_vec(&PathParts {
            u: username,
            a: token,
        })
        .unwrap_or_default();
        ResolvedPath(URL_SAFE_NO_PAD.encode(json))
    }

    /// Wrap a key read back from the metadata store.
    pub fn from_key(key: impl Into<String>) -> Self {
        ResolvedPath(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResolvedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ResolvedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(token: &str) -> AccessGrant {
        AccessGrant {
            token: token.to_string(),
            until: 100,
            max_size: 10,
            permission: Permission::Write,
        }
    }

    #[test]
    fn test_grant_wire_format() {
        let json = serde_json::to_string(&grant("abc")).unwrap();
        assert_eq!(json, r#"{"t":"abc","u":100,"s":10,"p":"w"}"#);
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let g = grant("abc");
        assert!(!g.is_expired_at(99));
        assert!(g.is_expired_at(100));
        assert!(g.is_expired_at(101));
    }

    #[test]
    fn test_unsafe_tokens() {
        assert!(grant("report-2024").has_safe_token());
        assert!(!grant("").has_safe_token());
        assert!(!grant(".").has_safe_token());
        assert!(!grant("..").has_safe_token());
        assert!(!grant("a/b").has_safe_token());
        assert!(!grant("a\\b").has_safe_token());
    }

    #[test]
    fn test_resolved_path_is_injective() {
        // naive concatenation would map both of these to "ab"
        let a = ResolvedPath::resolve("a", "b");
        let b = ResolvedPath::resolve("ab", "");
        let c = ResolvedPath::resolve("", "ab");
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(a, ResolvedPath::resolve("a", "b"));
    }

    #[test]
    fn test_resolved_path_is_single_component() {
        let path = ResolvedPath::resolve("alice", "../../etc/passwd");
        assert!(!path.as_str().contains('/'));
        assert!(!path.as_str().contains('.'));
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("r".parse::<Permission>().unwrap(), Permission::Read);
        assert_eq!("write".parse::<Permission>().unwrap(), Permission::Write);
        assert!("x".parse::<Permission>().is_err());
    }
}
