//! Helpers behind the `capshare` command: argument parsing and link building.

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use capshare_core::grant;
use capshare_core::{AccessGrant, Permission};

/// Parse `30s`, `10m`, `2h`, `7d` or a combination such as `1h30m` or
/// `1d12h` into seconds. A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<i64> {
    let input = input.trim();
    if input.is_empty() {
        bail!("invalid duration \"\"");
    }

    let mut rest = input;
    let mut total: i64 = 0;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, tail) = rest.split_at(digits_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let value: i64 = digits
            .parse()
            .with_context(|| format!("invalid duration \"{}\"", input))?;

        let multiplier = match unit.trim() {
            "" | "s" => 1,
            "m" => 60,
            "h" => 60 * 60,
            "d" => 24 * 60 * 60,
            other => bail!("unknown duration unit \"{}\" (use s, m, h or d)", other),
        };

        total = value
            .checked_mul(multiplier)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(|| anyhow!("duration \"{}\" is too large", input))?;
        rest = tail;
    }

    Ok(total)
}

/// Parse `512B`, `64KB`, `10MB` or `2GB` (decimal units) into bytes.
pub fn parse_size(input: &str) -> Result<u64> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    let value: u64 = digits
        .parse()
        .with_context(|| format!("invalid size \"{}\"", input))?;

    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1_000,
        "MB" => 1_000_000,
        "GB" => 1_000_000_000,
        other => bail!("unknown size unit \"{}\" (use B, KB, MB or GB)", other),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow!("size \"{}\" is too large", input))
}

/// `r` / `read` or `w` / `write`.
pub fn parse_permission(input: &str) -> Result<Permission> {
    input.trim().to_ascii_lowercase().parse()
}

/// Eight random bytes, base64url without padding.
pub fn random_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 8]>())
}

/// Sign `grant` and append the query to the public URL. Write grants point at
/// the upload page, read grants at the download root.
pub fn build_link(
    public_url: &str,
    username: &str,
    key: &[u8],
    grant: &AccessGrant,
) -> Result<String> {
    let mut link = public_url.to_string();
    if !link.ends_with('/') {
        link.push('/');
    }
    if grant.permission == Permission::Write {
        link.push_str("upload");
    }
    link.push('?');
    link.push_str(&grant::sign(username, key, grant)?.to_query_string());
    Ok(link)
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("45").unwrap(), 45);
        assert_eq!(parse_duration("30s").unwrap(), 30);
        assert_eq!(parse_duration("10m").unwrap(), 600);
        assert_eq!(parse_duration("2h").unwrap(), 7_200);
        assert_eq!(parse_duration("7d").unwrap(), 604_800);
    }

    #[test]
    fn parse_duration_combines_units() {
        assert_eq!(parse_duration("1h30m").unwrap(), 5_400);
        assert_eq!(parse_duration("1d12h").unwrap(), 129_600);
        assert_eq!(parse_duration("2m30").unwrap(), 150);
        assert_eq!(parse_duration("1d2h3m4s").unwrap(), 93_784);
        assert!(parse_duration("1h30x").is_err());
        assert!(parse_duration("1hm").is_err());
        assert!(parse_duration("9223372036854775807s1s").is_err());
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10y").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("-5m").is_err());
    }

    #[test]
    fn parse_size_units() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("512B").unwrap(), 512);
        assert_eq!(parse_size("64KB").unwrap(), 64_000);
        assert_eq!(parse_size("10MB").unwrap(), 10_000_000);
        assert_eq!(parse_size("2gb").unwrap(), 2_000_000_000);
    }

    #[test]
    fn parse_size_rejects_garbage() {
        assert!(parse_size("10TB").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("99999999999999999999GB").is_err());
    }

    #[test]
    fn parse_permission_accepts_short_and_long() {
        assert_eq!(parse_permission("r").unwrap(), Permission::Read);
        assert_eq!(parse_permission("Write").unwrap(), Permission::Write);
        assert!(parse_permission("x").is_err());
    }

    #[test]
    fn random_token_is_safe_path_component() {
        let token = random_token();
        assert_eq!(token.len(), 11);
        let grant = AccessGrant {
            token,
            until: 0,
            max_size: 0,
            permission: Permission::Read,
        };
        assert!(grant.has_safe_token());
    }

    #[test]
    fn build_link_points_writes_at_upload() {
        let grant = AccessGrant {
            token: "t".to_string(),
            until: 1_700_000_000,
            max_size: 10,
            permission: Permission::Write,
        };
        let link = build_link("https://share.example.com", "alice", b"key", &grant).unwrap();
        assert!(link.starts_with("https://share.example.com/upload?username=alice&sig="));

        let read = AccessGrant {
            permission: Permission::Read,
            ..grant
        };
        let link = build_link("https://share.example.com/", "alice", b"key", &read).unwrap();
        assert!(link.starts_with("https://share.example.com/?username=alice&sig="));

        // the link verifies against the same key
        let access = link.split("access=").nth(1).unwrap();
        let sig = link
            .split("sig=")
            .nth(1)
            .unwrap()
            .split('&')
            .next()
            .unwrap();
        assert!(grant::verify(b"key", access, sig));
    }
}
