//! Single `Range: bytes=` header parsing.

use axum::http::HeaderValue;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable Range header; serve everything.
    Full,
    /// Half-open byte range within the object.
    Partial(Range<u64>),
    /// Syntactically valid but outside the object.
    Unsatisfiable,
}

/// Interpret a Range header against an object of `size` bytes.
///
/// Malformed headers and multi-range requests are ignored (full response),
/// which RFC 9110 allows.
pub fn parse_range(value: Option<&HeaderValue>, size: u64) -> ByteRange {
    let Some(value) = value else {
        return ByteRange::Full;
    };
    let Ok(value) = value.to_str() else {
        return ByteRange::Full;
    };
    let Some(spec) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start_part, end_part)) = spec.split_once('-') else {
        return ByteRange::Full;
    };
    let (start_part, end_part) = (start_part.trim(), end_part.trim());

    if start_part.is_empty() {
        // suffix range: last N bytes
        let Ok(suffix) = end_part.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial(size.saturating_sub(suffix)..size);
    }

    let Ok(start) = start_part.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end_inclusive = if end_part.is_empty() {
        None
    } else {
        match end_part.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= size {
        return ByteRange::Unsatisfiable;
    }

    let end = end_inclusive.map_or(size, |e| e.saturating_add(1).min(size));
    ByteRange::Partial(start..end)
}
