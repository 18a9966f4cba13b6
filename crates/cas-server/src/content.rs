//! Conditional and range serving of stored objects.
//!
//! Validators are the object's modification time (second precision) and a
//! strong ETag derived from its address. Only single byte ranges are honored;
//! multi-range or malformed `Range` headers get the full body.

use std::io::{self, SeekFrom};
use std::time::SystemTime;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::Response;
use cas_store::ObjectHandle;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Obsolete date forms clients may still send: RFC 850 (two- and four-digit
/// years) and asctime.
const LEGACY_HTTP_DATE_FORMATS: [&str; 3] = [
    "%A, %d-%b-%y %H:%M:%S GMT",
    "%A, %d-%b-%Y %H:%M:%S GMT",
    "%a %b %e %H:%M:%S %Y",
];

/// Requested slice of an object of known length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteRange {
    Full,
    /// Inclusive byte offsets.
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

impl ByteRange {
    /// Interpret a `Range` header value against an object of `len` bytes.
    pub fn parse(value: &str, len: u64) -> Self {
        let Some(ranges) = value.trim().strip_prefix("bytes=") else {
            return Self::Full;
        };
        if ranges.contains(',') {
            return Self::Full;
        }
        let Some((first, last)) = ranges.trim().split_once('-') else {
            return Self::Full;
        };
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            // suffix range: the last N bytes
            let Ok(suffix) = last.parse::<u64>() else {
                return Self::Full;
            };
            if suffix == 0 || len == 0 {
                return Self::Unsatisfiable;
            }
            return Self::Partial {
                start: len.saturating_sub(suffix),
                end: len - 1,
            };
        }

        let Ok(start) = first.parse::<u64>() else {
            return Self::Full;
        };
        let end = if last.is_empty() {
            u64::MAX
        } else {
            match last.parse::<u64>() {
                Ok(end) if end >= start => end,
                _ => return Self::Full,
            }
        };
        if start >= len {
            return Self::Unsatisfiable;
        }
        Self::Partial {
            start,
            end: end.min(len - 1),
        }
    }
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

fn parse_http_date(value: &HeaderValue) -> Option<i64> {
    let s = value.to_str().ok()?.trim();
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.timestamp());
    }
    LEGACY_HTTP_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|t| t.and_utc().timestamp())
}

fn unix_secs(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

fn etag_matches(value: &HeaderValue, etag: &str) -> bool {
    let Ok(s) = value.to_str() else { return false };
    s.split(',').map(str::trim).any(|tag| {
        tag == "*" || tag == etag || tag.strip_prefix("W/") == Some(etag)
    })
}

/// Build the response for `handle`, honoring conditional and range headers.
pub async fn serve_object(mut handle: ObjectHandle, headers: &HeaderMap) -> io::Result<Response> {
    let len = handle.len();
    let modified = unix_secs(handle.modified());
    let last_modified = http_date(handle.modified());
    let etag = format!("\"{}\"", handle.address());

    let base = || {
        Response::builder()
            .header(header::LAST_MODIFIED, last_modified.as_str())
            .header(header::ETAG, etag.as_str())
            .header(header::ACCEPT_RANGES, "bytes")
    };
    let empty = |status: StatusCode| {
        base()
            .status(status)
            .body(Body::empty())
            .map_err(io::Error::other)
    };

    if let Some(since) = headers.get(header::IF_UNMODIFIED_SINCE).and_then(parse_http_date) {
        if modified > since {
            return empty(StatusCode::PRECONDITION_FAILED);
        }
    }
    match headers.get(header::IF_NONE_MATCH) {
        Some(value) => {
            if etag_matches(value, &etag) {
                return empty(StatusCode::NOT_MODIFIED);
            }
        }
        None => {
            if let Some(since) = headers.get(header::IF_MODIFIED_SINCE).and_then(parse_http_date) {
                if modified <= since {
                    return empty(StatusCode::NOT_MODIFIED);
                }
            }
        }
    }

    let range = match headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        Some(value) if if_range_allows(headers, &etag, modified) => ByteRange::parse(value, len),
        _ => ByteRange::Full,
    };

    let builder = base().header(header::CONTENT_TYPE, "application/octet-stream");
    match range {
        ByteRange::Full => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, len)
            .body(Body::from_stream(ReaderStream::new(handle)))
            .map_err(io::Error::other),
        ByteRange::Partial { start, end } => {
            let count = end - start + 1;
            handle.seek(SeekFrom::Start(start)).await?;
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_LENGTH, count)
                .header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{len}"))
                .body(Body::from_stream(ReaderStream::new(handle.take(count))))
                .map_err(io::Error::other)
        }
        ByteRange::Unsatisfiable => base()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{len}"))
            .body(Body::empty())
            .map_err(io::Error::other),
    }
}

/// `If-Range`: only honor the range if the validator still matches.
fn if_range_allows(headers: &HeaderMap, etag: &str, modified: i64) -> bool {
    let Some(value) = headers.get(header::IF_RANGE) else {
        return true;
    };
    if let Some(date) = parse_http_date(value) {
        return date == modified;
    }
    value.to_str().map(|v| v.trim() == etag).unwrap_or(false)
}
