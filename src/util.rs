use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tokio::fs::File as AsyncFile;
use tokio::io::{AsyncRead, BufWriter};

use std::path::Path;
use std::time::{Duration, SystemTime};

/// Characters that may not appear in a directory name on Windows, plus '.'
/// and ':' (the platform itself strips both from folder titles).
const FORBIDDEN_CHARS: &[char] = &['.', ':', '/', '\\', '*', '?', '<', '>', '|', '"'];

/// Strips every forbidden character from a course or folder title. Deletion
/// only, no substitution: "CS:101/Intro" becomes "CS101Intro". Distinct
/// titles can collapse onto the same directory name this way.
pub fn sanitize(name: &str) -> String {
	name.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect()
}

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parses a Last-Modified header value, e.g. "Mon, 06 Apr 2020 13:37:00 GMT".
/// The server only ever emits this one fixed format.
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
	let parsed = NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT).ok()?;
	let secs = parsed.and_utc().timestamp();
	if secs < 0 {
		return None;
	}
	Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64))
}

pub async fn write_file_data<R: ?Sized>(path: &Path, data: &mut R) -> Result<()>
where
	R: AsyncRead + Unpin,
{
	let file = AsyncFile::create(&path).await.context("failed to create file")?;
	let mut file = BufWriter::new(file);
	tokio::io::copy(data, &mut file).await.context("failed to write to file")?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sanitize_strips_the_entire_forbidden_set() {
		let cleaned = sanitize("a.b:c/d\\e*f?g<h>i|j\"k");
		assert_eq!(cleaned, "abcdefghijk");
		assert!(!cleaned.contains(|c| FORBIDDEN_CHARS.contains(&c)));
	}

	#[test]
	fn sanitize_is_idempotent() {
		let once = sanitize("CS:101/Intro");
		assert_eq!(once, "CS101Intro");
		assert_eq!(sanitize(&once), once);
	}

	#[test]
	fn sanitize_keeps_clean_names_untouched() {
		assert_eq!(sanitize("Exercises"), "Exercises");
		assert_eq!(sanitize(""), "");
	}

	#[test]
	fn sanitize_can_collapse_distinct_names() {
		assert_eq!(sanitize("a.b"), sanitize("ab"));
	}

	#[test]
	fn http_date_parses_the_fixed_format() {
		let parsed = parse_http_date("Mon, 06 Apr 2020 13:37:00 GMT").unwrap();
		assert_eq!(
			parsed.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs(),
			1586180220
		);
	}

	#[test]
	fn http_date_rejects_garbage() {
		assert!(parse_http_date("").is_none());
		assert!(parse_http_date("yesterday").is_none());
		assert!(parse_http_date("2020-04-06T13:37:00Z").is_none());
	}

	#[test]
	fn http_date_ordering_matches_wall_clock() {
		let older = parse_http_date("Mon, 06 Apr 2020 13:37:00 GMT").unwrap();
		let newer = parse_http_date("Mon, 06 Apr 2020 13:37:01 GMT").unwrap();
		assert!(older < newer);
	}
}
