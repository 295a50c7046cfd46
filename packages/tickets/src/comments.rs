// ABOUTME: Comment log serialization embedded in the ticket's comment column
// ABOUTME: Format: `[author-id|rfc3339]content` entries joined by a blank line
//
// Canonical escape rule: the serializer inserts a guard space into any
// `\n\n[` sequence inside content, and the parser strips exactly one such
// guard space back out. A blank line followed by `[` therefore only ever
// opens a new entry. Content that itself contains the literal guarded
// sequence `\n\n [` loses that one space on a round trip.
//
// Entries carry no numeric id; an entry is addressed by the SHA-256
// fingerprint of its raw author designation, raw timestamp, and content.
// Editing rewrites content only and leaves every other entry byte-identical.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use guichet_storage::StorageError;

#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Only the original author may edit a comment")]
    Forbidden,
    #[error("No comment matches the given fingerprint")]
    NotFound,
    #[error("Ticket not found")]
    TicketNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One parsed entry of a ticket's comment log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub author_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    /// Derived identity used for edits; stable as long as the entry itself
    /// is untouched.
    pub fingerprint: String,
}

struct Header<'a> {
    raw_author: &'a str,
    raw_timestamp: &'a str,
    author_id: i64,
    timestamp: DateTime<Utc>,
    content_start: usize,
}

/// Parse `[author|timestamp]` at the start of a segment. Returns `None` when
/// the text does not form a well-formed header.
fn parse_header(segment: &str) -> Option<Header<'_>> {
    let rest = segment.strip_prefix('[')?;
    let close = rest.find(']')?;
    let inside = &rest[..close];
    let (raw_author, raw_timestamp) = inside.split_once('|')?;

    let author_id = raw_author.parse::<i64>().ok()?;
    let timestamp = DateTime::parse_from_rfc3339(raw_timestamp)
        .ok()?
        .with_timezone(&Utc);

    Some(Header {
        raw_author,
        raw_timestamp,
        author_id,
        timestamp,
        // '[' + inside + ']'
        content_start: 1 + close + 1,
    })
}

/// Split a serialized log into raw entry segments. A boundary is a blank
/// line followed by a well-formed header; anything else stays inside the
/// current segment.
fn split_segments(log: &str) -> Vec<&str> {
    if log.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut start = 0;
    let mut search_from = 0;

    while let Some(found) = log[search_from..].find("\n\n[") {
        let boundary = search_from + found;
        let candidate = boundary + 2;
        if parse_header(&log[candidate..]).is_some() {
            segments.push(&log[start..boundary]);
            start = candidate;
            search_from = candidate;
        } else {
            search_from = boundary + 1;
        }
    }

    segments.push(&log[start..]);
    segments
}

fn escape(content: &str) -> String {
    content.replace("\n\n[", "\n\n [")
}

fn unescape(content: &str) -> String {
    content.replace("\n\n [", "\n\n[")
}

fn fingerprint(raw_author: &str, raw_timestamp: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_author.as_bytes());
    hasher.update(b"|");
    hasher.update(raw_timestamp.as_bytes());
    hasher.update(b"|");
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Serialize one entry and append it to an existing log.
pub fn append_entry(
    log: &str,
    author_id: i64,
    timestamp: DateTime<Utc>,
    content: &str,
) -> String {
    let entry = format!(
        "[{}|{}]{}",
        author_id,
        format_timestamp(timestamp),
        escape(content)
    );
    if log.is_empty() {
        entry
    } else {
        format!("{}\n\n{}", log, entry)
    }
}

/// Parse a serialized log. Malformed segments degrade to a null author and
/// the provided fallback timestamp instead of failing the whole read; their
/// fingerprint is computed over the raw segment so they stay addressable.
pub fn parse_log(log: &str, fallback_now: DateTime<Utc>) -> Vec<CommentEntry> {
    split_segments(log)
        .into_iter()
        .map(|segment| match parse_header(segment) {
            Some(header) => {
                let content = unescape(&segment[header.content_start..]);
                CommentEntry {
                    author_id: Some(header.author_id),
                    timestamp: header.timestamp,
                    fingerprint: fingerprint(header.raw_author, header.raw_timestamp, &content),
                    content,
                }
            }
            None => CommentEntry {
                author_id: None,
                timestamp: fallback_now,
                fingerprint: fingerprint("", "", segment),
                content: segment.to_string(),
            },
        })
        .collect()
}

/// Replace the content of the entry matching `target_fingerprint`, leaving
/// author and timestamp untouched. Fails with `Forbidden` unless `author_id`
/// is the entry's original author, with `NotFound` when no entry matches.
pub fn edit_entry(
    log: &str,
    target_fingerprint: &str,
    author_id: i64,
    new_content: &str,
) -> Result<String, CommentError> {
    let fallback = Utc::now();
    let segments = split_segments(log);
    let entries = parse_log(log, fallback);

    for (index, entry) in entries.iter().enumerate() {
        if entry.fingerprint != target_fingerprint {
            continue;
        }

        if entry.author_id != Some(author_id) {
            return Err(CommentError::Forbidden);
        }

        // Safe: a matching entry with an author id always has a header.
        let header = match parse_header(segments[index]) {
            Some(header) => header,
            None => return Err(CommentError::Forbidden),
        };

        let rebuilt = format!(
            "[{}|{}]{}",
            header.raw_author,
            header.raw_timestamp,
            escape(new_content)
        );

        let mut out: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        out[index] = rebuilt;
        return Ok(out.join("\n\n"));
    }

    Err(CommentError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, secs).unwrap()
    }

    #[test]
    fn test_append_and_parse_round_trip() {
        let log = append_entry("", 42, ts(0), "Le poste ne démarre plus.");
        let log = append_entry(&log, 7, ts(30), "Pris en charge ce matin.");

        let entries = parse_log(&log, Utc::now());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].author_id, Some(42));
        assert_eq!(entries[0].timestamp, ts(0));
        assert_eq!(entries[0].content, "Le poste ne démarre plus.");
        assert_eq!(entries[1].author_id, Some(7));
        assert_eq!(entries[1].content, "Pris en charge ce matin.");
    }

    #[test]
    fn test_multiline_content_with_blank_lines_survives() {
        let content = "Premier paragraphe.\n\nSecond paragraphe, toujours le même commentaire.";
        let log = append_entry("", 1, ts(0), content);
        let log = append_entry(&log, 2, ts(1), "Suivant");

        let entries = parse_log(&log, Utc::now());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, content);
    }

    #[test]
    fn test_escape_rule_guards_header_lookalikes() {
        // Content that would otherwise open a new entry after a blank line.
        let content = "Voir le log:\n\n[3|2024-03-15T10:00:00Z]collé par l'utilisateur";
        let log = append_entry("", 9, ts(5), content);

        let entries = parse_log(&log, Utc::now());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].author_id, Some(9));
        assert_eq!(entries[0].content, content);
    }

    #[test]
    fn test_malformed_log_degrades_to_null_author() {
        let fallback = ts(59);
        let entries = parse_log("pas un en-tête du tout", fallback);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].author_id, None);
        assert_eq!(entries[0].timestamp, fallback);
        assert_eq!(entries[0].content, "pas un en-tête du tout");
    }

    #[test]
    fn test_edit_replaces_content_only() {
        let log = append_entry("", 42, ts(0), "brouillon");
        let log = append_entry(&log, 7, ts(30), "autre commentaire");
        let entries = parse_log(&log, Utc::now());

        let edited = edit_entry(&log, &entries[0].fingerprint, 42, "version corrigée").unwrap();
        let reparsed = parse_log(&edited, Utc::now());

        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0].author_id, Some(42));
        assert_eq!(reparsed[0].timestamp, ts(0));
        assert_eq!(reparsed[0].content, "version corrigée");
        // untouched neighbour is byte-identical
        assert_eq!(reparsed[1], entries[1]);
    }

    #[test]
    fn test_edit_by_other_author_is_forbidden() {
        let log = append_entry("", 42, ts(0), "du premier auteur");
        let entries = parse_log(&log, Utc::now());

        let result = edit_entry(&log, &entries[0].fingerprint, 7, "réécrit");
        assert!(matches!(result, Err(CommentError::Forbidden)));
    }

    #[test]
    fn test_edit_unknown_fingerprint_is_not_found() {
        let log = append_entry("", 42, ts(0), "seul");
        let result = edit_entry(&log, "deadbeef", 42, "peu importe");
        assert!(matches!(result, Err(CommentError::NotFound)));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let log = append_entry("", 42, ts(0), "avant");
        let before = parse_log(&log, Utc::now())[0].fingerprint.clone();

        let edited = edit_entry(&log, &before, 42, "après").unwrap();
        let after = parse_log(&edited, Utc::now())[0].fingerprint.clone();

        assert_ne!(before, after);
    }
}
