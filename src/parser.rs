//! Note header parser.
//!
//! Turns raw file bytes into a [`Note`]. A file may start with a header
//! block delimited by `---` lines:
//!
//! ```text
//! ---
//! title: Deploy checklist
//! tags: [ops, release]
//! created: 2024-03-01
//! ---
//! Body text...
//! ```
//!
//! The block is found by splitting the text on the literal `---` at most
//! three ways, not by a structured parser. A header value or body line
//! containing `---` before the real closing delimiter will therefore shift
//! the split and leak header text into the body (or vice versa). Tags are a
//! plain comma-separated list, so a tag cannot contain a comma.
//!
//! Parsing never fails. Anything that does not look like a header is body
//! text, unknown keys are ignored, and malformed dates fall back to the
//! file's modification time.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{HeaderFields, Note, NOTE_EXTENSION};

const DELIMITER: &str = "---";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse raw note bytes into a [`Note`] with the given `id`.
///
/// `fallback` (normally the file's mtime) is used for `created_at` and
/// `updated_at` unless the header carries a valid `YYYY-MM-DD` value.
pub fn parse_note(id: &str, raw: &[u8], fallback: DateTime<Utc>) -> Note {
    let text = String::from_utf8_lossy(raw);
    let (header, body) = split_header(&text);

    let title = header
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title_from_id(id));

    Note {
        id: id.to_string(),
        title,
        content: body,
        tags: header.tags,
        created_at: parse_date(header.created.as_deref()).unwrap_or(fallback),
        updated_at: parse_date(header.updated.as_deref()).unwrap_or(fallback),
    }
}

/// Split text into header fields and body.
///
/// Without a leading delimiter line, or when the delimiter split does not
/// yield exactly three segments, the whole text is the body.
pub fn split_header(text: &str) -> (HeaderFields, String) {
    let starts_with_delimiter = text.starts_with("---\n") || text.starts_with("---\r\n");
    if !starts_with_delimiter {
        return (HeaderFields::default(), text.to_string());
    }

    let parts: Vec<&str> = text.splitn(3, DELIMITER).collect();
    if parts.len() != 3 {
        return (HeaderFields::default(), text.to_string());
    }

    (parse_header(parts[1]), parts[2].trim().to_string())
}

/// Parse the lines of a header segment into [`HeaderFields`].
pub fn parse_header(raw: &str) -> HeaderFields {
    let mut fields = HeaderFields::default();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = unquote(value.trim());

        match key.trim() {
            "title" => fields.title = Some(value.to_string()),
            "created" => fields.created = Some(value.to_string()),
            "updated" => fields.updated = Some(value.to_string()),
            "tags" => fields.tags = parse_tags(value),
            _ => {}
        }
    }

    fields
}

/// Strip one layer of matching `"` or `'` quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn parse_tags(value: &str) -> Vec<String> {
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value?, DATE_FORMAT).ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Derive a display title from an identifier: `my-first-note.md` becomes
/// `My First Note`.
pub fn title_from_id(id: &str) -> String {
    let stem = id.strip_suffix(NOTE_EXTENSION).unwrap_or(id);
    title_case(&stem.replace('-', " "))
}

/// Uppercase the first letter of every word. Letters, digits and `_` are
/// word characters; everything else starts a new word. The rest of each
/// word is left as-is.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mtime() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 15, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_header_title_and_body() {
        let note = parse_note("foo.md", b"---\ntitle: Foo\n---\nBody content", mtime());
        assert_eq!(note.title, "Foo");
        assert_eq!(note.content, "Body content");
    }

    #[test]
    fn test_title_from_id_without_header() {
        let note = parse_note("my-first-note", b"just text", mtime());
        assert_eq!(note.title, "My First Note");
        assert_eq!(note.content, "just text");
        assert_eq!(note.created_at, mtime());
        assert_eq!(note.updated_at, mtime());
    }

    #[test]
    fn test_title_from_id_strips_extension() {
        assert_eq!(title_from_id("test-note.md"), "Test Note");
        assert_eq!(title_from_id("already Capitalized-x"), "Already Capitalized X");
    }

    #[test]
    fn test_crlf_header() {
        let raw = b"---\r\ntitle: Windows\r\ntags: [a, b]\r\n---\r\nBody\r\n";
        let note = parse_note("w.md", raw, mtime());
        assert_eq!(note.title, "Windows");
        assert_eq!(note.tags, vec!["a", "b"]);
        assert_eq!(note.content, "Body");
    }

    #[test]
    fn test_unterminated_header_is_body() {
        let raw = "---\ntitle: Never closed\nsome text";
        let note = parse_note("open-header", raw.as_bytes(), mtime());
        assert_eq!(note.title, "Open Header");
        assert_eq!(note.content, raw);
    }

    #[test]
    fn test_no_leading_delimiter_is_body() {
        let raw = "intro\n---\ntitle: Nope\n---\nrest";
        let note = parse_note("plain", raw.as_bytes(), mtime());
        assert_eq!(note.title, "Plain");
        assert_eq!(note.content, raw);
    }

    #[test]
    fn test_later_delimiters_stay_in_body() {
        // Only the first two delimiters split; later ones stay in the body.
        let raw = "---\ntitle: T\n---\nabove\n---\nbelow";
        let note = parse_note("t", raw.as_bytes(), mtime());
        assert_eq!(note.content, "above\n---\nbelow");
    }

    #[test]
    fn test_delimiter_in_header_value_corrupts_split() {
        let raw = "---\ntitle: a---b\n---\nbody";
        let note = parse_note("corrupt", raw.as_bytes(), mtime());
        // The split happens inside the title value.
        assert_eq!(note.title, "a");
        assert!(note.content.starts_with("b"));
    }

    #[test]
    fn test_quotes_stripped_once() {
        let fields = parse_header("title: \"Quoted\"\ncreated: '2024-01-02'\n");
        assert_eq!(fields.title.as_deref(), Some("Quoted"));
        assert_eq!(fields.created.as_deref(), Some("2024-01-02"));

        let fields = parse_header("title: \"\"nested\"\"");
        assert_eq!(fields.title.as_deref(), Some("\"nested\""));

        let fields = parse_header("title: \"mismatched'");
        assert_eq!(fields.title.as_deref(), Some("\"mismatched'"));
    }

    #[test]
    fn test_value_split_on_first_colon() {
        let fields = parse_header("title: Meeting: 10:30");
        assert_eq!(fields.title.as_deref(), Some("Meeting: 10:30"));
    }

    #[test]
    fn test_unknown_keys_and_blank_lines_ignored() {
        let fields = parse_header("\nauthor: Alice\n\ntitle: Kept\nno colon here\n");
        assert_eq!(fields.title.as_deref(), Some("Kept"));
        assert!(fields.tags.is_empty());
    }

    #[test]
    fn test_tags() {
        assert_eq!(
            parse_header("tags: [rust,  async , io]").tags,
            vec!["rust", "async", "io"]
        );
        assert_eq!(parse_header("tags: solo").tags, vec!["solo"]);
        assert!(parse_header("tags: []").tags.is_empty());
    }

    #[test]
    fn test_dates_override_fallback() {
        let raw = b"---\ncreated: 2024-01-02\nupdated: 2024-02-03\n---\nx";
        let note = parse_note("d", raw, mtime());
        assert_eq!(note.created_at, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert_eq!(note.updated_at, Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_malformed_dates_keep_fallback() {
        let raw = b"---\ncreated: 02/01/2024\nupdated: 2024-13-40\n---\nx";
        let note = parse_note("d", raw, mtime());
        assert_eq!(note.created_at, mtime());
        assert_eq!(note.updated_at, mtime());
    }

    #[test]
    fn test_empty_title_falls_back() {
        let note = parse_note("empty-title.md", b"---\ntitle: \n---\nbody", mtime());
        assert_eq!(note.title, "Empty Title");
    }

    #[test]
    fn test_invalid_utf8_is_lossy_not_fatal() {
        let note = parse_note("bin", &[0xff, 0xfe, b'o', b'k'], mtime());
        assert!(note.content.ends_with("ok"));
        assert_eq!(note.title, "Bin");
    }
}
