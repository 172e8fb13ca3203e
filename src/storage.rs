//! Flat-JSON persistence format for the task store.
//!
//! The on-disk format is a deliberately restricted JSON subset: one array of
//! flat objects whose values are quoted strings, plus a bare integer for the
//! id. It is written and read by a hand-rolled scanner rather than a general
//! JSON library so that a malformed record can be skipped without losing the
//! rest of the file. The tolerance contract is asymmetric: record-level
//! corruption drops that record with a warning, while container-level
//! corruption (unbalanced array or brace structure) empties the whole load.

use std::iter::Peekable;
use std::str::Chars;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::task::{Status, Task};

/// Timestamp layout used for `createdAt`/`updatedAt` values (local time,
/// second resolution).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the task list as a flat-JSON array document.
///
/// Field order is fixed (id, description, status, createdAt, updatedAt) so
/// the output is byte-for-byte deterministic; an empty list renders as
/// `"[\n]\n"`.
pub fn serialize(tasks: &[Task]) -> String {
    let mut out = String::from("[\n");
    for (i, task) in tasks.iter().enumerate() {
        out.push_str(" {\n");
        out.push_str(&format!("   \"id\": {},\n", task.id));
        out.push_str(&format!(
            "   \"description\": \"{}\",\n",
            escape_json_string(&task.description)
        ));
        out.push_str(&format!("   \"status\": \"{}\",\n", task.status.as_str()));
        out.push_str(&format!(
            "   \"createdAt\": \"{}\",\n",
            format_timestamp(&task.created_at)
        ));
        out.push_str(&format!(
            "   \"updatedAt\": \"{}\"\n",
            format_timestamp(&task.updated_at)
        ));
        out.push_str(" }");
        if i + 1 < tasks.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str("]\n");
    out
}

/// Parse a task store document into the records it holds.
///
/// Empty and top-level-corrupt documents both yield an empty list (the
/// caller treats that as "start fresh"); individually malformed records are
/// skipped with a warning while the rest of the file loads. Records are
/// returned in file order.
pub fn deserialize(text: &str) -> Vec<Task> {
    let mut tasks = Vec::new();

    let content = text.trim();
    if content.is_empty() {
        return tasks;
    }
    if !content.starts_with('[') || !content.ends_with(']') {
        eprintln!("Warning: task store is malformed. Starting with an empty task list.");
        return tasks;
    }

    // Everything between the array brackets. Both bracket bytes are ASCII,
    // so the slice boundaries stay valid with multi-byte descriptions.
    let body = &content[1..content.len() - 1];
    let bytes = body.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(offset) = bytes[pos..].iter().position(|&b| b == b'{') else {
            break; // no more objects
        };
        let start = pos + offset;
        let Some(end) = find_object_end(bytes, start) else {
            eprintln!("Warning: mismatched braces in task store. Discarding all entries.");
            tasks.clear();
            return tasks;
        };
        match parse_task_object(&body[start..=end]) {
            Ok(task) => tasks.push(task),
            Err(err) => eprintln!("Warning: skipping malformed task entry: {err}"),
        }
        pos = end + 1;
    }
    tasks
}

/// Locate the closing brace matching the opener at `start`.
///
/// The scan tracks quoted strings (and backslash escapes within them) so
/// that brace characters inside a description cannot shift object
/// boundaries. Returns `None` when the braces never balance before the end
/// of the array body.
fn find_object_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Parse one extracted object substring as a flat key/value record.
///
/// Fields may appear in any order; missing fields keep their defaults and
/// unknown keys are warned about and ignored. Any structural failure fails
/// this record only — the caller skips it and resumes after its closing
/// brace.
fn parse_task_object(text: &str) -> Result<Task, String> {
    let mut scanner = Scanner::new(text);
    scanner.skip_whitespace();
    scanner.expect('{')?;

    let mut task = Task::default();
    loop {
        scanner.skip_whitespace();
        match scanner.peek() {
            Some('}') => {
                scanner.advance();
                break;
            }
            None => return Err("unexpected end of input before '}'".to_string()),
            _ => {}
        }

        let key = scanner.read_quoted_string()?;
        scanner.skip_whitespace();
        scanner.expect(':')?;
        scanner.skip_whitespace();

        if scanner.peek() == Some('"') {
            let value = scanner.read_quoted_string()?;
            match key.as_str() {
                "description" => task.description = value,
                "status" => task.status = Status::parse(&value),
                "createdAt" => task.created_at = parse_timestamp(&value),
                "updatedAt" => task.updated_at = parse_timestamp(&value),
                "id" => {
                    return Err(format!(
                        "expected numeric value for key 'id', found \"{value}\""
                    ))
                }
                _ => eprintln!("Warning: unknown key '{key}' in task entry."),
            }
        } else {
            // A bare integer is only valid for the id field.
            let value = scanner.read_integer()?;
            match key.as_str() {
                "id" => task.id = value,
                "description" | "status" | "createdAt" | "updatedAt" => {
                    return Err(format!("expected quoted value for key '{key}'"))
                }
                _ => eprintln!("Warning: unknown key '{key}' in task entry."),
            }
        }

        scanner.skip_whitespace();
        match scanner.peek() {
            Some(',') => {
                scanner.advance();
            }
            Some('}') => {}
            Some(other) => {
                return Err(format!(
                    "expected ',' or '}}' after value for key '{key}', found '{other}'"
                ))
            }
            None => {
                return Err(format!(
                    "unexpected end of input after value for key '{key}'"
                ))
            }
        }
    }
    Ok(task)
}

/// Escape a string for embedding as a quoted JSON value.
///
/// Handles the quote, the backslash, and the five common control
/// characters; everything else passes through verbatim (no Unicode
/// escaping).
fn escape_json_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Format a timestamp in the stored `YYYY-MM-DD HH:MM:SS` local-time form.
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Returns the epoch on failure rather than
/// failing the record.
pub fn parse_timestamp(s: &str) -> DateTime<Local> {
    let Ok(naive) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) else {
        eprintln!("Warning: failed to parse timestamp string: {s}");
        return epoch();
    };
    match Local.from_local_datetime(&naive).earliest() {
        Some(ts) => ts,
        None => {
            eprintln!("Warning: failed to resolve local time for: {s}");
            epoch()
        }
    }
}

fn epoch() -> DateTime<Local> {
    DateTime::from(std::time::UNIX_EPOCH)
}

/// Minimal cursor over an object substring for the flat key/value grammar.
struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Scanner {
            chars: text.chars().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.advance();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), String> {
        match self.advance() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(format!("expected '{want}', found '{c}'")),
            None => Err(format!("expected '{want}', found end of input")),
        }
    }

    /// Read a quoted string, decoding the writer's escape table.
    fn read_quoted_string(&mut self) -> Result<String, String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(out),
                Some('\\') => match self.advance() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('b') => out.push('\u{0008}'),
                    Some('f') => out.push('\u{000C}'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(other) => return Err(format!("invalid escape sequence: \\{other}")),
                    None => return Err("unterminated escape sequence".to_string()),
                },
                Some(c) => out.push(c),
                None => return Err("missing closing quote".to_string()),
            }
        }
    }

    /// Read a bare unsigned integer, the only unquoted value the format
    /// allows.
    fn read_integer(&mut self) -> Result<u64, String> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.advance();
        }
        if digits.is_empty() {
            return Err(match self.peek() {
                Some(c) => format!("expected a value, found '{c}'"),
                None => "expected a value, found end of input".to_string(),
            });
        }
        digits
            .parse::<u64>()
            .map_err(|_| format!("numeric value out of range: {digits}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(id: u64, description: &str, status: Status) -> Task {
        Task {
            id,
            description: description.to_string(),
            status,
            created_at: Local.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap(),
            updated_at: Local.with_ymd_and_hms(2024, 5, 17, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_serialize_empty_list() {
        assert_eq!(serialize(&[]), "[\n]\n");
    }

    #[test]
    fn test_deserialize_empty_array() {
        assert_eq!(deserialize("[\n]\n"), vec![]);
    }

    #[test]
    fn test_deserialize_empty_text() {
        assert_eq!(deserialize(""), vec![]);
        assert_eq!(deserialize("   \n\t  "), vec![]);
    }

    #[test]
    fn test_deserialize_non_array_text() {
        assert_eq!(deserialize("hello"), vec![]);
        assert_eq!(deserialize("{\n   \"id\": 1\n }"), vec![]);
        assert_eq!(deserialize("["), vec![]);
    }

    #[test]
    fn test_serialize_layout_exact_bytes() {
        let task = sample_task(1, "Buy milk", Status::Todo);
        let expected = "[\n {\n   \"id\": 1,\n   \"description\": \"Buy milk\",\n   \"status\": \"todo\",\n   \"createdAt\": \"2024-05-17 09:30:00\",\n   \"updatedAt\": \"2024-05-17 10:00:00\"\n }\n]\n";
        assert_eq!(serialize(&[task]), expected);
    }

    #[test]
    fn test_serialize_comma_placement() {
        let text = serialize(&[
            sample_task(1, "a", Status::Todo),
            sample_task(2, "b", Status::Done),
        ]);
        assert!(text.contains(" },\n {"));
        assert!(text.ends_with(" }\n]\n"));
    }

    #[test]
    fn test_round_trip() {
        let tasks = vec![
            sample_task(1, "plain text", Status::Todo),
            sample_task(2, "quotes \"inside\" and backslash \\ too", Status::InProgress),
            sample_task(5, "line one\nline two\ttabbed", Status::Done),
            sample_task(9, "control bytes \u{0008} and \u{000C} and \r survive", Status::Todo),
        ];
        assert_eq!(deserialize(&serialize(&tasks)), tasks);
    }

    #[test]
    fn test_escaping_fidelity() {
        let task = sample_task(1, "He said \"hi\"\n\tOK", Status::Todo);
        let text = serialize(&[task]);
        assert!(text.contains(r#"\""#));
        assert!(text.contains(r"\n"));
        assert!(text.contains(r"\t"));

        let parsed = deserialize(&text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].description, "He said \"hi\"\n\tOK");
    }

    #[test]
    fn test_reader_accepts_any_field_order() {
        let text = "[{\"status\": \"done\", \"id\": 5, \"description\": \"reordered\"}]";
        let tasks = deserialize(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 5);
        assert_eq!(tasks[0].status, Status::Done);
        assert_eq!(tasks[0].description, "reordered");
    }

    #[test]
    fn test_unbalanced_braces_abort_the_whole_parse() {
        // The second object never closes and nothing rebalances, so even
        // the well-formed first object is discarded.
        let text = "[\n {\n   \"id\": 1,\n   \"description\": \"first\"\n },\n {\n   \"id\": 2,\n   \"description\": \"broken\"\n]\n";
        assert_eq!(deserialize(text), vec![]);
    }

    #[test]
    fn test_malformed_record_is_skipped_when_braces_rebalance() {
        // Object 2 is missing its colon; its braces still balance, so only
        // that record is dropped. Object 4 has structural-looking braces
        // inside its description, which the quote-aware scan ignores.
        let text = concat!(
            "[\n",
            " {\n   \"id\": 1,\n   \"description\": \"first\"\n },\n",
            " {\n   \"id\": 2,\n   \"description\" \"missing colon\"\n },\n",
            " {\n   \"id\": 3,\n   \"description\": \"third\"\n },\n",
            " {\n   \"id\": 4,\n   \"description\": \"curly } inside {\"\n }\n",
            "]\n"
        );
        let tasks = deserialize(text);
        assert_eq!(
            tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
        assert_eq!(tasks[2].description, "curly } inside {");
    }

    #[test]
    fn test_object_missing_close_swallows_next_and_resyncs() {
        // Object 2 lacks its closing brace, so the depth scan swallows
        // object 3 and rebalances at its close; the merged blob fails as
        // one record and the scan resumes at object 4.
        let text = "[\n {\"id\": 1, \"description\": \"keep\"},\n {\"id\": 2\n {\"id\": 3}},\n {\"id\": 4, \"description\": \"after\"}\n]\n";
        let tasks = deserialize(text);
        assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_unterminated_string_aborts_the_parse() {
        // The unclosed quote swallows the closing brace, so the braces
        // never balance and the whole load is discarded.
        let text = "[\n {\n   \"id\": 1,\n   \"description\": \"unterminated\n }\n]\n";
        assert_eq!(deserialize(text), vec![]);
    }

    #[test]
    fn test_unquoted_key_skips_only_that_record() {
        let text = "[\n {\n   id: 1\n },\n {\n   \"id\": 2\n }\n]\n";
        let tasks = deserialize(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 2);
    }

    #[test]
    fn test_quoted_id_skips_only_that_record() {
        let text = "[\n {\n   \"id\": \"7\",\n   \"description\": \"x\"\n },\n {\n   \"id\": 2,\n   \"description\": \"y\"\n }\n]\n";
        let tasks = deserialize(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 2);
    }

    #[test]
    fn test_negative_id_skips_only_that_record() {
        let text = "[\n {\n   \"id\": -3,\n   \"description\": \"x\"\n },\n {\n   \"id\": 4\n }\n]\n";
        let tasks = deserialize(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 4);
    }

    #[test]
    fn test_bare_integer_for_string_key_skips_the_record() {
        let text = "[\n {\n   \"id\": 1,\n   \"description\": 42\n },\n {\n   \"id\": 2\n }\n]\n";
        let tasks = deserialize(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 2);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let text = "[\n {\n   \"id\": 8,\n   \"priority\": \"high\",\n   \"description\": \"x\",\n   \"points\": 13\n }\n]\n";
        let tasks = deserialize(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 8);
        assert_eq!(tasks[0].description, "x");
    }

    #[test]
    fn test_unknown_status_falls_back_to_todo() {
        let text = "[\n {\n   \"id\": 1,\n   \"description\": \"x\",\n   \"status\": \"bogus\"\n }\n]\n";
        let tasks = deserialize(text);
        assert_eq!(tasks[0].status, Status::Todo);
    }

    #[test]
    fn test_bad_timestamp_yields_epoch() {
        let text = "[\n {\n   \"id\": 1,\n   \"createdAt\": \"next tuesday\"\n }\n]\n";
        let tasks = deserialize(text);
        assert_eq!(tasks[0].created_at, epoch());
    }

    #[test]
    fn test_empty_object_yields_default_record() {
        let tasks = deserialize("[\n {}\n]\n");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 0);
        assert_eq!(tasks[0].description, "");
        assert_eq!(tasks[0].status, Status::Todo);
        assert_eq!(tasks[0].created_at, epoch());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = Local.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)), ts);
    }

    #[test]
    fn test_parse_timestamp_bad_input_is_epoch() {
        assert_eq!(parse_timestamp("garbage"), epoch());
        assert_eq!(parse_timestamp("2024-13-40 99:99:99"), epoch());
        assert_eq!(parse_timestamp(""), epoch());
    }

    #[test]
    fn test_escape_json_string_table() {
        assert_eq!(
            escape_json_string("a\"b\\c\u{0008}d\u{000C}e\nf\rg\th"),
            "a\\\"b\\\\c\\bd\\fe\\nf\\rg\\th"
        );
        assert_eq!(escape_json_string("plain ünïcode ok"), "plain ünïcode ok");
    }
}
