//! SQL Extraction
//!
//! Pulls a single candidate statement out of free-form model output:
//! marker prefixes, markdown fences and surrounding prose are discarded.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Answer markers used by the prompts. The last occurrence wins because
/// models like to echo the few-shot examples before answering.
const SQL_MARKERS: [&str; 2] = ["SQL-запрос:", "SQL:"];

const STATEMENT_KEYWORDS: [&str; 2] = ["SELECT", "WITH"];

lazy_static! {
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?i)```[ \t]*(?:postgresql|postgres|pgsql|psql|sql)?").expect("code fence pattern");
    static ref HEX_IDENTIFIER: Regex = Regex::new(r"\b[0-9a-fA-F]{32}\b").expect("hex identifier pattern");
    static ref BLANK_LINE: Regex = Regex::new(r"\n[ \t]*\n").expect("blank line pattern");
}

/// Extract a candidate SQL statement terminated by `;`.
///
/// Returns `None` when no `SELECT`/`WITH` keyword is found on a token boundary.
pub fn extract_sql(raw: &str, user_query: &str) -> Option<String> {
    let answer = after_last_marker(raw);
    let unfenced = CODE_FENCE.replace_all(answer, "");

    let start = match find_statement_start(&unfenced) {
        Some(idx) => idx,
        None => {
            debug!("No SELECT/WITH keyword found in model output");
            return None;
        }
    };

    let statement = terminate(&unfenced[start..]);
    if statement.len() <= 1 {
        return None;
    }

    check_identifiers(&statement, user_query);
    Some(statement)
}

fn after_last_marker(text: &str) -> &str {
    let mut rest = text;
    for marker in SQL_MARKERS {
        if let Some(idx) = rest.rfind(marker) {
            rest = &rest[idx + marker.len()..];
        }
    }
    rest
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte offset of the first statement keyword standing on its own.
/// Keywords are ASCII, so a byte-level match always lands on char boundaries.
fn find_statement_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for (idx, _) in text.char_indices() {
        for keyword in STATEMENT_KEYWORDS {
            let end = idx + keyword.len();
            if end > bytes.len() || !bytes[idx..end].eq_ignore_ascii_case(keyword.as_bytes()) {
                continue;
            }
            let clear_before = text[..idx].chars().next_back().map_or(true, |c| !is_word_char(c));
            let clear_after = text[end..].chars().next().map_or(true, |c| !is_word_char(c));
            if clear_before && clear_after {
                return Some(idx);
            }
        }
    }
    None
}

fn terminate(tail: &str) -> String {
    if let Some(pos) = tail.find(';') {
        return tail[..=pos].trim().to_string();
    }
    // No terminator: the statement ends at the first paragraph break.
    let body = BLANK_LINE.find(tail).map_or(tail, |m| &tail[..m.start()]);
    format!("{};", body.trim())
}

/// Soft signal only: identifiers may legitimately differ in representation.
fn check_identifiers(statement: &str, user_query: &str) {
    let requested: HashSet<String> = HEX_IDENTIFIER
        .find_iter(user_query)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect();
    if requested.is_empty() {
        return;
    }

    let used: HashSet<String> = HEX_IDENTIFIER
        .find_iter(statement)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect();

    if requested.is_disjoint(&used) {
        warn!(
            "Extracted SQL does not reference any identifier from the question: requested {:?}, found {:?}",
            requested, used
        );
    }
}
