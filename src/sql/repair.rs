//! Numeric literal repair
//!
//! Generation models often write thousands as `10 000`. After a comparison
//! operator such runs are glued back together so the statement parses.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SPACED_NUMBER: Regex =
        Regex::new(r"(?:<=|>=|!=|<|>|=)\s*([0-9]+(?:\s+[0-9]+)+)").expect("spaced number pattern");
    static ref DIGIT_GROUP: Regex = Regex::new(r"[0-9]+").expect("digit group pattern");
}

/// Join whitespace-separated digit groups that follow a comparison operator.
///
/// Idempotent: `repair_numeric_literals(&repair_numeric_literals(s)) == repair_numeric_literals(s)`.
pub fn repair_numeric_literals(sql: &str) -> String {
    let mut repaired = String::with_capacity(sql.len());
    let mut copied_up_to = 0;

    for caps in SPACED_NUMBER.captures_iter(sql) {
        let Some(run) = caps.get(1) else { continue };
        let groups: Vec<&str> = DIGIT_GROUP.find_iter(run.as_str()).map(|m| m.as_str()).collect();

        let mut count = groups.len();
        let mut end = run.end();
        if !run_is_terminated(&sql[end..]) {
            // The last group is glued to something else; a shorter run
            // always ends in whitespace and therefore qualifies.
            count -= 1;
            if count < 2 {
                continue;
            }
            end = run.start() + last_group_end(run.as_str(), count);
        }

        repaired.push_str(&sql[copied_up_to..run.start()]);
        for group in &groups[..count] {
            repaired.push_str(group);
        }
        copied_up_to = end;
    }

    repaired.push_str(&sql[copied_up_to..]);
    repaired
}

fn run_is_terminated(rest: &str) -> bool {
    let Some(next) = rest.chars().next() else {
        return true;
    };
    if next.is_whitespace() || next == ';' || next == ')' {
        return true;
    }
    let head: String = rest.chars().take(3).collect::<String>().to_ascii_uppercase();
    head.starts_with("AND") || head.starts_with("OR")
}

/// Byte offset (within the run) just past the `count`-th digit group.
fn last_group_end(run: &str, count: usize) -> usize {
    DIGIT_GROUP
        .find_iter(run)
        .nth(count - 1)
        .map_or(run.len(), |m| m.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_thousand_separated_literal() {
        assert_eq!(
            repair_numeric_literals("SELECT COUNT(*) FROM videos WHERE views_count > 100 000;"),
            "SELECT COUNT(*) FROM videos WHERE views_count > 100000;"
        );
        assert_eq!(
            repair_numeric_literals("WHERE likes_count >= 1 000 000 AND views_count < 10 000"),
            "WHERE likes_count >= 1000000 AND views_count < 10000"
        );
    }

    #[test]
    fn test_non_breaking_space_and_parenthesis() {
        assert_eq!(
            repair_numeric_literals("WHERE (views_count != 10\u{a0}000)"),
            "WHERE (views_count != 10000)"
        );
    }

    #[test]
    fn test_untouched_text() {
        let plain = "SELECT COUNT(*) FROM videos WHERE views_count > 100000;";
        assert_eq!(repair_numeric_literals(plain), plain);

        let dates = "WHERE DATE(created_at) = '2025-11-28' AND id IN (1, 2)";
        assert_eq!(repair_numeric_literals(dates), dates);

        let limit = "SELECT 1 2 FROM t LIMIT 10 20";
        assert_eq!(repair_numeric_literals(limit), limit);
    }

    #[test]
    fn test_glued_tail_keeps_last_group() {
        assert_eq!(repair_numeric_literals("x > 1 2 3abc"), "x > 12 3abc");
        assert_eq!(repair_numeric_literals("x > 1 2abc"), "x > 1 2abc");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "WHERE views_count > 100 000;",
            "x > 1 2 3abc",
            "x = 1 2 3 4x AND y <= 5 6",
            "a >= 10 000OR b < 3 3)",
            "no numbers here",
            "",
        ];
        for sample in samples {
            let once = repair_numeric_literals(sample);
            assert_eq!(repair_numeric_literals(&once), once, "not idempotent for {:?}", sample);
        }
    }
}
