//! Structural validation
//!
//! Character-balance checks only; no SQL grammar awareness.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralCheck {
    pub is_valid: bool,
    pub reason: String,
}

impl StructuralCheck {
    fn valid() -> Self {
        Self {
            is_valid: true,
            reason: "ok".to_string(),
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
        }
    }
}

/// Single pass over the statement counting quotes and parentheses.
pub fn validate_structure(sql: &str) -> StructuralCheck {
    if sql.trim().is_empty() {
        return StructuralCheck::invalid("empty statement");
    }

    let (mut single, mut double, mut open, mut close) = (0usize, 0usize, 0usize, 0usize);
    for c in sql.chars() {
        match c {
            '\'' => single += 1,
            '"' => double += 1,
            '(' => open += 1,
            ')' => close += 1,
            _ => {}
        }
    }

    if single % 2 != 0 {
        return StructuralCheck::invalid(format!("unbalanced single quotes ({})", single));
    }
    if double % 2 != 0 {
        return StructuralCheck::invalid(format!("unbalanced double quotes ({})", double));
    }
    if open != close {
        return StructuralCheck::invalid(format!(
            "unbalanced parentheses ({} opening, {} closing)",
            open, close
        ));
    }

    StructuralCheck::valid()
}
