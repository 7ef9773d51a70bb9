//! Complexity scoring
//!
//! Coarse, order-independent heuristic over keyword presence. A statement
//! collecting two or more signals is considered complex and is sent to the
//! semantic re-validator.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const COMPLEXITY_THRESHOLD: u32 = 2;
const LENGTH_LIMIT: usize = 200;
const KEYWORD_DENSITY_LIMIT: usize = 3;

lazy_static! {
    static ref SELECT_KEYWORD: Regex = Regex::new(r"(?i)\bSELECT\b").expect("select pattern");
    static ref JOIN_KEYWORD: Regex = Regex::new(r"(?i)\bJOIN\b").expect("join pattern");
    static ref GROUP_BY: Regex = Regex::new(r"(?i)\bGROUP\s+BY\b").expect("group by pattern");
    static ref CONNECTIVE: Regex = Regex::new(r"(?i)\b(?:AND|OR)\b").expect("connective pattern");
    static ref AGGREGATE: Regex = Regex::new(r"(?i)\b(?:SUM|COUNT|AVG|MAX|MIN)\b").expect("aggregate pattern");
    static ref STRUCTURAL_KEYWORD: Regex =
        Regex::new(r"(?i)\b(WHERE|JOIN|GROUP|HAVING|ORDER)\b").expect("structural keyword pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexitySignal {
    Join,
    Subquery,
    GroupBy,
    FilteredAggregate,
    Length,
    KeywordDensity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub score: u32,
    pub signals: Vec<ComplexitySignal>,
}

impl ComplexityReport {
    pub fn is_complex(&self) -> bool {
        self.score >= COMPLEXITY_THRESHOLD
    }
}

pub fn score_complexity(sql: &str) -> ComplexityReport {
    let mut signals = Vec::new();

    if JOIN_KEYWORD.is_match(sql) {
        signals.push(ComplexitySignal::Join);
    }
    if SELECT_KEYWORD.find_iter(sql).count() > 1 {
        signals.push(ComplexitySignal::Subquery);
    }
    if GROUP_BY.is_match(sql) {
        signals.push(ComplexitySignal::GroupBy);
    }
    if CONNECTIVE.find_iter(sql).count() >= 2 && AGGREGATE.is_match(sql) {
        signals.push(ComplexitySignal::FilteredAggregate);
    }
    if sql.chars().count() > LENGTH_LIMIT {
        signals.push(ComplexitySignal::Length);
    }

    let keywords: HashSet<String> = STRUCTURAL_KEYWORD
        .find_iter(sql)
        .map(|m| m.as_str().to_ascii_uppercase())
        .collect();
    if keywords.len() >= KEYWORD_DENSITY_LIMIT {
        signals.push(ComplexitySignal::KeywordDensity);
    }

    ComplexityReport {
        score: signals.len() as u32,
        signals,
    }
}

pub fn is_complex(sql: &str) -> bool {
    score_complexity(sql).is_complex()
}
