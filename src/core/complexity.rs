// complexity score and buckets

use super::types::{ParsedQuery, QueryComplexity};

pub fn complexity_score(query: &ParsedQuery) -> u32 {
    let mut score = 10;
    if query.has_subqueries {
        score += 20;
    }
    if query.has_ctes {
        score += 15;
    }
    if query.has_window_functions {
        score += 25;
    }
    score += query.tables.len().saturating_sub(1) as u32 * 5;
    score += query.functions.len() as u32 * 3;
    score
}

// upper bounds are inclusive
pub fn bucket(score: u32) -> QueryComplexity {
    match score {
        0..=15 => QueryComplexity::Simple,
        16..=35 => QueryComplexity::Moderate,
        36..=60 => QueryComplexity::Complex,
        _ => QueryComplexity::VeryComplex,
    }
}

pub fn complexity(query: &ParsedQuery) -> QueryComplexity {
    bucket(complexity_score(query))
}
