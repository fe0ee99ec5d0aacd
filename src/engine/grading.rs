//! Polymorphic answer grading.
//!
//! Grading is never a hard failure path: a missing, null or structurally
//! wrong user answer grades as incorrect. All string comparisons are on
//! trimmed values.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::engine::types::GradeResult;
use crate::store::operations::catalog::{AnswerSpec, MatchPair};

pub fn grade(spec: &AnswerSpec, user_answer: Option<&Value>) -> GradeResult {
    let Some(answer) = user_answer else {
        return GradeResult::incorrect();
    };
    if answer.is_null() {
        return GradeResult::incorrect();
    }

    match spec {
        AnswerSpec::SingleChoice { answer: expected } => grade_single_choice(expected, answer),
        AnswerSpec::MultiChoice { answers } => grade_multi_choice(answers, answer),
        AnswerSpec::Sequencing { order } => grade_sequencing(order, answer),
        AnswerSpec::Categorization { categories } => grade_categorization(categories, answer),
        AnswerSpec::Matching { pairs } => grade_matching(pairs, answer),
    }
}

fn as_trimmed_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim)
}

fn as_trimmed_vec(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    items
        .iter()
        .map(|v| as_trimmed_str(v).map(str::to_string))
        .collect()
}

fn grade_single_choice(expected: &str, answer: &Value) -> GradeResult {
    match as_trimmed_str(answer) {
        Some(selected) if selected == expected.trim() => GradeResult::correct(),
        _ => GradeResult::incorrect(),
    }
}

/// Multi-choice is strict on wrongness: any incorrect pick zeroes the
/// attempt. With only correct picks, credit is proportional to how many of
/// the correct options were found.
fn grade_multi_choice(correct: &[String], answer: &Value) -> GradeResult {
    let Some(selected) = as_trimmed_vec(answer) else {
        return GradeResult::incorrect();
    };

    let correct_set: BTreeSet<&str> = correct.iter().map(|s| s.trim()).collect();
    let selected_set: BTreeSet<&str> = selected.iter().map(|s| s.as_str()).collect();

    if correct_set.is_empty() {
        return GradeResult::incorrect();
    }

    let incorrect_selections = selected_set.difference(&correct_set).count();
    if incorrect_selections > 0 {
        return GradeResult::incorrect();
    }

    let correct_selections = selected_set.intersection(&correct_set).count();
    let partial = correct_selections as f64 / correct_set.len() as f64;
    GradeResult {
        is_correct: correct_selections == correct_set.len(),
        partial_credit: partial,
    }
}

fn grade_sequencing(order: &[String], answer: &Value) -> GradeResult {
    let Some(given) = as_trimmed_vec(answer) else {
        return GradeResult::incorrect();
    };
    let expected: Vec<&str> = order.iter().map(|s| s.trim()).collect();
    let given_refs: Vec<&str> = given.iter().map(|s| s.as_str()).collect();
    if given_refs == expected {
        GradeResult::correct()
    } else {
        GradeResult::incorrect()
    }
}

/// Category keys must match exactly, and so must each category's item set.
fn grade_categorization(
    categories: &std::collections::BTreeMap<String, Vec<String>>,
    answer: &Value,
) -> GradeResult {
    let Some(given) = answer.as_object() else {
        return GradeResult::incorrect();
    };

    let expected_keys: BTreeSet<&str> = categories.keys().map(|k| k.trim()).collect();
    let given_keys: BTreeSet<String> =
        given.keys().map(|k| k.trim().to_string()).collect();
    if expected_keys.len() != given_keys.len()
        || !given_keys.iter().all(|k| expected_keys.contains(k.as_str()))
    {
        return GradeResult::incorrect();
    }

    for (category, items) in categories {
        let Some(given_items) = given
            .iter()
            .find(|(k, _)| k.trim() == category.trim())
            .and_then(|(_, v)| as_trimmed_vec(v))
        else {
            return GradeResult::incorrect();
        };
        let expected_set: BTreeSet<&str> = items.iter().map(|s| s.trim()).collect();
        let given_set: BTreeSet<&str> = given_items.iter().map(|s| s.as_str()).collect();
        if expected_set != given_set {
            return GradeResult::incorrect();
        }
    }

    GradeResult::correct()
}

/// Pair lists compare as sets; presentation order carries no meaning.
fn grade_matching(pairs: &[MatchPair], answer: &Value) -> GradeResult {
    let Some(given) = answer.as_array() else {
        return GradeResult::incorrect();
    };

    let mut given_set = BTreeSet::new();
    for entry in given {
        let (Some(left), Some(right)) = (
            entry.get("left").and_then(as_trimmed_str),
            entry.get("right").and_then(as_trimmed_str),
        ) else {
            return GradeResult::incorrect();
        };
        given_set.insert((left.to_string(), right.to_string()));
    }

    let expected_set: BTreeSet<(String, String)> = pairs
        .iter()
        .map(|p| (p.left.trim().to_string(), p.right.trim().to_string()))
        .collect();

    if given_set == expected_set {
        GradeResult::correct()
    } else {
        GradeResult::incorrect()
    }
}
