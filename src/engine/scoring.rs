//! Pure scoring functions over one performance record and one graded attempt.
//!
//! Every derived field of a `PerformanceRecord` is recomputed by
//! `fold_attempt`; nothing outside this module mutates them piecemeal.

use chrono::{DateTime, Utc};

use crate::engine::config::ScoringConfig;
use crate::engine::types::{GradeResult, Level, LevelMap, LevelTally, RecentAttempt};
use crate::store::operations::performance::PerformanceRecord;

/// Coverage rewards breadth of practice: points per attempt by level, capped
/// per flashcard so grinding one card stops paying off. Monotonic
/// non-decreasing by construction.
pub fn coverage_score(by_level: &LevelMap<LevelTally>, config: &ScoringConfig) -> f64 {
    let raw: f64 = by_level
        .iter()
        .map(|(level, tally)| tally.attempts as f64 * config.coverage_points.get(level))
        .sum();
    raw.min(config.max_coverage_per_card)
}

/// Signed accuracy: correct answers earn, wrong answers cost, harder levels
/// swing further in both directions. No floor; a struggling card goes
/// negative.
pub fn accuracy_score(by_level: &LevelMap<LevelTally>, config: &ScoringConfig) -> f64 {
    by_level
        .iter()
        .map(|(level, tally)| {
            let points = config.accuracy_points.get(level);
            let incorrect = tally.attempts.saturating_sub(tally.correct);
            tally.correct as f64 * points.correct + incorrect as f64 * points.incorrect
        })
        .sum()
}

/// Time-decayed accuracy over the recent-attempt window. Each attempt decays
/// with `exp(-ln2 * age_days / half_life)`, so the latest attempts dominate.
/// Empty window yields 0.
pub fn momentum_score(
    recent: &[RecentAttempt],
    now: DateTime<Utc>,
    config: &ScoringConfig,
) -> f64 {
    if recent.is_empty() {
        return 0.0;
    }

    let mut earned = 0.0;
    let mut possible = 0.0;
    for attempt in recent {
        let age_days =
            (now - attempt.timestamp).num_milliseconds().max(0) as f64 / 86_400_000.0;
        let decay =
            (-std::f64::consts::LN_2 * age_days / config.momentum_half_life_days).exp();
        earned += attempt.points_earned * decay;
        possible += config.accuracy_points.get(attempt.level).correct * decay;
    }

    if possible <= 0.0 {
        return 0.0;
    }
    (earned / possible).clamp(0.0, 1.0)
}

/// Blend of momentum and lifetime correct ratio; the input to the next-level
/// recommendation.
pub fn comfortability_score(
    by_level: &LevelMap<LevelTally>,
    momentum: f64,
    config: &ScoringConfig,
) -> f64 {
    let attempts: u32 = by_level.iter().map(|(_, t)| t.attempts).sum();
    let correct: u32 = by_level.iter().map(|(_, t)| t.correct).sum();
    let correct_ratio = if attempts > 0 {
        correct as f64 / attempts as f64
    } else {
        0.0
    };
    let w = config.comfort_momentum_weight;
    momentum * w + correct_ratio * (1.0 - w)
}

/// Points one graded attempt earns at a level. Fully correct pays the full
/// correct points, partial credit pays a proportional share, and anything
/// else costs the (negative) incorrect points.
pub fn points_earned(level: Level, grade: &GradeResult, config: &ScoringConfig) -> f64 {
    let points = config.accuracy_points.get(level);
    if grade.is_correct {
        points.correct
    } else if grade.partial_credit > 0.0 {
        points.correct * grade.partial_credit
    } else {
        points.incorrect
    }
}

/// Fold one graded attempt into a record and recompute every derived field.
///
/// Order matters for the weak/redeemed transition: the attempt is tallied
/// first, then the fresh accuracy is checked against the recovery threshold.
pub fn fold_attempt(
    record: &mut PerformanceRecord,
    level: Level,
    grade: &GradeResult,
    now: DateTime<Utc>,
    config: &ScoringConfig,
) -> f64 {
    let earned = points_earned(level, grade, config);

    let tally = record.performance_by_level.get_mut(level);
    tally.attempts += 1;
    if grade.is_correct {
        tally.correct += 1;
    }
    tally.points += earned;

    record.recent_attempts.push(RecentAttempt {
        timestamp: now,
        level,
        is_correct: grade.is_correct,
        points_earned: earned,
    });
    if record.recent_attempts.len() > config.recent_attempts_cap {
        let overflow = record.recent_attempts.len() - config.recent_attempts_cap;
        record.recent_attempts.drain(..overflow);
    }

    record.coverage_score = coverage_score(&record.performance_by_level, config);
    record.accuracy_score = accuracy_score(&record.performance_by_level, config);
    record.momentum_score = momentum_score(&record.recent_attempts, now, config);
    record.comfortability_score =
        comfortability_score(&record.performance_by_level, record.momentum_score, config);
    record.next_level = config
        .next_level_thresholds
        .level_for(record.comfortability_score);

    if !grade.is_correct {
        record.is_weak = true;
    } else if record.is_weak && record.accuracy_score >= config.recovery_threshold {
        record.is_weak = false;
    }

    record.updated_at = now;
    earned
}
