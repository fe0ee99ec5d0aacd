use serde::{Deserialize, Serialize};

use crate::engine::types::{Level, LevelMap};

/// Points awarded/deducted by the accuracy pillar for one attempt at a level.
/// `incorrect` is negative: wrong answers at harder levels cost more.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyPoints {
    pub correct: f64,
    pub incorrect: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Coverage points granted per attempt, by level.
    pub coverage_points: LevelMap<f64>,
    /// Cap on the coverage a single flashcard can accumulate.
    pub max_coverage_per_card: f64,
    pub accuracy_points: LevelMap<AccuracyPoints>,
    /// Half-life of the momentum decay, in days.
    #[serde(default = "default_momentum_half_life_days")]
    pub momentum_half_life_days: f64,
    /// Length cap of the recent-attempt window (oldest dropped first).
    #[serde(default = "default_recent_attempts_cap")]
    pub recent_attempts_cap: usize,
    /// Signed accuracy a weak flashcard must reach on a correct attempt to
    /// be redeemed back to not-weak.
    #[serde(default)]
    pub recovery_threshold: f64,
    /// Momentum share of the comfortability blend; the rest is the lifetime
    /// correct ratio.
    #[serde(default = "default_comfort_momentum_weight")]
    pub comfort_momentum_weight: f64,
    pub next_level_thresholds: NextLevelThresholds,
}

/// Comfortability -> recommended level mapping. Pluggable via config rather
/// than hard-coded in the scoring functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextLevelThresholds {
    pub easy_below: f64,
    pub medium_below: f64,
    pub hard_below: f64,
}

impl NextLevelThresholds {
    pub fn level_for(&self, comfortability: f64) -> Level {
        if comfortability < self.easy_below {
            Level::Easy
        } else if comfortability < self.medium_below {
            Level::Medium
        } else if comfortability < self.hard_below {
            Level::Hard
        } else {
            Level::Boss
        }
    }
}

impl Default for NextLevelThresholds {
    fn default() -> Self {
        Self {
            easy_below: 0.35,
            medium_below: 0.60,
            hard_below: 0.80,
        }
    }
}

fn default_momentum_half_life_days() -> f64 {
    7.0
}
fn default_recent_attempts_cap() -> usize {
    20
}
fn default_comfort_momentum_weight() -> f64 {
    0.6
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            coverage_points: LevelMap {
                easy: 1.0,
                medium: 1.5,
                hard: 2.0,
                boss: 3.0,
            },
            max_coverage_per_card: 10.0,
            accuracy_points: LevelMap {
                easy: AccuracyPoints {
                    correct: 1.0,
                    incorrect: -0.5,
                },
                medium: AccuracyPoints {
                    correct: 2.0,
                    incorrect: -1.0,
                },
                hard: AccuracyPoints {
                    correct: 3.0,
                    incorrect: -1.5,
                },
                boss: AccuracyPoints {
                    correct: 4.0,
                    incorrect: -2.0,
                },
            },
            momentum_half_life_days: default_momentum_half_life_days(),
            recent_attempts_cap: default_recent_attempts_cap(),
            recovery_threshold: 0.0,
            comfort_momentum_weight: default_comfort_momentum_weight(),
            next_level_thresholds: NextLevelThresholds::default(),
        }
    }
}

/// Pillar weights for the final readiness percentage. Exam-scoped and
/// deck-scoped readiness carry independently configured weight sets; the two
/// deliberately stay separate configuration surfaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessWeights {
    pub coverage: f64,
    pub accuracy: f64,
    pub momentum: f64,
}

impl ReadinessWeights {
    pub fn exam_default() -> Self {
        Self {
            coverage: 0.5,
            accuracy: 0.3,
            momentum: 0.2,
        }
    }

    pub fn deck_default() -> Self {
        Self {
            coverage: 0.4,
            accuracy: 0.4,
            momentum: 0.2,
        }
    }

    fn sum(&self) -> f64 {
        self.coverage + self.accuracy + self.momentum
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessConfig {
    /// Expected distinct questions per flashcard per level, used for the
    /// theoretical accuracy maximum of a scope.
    pub estimated_questions_per_level: LevelMap<u32>,
    #[serde(default = "ReadinessWeights::exam_default")]
    pub exam_weights: ReadinessWeights,
    #[serde(default = "ReadinessWeights::deck_default")]
    pub deck_weights: ReadinessWeights,
    /// TTL of the in-memory deck readiness cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    30
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            estimated_questions_per_level: LevelMap {
                easy: 2,
                medium: 2,
                hard: 1,
                boss: 1,
            },
            exam_weights: ReadinessWeights::exam_default(),
            deck_weights: ReadinessWeights::deck_default(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    /// Reinforcement weight of a flashcard with no performance record.
    #[serde(default = "default_unseen_weakness_weight")]
    pub unseen_weakness_weight: f64,
    /// Base reinforcement weight of a weak flashcard.
    #[serde(default = "default_weak_weight")]
    pub weak_weight: f64,
    /// Cap on the extra weight a deeply negative accuracy adds to a weak card.
    #[serde(default = "default_weak_accuracy_bonus_cap")]
    pub weak_accuracy_bonus_cap: f64,
    /// Reinforcement weight of a flashcard the learner is not weak on.
    #[serde(default = "default_known_weight")]
    pub known_weight: f64,
    /// Multiplier for question hashes the learner has never attempted.
    #[serde(default = "default_fresh_question_multiplier")]
    pub fresh_question_multiplier: f64,
}

fn default_unseen_weakness_weight() -> f64 {
    1.5
}
fn default_weak_weight() -> f64 {
    2.0
}
fn default_weak_accuracy_bonus_cap() -> f64 {
    2.0
}
fn default_known_weight() -> f64 {
    1.5
}
fn default_fresh_question_multiplier() -> f64 {
    1.3
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            unseen_weakness_weight: default_unseen_weakness_weight(),
            weak_weight: default_weak_weight(),
            weak_accuracy_bonus_cap: default_weak_accuracy_bonus_cap(),
            known_weight: default_known_weight(),
            fresh_question_multiplier: default_fresh_question_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
}

impl EngineConfig {
    pub fn from_env(env: &crate::config::EngineEnvConfig) -> Self {
        let mut config = Self::default();
        config.readiness.cache_ttl_secs = env.readiness_cache_ttl_secs;
        config.scoring.momentum_half_life_days = env.momentum_half_life_days;
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.scoring.max_coverage_per_card <= 0.0 {
            return Err("maxCoveragePerCard must be positive".to_string());
        }
        if self.scoring.momentum_half_life_days <= 0.0 {
            return Err("momentumHalfLifeDays must be positive".to_string());
        }
        if self.scoring.recent_attempts_cap == 0 {
            return Err("recentAttemptsCap must be at least 1".to_string());
        }
        for (level, pts) in self.scoring.accuracy_points.iter() {
            if pts.correct <= 0.0 {
                return Err(format!("accuracyPoints.{}.correct must be positive", level.as_str()));
            }
            if pts.incorrect > 0.0 {
                return Err(format!(
                    "accuracyPoints.{}.incorrect must not be positive",
                    level.as_str()
                ));
            }
        }
        for weights in [&self.readiness.exam_weights, &self.readiness.deck_weights] {
            if (weights.sum() - 1.0).abs() > 1e-9 {
                return Err("readiness weights must sum to 1.0".to_string());
            }
        }
        let t = &self.scoring.next_level_thresholds;
        if !(t.easy_below < t.medium_below && t.medium_below < t.hard_below) {
            return Err("nextLevelThresholds must be strictly increasing".to_string());
        }
        Ok(())
    }
}
