//! Readiness aggregation.
//!
//! A readiness record is a weighted blend of three pillars (coverage,
//! accuracy, momentum), each normalized against the theoretical maximum of
//! the scope. Deck-scoped results sit behind a short-lived in-memory cache
//! that answer submission invalidates explicitly; exam-scoped results are
//! always computed fresh.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::engine::config::{EngineConfig, ReadinessWeights};
use crate::engine::types::{
    Level, PillarSums, ReadinessRecord, ReadinessScope, WeakFlashcard,
};
use crate::engine::MasteryEngine;
use crate::response::AppError;
use crate::store::operations::performance::PerformanceRecord;
use crate::store::StoreError;

/// Canonical deck scope: ids sorted and de-duplicated, so the same deck set
/// always maps to the same cache and store key.
pub fn canonical_deck_ids(deck_ids: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = deck_ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}

pub fn deck_scope_key(canonical_ids: &[String]) -> String {
    format!("decks:{}", canonical_ids.join("+"))
}

pub fn exam_scope_key(exam_id: &str) -> String {
    format!("exam:{exam_id}")
}

struct CachedDeckReadiness {
    record: ReadinessRecord,
    deck_ids: Vec<String>,
    cached_at: DateTime<Utc>,
}

/// In-memory cache of deck-scoped readiness, keyed by `(userId, scopeKey)`.
/// Entries expire after the configured TTL and are invalidated eagerly when
/// an answer submission touches an overlapping deck set.
pub struct DeckReadinessCache {
    entries: RwLock<HashMap<(String, String), CachedDeckReadiness>>,
}

impl DeckReadinessCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(
        &self,
        user_id: &str,
        scope_key: &str,
        ttl_secs: u64,
        now: DateTime<Utc>,
    ) -> Option<ReadinessRecord> {
        let entries = self.entries.read().await;
        let entry = entries.get(&(user_id.to_string(), scope_key.to_string()))?;
        if now - entry.cached_at > Duration::seconds(ttl_secs as i64) {
            return None;
        }
        Some(entry.record.clone())
    }

    pub async fn put(
        &self,
        user_id: &str,
        scope_key: &str,
        deck_ids: Vec<String>,
        record: ReadinessRecord,
        now: DateTime<Utc>,
    ) {
        let mut entries = self.entries.write().await;
        entries.insert(
            (user_id.to_string(), scope_key.to_string()),
            CachedDeckReadiness {
                record,
                deck_ids,
                cached_at: now,
            },
        );
    }

    /// Drops every cached entry of the user whose deck set shares at least
    /// one deck with `deck_ids`.
    pub async fn invalidate_intersecting(&self, user_id: &str, deck_ids: &[String]) {
        let mut entries = self.entries.write().await;
        entries.retain(|(entry_user, _), entry| {
            entry_user != user_id || !entry.deck_ids.iter().any(|d| deck_ids.contains(d))
        });
    }
}

impl Default for DeckReadinessCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregates the in-scope performance records into one readiness record.
/// An empty scope or a user with no attempts yields a well-formed zero
/// record rather than an error.
pub fn compute_readiness(
    user_id: &str,
    scope: ReadinessScope,
    scope_size: usize,
    records: &[PerformanceRecord],
    weights: ReadinessWeights,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> ReadinessRecord {
    let mut raw = PillarSums::default();
    for record in records {
        raw.coverage += record.coverage_score;
        raw.accuracy += record.accuracy_score;
        raw.momentum += record.momentum_score;
    }

    let per_card_accuracy_max: f64 = Level::ALL
        .iter()
        .map(|level| {
            *config.readiness.estimated_questions_per_level.get(*level) as f64
                * config.scoring.accuracy_points.get(*level).correct
        })
        .sum();
    let theoretical_max = PillarSums {
        coverage: scope_size as f64 * config.scoring.max_coverage_per_card,
        accuracy: scope_size as f64 * per_card_accuracy_max,
        momentum: scope_size as f64,
    };

    let coverage_factor = normalize(raw.coverage, theoretical_max.coverage);
    let accuracy_factor = normalize(raw.accuracy, theoretical_max.accuracy);
    let momentum_factor = normalize(raw.momentum, theoretical_max.momentum);

    let overall_score = 100.0
        * (weights.coverage * coverage_factor
            + weights.accuracy * accuracy_factor
            + weights.momentum * momentum_factor);

    let mut weak_flashcards: Vec<WeakFlashcard> = records
        .iter()
        .filter(|r| r.is_weak)
        .map(|r| WeakFlashcard {
            flashcard_id: r.flashcard_id.clone(),
            accuracy_score: r.accuracy_score,
        })
        .collect();
    // worst first
    weak_flashcards.sort_by(|a, b| {
        a.accuracy_score
            .partial_cmp(&b.accuracy_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ReadinessRecord {
        user_id: user_id.to_string(),
        scope,
        overall_score,
        coverage_factor,
        accuracy_factor,
        momentum_factor,
        raw_sums: raw,
        theoretical_max,
        weak_flashcards,
        flashcards_started: records.len() as u32,
        flashcards_total: scope_size as u32,
        last_calculated: now,
    }
}

fn normalize(raw: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (raw / max).clamp(0.0, 1.0)
}

impl MasteryEngine {
    /// Exam readiness over the flashcards of the exam's lectures. Always
    /// computed fresh; the persisted copy only serves external consumers.
    pub async fn exam_readiness(
        &self,
        user_id: &str,
        exam_id: &str,
    ) -> Result<ReadinessRecord, AppError> {
        let exam = self
            .store()
            .get_exam(exam_id)?
            .ok_or_else(|| AppError::not_found("Exam not found"))?;
        let flashcards = self
            .store()
            .flashcards_for_lectures(&exam.course_id, &exam.lecture_ids)?;
        let flashcard_ids: Vec<String> = flashcards.into_iter().map(|f| f.id).collect();

        let config = self.get_config().await;
        let records = self
            .store()
            .query_performance_by_scope(user_id, &flashcard_ids)?;
        let record = compute_readiness(
            user_id,
            ReadinessScope::Exam {
                exam_id: exam_id.to_string(),
            },
            flashcard_ids.len(),
            &records,
            config.readiness.exam_weights,
            &config,
            self.now(),
        );

        self.persist_readiness(user_id, &exam_scope_key(exam_id), &record)?;
        Ok(record)
    }

    /// Deck readiness with the TTL cache in front. `force_refresh` bypasses
    /// the cache but still refreshes it.
    pub async fn deck_readiness(
        &self,
        user_id: &str,
        course_id: &str,
        deck_ids: &[String],
        force_refresh: bool,
    ) -> Result<ReadinessRecord, AppError> {
        let canonical = canonical_deck_ids(deck_ids);
        let scope_key = deck_scope_key(&canonical);
        let config = self.get_config().await;
        let now = self.now();

        if !force_refresh {
            if let Some(cached) = self
                .readiness_cache
                .get(user_id, &scope_key, config.readiness.cache_ttl_secs, now)
                .await
            {
                return Ok(cached);
            }
        }

        let mut flashcard_ids = Vec::new();
        for deck_id in &canonical {
            flashcard_ids.extend(
                self.store()
                    .load_flashcards(course_id, deck_id)?
                    .into_iter()
                    .map(|f| f.id),
            );
        }

        let records = self
            .store()
            .query_performance_by_scope(user_id, &flashcard_ids)?;
        let record = compute_readiness(
            user_id,
            ReadinessScope::Decks {
                deck_ids: canonical.clone(),
            },
            flashcard_ids.len(),
            &records,
            config.readiness.deck_weights,
            &config,
            now,
        );

        self.persist_readiness(user_id, &scope_key, &record)?;
        self.readiness_cache
            .put(user_id, &scope_key, canonical, record.clone(), now)
            .await;
        Ok(record)
    }

    /// All weak flashcards of a user, worst accuracy first, optionally
    /// restricted to one course.
    pub async fn weak_flashcards(
        &self,
        user_id: &str,
        course_id: Option<&str>,
    ) -> Result<Vec<WeakFlashcard>, AppError> {
        let records = self.store().query_weak_performance(user_id, course_id)?;
        let mut weak: Vec<WeakFlashcard> = records
            .into_iter()
            .map(|r| WeakFlashcard {
                flashcard_id: r.flashcard_id,
                accuracy_score: r.accuracy_score,
            })
            .collect();
        weak.sort_by(|a, b| {
            a.accuracy_score
                .partial_cmp(&b.accuracy_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(weak)
    }

    pub(crate) async fn invalidate_deck_readiness(&self, user_id: &str, deck_ids: &[String]) {
        self.readiness_cache
            .invalidate_intersecting(user_id, deck_ids)
            .await;
    }

    fn persist_readiness(
        &self,
        user_id: &str,
        scope_key: &str,
        record: &ReadinessRecord,
    ) -> Result<(), AppError> {
        let value = serde_json::to_value(record).map_err(StoreError::from)?;
        self.store().set_readiness_record(user_id, scope_key, &value)?;
        Ok(())
    }
}
