use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::types::{Level, LevelMap, LevelTally, RecentAttempt};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Per (user, flashcard) performance state. Created on the first graded
/// attempt, mutated on every attempt, never deleted. All `*_score` fields
/// plus `next_level` and `is_weak` are derived: `engine::scoring::fold_attempt`
/// recomputes them atomically from the tallies and the recent-attempt window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub user_id: String,
    pub flashcard_id: String,
    pub course_id: String,
    pub lecture_id: String,
    pub performance_by_level: LevelMap<LevelTally>,
    pub recent_attempts: Vec<RecentAttempt>,
    pub coverage_score: f64,
    pub accuracy_score: f64,
    pub momentum_score: f64,
    pub comfortability_score: f64,
    pub next_level: Level,
    pub is_weak: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PerformanceRecord {
    pub fn new(user_id: &str, flashcard_id: &str, course_id: &str, lecture_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            flashcard_id: flashcard_id.to_string(),
            course_id: course_id.to_string(),
            lecture_id: lecture_id.to_string(),
            performance_by_level: LevelMap::default(),
            recent_attempts: Vec::new(),
            coverage_score: 0.0,
            accuracy_score: 0.0,
            momentum_score: 0.0,
            comfortability_score: 0.0,
            next_level: Level::Easy,
            is_weak: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.performance_by_level.iter().map(|(_, t)| t.attempts).sum()
    }
}

impl Store {
    pub fn get_performance_record(
        &self,
        user_id: &str,
        flashcard_id: &str,
    ) -> Result<Option<PerformanceRecord>, StoreError> {
        let key = keys::performance_key(user_id, flashcard_id)?;
        match self.performance_records.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn upsert_performance_record(&self, record: &PerformanceRecord) -> Result<(), StoreError> {
        let key = keys::performance_key(&record.user_id, &record.flashcard_id)?;
        self.performance_records
            .insert(key.as_bytes(), Self::serialize(record)?)?;
        Ok(())
    }

    /// Records for the given flashcard scope, in scope order; flashcards the
    /// user never attempted are simply absent.
    pub fn query_performance_by_scope(
        &self,
        user_id: &str,
        flashcard_ids: &[String],
    ) -> Result<Vec<PerformanceRecord>, StoreError> {
        let mut records = Vec::with_capacity(flashcard_ids.len());
        for flashcard_id in flashcard_ids {
            if let Some(record) = self.get_performance_record(user_id, flashcard_id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// All weak records of a user, optionally restricted to one course.
    pub fn query_weak_performance(
        &self,
        user_id: &str,
        course_id: Option<&str>,
    ) -> Result<Vec<PerformanceRecord>, StoreError> {
        let prefix = keys::performance_prefix(user_id)?;
        let mut records = Vec::new();
        for item in self.performance_records.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = item?;
            let record: PerformanceRecord = Self::deserialize(&raw)?;
            if !record.is_weak {
                continue;
            }
            if let Some(course) = course_id {
                if record.course_id != course {
                    continue;
                }
            }
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, Store) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Store::open(tmp.path().join("perf.sled").to_str().unwrap()).unwrap();
        (tmp, store)
    }

    #[test]
    fn scope_query_skips_missing_records() {
        let (_tmp, store) = open_store();
        let record = PerformanceRecord::new("u1", "f1", "c1", "l1");
        store.upsert_performance_record(&record).unwrap();

        let records = store
            .query_performance_by_scope("u1", &["f1".to_string(), "f2".to_string()])
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flashcard_id, "f1");
    }

    #[test]
    fn weak_query_filters_course() {
        let (_tmp, store) = open_store();
        let mut a = PerformanceRecord::new("u1", "f1", "c1", "l1");
        a.is_weak = true;
        let mut b = PerformanceRecord::new("u1", "f2", "c2", "l1");
        b.is_weak = true;
        let c = PerformanceRecord::new("u1", "f3", "c1", "l1");
        for r in [&a, &b, &c] {
            store.upsert_performance_record(r).unwrap();
        }

        let weak_c1 = store.query_weak_performance("u1", Some("c1")).unwrap();
        assert_eq!(weak_c1.len(), 1);
        assert_eq!(weak_c1[0].flashcard_id, "f1");

        let weak_all = store.query_weak_performance("u1", None).unwrap();
        assert_eq!(weak_all.len(), 2);
    }
}
