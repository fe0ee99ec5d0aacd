use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::types::Activity;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// One adaptive Mix study session. Sessions are endless round generators:
/// there is no completed state, the queue is regenerated whenever a round is
/// exhausted. `version` implements optimistic concurrency: an update whose
/// version no longer matches the stored one fails with a conflict instead of
/// silently overwriting another writer's queue state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixSession {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub deck_ids: Vec<String>,
    /// Fixed at creation, relevance-descending.
    pub flashcard_master_order: Vec<String>,
    pub activity_queue: Vec<Activity>,
    pub current_round: u32,
    pub seen_in_current_round: BTreeSet<String>,
    /// Grows monotonically; a hash is only removed when the learner reveals
    /// the answer, so the question may resurface later.
    pub asked_question_hashes: Vec<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_mix_session(&self, session: &MixSession) -> Result<(), StoreError> {
        let key = keys::mix_session_key(&session.id);
        let value = Self::serialize(session)?;
        match self
            .mix_sessions
            .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(value))?
        {
            Ok(()) => Ok(()),
            Err(_) => Err(StoreError::Conflict {
                entity: "mix_session".to_string(),
                key: session.id.clone(),
            }),
        }
    }

    pub fn get_mix_session(&self, session_id: &str) -> Result<Option<MixSession>, StoreError> {
        let key = keys::mix_session_key(session_id);
        match (self.mix_sessions.get(key.as_bytes()))? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Persist a mutated session. `session.version` must be the version it
    /// was loaded with; on success it is bumped in place. A mismatch means a
    /// concurrent writer got there first and surfaces as `Conflict`.
    pub fn update_mix_session(&self, session: &mut MixSession) -> Result<(), StoreError> {
        let key = keys::mix_session_key(&session.id);
        let current_raw =
            self.mix_sessions
                .get(key.as_bytes())?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "mix_session".to_string(),
                    key: session.id.clone(),
                })?;
        let current: MixSession = Self::deserialize(&current_raw)?;
        if current.version != session.version {
            return Err(StoreError::Conflict {
                entity: "mix_session".to_string(),
                key: session.id.clone(),
            });
        }

        session.version += 1;
        session.updated_at = Utc::now();
        let value = Self::serialize(session)?;

        match self
            .mix_sessions
            .compare_and_swap(key.as_bytes(), Some(&current_raw), Some(value))?
        {
            Ok(()) => Ok(()),
            Err(_) => {
                session.version -= 1;
                Err(StoreError::Conflict {
                    entity: "mix_session".to_string(),
                    key: session.id.clone(),
                })
            }
        }
    }
}
