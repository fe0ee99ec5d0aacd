//! Mix Mode session state machine.
//!
//! Sessions are endless round generators. Round one asks one medium
//! question per flashcard in relevance order; every later round re-asks each
//! flashcard at its freshly recommended level. A losing answer injects a
//! remediation pair (review the card, then a follow-up question) at the
//! front of the queue. All mutating operations on one session run under a
//! per-session lock on top of the store's optimistic version check.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::engine::types::{Activity, ActivityKind, Level};
use crate::engine::{grading, scoring, selector, MasteryEngine};
use crate::response::AppError;
use crate::store::operations::catalog::{AnswerSpec, Flashcard, Question};
use crate::store::operations::mix_sessions::MixSession;
use crate::store::operations::performance::PerformanceRecord;
use crate::store::operations::question_attempts::QuestionAttempt;

/// Regeneration attempts per `next_activity` call. One regeneration covers
/// the normal round rollover; the second covers a freshly regenerated round
/// whose activities all turn out to have no eligible question.
const MAX_REGENERATIONS_PER_CALL: u32 = 2;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: String,
    pub total_flashcards: u32,
}

/// A question as handed to the learner. The answer key never leaves the
/// server through this shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub hash: String,
    pub flashcard_id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

impl From<Question> for QuestionView {
    fn from(question: Question) -> Self {
        Self {
            hash: question.hash,
            flashcard_id: question.source_flashcard_id,
            prompt: question.prompt,
            options: question.options,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextActivity {
    pub kind: ActivityKind,
    pub level: Level,
    pub is_follow_up: bool,
    pub current_round: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flashcard: Option<Flashcard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_hash: String,
    pub user_answer: Option<Value>,
    #[serde(default)]
    pub is_follow_up: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub is_correct: bool,
    pub partial_credit: f64,
    pub points_earned: f64,
    pub correct_answer: AnswerSpec,
    pub explanation: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealRequest {
    pub question_hash: String,
    #[serde(default)]
    pub is_follow_up: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealOutcome {
    pub correct_answer: AnswerSpec,
    pub explanation: String,
}

impl MasteryEngine {
    pub async fn start_session(
        &self,
        user_id: &str,
        course_id: &str,
        deck_ids: &[String],
    ) -> Result<StartedSession, AppError> {
        if deck_ids.is_empty() {
            return Err(AppError::bad_request(
                "INVALID_SCOPE",
                "deckIds must not be empty",
            ));
        }

        let mut flashcards = Vec::new();
        for deck_id in deck_ids {
            flashcards.extend(self.store().load_flashcards(course_id, deck_id)?);
        }
        // Stable sort keeps catalog order among equally relevant cards.
        flashcards.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let master_order: Vec<String> = flashcards.into_iter().map(|f| f.id).collect();
        let activity_queue: Vec<Activity> = master_order
            .iter()
            .map(|id| Activity {
                kind: ActivityKind::Question,
                flashcard_id: id.clone(),
                level: Level::Medium,
                is_follow_up: false,
            })
            .collect();

        let now = self.now();
        let session = MixSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            deck_ids: deck_ids.to_vec(),
            flashcard_master_order: master_order,
            activity_queue,
            current_round: 1,
            seen_in_current_round: BTreeSet::new(),
            asked_question_hashes: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.store().create_mix_session(&session)?;

        tracing::info!(
            session_id = %session.id,
            user_id = %user_id,
            flashcards = session.flashcard_master_order.len(),
            "Mix session started"
        );
        Ok(StartedSession {
            total_flashcards: session.flashcard_master_order.len() as u32,
            session_id: session.id,
        })
    }

    /// Pops the next presentable activity. Activities whose flashcard has no
    /// eligible question at the target level are dropped silently; an empty
    /// queue regenerates the next round. The loop is bounded, so a session
    /// whose catalog lost all its questions reports not-found instead of
    /// spinning.
    pub async fn next_activity(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<NextActivity, AppError> {
        let lock = self.acquire_session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut session = self.load_owned_session(session_id, user_id)?;
        let mut regenerations = 0;

        loop {
            if session.activity_queue.is_empty() {
                if regenerations >= MAX_REGENERATIONS_PER_CALL {
                    return Err(AppError::not_found(
                        "No eligible activity available for this session",
                    ));
                }
                self.regenerate_round(&mut session)?;
                regenerations += 1;
                if session.activity_queue.is_empty() {
                    return Err(AppError::not_found(
                        "No eligible activity available for this session",
                    ));
                }
                continue;
            }

            let activity = session.activity_queue.remove(0);
            if !activity.is_follow_up {
                session
                    .seen_in_current_round
                    .insert(activity.flashcard_id.clone());
            }

            let Some(flashcard) = self.store().get_flashcard(&activity.flashcard_id)? else {
                // Catalog lost the card; drop the activity.
                tracing::warn!(
                    session_id = %session.id,
                    flashcard_id = %activity.flashcard_id,
                    "Skipping activity for missing flashcard"
                );
                continue;
            };

            match activity.kind {
                ActivityKind::FlashcardReview => {
                    self.store().update_mix_session(&mut session)?;
                    return Ok(NextActivity {
                        kind: ActivityKind::FlashcardReview,
                        level: activity.level,
                        is_follow_up: activity.is_follow_up,
                        current_round: session.current_round,
                        flashcard: Some(flashcard),
                        question: None,
                    });
                }
                ActivityKind::Question => {
                    let picked = selector::pick_question_for_flashcard(
                        self.store(),
                        user_id,
                        &flashcard,
                        activity.level,
                        &session.asked_question_hashes,
                    )?;
                    match picked {
                        Some(question) => {
                            session.asked_question_hashes.push(question.hash.clone());
                            self.store().update_mix_session(&mut session)?;
                            return Ok(NextActivity {
                                kind: ActivityKind::Question,
                                level: activity.level,
                                is_follow_up: activity.is_follow_up,
                                current_round: session.current_round,
                                flashcard: None,
                                question: Some(question.into()),
                            });
                        }
                        None => continue,
                    }
                }
            }
        }
    }

    pub async fn submit_answer(
        &self,
        session_id: &str,
        user_id: &str,
        submission: AnswerSubmission,
    ) -> Result<SubmitOutcome, AppError> {
        let lock = self.acquire_session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut session = self.load_owned_session(session_id, user_id)?;
        let question = self
            .store()
            .get_question(&submission.question_hash)?
            .ok_or_else(|| AppError::not_found("Question not found"))?;

        // The level, answer key and flashcard attribution all come from the
        // catalog entry for the hash, never from the request body.
        let flashcard_id = question.source_flashcard_id.clone();

        let grade = grading::grade(&question.answer, submission.user_answer.as_ref());
        let config = self.get_config().await;
        let now = self.now();
        let earned = {
            let record_lock = self.acquire_record_lock(user_id, &flashcard_id).await;
            let _record_guard = record_lock.lock().await;
            let mut record = self.load_or_init_record(user_id, &flashcard_id)?;
            let earned = scoring::fold_attempt(&mut record, question.level, &grade, now, &config.scoring);
            self.store().upsert_performance_record(&record)?;
            earned
        };

        self.store().upsert_question_attempt(&QuestionAttempt {
            user_id: user_id.to_string(),
            question_hash: question.hash.clone(),
            is_correct: grade.is_correct,
            last_attempted: now,
        })?;

        self.invalidate_deck_readiness(user_id, &session.deck_ids)
            .await;

        if earned <= 0.0 && !submission.is_follow_up {
            self.inject_remediation(user_id, &mut session, &flashcard_id)?;
        }
        self.store().update_mix_session(&mut session)?;

        tracing::debug!(
            session_id = %session.id,
            flashcard_id = %flashcard_id,
            question_hash = %question.hash,
            is_correct = grade.is_correct,
            points_earned = earned,
            "Answer submitted"
        );
        Ok(SubmitOutcome {
            is_correct: grade.is_correct,
            partial_credit: grade.partial_credit,
            points_earned: earned,
            correct_answer: question.answer,
            explanation: question.explanation,
        })
    }

    /// Shows the answer without grading. The hash is released so the
    /// question may resurface, and the same remediation pair is injected as
    /// for a losing submission unless this already was a follow-up.
    pub async fn reveal_answer(
        &self,
        session_id: &str,
        user_id: &str,
        request: RevealRequest,
    ) -> Result<RevealOutcome, AppError> {
        let lock = self.acquire_session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut session = self.load_owned_session(session_id, user_id)?;
        let question = self
            .store()
            .get_question(&request.question_hash)?
            .ok_or_else(|| AppError::not_found("Question not found"))?;

        session
            .asked_question_hashes
            .retain(|hash| hash != &request.question_hash);
        if !request.is_follow_up {
            self.inject_remediation(user_id, &mut session, &question.source_flashcard_id)?;
        }
        self.store().update_mix_session(&mut session)?;

        Ok(RevealOutcome {
            correct_answer: question.answer,
            explanation: question.explanation,
        })
    }

    fn load_owned_session(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<MixSession, AppError> {
        let session = self
            .store()
            .get_mix_session(session_id)?
            .ok_or_else(|| AppError::not_found("Session not found"))?;
        if session.user_id != user_id {
            return Err(AppError::forbidden("Session belongs to another user"));
        }
        Ok(session)
    }

    fn load_or_init_record(
        &self,
        user_id: &str,
        flashcard_id: &str,
    ) -> Result<PerformanceRecord, AppError> {
        if let Some(record) = self.store().get_performance_record(user_id, flashcard_id)? {
            return Ok(record);
        }
        let flashcard = self
            .store()
            .get_flashcard(flashcard_id)?
            .ok_or_else(|| AppError::not_found("Flashcard not found"))?;
        Ok(PerformanceRecord::new(
            user_id,
            flashcard_id,
            &flashcard.course_id,
            &flashcard.lecture_id,
        ))
    }

    /// Front-loads a review of the flashcard plus one follow-up question at
    /// the freshly recommended level. Both entries are follow-ups, so a
    /// second failure never chains another pair.
    fn inject_remediation(
        &self,
        user_id: &str,
        session: &mut MixSession,
        flashcard_id: &str,
    ) -> Result<(), AppError> {
        let level = self
            .store()
            .get_performance_record(user_id, flashcard_id)?
            .map(|record| record.next_level)
            .unwrap_or(Level::Medium);

        session.activity_queue.insert(
            0,
            Activity {
                kind: ActivityKind::Question,
                flashcard_id: flashcard_id.to_string(),
                level,
                is_follow_up: true,
            },
        );
        session.activity_queue.insert(
            0,
            Activity {
                kind: ActivityKind::FlashcardReview,
                flashcard_id: flashcard_id.to_string(),
                level,
                is_follow_up: true,
            },
        );
        Ok(())
    }

    /// One non-follow-up question per flashcard of the master order, at the
    /// level each performance record currently recommends (easy when the
    /// card was never attempted).
    fn regenerate_round(&self, session: &mut MixSession) -> Result<(), AppError> {
        let mut queue = Vec::with_capacity(session.flashcard_master_order.len());
        for flashcard_id in &session.flashcard_master_order {
            let level = self
                .store()
                .get_performance_record(&session.user_id, flashcard_id)?
                .map(|record| record.next_level)
                .unwrap_or(Level::Easy);
            queue.push(Activity {
                kind: ActivityKind::Question,
                flashcard_id: flashcard_id.clone(),
                level,
                is_follow_up: false,
            });
        }

        session.activity_queue = queue;
        session.seen_in_current_round.clear();
        session.current_round += 1;
        tracing::debug!(
            session_id = %session.id,
            round = session.current_round,
            "Round regenerated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::config::EngineConfig;
    use crate::store::Store;
    use serde_json::json;

    fn test_engine() -> (MasteryEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            Arc::new(Store::open(dir.path().join("session.sled").to_str().unwrap()).unwrap());
        let engine = MasteryEngine::new(EngineConfig::default(), store);
        (engine, dir)
    }

    fn seed_flashcard(engine: &MasteryEngine, id: &str, relevance: f64) {
        engine
            .store()
            .put_flashcard(&Flashcard {
                id: id.to_string(),
                course_id: "c1".to_string(),
                deck_id: "d1".to_string(),
                lecture_id: "l1".to_string(),
                front: format!("front {id}"),
                back: format!("back {id}"),
                relevance_score: relevance,
            })
            .unwrap();
    }

    fn seed_question(engine: &MasteryEngine, hash: &str, flashcard_id: &str, level: Level) {
        engine
            .store()
            .put_question(&Question {
                hash: hash.to_string(),
                course_id: "c1".to_string(),
                deck_id: "d1".to_string(),
                source_flashcard_id: flashcard_id.to_string(),
                level,
                prompt: format!("prompt {hash}"),
                options: vec!["right".to_string(), "wrong".to_string()],
                answer: AnswerSpec::SingleChoice {
                    answer: "right".to_string(),
                },
                explanation: format!("explanation {hash}"),
            })
            .unwrap();
    }

    fn seed_all_levels(engine: &MasteryEngine, flashcard_id: &str) {
        for level in Level::ALL {
            seed_question(
                engine,
                &format!("q-{flashcard_id}-{}", level.as_str()),
                flashcard_id,
                level,
            );
        }
    }

    async fn start(engine: &MasteryEngine) -> String {
        engine
            .start_session("u1", "c1", &["d1".to_string()])
            .await
            .unwrap()
            .session_id
    }

    fn submission(hash: &str, answer: Value, follow_up: bool) -> AnswerSubmission {
        AnswerSubmission {
            question_hash: hash.to_string(),
            user_answer: Some(answer),
            is_follow_up: follow_up,
        }
    }

    #[tokio::test]
    async fn start_rejects_empty_deck_list() {
        let (engine, _dir) = test_engine();
        let err = engine.start_session("u1", "c1", &[]).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn round_one_asks_medium_questions_by_relevance() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 0.9);
        seed_flashcard(&engine, "f2", 0.4);
        seed_all_levels(&engine, "f1");
        seed_all_levels(&engine, "f2");

        let session_id = start(&engine).await;
        let first = engine.next_activity(&session_id, "u1").await.unwrap();
        assert_eq!(first.kind, ActivityKind::Question);
        assert_eq!(first.level, Level::Medium);
        assert!(!first.is_follow_up);
        assert_eq!(first.question.unwrap().flashcard_id, "f1");

        let second = engine.next_activity(&session_id, "u1").await.unwrap();
        assert_eq!(second.question.unwrap().flashcard_id, "f2");
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_not_lost() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 1.0);
        seed_all_levels(&engine, "f1");
        let session_id = start(&engine).await;

        let err = engine.next_activity(&session_id, "intruder").await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);

        let err = engine.next_activity("no-such-session", "u1").await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_answer_injects_remediation_pair_at_front() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 0.9);
        seed_flashcard(&engine, "f2", 0.4);
        seed_all_levels(&engine, "f1");
        seed_all_levels(&engine, "f2");

        let session_id = start(&engine).await;
        let first = engine.next_activity(&session_id, "u1").await.unwrap();
        let hash = first.question.unwrap().hash;

        let outcome = engine
            .submit_answer(&session_id, "u1", submission(&hash, json!("wrong"), false))
            .await
            .unwrap();
        assert!(!outcome.is_correct);
        assert!(outcome.points_earned < 0.0);

        let review = engine.next_activity(&session_id, "u1").await.unwrap();
        assert_eq!(review.kind, ActivityKind::FlashcardReview);
        assert!(review.is_follow_up);
        assert_eq!(review.flashcard.unwrap().id, "f1");

        let follow_up = engine.next_activity(&session_id, "u1").await.unwrap();
        assert_eq!(follow_up.kind, ActivityKind::Question);
        assert!(follow_up.is_follow_up);
        assert_eq!(follow_up.question.as_ref().unwrap().flashcard_id, "f1");

        // After remediation, the round resumes with f2.
        let resumed = engine.next_activity(&session_id, "u1").await.unwrap();
        assert_eq!(resumed.question.unwrap().flashcard_id, "f2");
    }

    #[tokio::test]
    async fn wrong_follow_up_does_not_chain_remediation() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 1.0);
        seed_all_levels(&engine, "f1");

        let session_id = start(&engine).await;
        let first = engine.next_activity(&session_id, "u1").await.unwrap();
        let hash = first.question.unwrap().hash;
        engine
            .submit_answer(&session_id, "u1", submission(&hash, json!("wrong"), true))
            .await
            .unwrap();

        let session = engine.store().get_mix_session(&session_id).unwrap().unwrap();
        assert!(session
            .activity_queue
            .iter()
            .all(|activity| !activity.is_follow_up));
    }

    #[tokio::test]
    async fn partial_credit_with_positive_points_skips_remediation() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 1.0);
        engine
            .store()
            .put_question(&Question {
                hash: "q-multi".to_string(),
                course_id: "c1".to_string(),
                deck_id: "d1".to_string(),
                source_flashcard_id: "f1".to_string(),
                level: Level::Medium,
                prompt: "pick all".to_string(),
                options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                answer: AnswerSpec::MultiChoice {
                    answers: vec!["a".to_string(), "b".to_string()],
                },
                explanation: "a and b".to_string(),
            })
            .unwrap();

        let session_id = start(&engine).await;
        let first = engine.next_activity(&session_id, "u1").await.unwrap();
        let hash = first.question.unwrap().hash;

        let outcome = engine
            .submit_answer(&session_id, "u1", submission(&hash, json!(["a"]), false))
            .await
            .unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.partial_credit, 0.5);
        assert!(outcome.points_earned > 0.0);

        let session = engine.store().get_mix_session(&session_id).unwrap().unwrap();
        assert!(session.activity_queue.is_empty());
    }

    #[tokio::test]
    async fn round_completes_and_regenerates_at_recommended_levels() {
        let (engine, _dir) = test_engine();
        for (id, relevance) in [("f1", 0.9), ("f2", 0.6), ("f3", 0.3)] {
            seed_flashcard(&engine, id, relevance);
            seed_all_levels(&engine, id);
        }

        let session_id = start(&engine).await;
        for _ in 0..3 {
            let activity = engine.next_activity(&session_id, "u1").await.unwrap();
            let question = activity.question.unwrap();
            engine
                .submit_answer(
                    &session_id,
                    "u1",
                    submission(&question.hash, json!("right"), false),
                )
                .await
                .unwrap();
        }

        let before = engine.store().get_mix_session(&session_id).unwrap().unwrap();
        assert_eq!(before.current_round, 1);
        assert_eq!(before.seen_in_current_round.len(), 3);
        assert!(before.activity_queue.is_empty());

        // The next pop rolls the session into round two.
        engine.next_activity(&session_id, "u1").await.unwrap();
        let after = engine.store().get_mix_session(&session_id).unwrap().unwrap();
        assert_eq!(after.current_round, 2);
        assert_eq!(after.seen_in_current_round.len(), 1);
        assert_eq!(
            after.activity_queue.len(),
            after.flashcard_master_order.len() - 1
        );
    }

    #[tokio::test]
    async fn activities_without_eligible_questions_are_skipped_silently() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 0.9);
        seed_flashcard(&engine, "f2", 0.4);
        // f1 has no medium question at all; f2 does.
        seed_question(&engine, "q-f2-medium", "f2", Level::Medium);

        let session_id = start(&engine).await;
        let first = engine.next_activity(&session_id, "u1").await.unwrap();
        assert_eq!(first.question.unwrap().flashcard_id, "f2");
    }

    #[tokio::test]
    async fn exhausted_catalog_reports_not_found_instead_of_spinning() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 1.0);

        let session_id = start(&engine).await;
        let err = engine.next_activity(&session_id, "u1").await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reveal_releases_the_hash_and_injects_remediation() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 1.0);
        seed_all_levels(&engine, "f1");

        let session_id = start(&engine).await;
        let first = engine.next_activity(&session_id, "u1").await.unwrap();
        let hash = first.question.unwrap().hash;

        let outcome = engine
            .reveal_answer(
                &session_id,
                "u1",
                RevealRequest {
                    question_hash: hash.clone(),
                    is_follow_up: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.correct_answer,
            AnswerSpec::SingleChoice {
                answer: "right".to_string()
            }
        );

        let session = engine.store().get_mix_session(&session_id).unwrap().unwrap();
        assert!(!session.asked_question_hashes.contains(&hash));
        assert_eq!(session.activity_queue.len(), 2);
        assert_eq!(session.activity_queue[0].kind, ActivityKind::FlashcardReview);
        assert_eq!(session.activity_queue[1].kind, ActivityKind::Question);
        // No performance attempt was recorded.
        assert!(engine
            .store()
            .get_performance_record("u1", "f1")
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sessions_never_lose_attempts_on_one_flashcard() {
        let (engine, _dir) = test_engine();
        let engine = Arc::new(engine);
        seed_flashcard(&engine, "f1", 1.0);
        seed_all_levels(&engine, "f1");

        // Same learner, two parallel sessions over the same deck.
        let session_a = start(&engine).await;
        let session_b = start(&engine).await;

        let mut handles = Vec::new();
        for session_id in [session_a, session_b] {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    engine
                        .submit_answer(
                            &session_id,
                            "u1",
                            submission("q-f1-medium", json!("right"), true),
                        )
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = engine
            .store()
            .get_performance_record("u1", "f1")
            .unwrap()
            .unwrap();
        assert_eq!(record.total_attempts(), 50);
    }

    #[tokio::test]
    async fn attempts_are_attributed_to_the_questions_source_flashcard() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 0.9);
        seed_flashcard(&engine, "f2", 0.4);
        seed_all_levels(&engine, "f1");
        seed_all_levels(&engine, "f2");

        let session_id = start(&engine).await;
        // The queue head points at f1, but the submitted hash belongs to f2.
        engine
            .submit_answer(&session_id, "u1", submission("q-f2-hard", json!("wrong"), false))
            .await
            .unwrap();

        assert!(engine
            .store()
            .get_performance_record("u1", "f1")
            .unwrap()
            .is_none());
        let record = engine
            .store()
            .get_performance_record("u1", "f2")
            .unwrap()
            .unwrap();
        assert_eq!(record.total_attempts(), 1);

        // Remediation likewise targets the source card.
        let session = engine.store().get_mix_session(&session_id).unwrap().unwrap();
        assert!(session.activity_queue[0].is_follow_up);
        assert_eq!(session.activity_queue[0].flashcard_id, "f2");
    }

    #[tokio::test]
    async fn submit_updates_performance_and_question_attempt() {
        let (engine, _dir) = test_engine();
        seed_flashcard(&engine, "f1", 1.0);
        seed_all_levels(&engine, "f1");

        let session_id = start(&engine).await;
        let first = engine.next_activity(&session_id, "u1").await.unwrap();
        let hash = first.question.unwrap().hash;
        engine
            .submit_answer(&session_id, "u1", submission(&hash, json!("right"), false))
            .await
            .unwrap();

        let record = engine
            .store()
            .get_performance_record("u1", "f1")
            .unwrap()
            .unwrap();
        assert_eq!(record.total_attempts(), 1);
        assert!(record.coverage_score > 0.0);
        assert!(!record.is_weak);

        let attempt = engine
            .store()
            .get_question_attempt("u1", &hash)
            .unwrap()
            .unwrap();
        assert!(attempt.is_correct);
    }
}
