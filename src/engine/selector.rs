//! Question selection.
//!
//! Two strategies live here: the per-flashcard three-tier fallback used
//! inside a Mix session, and the two-phase discovery/reinforcement sampler
//! behind standalone quizzes.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::config::SelectorConfig;
use crate::engine::types::Level;
use crate::store::operations::catalog::{Flashcard, Question};
use crate::store::operations::performance::PerformanceRecord;
use crate::store::{Store, StoreError};

/// Three-tier fallback for one flashcard at one level, first non-empty tier
/// wins, uniform random within a tier:
///
/// 1. questions whose hash has not been asked in this session,
/// 2. questions the learner previously answered incorrectly,
/// 3. any question at the level.
///
/// Returns `None` only when the catalog has no question at all for the
/// flashcard at this level.
pub fn pick_question_for_flashcard(
    store: &Store,
    user_id: &str,
    flashcard: &Flashcard,
    level: Level,
    asked_hashes: &[String],
) -> Result<Option<Question>, StoreError> {
    let candidates = store.questions_for_flashcard(
        &flashcard.course_id,
        &flashcard.deck_id,
        level,
        &flashcard.id,
    )?;
    if candidates.is_empty() {
        return Ok(None);
    }

    let unasked: Vec<&Question> = candidates
        .iter()
        .filter(|q| !asked_hashes.contains(&q.hash))
        .collect();
    if let Some(question) = unasked.choose(&mut rand::thread_rng()) {
        return Ok(Some((*question).clone()));
    }

    let mut previously_wrong = Vec::new();
    for question in &candidates {
        if let Some(attempt) = store.get_question_attempt(user_id, &question.hash)? {
            if !attempt.is_correct {
                previously_wrong.push(question);
            }
        }
    }
    if let Some(question) = previously_wrong.choose(&mut rand::thread_rng()) {
        return Ok(Some((*question).clone()));
    }

    Ok(candidates.choose(&mut rand::thread_rng()).cloned())
}

/// Reinforcement sampling weight of one flashcard, derived from its
/// performance record. Deeper negative accuracy raises the weight of a weak
/// card up to a configured cap.
pub fn weakness_score(record: Option<&PerformanceRecord>, config: &SelectorConfig) -> f64 {
    match record {
        None => config.unseen_weakness_weight,
        Some(record) if record.is_weak => {
            let deficit = (-record.accuracy_score).max(0.0);
            config.weak_weight + deficit.min(config.weak_accuracy_bonus_cap)
        }
        Some(_) => config.known_weight,
    }
}

/// Builds a standalone quiz over the given decks.
///
/// While any flashcard in scope is unseen the selector is in discovery:
/// unseen flashcards contribute one random question each, most relevant
/// first, and leftover slots fill with uniform-random questions from seen
/// flashcards. Once every flashcard has a record the selector switches to
/// weighted reinforcement sampling, de-duplicated at draw time.
///
/// The result is shuffled so presentation order carries no signal about
/// selection order.
pub fn build_quiz(
    store: &Store,
    config: &SelectorConfig,
    user_id: &str,
    course_id: &str,
    deck_ids: &[String],
    size: usize,
) -> Result<Vec<Question>, StoreError> {
    let mut flashcards = Vec::new();
    for deck_id in deck_ids {
        flashcards.extend(store.load_flashcards(course_id, deck_id)?);
    }
    if flashcards.is_empty() || size == 0 {
        return Ok(Vec::new());
    }

    let mut seen = Vec::new();
    let mut unseen = Vec::new();
    for flashcard in flashcards {
        let record = store.get_performance_record(user_id, &flashcard.id)?;
        match record {
            Some(record) => seen.push((flashcard, record)),
            None => unseen.push(flashcard),
        }
    }

    let mut quiz = if unseen.is_empty() {
        reinforcement_draw(store, config, user_id, &seen, size)?
    } else {
        discovery_draw(store, &mut unseen, &seen, size)?
    };

    quiz.shuffle(&mut rand::thread_rng());
    Ok(quiz)
}

fn questions_all_levels(store: &Store, flashcard: &Flashcard) -> Result<Vec<Question>, StoreError> {
    let mut questions = Vec::new();
    for level in Level::ALL {
        questions.extend(store.questions_for_flashcard(
            &flashcard.course_id,
            &flashcard.deck_id,
            level,
            &flashcard.id,
        )?);
    }
    Ok(questions)
}

fn discovery_draw(
    store: &Store,
    unseen: &mut [Flashcard],
    seen: &[(Flashcard, PerformanceRecord)],
    size: usize,
) -> Result<Vec<Question>, StoreError> {
    let mut rng = rand::thread_rng();
    let mut quiz = Vec::with_capacity(size);

    // Stable sort keeps catalog order among equally relevant cards.
    unseen.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for flashcard in unseen.iter() {
        if quiz.len() >= size {
            return Ok(quiz);
        }
        let candidates = questions_all_levels(store, flashcard)?;
        if let Some(question) = candidates.choose(&mut rng) {
            quiz.push(question.clone());
        }
    }

    if quiz.len() < size {
        let mut fillers = Vec::new();
        for (flashcard, _) in seen {
            fillers.extend(questions_all_levels(store, flashcard)?);
        }
        fillers.retain(|q| !quiz.iter().any(|chosen| chosen.hash == q.hash));
        fillers.shuffle(&mut rng);
        let remaining = size - quiz.len();
        quiz.extend(fillers.into_iter().take(remaining));
    }

    Ok(quiz)
}

fn reinforcement_draw(
    store: &Store,
    config: &SelectorConfig,
    user_id: &str,
    seen: &[(Flashcard, PerformanceRecord)],
    size: usize,
) -> Result<Vec<Question>, StoreError> {
    let mut rng = rand::thread_rng();

    // (question, sampling weight) pool; weights combine concept weakness
    // with a freshness bonus for unattempted question variants.
    let mut pool: Vec<(Question, f64)> = Vec::new();
    for (flashcard, record) in seen {
        let base = weakness_score(Some(record), config);
        for question in questions_all_levels(store, flashcard)? {
            let fresh = store.get_question_attempt(user_id, &question.hash)?.is_none();
            let weight = if fresh {
                base * config.fresh_question_multiplier
            } else {
                base
            };
            pool.push((question, weight));
        }
    }

    let mut quiz = Vec::with_capacity(size);
    while quiz.len() < size && !pool.is_empty() {
        let total: f64 = pool.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            break;
        }
        let mut roll = rng.gen::<f64>() * total;
        let mut picked = pool.len() - 1;
        for (index, (_, weight)) in pool.iter().enumerate() {
            roll -= weight;
            if roll <= 0.0 {
                picked = index;
                break;
            }
        }
        let (question, _) = pool.swap_remove(picked);
        // A hash can appear under several levels; drop every copy once drawn.
        pool.retain(|(q, _)| q.hash != question.hash);
        quiz.push(question);
    }

    Ok(quiz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::RecentAttempt;
    use crate::store::operations::catalog::AnswerSpec;
    use crate::store::operations::question_attempts::QuestionAttempt;
    use chrono::Utc;

    fn test_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("selector.sled").to_str().unwrap()).unwrap();
        (store, dir)
    }

    fn flashcard(id: &str, relevance: f64) -> Flashcard {
        Flashcard {
            id: id.to_string(),
            course_id: "c1".to_string(),
            deck_id: "d1".to_string(),
            lecture_id: "l1".to_string(),
            front: format!("front {id}"),
            back: format!("back {id}"),
            relevance_score: relevance,
        }
    }

    fn question(hash: &str, flashcard_id: &str, level: Level) -> Question {
        Question {
            hash: hash.to_string(),
            course_id: "c1".to_string(),
            deck_id: "d1".to_string(),
            source_flashcard_id: flashcard_id.to_string(),
            level,
            prompt: format!("prompt {hash}"),
            options: vec!["a".to_string(), "b".to_string()],
            answer: AnswerSpec::SingleChoice {
                answer: "a".to_string(),
            },
            explanation: format!("because {hash}"),
        }
    }

    fn record(flashcard_id: &str, is_weak: bool, accuracy: f64) -> PerformanceRecord {
        let mut record = PerformanceRecord::new("u1", flashcard_id, "c1", "l1");
        record.is_weak = is_weak;
        record.accuracy_score = accuracy;
        record.recent_attempts = vec![RecentAttempt {
            timestamp: Utc::now(),
            level: Level::Medium,
            is_correct: true,
            points_earned: 2.0,
        }];
        record
    }

    #[test]
    fn tier_one_prefers_unasked_hashes() {
        let (store, _dir) = test_store();
        let card = flashcard("f1", 1.0);
        store.put_flashcard(&card).unwrap();
        store
            .put_question(&question("q1", "f1", Level::Medium))
            .unwrap();
        store
            .put_question(&question("q2", "f1", Level::Medium))
            .unwrap();

        let asked = vec!["q1".to_string()];
        let picked = pick_question_for_flashcard(&store, "u1", &card, Level::Medium, &asked)
            .unwrap()
            .unwrap();
        assert_eq!(picked.hash, "q2");
    }

    #[test]
    fn tier_two_prefers_previously_wrong() {
        let (store, _dir) = test_store();
        let card = flashcard("f1", 1.0);
        store.put_flashcard(&card).unwrap();
        store
            .put_question(&question("q1", "f1", Level::Medium))
            .unwrap();
        store
            .put_question(&question("q2", "f1", Level::Medium))
            .unwrap();
        store
            .upsert_question_attempt(&QuestionAttempt {
                user_id: "u1".to_string(),
                question_hash: "q1".to_string(),
                is_correct: false,
                last_attempted: Utc::now(),
            })
            .unwrap();
        store
            .upsert_question_attempt(&QuestionAttempt {
                user_id: "u1".to_string(),
                question_hash: "q2".to_string(),
                is_correct: true,
                last_attempted: Utc::now(),
            })
            .unwrap();

        // Both hashes already asked, so tier one is empty.
        let asked = vec!["q1".to_string(), "q2".to_string()];
        let picked = pick_question_for_flashcard(&store, "u1", &card, Level::Medium, &asked)
            .unwrap()
            .unwrap();
        assert_eq!(picked.hash, "q1");
    }

    #[test]
    fn tier_three_falls_back_to_any_question() {
        let (store, _dir) = test_store();
        let card = flashcard("f1", 1.0);
        store.put_flashcard(&card).unwrap();
        store
            .put_question(&question("q1", "f1", Level::Medium))
            .unwrap();
        store
            .upsert_question_attempt(&QuestionAttempt {
                user_id: "u1".to_string(),
                question_hash: "q1".to_string(),
                is_correct: true,
                last_attempted: Utc::now(),
            })
            .unwrap();

        let asked = vec!["q1".to_string()];
        let picked = pick_question_for_flashcard(&store, "u1", &card, Level::Medium, &asked)
            .unwrap()
            .unwrap();
        assert_eq!(picked.hash, "q1");
    }

    #[test]
    fn no_questions_at_level_yields_none() {
        let (store, _dir) = test_store();
        let card = flashcard("f1", 1.0);
        store.put_flashcard(&card).unwrap();
        store
            .put_question(&question("q1", "f1", Level::Easy))
            .unwrap();

        let picked =
            pick_question_for_flashcard(&store, "u1", &card, Level::Boss, &[]).unwrap();
        assert!(picked.is_none());
    }

    #[test]
    fn weakness_score_tiers() {
        let config = SelectorConfig::default();
        assert_eq!(weakness_score(None, &config), 1.5);
        // A recorded but non-weak card keeps the same baseline weight.
        assert_eq!(weakness_score(Some(&record("f1", false, 3.0)), &config), 1.5);
        // weak with accuracy -1.0 gets weak_weight + 1.0
        assert_eq!(weakness_score(Some(&record("f1", true, -1.0)), &config), 3.0);
        // bonus is capped
        assert_eq!(
            weakness_score(Some(&record("f1", true, -50.0)), &config),
            4.0
        );
    }

    #[test]
    fn discovery_covers_unseen_most_relevant_first() {
        let (store, _dir) = test_store();
        for (id, relevance) in [("f1", 0.2), ("f2", 0.9), ("f3", 0.5)] {
            let card = flashcard(id, relevance);
            store.put_flashcard(&card).unwrap();
            store
                .put_question(&question(&format!("q-{id}"), id, Level::Medium))
                .unwrap();
        }

        let config = SelectorConfig::default();
        let quiz = build_quiz(&store, &config, "u1", "c1", &["d1".to_string()], 2).unwrap();
        let hashes: Vec<&str> = quiz.iter().map(|q| q.hash.as_str()).collect();
        assert_eq!(quiz.len(), 2);
        assert!(hashes.contains(&"q-f2"));
        assert!(hashes.contains(&"q-f3"));
    }

    #[test]
    fn reinforcement_never_duplicates_a_hash() {
        let (store, _dir) = test_store();
        for id in ["f1", "f2"] {
            let card = flashcard(id, 1.0);
            store.put_flashcard(&card).unwrap();
            store
                .put_question(&question(&format!("q-{id}"), id, Level::Medium))
                .unwrap();
            store
                .upsert_performance_record(&record(id, id == "f1", -1.0))
                .unwrap();
        }

        let config = SelectorConfig::default();
        // Ask for more than exist; the pool must still yield each hash once.
        let quiz = build_quiz(&store, &config, "u1", "c1", &["d1".to_string()], 10).unwrap();
        let mut hashes: Vec<&str> = quiz.iter().map(|q| q.hash.as_str()).collect();
        hashes.sort();
        assert_eq!(hashes, vec!["q-f1", "q-f2"]);
    }

    #[test]
    fn empty_scope_yields_empty_quiz() {
        let (store, _dir) = test_store();
        let config = SelectorConfig::default();
        let quiz = build_quiz(&store, &config, "u1", "c1", &["d1".to_string()], 5).unwrap();
        assert!(quiz.is_empty());
    }
}
