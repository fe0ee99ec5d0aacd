use mastery_backend::engine::types::Level;
use mastery_backend::store::operations::catalog::{AnswerSpec, Exam, Flashcard, Question};
use mastery_backend::store::Store;

pub fn seed_flashcard(store: &Store, deck_id: &str, id: &str, relevance: f64) -> Flashcard {
    let flashcard = Flashcard {
        id: id.to_string(),
        course_id: "c1".to_string(),
        deck_id: deck_id.to_string(),
        lecture_id: "l1".to_string(),
        front: format!("What is {id}?"),
        back: format!("{id} explained"),
        relevance_score: relevance,
    };
    store.put_flashcard(&flashcard).expect("seed flashcard");
    flashcard
}

/// One single-choice question per level for the flashcard. The correct
/// option is always `"right"`.
pub fn seed_questions_all_levels(store: &Store, deck_id: &str, flashcard_id: &str) {
    for level in Level::ALL {
        seed_question(
            store,
            deck_id,
            &format!("q-{flashcard_id}-{}", level.as_str()),
            flashcard_id,
            level,
        );
    }
}

pub fn seed_question(
    store: &Store,
    deck_id: &str,
    hash: &str,
    flashcard_id: &str,
    level: Level,
) -> Question {
    let question = Question {
        hash: hash.to_string(),
        course_id: "c1".to_string(),
        deck_id: deck_id.to_string(),
        source_flashcard_id: flashcard_id.to_string(),
        level,
        prompt: format!("Question {hash}"),
        options: vec!["right".to_string(), "wrong".to_string()],
        answer: AnswerSpec::SingleChoice {
            answer: "right".to_string(),
        },
        explanation: format!("Explanation for {hash}"),
    };
    store.put_question(&question).expect("seed question");
    question
}

#[allow(dead_code)]
pub fn seed_exam(store: &Store, exam_id: &str, lecture_ids: &[&str]) -> Exam {
    let exam = Exam {
        id: exam_id.to_string(),
        course_id: "c1".to_string(),
        title: format!("Exam {exam_id}"),
        lecture_ids: lecture_ids.iter().map(|s| s.to_string()).collect(),
    };
    store.put_exam(&exam).expect("seed exam");
    exam
}

/// A deck of `count` flashcards with descending relevance, each with a full
/// question set.
pub fn seed_deck(store: &Store, deck_id: &str, count: usize) -> Vec<Flashcard> {
    let mut flashcards = Vec::with_capacity(count);
    for idx in 0..count {
        let id = format!("{deck_id}-card-{idx}");
        let relevance = 1.0 - idx as f64 * 0.1;
        let flashcard = seed_flashcard(store, deck_id, &id, relevance);
        seed_questions_all_levels(store, deck_id, &id);
        flashcards.push(flashcard);
    }
    flashcards
}
