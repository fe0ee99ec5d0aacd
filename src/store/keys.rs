use crate::engine::types::Level;
use crate::store::StoreError;

/// Composite keys join component ids with `:`, so the components themselves
/// must not contain one.
fn safe_id<'a>(label: &str, id: &'a str) -> Result<&'a str, StoreError> {
    if id.is_empty() {
        return Err(StoreError::Validation(format!("{label} must not be empty")));
    }
    if id.contains(':') {
        return Err(StoreError::Validation(format!(
            "{label} must not contain ':': {id}"
        )));
    }
    Ok(id)
}

pub fn flashcard_key(flashcard_id: &str) -> String {
    flashcard_id.to_string()
}

pub fn flashcard_deck_index_key(
    course_id: &str,
    deck_id: &str,
    flashcard_id: &str,
) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:{}",
        safe_id("courseId", course_id)?,
        safe_id("deckId", deck_id)?,
        safe_id("flashcardId", flashcard_id)?
    ))
}

pub fn flashcard_deck_prefix(course_id: &str, deck_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:",
        safe_id("courseId", course_id)?,
        safe_id("deckId", deck_id)?
    ))
}

pub fn flashcard_lecture_index_key(
    course_id: &str,
    lecture_id: &str,
    flashcard_id: &str,
) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:{}",
        safe_id("courseId", course_id)?,
        safe_id("lectureId", lecture_id)?,
        safe_id("flashcardId", flashcard_id)?
    ))
}

pub fn flashcard_lecture_prefix(course_id: &str, lecture_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:",
        safe_id("courseId", course_id)?,
        safe_id("lectureId", lecture_id)?
    ))
}

pub fn question_key(question_hash: &str) -> String {
    question_hash.to_string()
}

pub fn question_level_index_key(
    course_id: &str,
    deck_id: &str,
    level: Level,
    flashcard_id: &str,
    question_hash: &str,
) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:{}:{}:{}",
        safe_id("courseId", course_id)?,
        safe_id("deckId", deck_id)?,
        level.as_str(),
        safe_id("flashcardId", flashcard_id)?,
        safe_id("questionHash", question_hash)?
    ))
}

pub fn question_level_prefix(
    course_id: &str,
    deck_id: &str,
    level: Level,
) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:{}:",
        safe_id("courseId", course_id)?,
        safe_id("deckId", deck_id)?,
        level.as_str()
    ))
}

pub fn question_flashcard_prefix(
    course_id: &str,
    deck_id: &str,
    level: Level,
    flashcard_id: &str,
) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:{}:{}:",
        safe_id("courseId", course_id)?,
        safe_id("deckId", deck_id)?,
        level.as_str(),
        safe_id("flashcardId", flashcard_id)?
    ))
}

pub fn exam_key(exam_id: &str) -> String {
    exam_id.to_string()
}

pub fn performance_key(user_id: &str, flashcard_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}",
        safe_id("userId", user_id)?,
        safe_id("flashcardId", flashcard_id)?
    ))
}

pub fn performance_prefix(user_id: &str) -> Result<String, StoreError> {
    Ok(format!("{}:", safe_id("userId", user_id)?))
}

pub fn question_attempt_key(user_id: &str, question_hash: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}",
        safe_id("userId", user_id)?,
        safe_id("questionHash", question_hash)?
    ))
}

pub fn mix_session_key(session_id: &str) -> String {
    session_id.to_string()
}

pub fn readiness_key(user_id: &str, scope_key: &str) -> Result<String, StoreError> {
    Ok(format!("{}:{scope_key}", safe_id("userId", user_id)?))
}
