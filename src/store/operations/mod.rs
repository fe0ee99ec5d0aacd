pub mod catalog;
pub mod mix_sessions;
pub mod performance;
pub mod question_attempts;
pub mod readiness;
