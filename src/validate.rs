//! Field-length validation for task submissions.

use crate::error::{AppError, AppResult};

/// Minimum title length in characters.
pub const TITLE_MIN_CHARS: usize = 4;
/// Minimum body length in characters.
pub const TEXT_MIN_CHARS: usize = 10;

/// Check a candidate title and body before persistence.
///
/// Title is checked first and short-circuits, so a submission failing both
/// rules reports the title. Lengths are counted in characters, not bytes.
pub fn validate_task_fields(title: &str, text: &str) -> AppResult<()> {
    if title.chars().count() < TITLE_MIN_CHARS {
        return Err(AppError::invalid_value(
            "title",
            format!("Title must be at least {} characters", TITLE_MIN_CHARS),
        ));
    }
    if text.chars().count() < TEXT_MIN_CHARS {
        return Err(AppError::invalid_value(
            "text",
            format!("Text must be at least {} characters", TEXT_MIN_CHARS),
        ));
    }
    Ok(())
}
