//! Message validation and topic relevance gate.
//!
//! [`validate`] enforces the caller input contract (non-empty, at most 1000
//! characters after trimming). [`is_gym_related`] is a case-insensitive
//! substring match against a fixed fitness vocabulary. Both are pure
//! functions with no collaborators.
//!
//! Substring matching is deliberately naive: "core" matches inside "corex".
//! That precision trade-off is part of the gate's contract; a smarter
//! classifier would change observable routing behavior.

use crate::error::RagError;

/// Maximum message length after trimming, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Fitness vocabulary for the relevance gate. Matching is case-insensitive
/// substring containment anywhere in the message.
const GYM_KEYWORDS: &[&str] = &[
    "exercise",
    "workout",
    "fitness",
    "gym",
    "muscle",
    "strength",
    "cardio",
    "weight",
    "lifting",
    "training",
    "protein",
    "nutrition",
    "diet",
    "health",
    "bodybuilding",
    "crossfit",
    "yoga",
    "pilates",
    "running",
    "cycling",
    "treadmill",
    "dumbbell",
    "barbell",
    "squat",
    "deadlift",
    "bench press",
    "abs",
    "core",
    "biceps",
    "triceps",
    "shoulders",
    "chest",
    "back",
    "legs",
    "calories",
    "supplements",
    "recovery",
    "rest",
    "stretching",
    "flexibility",
    "endurance",
    "stamina",
    "metabolism",
    "fat loss",
    "muscle gain",
    "reps",
    "sets",
    "form",
    "technique",
    "safety",
    "injury",
    "prevention",
    "warm up",
    "cool down",
    "hydration",
    "equipment",
    "machines",
    "free weights",
];

/// A message that passed validation. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ValidMessage {
    pub text: String,
    pub gym_related: bool,
}

/// Trim and validate a raw message.
///
/// Fails with `"Message cannot be empty"` for empty/whitespace input and
/// `"Message too long (max 1000 characters)"` past the length cap.
pub fn validate(raw: &str) -> Result<ValidMessage, RagError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RagError::validation("Message cannot be empty"));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(RagError::validation(
            "Message too long (max 1000 characters)",
        ));
    }

    Ok(ValidMessage {
        gym_related: is_gym_related(trimmed),
        text: trimmed.to_string(),
    })
}

/// True if any fitness keyword occurs anywhere in the message,
/// case-insensitively.
pub fn is_gym_related(message: &str) -> bool {
    let lower = message.to_lowercase();
    GYM_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
