//! Input normalization for poll creation.

use super::error::{PollError, PollResult};
use super::{MAX_END_TIME, MAX_OPTIONS, MIN_OPTIONS};

/// Trim the title. Empty after trimming is rejected.
pub fn normalize_title(title: &str) -> PollResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PollError::InvalidTitle);
    }
    Ok(title.to_string())
}

/// Trim every option, drop empty entries and repeated labels (first
/// occurrence wins), then enforce the option count bounds.
pub fn normalize_options<S: AsRef<str>>(options: &[S]) -> PollResult<Vec<String>> {
    let mut kept: Vec<String> = Vec::with_capacity(options.len());
    for option in options {
        let label = option.as_ref().trim();
        if label.is_empty() || kept.iter().any(|k| k == label) {
            continue;
        }
        kept.push(label.to_string());
    }

    if kept.len() < MIN_OPTIONS {
        return Err(PollError::InsufficientOptions {
            found: kept.len(),
            min: MIN_OPTIONS,
        });
    }
    if kept.len() > MAX_OPTIONS {
        return Err(PollError::TooManyOptions {
            found: kept.len(),
            max: MAX_OPTIONS,
        });
    }
    Ok(kept)
}

/// Deadline for a poll opened at `now`. The duration must be positive and
/// the deadline must not pass `MAX_END_TIME`.
pub fn deadline(now: u64, duration_secs: u64) -> PollResult<u64> {
    if duration_secs == 0 {
        return Err(PollError::InvalidDuration);
    }
    match now.checked_add(duration_secs) {
        Some(end_time) if end_time <= MAX_END_TIME => Ok(end_time),
        _ => Err(PollError::InvalidDuration),
    }
}
