//! Poll lifecycle errors.
//!
//! Every variant is a caller-correctable validation or authorization
//! failure. None of them leave partial state behind: checks run before
//! any mutation.

use super::types::PollId;

/// Result type for poll operations
pub type PollResult<T> = Result<T, PollError>;

/// Poll lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Poll title is required")]
    InvalidTitle,

    #[error("At least {min} distinct options are required (got {found})")]
    InsufficientOptions { found: usize, min: usize },

    #[error("At most {max} options are allowed (got {found})")]
    TooManyOptions { found: usize, max: usize },

    #[error("Poll duration must be greater than zero and end by 9999-12-31")]
    InvalidDuration,

    #[error("Unauthorized operation")]
    Unauthorized,

    #[error("Poll {0} not found")]
    PollNotFound(PollId),

    #[error("Poll {0} is closed for voting")]
    PollClosed(PollId),

    #[error("Poll {0} is already closed")]
    PollAlreadyClosed(PollId),

    #[error("Invalid option {index} (poll has {count} options)")]
    InvalidOption { index: usize, count: usize },

    #[error("Already voted in poll {0}")]
    AlreadyVoted(PollId),

    #[error("Results for poll {0} are revealed when the poll closes")]
    ResultsHidden(PollId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PollError::InsufficientOptions { found: 1, min: 2 }.to_string(),
            "At least 2 distinct options are required (got 1)"
        );
        assert_eq!(
            PollError::InvalidOption { index: 4, count: 2 }.to_string(),
            "Invalid option 4 (poll has 2 options)"
        );
        assert_eq!(
            PollError::PollNotFound(PollId(999)).to_string(),
            "Poll 999 not found"
        );
    }
}
