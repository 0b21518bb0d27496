//! Error taxonomy for the player core
//!
//! Every failure the player can surface maps onto one [`ErrorClass`], which
//! decides how the lifecycle controller reacts and what the user is told.

use thiserror::Error;

use crate::models::SourceKind;
use crate::stream::subtitles::SubtitleError;

/// Broad failure domain of a [`PlayerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network failure or unusable backend response
    Transport,
    /// Media could not be decoded or the embedded player failed
    Decode,
    /// Subtitle content could not be understood
    Parse,
    /// Request the player refuses to carry out
    Policy,
    /// Work voided by a newer source switch
    Superseded,
}

/// Errors from player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Embedded player failed to load: {0}")]
    EmbedFailed(String),

    #[error(transparent)]
    Subtitle(#[from] SubtitleError),

    #[error("Unsupported source kind: {0}")]
    UnsupportedSource(String),

    #[error("{operation} is not available for {kind} sources")]
    Unsupported {
        kind: SourceKind,
        operation: &'static str,
    },

    #[error("No subtitle for language '{0}'")]
    UnknownSubtitle(String),

    #[error("No subtitles available for this episode")]
    NoSubtitles,

    #[error("Unknown quality '{0}'")]
    UnknownQuality(String),

    #[error("No source is attached")]
    NotAttached,

    #[error("Superseded by a newer source switch")]
    Superseded,
}

impl PlayerError {
    /// Failure domain of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            PlayerError::Transport(_)
            | PlayerError::Timeout
            | PlayerError::Extraction(_)
            | PlayerError::Rejected(_) => ErrorClass::Transport,
            PlayerError::Decode(_) | PlayerError::EmbedFailed(_) => ErrorClass::Decode,
            PlayerError::Subtitle(_) => ErrorClass::Parse,
            PlayerError::UnsupportedSource(_)
            | PlayerError::Unsupported { .. }
            | PlayerError::UnknownSubtitle(_)
            | PlayerError::NoSubtitles
            | PlayerError::UnknownQuality(_)
            | PlayerError::NotAttached => ErrorClass::Policy,
            PlayerError::Superseded => ErrorClass::Superseded,
        }
    }

    /// Whether an automatic retry may help (network-level failures only)
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlayerError::Transport(_) | PlayerError::Timeout)
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, PlayerError::Superseded)
    }
}

impl From<reqwest::Error> for PlayerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlayerError::Timeout
        } else {
            PlayerError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(PlayerError::Timeout.class(), ErrorClass::Transport);
        assert_eq!(
            PlayerError::Extraction("empty".into()).class(),
            ErrorClass::Transport
        );
        assert_eq!(PlayerError::Decode("fatal".into()).class(), ErrorClass::Decode);
        assert_eq!(
            PlayerError::Subtitle(SubtitleError::Empty).class(),
            ErrorClass::Parse
        );
        assert_eq!(
            PlayerError::UnsupportedSource("rtmp".into()).class(),
            ErrorClass::Policy
        );
        assert_eq!(PlayerError::Superseded.class(), ErrorClass::Superseded);
    }

    #[test]
    fn test_only_network_failures_retry() {
        assert!(PlayerError::Timeout.is_retryable());
        assert!(PlayerError::Transport("reset".into()).is_retryable());
        assert!(!PlayerError::Extraction("success=false".into()).is_retryable());
        assert!(!PlayerError::Decode("fatal".into()).is_retryable());
    }
}
