//! Transient user notifications
//!
//! Failures the user should see are posted here as short-lived notices that
//! dismiss themselves after a fixed time-to-live. Subscribers get every
//! notice as it is posted; `visible()` returns the ones still on screen.

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::error::{ErrorClass, PlayerError};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A single user-facing notice
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip)]
    pub expires_at: Instant,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// Auto-dismissing notice queue
pub struct NoticeBoard {
    ttl: Duration,
    notices: Mutex<Vec<Notice>>,
    tx: broadcast::Sender<Notice>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        let (tx, _) = broadcast::channel(32);
        Self {
            ttl,
            notices: Mutex::new(Vec::new()),
            tx,
        }
    }

    /// Receive every notice posted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Post a notice
    pub fn post(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
            expires_at: Instant::now() + self.ttl,
        };
        tracing::debug!(%notice, "notice posted");

        if let Ok(mut notices) = self.notices.lock() {
            let now = Instant::now();
            notices.retain(|n| n.expires_at > now);
            notices.push(notice.clone());
        }
        // No subscribers is fine
        let _ = self.tx.send(notice);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.post(NoticeLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.post(NoticeLevel::Warning, message);
    }

    /// Post the user-facing rendering of a player error
    pub fn error(&self, err: &PlayerError) {
        let message = match err.class() {
            ErrorClass::Transport | ErrorClass::Decode => {
                format!("{}. Please pick another source.", err)
            }
            ErrorClass::Parse => format!("Subtitles unavailable: {}", err),
            ErrorClass::Policy => err.to_string(),
            // Never shown: the newer request reports for itself
            ErrorClass::Superseded => return,
        };
        self.post(NoticeLevel::Error, message);
    }

    /// Post a failed subtitle selection
    ///
    /// The video keeps playing, so fetch failures do not suggest another source.
    pub fn subtitle_error(&self, err: &PlayerError) {
        let message = match err.class() {
            ErrorClass::Policy => err.to_string(),
            ErrorClass::Superseded => return,
            _ => format!("Subtitles unavailable: {}", err),
        };
        self.post(NoticeLevel::Error, message);
    }

    /// Notices that have not expired yet
    pub fn visible(&self) -> Vec<Notice> {
        let now = Instant::now();
        match self.notices.lock() {
            Ok(mut notices) => {
                notices.retain(|n| n.expires_at > now);
                notices.clone()
            }
            Err(_) => Vec::new(),
        }
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notices_expire() {
        let board = NoticeBoard::new(Duration::from_secs(5));
        board.info("switched source");
        assert_eq!(board.visible().len(), 1);

        tokio::time::advance(Duration::from_secs(3)).await;
        board.warn("slow network");
        assert_eq!(board.visible().len(), 2);

        tokio::time::advance(Duration::from_secs(3)).await;
        let visible = board.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].message, "slow network");

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(board.visible().is_empty());
    }

    #[tokio::test]
    async fn test_error_notice_offers_another_source() {
        let board = NoticeBoard::default();
        let mut rx = board.subscribe();

        board.error(&PlayerError::Extraction("no playlist".into()));
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("pick another source"));
    }

    #[test]
    fn test_subtitle_fetch_failure_keeps_source() {
        let board = NoticeBoard::default();
        board.subtitle_error(&PlayerError::Transport("404 for /subs/en.srt".into()));
        let visible = board.visible();
        assert!(visible[0].message.starts_with("Subtitles unavailable"));
        assert!(!visible[0].message.contains("another source"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_notices_dropped_on_post() {
        let board = NoticeBoard::new(Duration::from_secs(5));
        for _ in 0..10 {
            board.info("tick");
        }
        tokio::time::advance(Duration::from_secs(6)).await;
        board.info("fresh");
        assert_eq!(board.notices.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_superseded_is_silent() {
        let board = NoticeBoard::default();
        board.error(&PlayerError::Superseded);
        assert!(board.visible().is_empty());
    }
}
