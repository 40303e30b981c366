//! Transient user notifications
//!
//! Fire-and-forget messages with a display duration. Only the most recent
//! one is visible; emitting a new one replaces it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::debug;

/// Number of past notifications kept for inspection
const RECENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub is_error: bool,
    pub duration: Duration,
}

impl Notification {
    pub fn info(text: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            duration: Duration::from_millis(duration_ms),
        }
    }

    pub fn error(text: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            text: text.into(),
            is_error: true,
            duration: Duration::from_millis(duration_ms),
        }
    }
}

#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<(Notification, Instant)>,
    recent: VecDeque<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, notification: Notification, now: Instant) {
        debug!(text = %notification.text, error = notification.is_error, "notification");
        let expires_at = now + notification.duration;
        if self.recent.len() == RECENT_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(notification.clone());
        self.current = Some((notification, expires_at));
    }

    /// The notification on screen at `now`, if it has not expired
    pub fn visible(&self, now: Instant) -> Option<&Notification> {
        match &self.current {
            Some((notification, expires_at)) if now < *expires_at => Some(notification),
            _ => None,
        }
    }

    /// Drop the current notification once it has expired
    ///
    /// Returns `true` if something was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        match &self.current {
            Some((_, expires_at)) if now >= *expires_at => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    /// Most recently emitted notification, expired or not
    pub fn last(&self) -> Option<&Notification> {
        self.recent.back()
    }

    /// Recently emitted notifications, oldest first
    pub fn recent(&self) -> impl Iterator<Item = &Notification> {
        self.recent.iter()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
