//! The execution context handed to context-aware functions.

/// Per-query execution context.
///
/// Functions whose descriptor requires a context receive a reference to the
/// active session as a hidden leading argument. The session is supplied by
/// whoever executes a compiled unit, never by the expression itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: String,
    start_time_millis: i64,
    utc_offset_minutes: i32,
}

impl Session {
    /// Create a session for `user` whose query started at `start_time_millis`
    /// (milliseconds since the Unix epoch, UTC).
    pub fn new(user: impl Into<String>, start_time_millis: i64) -> Self {
        Self {
            user: user.into(),
            start_time_millis,
            utc_offset_minutes: 0,
        }
    }

    /// Set the session's offset from UTC, in minutes.
    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn start_time_millis(&self) -> i64 {
        self.start_time_millis
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }
}
