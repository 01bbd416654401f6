//! Aggregation of streamed status frames into a single terminal outcome.
//!
//! Pulls and builds report progress as a long sequence of status frames, any
//! of which may carry an error field. The first error decides the outcome,
//! but the stream must still be drained to completion so the shared
//! connection is not left with unread frames. Exactly one terminal report is
//! produced per stream.

/// Tracks the outcome of a streamed operation while its frames are drained.
///
/// The error state is sticky: once an error frame has been observed, later
/// error frames do not change the reported message.
#[derive(Debug)]
pub(crate) struct FrameAggregator {
    first_error: Option<String>,
}

impl FrameAggregator {
    pub(crate) fn new() -> Self {
        Self { first_error: None }
    }

    /// Record an error frame. Only the first recorded message is kept.
    pub(crate) fn record_error(&mut self, message: String) {
        if self.first_error.is_none() {
            self.first_error = Some(message);
        }
    }

    /// Whether an error frame has been observed.
    pub(crate) fn errored(&self) -> bool {
        self.first_error.is_some()
    }

    /// Produce the terminal outcome after the stream has ended.
    pub(crate) fn finish(self) -> Result<(), String> {
        match self.first_error {
            None => Ok(()),
            Some(message) => Err(message),
        }
    }
}
