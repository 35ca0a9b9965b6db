// src/error.rs

use thiserror::Error;

/// Failure taxonomy for a scrape attempt.
///
/// Any failure aborts the whole attempt; no partial results are returned.
/// The page (and, on non-reused-browser paths, the browser) is closed before
/// the error propagates.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The browser process could not start. No internal retry.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// The schedule page did not load within its timeout.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Unused by the overlay sweep strategy, which tolerates absent modals.
    /// Kept as a taxonomy slot for a stricter targeted-dismiss variant.
    #[error("modal dismiss failed: {0}")]
    #[allow(dead_code)]
    ModalDismiss(String),

    /// An autocomplete list never appeared or never produced a clickable
    /// match. Carries the step name; the upstream form can silently change.
    #[error("autocomplete timed out at step `{step}`")]
    AutocompleteTimeout { step: &'static str },

    /// An input could not be filled or stayed disabled past its timeout.
    #[error("form fill failed: {0}")]
    FormFill(String),

    /// Expected schedule DOM (status cells, date tabs, weekly rows) absent
    /// or malformed.
    #[error("schedule extraction failed: {0}")]
    Extraction(String),
}
