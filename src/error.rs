use thiserror::Error;

/// Failures raised by the compositing, hook and rendering plumbing.
///
/// Platform faults carry the raw OS error code so the embedding application
/// can report them verbatim. None of these are retried internally.
#[derive(Debug, Error)]
pub enum TabStripError {
    #[error("layered window update failed (os error {code})")]
    Blit { code: i32 },
    #[error("failed to install the low-level mouse hook (os error {code})")]
    HookInstall { code: i32 },
    #[error("skin image `{0}` is not set")]
    MissingSkinImage(&'static str),
    #[error("ui dispatcher unavailable: {0}")]
    Dispatcher(String),
    #[error("failed to create host window: {0}")]
    WindowCreation(String),
    #[error("failed to create tab content: {0}")]
    ContentCreation(String),
}

pub type Result<T> = std::result::Result<T, TabStripError>;
