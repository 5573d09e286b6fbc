use std::path::PathBuf;

/// Error type for editor operations.
#[derive(Debug)]
pub enum EditorError {
    /// The source image could not be read or decoded. The editor does not
    /// open when this happens.
    Load { path: Option<PathBuf>, reason: String },
    /// Effect-buffer generation failed (e.g. unsupported image size).
    /// Non-fatal: the affected effect is unavailable for the session.
    Effect(String),
    /// Flatten/encode of the final raster failed.
    Encode(String),
    /// The ops script could not be read or parsed.
    Script(String),
    Io(std::io::Error),
}

impl std::fmt::Display for EditorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditorError::Load { path: Some(p), reason } => {
                write!(f, "failed to load '{}': {}", p.display(), reason)
            }
            EditorError::Load { path: None, reason } => {
                write!(f, "failed to load image: {}", reason)
            }
            EditorError::Effect(e) => write!(f, "effect generation failed: {}", e),
            EditorError::Encode(e) => write!(f, "export failed: {}", e),
            EditorError::Script(e) => write!(f, "ops script error: {}", e),
            EditorError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EditorError {}

impl From<std::io::Error> for EditorError {
    fn from(e: std::io::Error) -> Self {
        EditorError::Io(e)
    }
}
