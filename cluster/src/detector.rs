use thiserror::Error;
use tracing::warn;

use crate::types::Face;

/// Failure reported by a face detection backend.
///
/// Never surfaces from the clustering core: a failed detection is treated
/// exactly like an image with no faces.
#[derive(Debug, Error)]
#[error("detection failed: {0}")]
pub struct DetectError(pub String);

/// Extracts faces from encoded image bytes.
///
/// Implementations wrap a concrete detection model and must not block
/// indefinitely; any timeout policy lives in the implementation.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &[u8]) -> Result<Vec<Face>, DetectError>;
}

/// Maps a detection result onto the face list the core consumes.
/// Errors become an empty list.
pub fn faces_or_empty(result: Result<Vec<Face>, DetectError>) -> Vec<Face> {
    match result {
        Ok(faces) => faces,
        Err(e) => {
            warn!("{e}; falling back to unclustered");
            Vec::new()
        }
    }
}
