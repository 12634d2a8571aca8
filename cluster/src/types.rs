use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored in place of a cluster id for images with no identifiable face.
pub const UNCLUSTERED: &str = "unclustered";

/// Axis-aligned face bounding box in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns width × height. Negative extents count as zero.
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// One detection result: a face embedding and where it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub embedding: Vec<f32>,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl Face {
    pub fn new(embedding: Vec<f32>, bbox: BoundingBox) -> Self {
        Self { embedding, bbox }
    }
}

/// The cluster chosen to characterize an image.
///
/// Serialized as the bare cluster id, or `"unclustered"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Representative {
    /// No face was detected, or detection failed.
    Unclustered,
    Cluster(String),
}

impl Representative {
    /// Returns the cluster id, or `None` for [`Representative::Unclustered`].
    pub fn cluster_id(&self) -> Option<&str> {
        match self {
            Self::Unclustered => None,
            Self::Cluster(id) => Some(id),
        }
    }

    pub fn is_unclustered(&self) -> bool {
        matches!(self, Self::Unclustered)
    }
}

impl From<String> for Representative {
    fn from(s: String) -> Self {
        if s == UNCLUSTERED {
            Self::Unclustered
        } else {
            Self::Cluster(s)
        }
    }
}

impl From<&str> for Representative {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Representative> for String {
    fn from(r: Representative) -> Self {
        match r {
            Representative::Unclustered => UNCLUSTERED.to_string(),
            Representative::Cluster(id) => id,
        }
    }
}

impl fmt::Display for Representative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclustered => f.write_str(UNCLUSTERED),
            Self::Cluster(id) => f.write_str(id),
        }
    }
}

/// The persisted view of an uploaded image, as read by
/// [`build_albums`](crate::build_albums).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub owner: String,
    pub uploaded_at: DateTime<Utc>,

    /// Cluster id assigned to each detected face, in detection order.
    #[serde(default)]
    pub face_clusters: Vec<String>,

    pub representative: Representative,

    /// Name the uploader typed for the person in the photo, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friend_name: Option<String>,
}
