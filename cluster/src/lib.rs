//! Incremental per-owner face clustering and album grouping.
//!
//! Faces arrive as fixed-length embeddings produced by an external detector.
//! Each face is assigned to the owner's nearest cluster centroid by cosine
//! similarity, or seeds a new cluster when nothing reaches the threshold.
//! Every image gets one representative cluster (its largest face), and
//! albums are derived on read by grouping images on that cluster.
//!
//! # Usage
//!
//! ```
//! use facealbum_cluster::{build_albums, BoundingBox, Config, Face, IdScheme, Registry};
//!
//! let reg = Registry::with_memory_stores(Config::default(), IdScheme::sequential("person"))?;
//!
//! let faces = vec![Face::new(vec![0.1, 0.9, 0.2], BoundingBox::new(10.0, 10.0, 64.0, 64.0))];
//! let out = reg.process_image("alice", &faces)?;
//! assert_eq!(out.representative.cluster_id(), Some("person:001"));
//!
//! let record = out.into_record("img-1", "alice", chrono::Utc::now(), None);
//! let albums = build_albums("alice", &[record]);
//! assert_eq!(albums.len(), 1);
//! # Ok::<(), facealbum_cluster::ClusterError>(())
//! ```
//!
//! # Design
//!
//! Assignment is a greedy nearest-centroid classifier: clusters are created
//! and grown online, never split or merged afterwards. Stores are scoped to a
//! single owner and mutated through `&mut`; [`Registry`] serializes all work
//! for one owner behind a per-owner lock while different owners run in
//! parallel.

mod album;
mod assigner;
mod config;
mod coordinator;
mod detector;
mod error;
mod registry;
pub mod similarity;
mod store;
mod types;

pub use album::{build_albums, Album, UNSORTED_LABEL};
pub use assigner::{Assigner, Assignment};
pub use config::{Config, DEFAULT_THRESHOLD};
pub use coordinator::{process_image, ImageAssignment};
pub use detector::{faces_or_empty, DetectError, FaceDetector};
pub use error::ClusterError;
pub use registry::Registry;
pub use similarity::{cosine_similarity, euclidean_distance};
pub use store::{Cluster, ClusterStore, IdScheme, MemoryClusterStore};
pub use types::{BoundingBox, Face, ImageRecord, Representative, UNCLUSTERED};
