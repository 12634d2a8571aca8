use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assigner::{Assigner, Assignment};
use crate::store::ClusterStore;
use crate::types::{Face, ImageRecord, Representative};
use crate::ClusterError;

/// Result of clustering every face in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAssignment {
    /// One entry per face, in detection order.
    pub faces: Vec<Assignment>,

    /// Cluster of the most prominent face, or unclustered when no face was found.
    pub representative: Representative,
}

impl ImageAssignment {
    /// The designed fallback for images with no identifiable person.
    pub fn unclustered() -> Self {
        Self {
            faces: Vec::new(),
            representative: Representative::Unclustered,
        }
    }

    /// Builds the record the storage layer persists for this image.
    pub fn into_record(
        self,
        id: impl Into<String>,
        owner: impl Into<String>,
        uploaded_at: DateTime<Utc>,
        friend_name: Option<String>,
    ) -> ImageRecord {
        ImageRecord {
            id: id.into(),
            owner: owner.into(),
            uploaded_at,
            face_clusters: self.faces.into_iter().map(|a| a.cluster_id).collect(),
            representative: self.representative,
            friend_name,
        }
    }
}

/// Assigns each face of one image to a cluster and picks the image's
/// representative cluster.
///
/// Faces are assigned one after another in detection order, so a cluster
/// created for an earlier face is visible to later faces of the same image.
/// If a face fails, the error is returned and assignments already made for
/// earlier faces stay in the store.
pub fn process_image(
    assigner: &Assigner,
    store: &mut dyn ClusterStore,
    faces: &[Face],
) -> Result<ImageAssignment, ClusterError> {
    if faces.is_empty() {
        debug!(owner = store.owner(), "no faces, image left unclustered");
        return Ok(ImageAssignment::unclustered());
    }

    let mut assigned = Vec::with_capacity(faces.len());
    for face in faces {
        assigned.push(assigner.assign(store, &face.embedding)?);
    }

    let idx = most_prominent(faces);
    let representative = Representative::Cluster(assigned[idx].cluster_id.clone());
    debug!(
        owner = store.owner(),
        faces = faces.len(),
        representative = %representative,
        "image clustered"
    );

    Ok(ImageAssignment {
        faces: assigned,
        representative,
    })
}

/// Index of the face with the largest bounding-box area. First wins on ties.
fn most_prominent(faces: &[Face]) -> usize {
    let mut best = 0;
    for (i, f) in faces.iter().enumerate().skip(1) {
        if f.bbox.area() > faces[best].bbox.area() {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IdScheme, MemoryClusterStore};
    use crate::types::BoundingBox;
    use crate::Config;

    fn face(emb: &[f32], w: f32, h: f32) -> Face {
        Face::new(emb.to_vec(), BoundingBox::new(0.0, 0.0, w, h))
    }

    fn setup() -> (Assigner, MemoryClusterStore) {
        (
            Assigner::new(Config::default()).unwrap(),
            MemoryClusterStore::with_ids("alice", IdScheme::sequential("person")),
        )
    }

    #[test]
    fn no_faces_is_unclustered() {
        let (asg, mut store) = setup();
        let out = process_image(&asg, &mut store, &[]).unwrap();
        assert!(out.faces.is_empty());
        assert_eq!(out.representative, Representative::Unclustered);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn largest_face_is_representative() {
        let small = face(&[1.0, 0.0, 0.0], 10.0, 10.0);
        let large = face(&[0.0, 1.0, 0.0], 20.0, 20.0);

        let (asg, mut store) = setup();
        let out = process_image(&asg, &mut store, &[small.clone(), large.clone()]).unwrap();
        assert_eq!(out.faces.len(), 2);
        assert_eq!(
            out.representative,
            Representative::Cluster(out.faces[1].cluster_id.clone())
        );

        let (asg, mut store) = setup();
        let out = process_image(&asg, &mut store, &[large, small]).unwrap();
        assert_eq!(
            out.representative,
            Representative::Cluster(out.faces[0].cluster_id.clone())
        );
    }

    #[test]
    fn equal_areas_pick_first() {
        let (asg, mut store) = setup();
        let faces = [
            face(&[1.0, 0.0, 0.0], 8.0, 5.0),
            face(&[0.0, 1.0, 0.0], 5.0, 8.0),
        ];
        let out = process_image(&asg, &mut store, &faces).unwrap();
        assert_eq!(out.representative, Representative::Cluster("person:001".into()));
    }

    #[test]
    fn faces_in_one_image_see_each_other() {
        // The second face matches the cluster created by the first.
        let (asg, mut store) = setup();
        let faces = [
            face(&[1.0, 0.0, 0.0], 10.0, 10.0),
            face(&[0.98, 0.05, 0.0], 12.0, 12.0),
        ];
        let out = process_image(&asg, &mut store, &faces).unwrap();
        assert!(out.faces[0].created);
        assert!(!out.faces[1].created);
        assert_eq!(out.faces[0].cluster_id, out.faces[1].cluster_id);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn failure_keeps_earlier_assignments() {
        let (asg, mut store) = setup();
        let faces = [
            face(&[1.0, 0.0, 0.0], 10.0, 10.0),
            face(&[1.0, 0.0], 10.0, 10.0),
        ];
        let err = process_image(&asg, &mut store, &faces).unwrap_err();
        assert!(matches!(err, ClusterError::DimensionMismatch { .. }));
        assert_eq!(store.len().unwrap(), 1, "first face's cluster stays");
    }

    #[test]
    fn into_record_keeps_representative_among_faces() {
        let (asg, mut store) = setup();
        let faces = [
            face(&[1.0, 0.0, 0.0], 10.0, 10.0),
            face(&[0.0, 1.0, 0.0], 30.0, 30.0),
        ];
        let out = process_image(&asg, &mut store, &faces).unwrap();
        let record = out.into_record("img-1", "alice", Utc::now(), Some("Sam".into()));

        assert_eq!(record.face_clusters, vec!["person:001", "person:002"]);
        let rep = record.representative.cluster_id().unwrap();
        assert!(record.face_clusters.iter().any(|c| c == rep));
        assert_eq!(record.friend_name.as_deref(), Some("Sam"));
    }
}
