use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ClusterError;

/// One recognized person for one owner.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Opaque unique identifier.
    pub id: String,

    /// Creation order within the owner's store. Lower = created earlier.
    /// Tie-breaking during assignment relies on this.
    pub seq: u64,

    /// Running mean of all member embeddings.
    pub centroid: Vec<f32>,

    /// Number of faces assigned so far. Always >= 1.
    pub count: usize,
}

/// Rejects empty embeddings and embeddings containing NaN or infinity.
pub(crate) fn check_embedding(emb: &[f32]) -> Result<(), ClusterError> {
    if emb.is_empty() {
        return Err(ClusterError::EmptyEmbedding);
    }
    match emb.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(ClusterError::NonFiniteEmbedding { index }),
        None => Ok(()),
    }
}

impl Cluster {
    /// Creates a single-member cluster seeded with `emb`.
    pub fn seed(id: impl Into<String>, seq: u64, emb: &[f32]) -> Result<Self, ClusterError> {
        check_embedding(emb)?;
        Ok(Self {
            id: id.into(),
            seq,
            centroid: emb.to_vec(),
            count: 1,
        })
    }

    /// Folds a new member into the running-mean centroid and bumps the count.
    ///
    /// `centroid' = centroid + (emb - centroid) / (count + 1)`
    pub fn absorb(&mut self, emb: &[f32]) -> Result<(), ClusterError> {
        if emb.len() != self.centroid.len() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.centroid.len(),
                got: emb.len(),
            });
        }
        check_embedding(emb)?;
        let n = (self.count + 1) as f64;
        for (c, &x) in self.centroid.iter_mut().zip(emb) {
            let cur = *c as f64;
            *c = (cur + (x as f64 - cur) / n) as f32;
        }
        self.count += 1;
        Ok(())
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("id", &self.id)
            .field("seq", &self.seq)
            .field("count", &self.count)
            .field("centroid_len", &self.centroid.len())
            .finish()
    }
}

/// The set of clusters known for a single owner.
///
/// Implementations back onto whatever the storage layer uses. A store is
/// only ever touched by one assignment sequence at a time; mutation goes
/// through `&mut self` and [`Registry`](crate::Registry) holds a per-owner
/// lock around it.
pub trait ClusterStore: Send {
    /// The owner every cluster in this store belongs to.
    fn owner(&self) -> &str;

    /// Returns all clusters ordered by creation (ascending `seq`).
    fn list_clusters(&self) -> Result<Vec<Cluster>, ClusterError>;

    /// Calls `f` on every cluster in creation order, stopping at the first
    /// error. Stores holding clusters in memory override this to lend them
    /// out instead of cloning.
    fn for_each_cluster(
        &self,
        f: &mut dyn FnMut(&Cluster) -> Result<(), ClusterError>,
    ) -> Result<(), ClusterError> {
        for c in self.list_clusters()? {
            f(&c)?;
        }
        Ok(())
    }

    /// Returns the cluster with the given id, if any.
    fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, ClusterError>;

    /// Allocates a new cluster with `initial` as its centroid and count 1.
    fn create_cluster(&mut self, initial: &[f32]) -> Result<Cluster, ClusterError>;

    /// Folds `emb` into the cluster's centroid and increments its count.
    /// Fails with [`ClusterError::ClusterNotFound`] for unknown ids.
    fn update_cluster(&mut self, id: &str, emb: &[f32]) -> Result<Cluster, ClusterError>;

    /// Returns the number of clusters.
    fn len(&self) -> Result<usize, ClusterError> {
        Ok(self.list_clusters()?.len())
    }

    /// Returns true if the store holds no clusters.
    fn is_empty(&self) -> Result<bool, ClusterError> {
        Ok(self.len()? == 0)
    }
}

/// How a store mints identifiers for new clusters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdScheme {
    /// Random UUID v4 in simple (hex) form.
    #[default]
    Random,

    /// `"{prefix}:{seq:03}"`, or zero-padded `seq` alone if the prefix is empty.
    Sequential { prefix: String },
}

impl IdScheme {
    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self::Sequential {
            prefix: prefix.into(),
        }
    }

    fn mint(&self, seq: u64) -> String {
        match self {
            Self::Random => uuid::Uuid::new_v4().simple().to_string(),
            Self::Sequential { prefix } if prefix.is_empty() => format!("{seq:03}"),
            Self::Sequential { prefix } => format!("{prefix}:{seq:03}"),
        }
    }
}

/// In-memory [`ClusterStore`] for one owner.
///
/// Also used as the working copy the storage layer loads persisted clusters
/// into via [`MemoryClusterStore::from_clusters`].
#[derive(Debug, Clone)]
pub struct MemoryClusterStore {
    owner: String,
    ids: IdScheme,
    clusters: Vec<Cluster>,
    next_seq: u64,
}

impl MemoryClusterStore {
    /// Creates an empty store minting random ids.
    pub fn new(owner: impl Into<String>) -> Self {
        Self::with_ids(owner, IdScheme::Random)
    }

    /// Creates an empty store with the given id scheme.
    pub fn with_ids(owner: impl Into<String>, ids: IdScheme) -> Self {
        Self {
            owner: owner.into(),
            ids,
            clusters: Vec::new(),
            next_seq: 1,
        }
    }

    /// Rebuilds a store from previously persisted clusters.
    /// Clusters are reordered by `seq`; new ones continue after the highest.
    pub fn from_clusters(owner: impl Into<String>, ids: IdScheme, mut clusters: Vec<Cluster>) -> Self {
        clusters.sort_by_key(|c| c.seq);
        let next_seq = clusters.last().map_or(1, |c| c.seq + 1);
        Self {
            owner: owner.into(),
            ids,
            clusters,
            next_seq,
        }
    }

    /// Borrows the clusters in creation order without cloning.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.clusters.iter().position(|c| c.id == id)
    }
}

impl ClusterStore for MemoryClusterStore {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn list_clusters(&self) -> Result<Vec<Cluster>, ClusterError> {
        Ok(self.clusters.clone())
    }

    fn for_each_cluster(
        &self,
        f: &mut dyn FnMut(&Cluster) -> Result<(), ClusterError>,
    ) -> Result<(), ClusterError> {
        self.clusters.iter().try_for_each(f)
    }

    fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, ClusterError> {
        Ok(self.position(id).map(|i| self.clusters[i].clone()))
    }

    fn create_cluster(&mut self, initial: &[f32]) -> Result<Cluster, ClusterError> {
        if let Some(first) = self.clusters.first() {
            if first.centroid.len() != initial.len() {
                return Err(ClusterError::DimensionMismatch {
                    expected: first.centroid.len(),
                    got: initial.len(),
                });
            }
        }
        let seq = self.next_seq;
        let mut id = self.ids.mint(seq);
        // Persisted clusters may carry ids from an older scheme.
        while self.position(&id).is_some() {
            id = IdScheme::Random.mint(seq);
        }
        let cluster = Cluster::seed(id, seq, initial)?;
        self.next_seq += 1;
        self.clusters.push(cluster.clone());
        Ok(cluster)
    }

    fn update_cluster(&mut self, id: &str, emb: &[f32]) -> Result<Cluster, ClusterError> {
        let idx = self.position(id).ok_or_else(|| ClusterError::ClusterNotFound {
            owner: self.owner.clone(),
            id: id.to_string(),
        })?;
        let cluster = &mut self.clusters[idx];
        cluster.absorb(emb)?;
        Ok(cluster.clone())
    }

    fn len(&self) -> Result<usize, ClusterError> {
        Ok(self.clusters.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sets_count_and_centroid() {
        let mut store = MemoryClusterStore::with_ids("alice", IdScheme::sequential("person"));
        let c = store.create_cluster(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(c.id, "person:001");
        assert_eq!(c.seq, 1);
        assert_eq!(c.count, 1);
        assert_eq!(c.centroid, vec![1.0, 2.0, 3.0]);
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.owner(), "alice");
    }

    #[test]
    fn update_is_running_mean() {
        let mut store = MemoryClusterStore::with_ids("alice", IdScheme::sequential(""));
        let c = store.create_cluster(&[0.0, 0.0]).unwrap();
        assert_eq!(c.id, "001");

        store.update_cluster(&c.id, &[2.0, 4.0]).unwrap();
        let c = store.update_cluster(&c.id, &[4.0, 2.0]).unwrap();

        // mean of (0,0), (2,4), (4,2)
        assert_eq!(c.count, 3);
        assert!((c.centroid[0] - 2.0).abs() < 1e-6, "got {:?}", c.centroid);
        assert!((c.centroid[1] - 2.0).abs() < 1e-6, "got {:?}", c.centroid);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let mut store = MemoryClusterStore::new("bob");
        let err = store.update_cluster("nope", &[1.0]).unwrap_err();
        match err {
            ClusterError::ClusterNotFound { owner, id } => {
                assert_eq!(owner, "bob");
                assert_eq!(id, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn update_wrong_dimension_leaves_cluster_untouched() {
        let mut store = MemoryClusterStore::new("bob");
        let c = store.create_cluster(&[1.0, 0.0]).unwrap();
        assert!(store.update_cluster(&c.id, &[1.0, 0.0, 0.0]).is_err());

        let after = store.get_cluster(&c.id).unwrap().unwrap();
        assert_eq!(after.count, 1);
        assert_eq!(after.centroid, vec![1.0, 0.0]);
    }

    #[test]
    fn create_rejects_empty_and_mismatched() {
        let mut store = MemoryClusterStore::new("bob");
        assert!(matches!(
            store.create_cluster(&[]),
            Err(ClusterError::EmptyEmbedding)
        ));
        store.create_cluster(&[1.0, 0.0]).unwrap();
        assert!(matches!(
            store.create_cluster(&[1.0]),
            Err(ClusterError::DimensionMismatch { expected: 2, got: 1 })
        ));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn non_finite_values_rejected() {
        let mut store = MemoryClusterStore::new("bob");
        assert!(matches!(
            store.create_cluster(&[f32::NAN, 1.0]),
            Err(ClusterError::NonFiniteEmbedding { index: 0 })
        ));
        assert!(store.is_empty().unwrap());

        let c = store.create_cluster(&[1.0, 0.0]).unwrap();
        assert!(matches!(
            store.update_cluster(&c.id, &[1.0, f32::INFINITY]),
            Err(ClusterError::NonFiniteEmbedding { index: 1 })
        ));
        let after = store.get_cluster(&c.id).unwrap().unwrap();
        assert_eq!(after.count, 1);
        assert_eq!(after.centroid, vec![1.0, 0.0]);
    }

    #[test]
    fn for_each_visits_in_creation_order() {
        let mut store = MemoryClusterStore::with_ids("carol", IdScheme::sequential("p"));
        store.create_cluster(&[1.0, 0.0]).unwrap();
        store.create_cluster(&[0.0, 1.0]).unwrap();

        let mut seen = Vec::new();
        store
            .for_each_cluster(&mut |c: &Cluster| {
                seen.push(c.id.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec!["p:001", "p:002"]);
    }

    #[test]
    fn list_in_creation_order() {
        let mut store = MemoryClusterStore::new("carol");
        let a = store.create_cluster(&[1.0, 0.0]).unwrap();
        let b = store.create_cluster(&[0.0, 1.0]).unwrap();
        let c = store.create_cluster(&[1.0, 1.0]).unwrap();

        let ids: Vec<String> = store.list_clusters().unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn random_ids_are_unique() {
        let mut store = MemoryClusterStore::new("dave");
        let a = store.create_cluster(&[1.0]).unwrap();
        let b = store.create_cluster(&[1.0]).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 32);
    }

    #[test]
    fn from_clusters_restores_order_and_sequence() {
        let persisted = vec![
            Cluster::seed("p:002", 2, &[0.0, 1.0]).unwrap(),
            Cluster::seed("p:001", 1, &[1.0, 0.0]).unwrap(),
        ];
        let mut store =
            MemoryClusterStore::from_clusters("erin", IdScheme::sequential("p"), persisted);
        assert_eq!(store.clusters()[0].id, "p:001");

        let c = store.create_cluster(&[1.0, 1.0]).unwrap();
        assert_eq!(c.id, "p:003");
        assert_eq!(c.seq, 3);
    }

    #[test]
    fn cluster_serde() {
        let c = Cluster::seed("x", 7, &[0.5, 0.25]).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: Cluster = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
