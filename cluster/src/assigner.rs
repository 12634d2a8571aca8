use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::similarity::cosine_similarity;
use crate::store::{check_embedding, Cluster, ClusterStore};
use crate::{ClusterError, Config};

/// Outcome of assigning one face embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// The cluster the face now belongs to.
    pub cluster_id: String,

    /// Cosine similarity to the matched centroid (before the update).
    /// 1.0 for a newly created cluster.
    pub similarity: f32,

    /// True if a new cluster was created for this face.
    pub created: bool,
}

/// Greedy nearest-centroid classifier.
///
/// Scores the embedding against every centroid in the owner's store. The best
/// match at or above the threshold absorbs the face; otherwise a new cluster
/// is seeded with it. Equal scores resolve to the earliest-created cluster.
/// Clusters are never split or merged after creation.
#[derive(Debug, Clone)]
pub struct Assigner {
    cfg: Config,
}

impl Assigner {
    /// Creates an assigner. Fails if the threshold is outside (0, 1].
    pub fn new(cfg: Config) -> Result<Self, ClusterError> {
        let cfg = cfg.with_defaults();
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn threshold(&self) -> f32 {
        self.cfg.threshold
    }

    /// Returns the best-scoring cluster and its score, or `None` for an empty
    /// store. Iterates in creation order and only replaces the current best on
    /// a strictly greater score.
    pub fn best_match(
        &self,
        store: &dyn ClusterStore,
        emb: &[f32],
    ) -> Result<Option<(Cluster, f32)>, ClusterError> {
        let mut best: Option<(Cluster, f32)> = None;
        store.for_each_cluster(&mut |c: &Cluster| {
            let sim = cosine_similarity(emb, &c.centroid)?;
            if best.as_ref().is_none_or(|(_, s)| sim > *s) {
                best = Some((c.clone(), sim));
            }
            Ok(())
        })?;
        Ok(best)
    }

    /// Assigns `emb` to a cluster in `store`, creating one when nothing is
    /// similar enough.
    pub fn assign(
        &self,
        store: &mut dyn ClusterStore,
        emb: &[f32],
    ) -> Result<Assignment, ClusterError> {
        check_embedding(emb)?;

        match self.best_match(store, emb)? {
            Some((best, sim)) if sim >= self.cfg.threshold => {
                let updated = store.update_cluster(&best.id, emb)?;
                debug!(
                    owner = store.owner(),
                    cluster = %updated.id,
                    similarity = sim,
                    count = updated.count,
                    "face matched existing cluster"
                );
                Ok(Assignment {
                    cluster_id: updated.id,
                    similarity: sim,
                    created: false,
                })
            }
            best => {
                if let Some((c, sim)) = &best {
                    debug!(
                        owner = store.owner(),
                        nearest = %c.id,
                        similarity = *sim,
                        threshold = self.cfg.threshold,
                        "no cluster above threshold"
                    );
                }
                let created = store.create_cluster(emb)?;
                info!(owner = store.owner(), cluster = %created.id, "created cluster");
                Ok(Assignment {
                    cluster_id: created.id,
                    similarity: 1.0,
                    created: true,
                })
            }
        }
    }
}
