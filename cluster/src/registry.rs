use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::assigner::{Assigner, Assignment};
use crate::coordinator::{process_image, ImageAssignment};
use crate::detector::{faces_or_empty, FaceDetector};
use crate::store::{Cluster, ClusterStore, IdScheme, MemoryClusterStore};
use crate::types::Face;
use crate::{ClusterError, Config};

type StoreFactory<S> = Box<dyn Fn(&str) -> S + Send + Sync>;

/// Owner-scoped cluster stores with per-owner serialization.
///
/// Every operation on an owner holds that owner's lock for its full
/// duration, so two uploads by the same owner can never race to create
/// two clusters for one person. Different owners have separate locks and
/// proceed in parallel.
///
/// Thread-safe: all methods can be called concurrently.
pub struct Registry<S: ClusterStore = MemoryClusterStore> {
    assigner: RwLock<Assigner>,
    owners: RwLock<HashMap<String, Arc<Mutex<S>>>>,
    factory: StoreFactory<S>,
}

impl Registry<MemoryClusterStore> {
    /// Creates a registry that gives each owner a fresh in-memory store.
    pub fn with_memory_stores(cfg: Config, ids: IdScheme) -> Result<Self, ClusterError> {
        Self::new(cfg, move |owner| {
            MemoryClusterStore::with_ids(owner, ids.clone())
        })
    }
}

impl<S: ClusterStore + 'static> Registry<S> {
    /// Creates a registry. `factory` builds the store for an owner seen for
    /// the first time.
    pub fn new(
        cfg: Config,
        factory: impl Fn(&str) -> S + Send + Sync + 'static,
    ) -> Result<Self, ClusterError> {
        Ok(Self {
            assigner: RwLock::new(Assigner::new(cfg)?),
            owners: RwLock::new(HashMap::new()),
            factory: Box::new(factory),
        })
    }

    /// Registers a preloaded store, replacing any existing one for its owner.
    pub fn insert_store(&self, store: S) {
        let owner = store.owner().to_string();
        self.owners.write().insert(owner, Arc::new(Mutex::new(store)));
    }

    fn store(&self, owner: &str) -> Result<Arc<Mutex<S>>, ClusterError> {
        if let Some(s) = self.owners.read().get(owner) {
            return Ok(Arc::clone(s));
        }

        let mut owners = self.owners.write();
        if let Some(s) = owners.get(owner) {
            return Ok(Arc::clone(s));
        }
        let store = (self.factory)(owner);
        if store.owner() != owner {
            return Err(ClusterError::OwnerMismatch {
                expected: owner.to_string(),
                got: store.owner().to_string(),
            });
        }
        let s = Arc::new(Mutex::new(store));
        owners.insert(owner.to_string(), Arc::clone(&s));
        Ok(s)
    }

    /// Clusters all faces of one image for `owner`.
    pub fn process_image(&self, owner: &str, faces: &[Face]) -> Result<ImageAssignment, ClusterError> {
        let assigner = self.assigner.read().clone();
        let store = self.store(owner)?;
        let mut guard = store.lock();
        process_image(&assigner, &mut *guard, faces)
    }

    /// Runs `detector` on an uploaded image and clusters what it finds.
    /// A detection failure yields the unclustered fallback, not an error.
    pub fn process_upload(
        &self,
        owner: &str,
        detector: &dyn FaceDetector,
        image: &[u8],
    ) -> Result<ImageAssignment, ClusterError> {
        let faces = faces_or_empty(detector.detect(image));
        self.process_image(owner, &faces)
    }

    /// Assigns a single embedding for `owner`.
    pub fn assign(&self, owner: &str, emb: &[f32]) -> Result<Assignment, ClusterError> {
        let assigner = self.assigner.read().clone();
        let store = self.store(owner)?;
        let mut guard = store.lock();
        assigner.assign(&mut *guard, emb)
    }

    /// Returns `owner`'s clusters in creation order. Empty for unknown owners.
    pub fn clusters(&self, owner: &str) -> Result<Vec<Cluster>, ClusterError> {
        let store = self.owners.read().get(owner).map(Arc::clone);
        match store {
            Some(s) => s.lock().list_clusters(),
            None => Ok(Vec::new()),
        }
    }

    /// Runs `f` with exclusive access to `owner`'s store, e.g. to persist it.
    pub fn with_store<R>(&self, owner: &str, f: impl FnOnce(&mut S) -> R) -> Result<R, ClusterError> {
        let store = self.store(owner)?;
        let mut guard = store.lock();
        Ok(f(&mut guard))
    }

    /// Returns all owners with a store, sorted.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.owners.read().keys().cloned().collect();
        owners.sort();
        owners
    }

    /// Adjusts matching strictness at runtime. In-flight images keep the
    /// threshold they started with.
    pub fn set_threshold(&self, t: f32) -> Result<(), ClusterError> {
        let next = Assigner::new(Config::new(t))?;
        *self.assigner.write() = next;
        Ok(())
    }

    pub fn threshold(&self) -> f32 {
        self.assigner.read().threshold()
    }
}
