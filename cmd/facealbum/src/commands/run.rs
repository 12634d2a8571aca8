//! Batch clustering command.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::info;

use facealbum_cluster::{
    build_albums, faces_or_empty, Assignment, DetectError, Face, IdScheme, ImageRecord, Registry,
    Representative,
};

use super::{load_cluster_config, load_request, output_result, print_verbose};
use crate::Cli;

/// Cluster a batch of uploads.
///
/// Uploads are processed in file order per owner; different owners run in
/// parallel. Prints per-image assignments, per-owner clusters and albums.
#[derive(Args)]
pub struct RunCommand {
    /// Uploads file (YAML or JSON)
    #[arg(short = 'f', long = "file")]
    input: String,

    /// Similarity threshold in (0, 1], overrides the config file
    #[arg(short = 't', long)]
    threshold: Option<f32>,

    /// Use sequential cluster ids with this prefix (e.g. "person" -> person:001)
    #[arg(long)]
    prefix: Option<String>,
}

/// Input file format.
#[derive(Debug, Deserialize)]
struct UploadBatch {
    uploads: Vec<Upload>,
}

/// One uploaded image with its detection output.
#[derive(Debug, Clone, Deserialize)]
struct Upload {
    owner: String,
    id: String,
    uploaded_at: DateTime<Utc>,
    #[serde(default)]
    friend_name: Option<String>,
    #[serde(default)]
    faces: Vec<Face>,
    /// Set when the detector failed on this image.
    #[serde(default)]
    detect_error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    images: Vec<ImageReport>,
    owners: BTreeMap<String, OwnerReport>,
}

#[derive(Debug, Serialize)]
struct ImageReport {
    owner: String,
    id: String,
    representative: Representative,
    faces: Vec<Assignment>,
}

#[derive(Debug, Serialize)]
struct OwnerReport {
    clusters: Vec<ClusterSummary>,
    albums: Vec<AlbumSummary>,
}

#[derive(Debug, Serialize)]
struct ClusterSummary {
    id: String,
    count: usize,
}

#[derive(Debug, Serialize)]
struct AlbumSummary {
    cluster: Representative,
    label: String,
    images: Vec<String>,
}

impl RunCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = load_cluster_config(cli, self.threshold)?;
        let batch: UploadBatch = load_request(&self.input)?;
        print_verbose(cli, &format!("Threshold: {}", cfg.threshold));
        print_verbose(cli, &format!("Uploads: {}", batch.uploads.len()));

        let ids = match &self.prefix {
            Some(p) => IdScheme::sequential(p.clone()),
            None => IdScheme::Random,
        };
        let registry = Arc::new(Registry::with_memory_stores(cfg, ids)?);

        let processed = process_batch(&registry, batch.uploads).await?;
        let report = build_report(&registry, processed)?;
        output_result(&report, cli.output.as_deref(), cli.json)
    }
}

/// Clusters uploads, one blocking task per owner. Results come back in input
/// order.
async fn process_batch(
    registry: &Arc<Registry>,
    uploads: Vec<Upload>,
) -> anyhow::Result<Vec<(Upload, ImageReport)>> {
    let mut by_owner: BTreeMap<String, Vec<(usize, Upload)>> = BTreeMap::new();
    for (i, up) in uploads.into_iter().enumerate() {
        by_owner.entry(up.owner.clone()).or_default().push((i, up));
    }

    let mut tasks = JoinSet::new();
    for (owner, items) in by_owner {
        let registry = Arc::clone(registry);
        tasks.spawn_blocking(move || -> anyhow::Result<Vec<(usize, Upload, ImageReport)>> {
            let mut out = Vec::with_capacity(items.len());
            for (i, up) in items {
                let detected = match &up.detect_error {
                    Some(msg) => Err(DetectError(msg.clone())),
                    None => Ok(up.faces.clone()),
                };
                let faces = faces_or_empty(detected);
                let result = registry
                    .process_image(&owner, &faces)
                    .map_err(|e| anyhow::anyhow!("image {} of {}: {e}", up.id, owner))?;
                let report = ImageReport {
                    owner: owner.clone(),
                    id: up.id.clone(),
                    representative: result.representative,
                    faces: result.faces,
                };
                out.push((i, up, report));
            }
            info!(owner = %owner, images = out.len(), "owner batch done");
            Ok(out)
        });
    }

    let mut all = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        all.extend(joined??);
    }
    all.sort_by_key(|(i, _, _)| *i);
    Ok(all.into_iter().map(|(_, up, r)| (up, r)).collect())
}

fn build_report(registry: &Registry, processed: Vec<(Upload, ImageReport)>) -> anyhow::Result<Report> {
    let mut records: BTreeMap<String, Vec<ImageRecord>> = BTreeMap::new();
    let mut images = Vec::with_capacity(processed.len());
    for (up, report) in processed {
        records.entry(up.owner.clone()).or_default().push(ImageRecord {
            id: up.id,
            owner: up.owner,
            uploaded_at: up.uploaded_at,
            face_clusters: report.faces.iter().map(|a| a.cluster_id.clone()).collect(),
            representative: report.representative.clone(),
            friend_name: up.friend_name,
        });
        images.push(report);
    }

    let mut owners = BTreeMap::new();
    for (owner, recs) in records {
        let clusters = registry
            .clusters(&owner)?
            .into_iter()
            .map(|c| ClusterSummary {
                id: c.id,
                count: c.count,
            })
            .collect();
        let albums = build_albums(&owner, &recs)
            .into_iter()
            .map(|a| AlbumSummary {
                cluster: a.cluster,
                label: a.label,
                images: a.images.into_iter().map(|i| i.id).collect(),
            })
            .collect();
        owners.insert(owner, OwnerReport { clusters, albums });
    }

    Ok(Report { images, owners })
}

#[cfg(test)]
mod tests {
    use super::*;
    use facealbum_cluster::Config;

    const BATCH: &str = r#"
uploads:
  - owner: alice
    id: beach
    uploaded_at: 2024-06-01T10:00:00Z
    faces:
      - embedding: [0.9, 0.1, 0.0]
        box: { x: 0, y: 0, width: 50, height: 50 }
  - owner: bob
    id: hike
    uploaded_at: 2024-06-01T11:00:00Z
    faces:
      - embedding: [0.9, 0.1, 0.0]
        box: { x: 0, y: 0, width: 50, height: 50 }
  - owner: alice
    id: dinner
    uploaded_at: 2024-06-02T19:00:00Z
    friend_name: Sam
    faces:
      - embedding: [0.88, 0.12, 0.01]
        box: { x: 5, y: 5, width: 40, height: 40 }
  - owner: alice
    id: blurry
    uploaded_at: 2024-06-03T08:00:00Z
    detect_error: model timeout
    faces:
      - embedding: [0.0, 1.0, 0.0]
        box: { x: 0, y: 0, width: 10, height: 10 }
"#;

    fn registry() -> Arc<Registry> {
        Arc::new(
            Registry::with_memory_stores(Config::default(), IdScheme::sequential("person"))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn batch_report() {
        let batch: UploadBatch = serde_yaml::from_str(BATCH).unwrap();
        let reg = registry();
        let processed = process_batch(&reg, batch.uploads).await.unwrap();

        let order: Vec<&str> = processed.iter().map(|(u, _)| u.id.as_str()).collect();
        assert_eq!(order, vec!["beach", "hike", "dinner", "blurry"]);

        let report = build_report(&reg, processed).unwrap();
        assert_eq!(report.images[3].representative, Representative::Unclustered);

        let alice = &report.owners["alice"];
        assert_eq!(alice.clusters.len(), 1);
        assert_eq!(alice.clusters[0].count, 2);
        assert_eq!(alice.albums.len(), 2);
        assert_eq!(alice.albums[0].label, "Sam");
        assert_eq!(alice.albums[0].images, vec!["dinner", "beach"]);
        assert_eq!(alice.albums[1].label, "Unsorted");

        let bob = &report.owners["bob"];
        assert_eq!(bob.clusters.len(), 1);
        assert_eq!(bob.albums[0].label, "Alex #001");
    }
}
