use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::types::{ImageRecord, Representative};

/// Label of the album holding images with no identifiable face.
pub const UNSORTED_LABEL: &str = "Unsorted";

/// Placeholder person names, cycled over albums the owner has not named.
const NAME_POOL: &[&str] = &[
    "Alex", "Blake", "Casey", "Dana", "Eden", "Finley", "Gray", "Harper", "Indy", "Jordan", "Kai",
    "Logan",
];

const FRAGMENT_LEN: usize = 6;

/// Images sharing one representative cluster. Derived on read, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub cluster: Representative,
    pub label: String,

    /// True if `label` came from a name the uploader typed.
    pub named: bool,

    /// Newest upload first.
    pub images: Vec<ImageRecord>,
}

/// Groups `owner`'s images into albums by representative cluster.
///
/// Albums are ordered by when their person first appeared (oldest first, ties
/// by cluster id), with the unsorted album last. An album is labelled with the
/// most recent friend name among its images, or else a pooled placeholder name
/// picked by its position and suffixed with a fragment of the cluster id.
/// Images belonging to other owners are skipped.
pub fn build_albums(owner: &str, images: &[ImageRecord]) -> Vec<Album> {
    let mut groups: HashMap<&Representative, Vec<&ImageRecord>> = HashMap::new();
    let mut foreign = 0usize;
    for img in images {
        if img.owner != owner {
            foreign += 1;
            continue;
        }
        groups.entry(&img.representative).or_default().push(img);
    }
    if foreign > 0 {
        warn!(owner, skipped = foreign, "ignoring images of other owners");
    }

    let mut unsorted: Option<Vec<&ImageRecord>> = None;
    let mut clustered: Vec<(&Representative, Vec<&ImageRecord>)> = Vec::with_capacity(groups.len());
    for (rep, mut members) in groups {
        members.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then_with(|| a.id.cmp(&b.id)));
        if rep.is_unclustered() {
            unsorted = Some(members);
        } else {
            clustered.push((rep, members));
        }
    }

    // Members are newest-first, so the last one is the earliest upload.
    clustered.sort_by(|(ra, ma), (rb, mb)| {
        let ea = ma.last().map(|i| i.uploaded_at);
        let eb = mb.last().map(|i| i.uploaded_at);
        ea.cmp(&eb).then_with(|| ra.cmp(rb))
    });

    let mut albums: Vec<Album> = clustered
        .into_iter()
        .enumerate()
        .map(|(i, (rep, members))| {
            let friend = members
                .iter()
                .filter_map(|m| m.friend_name.as_deref())
                .map(str::trim)
                .find(|n| !n.is_empty());
            let (label, named) = match friend {
                Some(name) => (name.to_string(), true),
                None => (pooled_label(i, rep.cluster_id().unwrap_or_default()), false),
            };
            Album {
                cluster: rep.clone(),
                label,
                named,
                images: members.into_iter().cloned().collect(),
            }
        })
        .collect();

    if let Some(members) = unsorted {
        albums.push(Album {
            cluster: Representative::Unclustered,
            label: UNSORTED_LABEL.to_string(),
            named: false,
            images: members.into_iter().cloned().collect(),
        });
    }
    albums
}

fn pooled_label(index: usize, cluster_id: &str) -> String {
    let name = NAME_POOL[index % NAME_POOL.len()];
    format!("{name} #{}", id_fragment(cluster_id))
}

/// Short disambiguating piece of a cluster id: the part after the last `:`,
/// cut to six characters.
fn id_fragment(id: &str) -> &str {
    let tail = id.rsplit(':').next().unwrap_or(id);
    match tail.char_indices().nth(FRAGMENT_LEN) {
        Some((end, _)) => &tail[..end],
        None => tail,
    }
}
