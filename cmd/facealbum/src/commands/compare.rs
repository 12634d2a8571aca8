//! Embedding comparison command.

use clap::Args;
use serde::Serialize;

use facealbum_cluster::{cosine_similarity, euclidean_distance};

use super::{load_cluster_config, output_result, parse_embedding};
use crate::Cli;

/// Compare two embeddings.
///
/// Prints cosine similarity (the assignment metric), Euclidean distance
/// (diagnostic) and whether the pair would land in the same cluster.
#[derive(Args)]
pub struct CompareCommand {
    /// First embedding, comma-separated
    #[arg(long, allow_hyphen_values = true)]
    a: String,

    /// Second embedding, comma-separated
    #[arg(long, allow_hyphen_values = true)]
    b: String,

    /// Similarity threshold in (0, 1], overrides the config file
    #[arg(short = 't', long)]
    threshold: Option<f32>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Comparison {
    dim: usize,
    cosine_similarity: f32,
    euclidean_distance: f32,
    threshold: f32,
    same_person: bool,
}

impl CompareCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = load_cluster_config(cli, self.threshold)?;
        let a = parse_embedding(&self.a)?;
        let b = parse_embedding(&self.b)?;
        let result = compare(&a, &b, cfg.threshold)?;
        output_result(&result, cli.output.as_deref(), cli.json)
    }
}

fn compare(a: &[f32], b: &[f32], threshold: f32) -> anyhow::Result<Comparison> {
    if a.is_empty() {
        anyhow::bail!("embeddings must not be empty");
    }
    let sim = cosine_similarity(a, b)?;
    Ok(Comparison {
        dim: a.len(),
        cosine_similarity: sim,
        euclidean_distance: euclidean_distance(a, b)?,
        threshold,
        same_person: sim >= threshold,
    })
}
