//! Utility functions for CLI commands.

use std::path::Path;

use facealbum_cluster::Config;

use crate::Cli;

/// Loads a request from a YAML or JSON file, chosen by extension.
pub fn load_request<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {path}: {e}"))?;
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml");

    let result = match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };

    Ok(result)
}

/// Resolves the clustering config: file (if any), then flag override.
/// A threshold of 0 from either source means the default.
pub fn load_cluster_config(cli: &Cli, threshold: Option<f32>) -> anyhow::Result<Config> {
    let mut cfg = match cli.config.as_deref() {
        Some(path) => load_request::<Config>(path)?,
        None => Config::default(),
    };
    if let Some(t) = threshold {
        cfg.threshold = t;
    }
    let cfg = cfg.with_defaults();
    cfg.validate()?;
    Ok(cfg)
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(
    result: &T,
    output_path: Option<&str>,
    as_json: bool,
) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)?
    } else {
        serde_yaml::to_string(result)?
    };

    match output_path {
        Some(path) => std::fs::write(path, output)?,
        None => print!("{}", output),
    }

    Ok(())
}

/// Prints a message to stderr in verbose mode.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Parses a comma-separated list of floats, e.g. `"0.1, 0.2,0.3"`.
pub fn parse_embedding(s: &str) -> anyhow::Result<Vec<f32>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<f32>()
                .map_err(|e| anyhow::anyhow!("invalid embedding value {p:?}: {e}"))
        })
        .collect()
}
