use crate::ClusterError;

/// Cosine similarity between two embeddings, in `[-1, 1]`.
///
/// Uses f64 intermediate precision. Returns 0 when either operand has zero
/// magnitude. Embeddings of different length are rejected.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, ClusterError> {
    check_dims(a, b)?;

    let mut dot: f64 = 0.0;
    let mut na: f64 = 0.0;
    let mut nb: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let ai = x as f64;
        let bi = y as f64;
        dot += ai * bi;
        na += ai * ai;
        nb += bi * bi;
    }
    if na == 0.0 || nb == 0.0 {
        return Ok(0.0);
    }

    // Clamp to [-1, 1] to absorb rounding.
    let sim = (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0);
    Ok(sim as f32)
}

/// Euclidean (L2) distance between two embeddings.
///
/// Diagnostic only: assignment decisions use [`cosine_similarity`], which is
/// scale-invariant.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, ClusterError> {
    check_dims(a, b)?;

    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum.sqrt() as f32)
}

fn check_dims(a: &[f32], b: &[f32]) -> Result<(), ClusterError> {
    if a.len() != b.len() {
        return Err(ClusterError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(())
}
