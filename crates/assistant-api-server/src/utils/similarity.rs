use anyhow::Result;

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Cosine similarity in [-1.0, 1.0]. A zero vector scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        anyhow::bail!("Vector dimensions must match: {} != {}", a.len(), b.len());
    }
    if a.is_empty() {
        anyhow::bail!("Vectors cannot be empty");
    }

    let denominator = norm(a) * norm(b);
    if denominator == 0.0 {
        return Ok(0.0);
    }

    Ok((dot(a, b) / denominator).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_scaled_vectors() {
        let a = [1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);

        let scaled = [2.0, 4.0, 6.0];
        assert!((cosine_similarity(&a, &scaled).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_and_opposite_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(cosine_similarity(&[], &[]).is_err());
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }
}
