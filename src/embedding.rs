//! Embedding provider seam.
//!
//! The store consumes embeddings as a capability: any type that maps text to
//! a fixed-dimension float vector can back it. The shipped implementation
//! ([`crate::embedding_openai::OpenAiEmbeddingProvider`]) calls an
//! OpenAI-compatible HTTP endpoint; tests use a deterministic local provider.

use crate::error::{Error, Result};

/// Maps text to a fixed-dimension float vector.
///
/// The dimension is fixed at construction and must match the store's index.
/// Each text is embedded exactly once, at insertion; the stored vector is
/// reused for every later operation, including index rebuilds.
pub trait EmbeddingProvider {
    /// Embed a single text. The returned vector is not necessarily
    /// unit-normalized; callers normalize before indexing.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The fixed output dimension of this provider.
    fn dimension(&self) -> usize;
}

/// Scale a vector to unit length in place.
///
/// Zero vectors are left untouched: normalizing them is undefined, and a
/// zero query simply matches nothing strongly.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Embed `text` and unit-normalize the result, checking the dimension.
pub fn embed_normalized(
    provider: &dyn EmbeddingProvider,
    text: &str,
) -> Result<Vec<f32>> {
    let mut vector = provider.embed(text)?;
    if vector.len() != provider.dimension() {
        return Err(Error::Config(format!(
            "embedding provider returned dimension {}, expected {}",
            vector.len(),
            provider.dimension()
        )));
    }
    normalize(&mut vector);
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider(Vec<f32>);

    impl EmbeddingProvider for FixedProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    #[test]
    fn normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        let mut v = vec![0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn embed_normalized_checks_dimension() {
        let provider = FixedProvider(vec![1.0, 2.0]);
        assert!(embed_normalized(&provider, "hi").is_err());

        let provider = FixedProvider(vec![1.0, 2.0, 2.0]);
        let v = embed_normalized(&provider, "hi").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
