use std::path::Path;

use crate::error::{Error, Result};

/// Header size: 4 bytes vector count + 4 bytes dimension.
const HEADER_SIZE: usize = 8;

/// Reserved id returned by [`FlatIpIndex::search`] for positions beyond the
/// number of stored vectors.
pub const NO_MATCH: i64 = -1;

/// Append-only flat inner-product index over unit-normalized vectors.
///
/// Every stored vector is scanned on search, so results are exact. The index
/// has no targeted removal: callers that need to drop entries rebuild a fresh
/// index from the vectors they keep.
///
/// Snapshot format (little-endian):
/// - 4 bytes: vector count N (u32 LE)
/// - 4 bytes: dimension D (u32 LE)
/// - N * D * 4 bytes: f32 LE values in row-major order
pub struct FlatIpIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config(
                "vector index dimension must be non-zero".into(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append a vector. Its position becomes its id.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::Config(format!(
                "vector dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Build a fresh index containing only the rows in `keep`, preserving
    /// their relative order. Kept vectors are copied, not re-derived.
    pub fn retain_rows(&self, keep: &[usize]) -> Result<Self> {
        let mut data = Vec::with_capacity(keep.len() * self.dimension);
        for &i in keep {
            let row = self
                .data
                .get(i * self.dimension..(i + 1) * self.dimension)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "vector id {i} out of bounds (index holds {})",
                        self.len()
                    ))
                })?;
            data.extend_from_slice(row);
        }
        Ok(Self {
            dimension: self.dimension,
            data,
        })
    }

    /// Exact k-nearest-neighbor search by inner product.
    ///
    /// Returns exactly `k` `(score, id)` pairs in descending score order,
    /// padded with `(0.0, NO_MATCH)` when fewer than `k` vectors are stored.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, i64)>> {
        if query.len() != self.dimension {
            return Err(Error::Config(format!(
                "query dimension mismatch: expected {}, got {}",
                self.dimension,
                query.len()
            )));
        }

        let mut scored: Vec<(f32, i64)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, row)| {
                let score: f32 =
                    row.iter().zip(query).map(|(a, b)| a * b).sum();
                (score, i as i64)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored.resize(k, (0.0, NO_MATCH));
        Ok(scored)
    }

    /// Write the index snapshot to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut bytes =
            Vec::with_capacity(HEADER_SIZE + std::mem::size_of_val(
                self.data.as_slice(),
            ));
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.data));
        std::fs::write(path, bytes).map_err(|source| Error::Persistence {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load an index snapshot from a file.
    ///
    /// A truncated or structurally invalid file is a parse error; the store
    /// treats that as "discard the snapshot and start empty".
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.len() < HEADER_SIZE {
            return Err(Error::parse(path, "index file shorter than header"));
        }

        let count = u32::from_le_bytes(bytes[0..4].try_into().map_err(
            |_| Error::parse(path, "invalid index header"),
        )?) as usize;
        let dimension = u32::from_le_bytes(bytes[4..8].try_into().map_err(
            |_| Error::parse(path, "invalid index header"),
        )?) as usize;

        if dimension == 0 {
            return Err(Error::parse(path, "index dimension is zero"));
        }

        let expected_len = HEADER_SIZE + count * dimension * 4;
        if bytes.len() != expected_len {
            return Err(Error::parse(
                path,
                format!(
                    "index file length {} does not match header ({count} x {dimension})",
                    bytes.len()
                ),
            ));
        }

        let data: Vec<f32> =
            bytemuck::cast_slice(&bytes[HEADER_SIZE..]).to_vec();

        Ok(Self { dimension, data })
    }
}

impl std::fmt::Debug for FlatIpIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatIpIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimension_rejected() {
        assert!(FlatIpIndex::new(0).is_err());
    }

    #[test]
    fn add_and_len() {
        let mut index = FlatIpIndex::new(3).unwrap();
        assert!(index.is_empty());

        index.add(&[1.0, 0.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let mut index = FlatIpIndex::new(3).unwrap();
        assert!(index.add(&[1.0, 0.0]).is_err());
        assert!(index.search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn search_orders_by_inner_product() {
        let mut index = FlatIpIndex::new(2).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[0.6, 0.8]).unwrap();

        let results = index.search(&[0.0, 1.0], 3).unwrap();
        assert_eq!(results[0].1, 1);
        assert_eq!(results[1].1, 2);
        assert_eq!(results[2].1, 0);
        assert!(results[0].0 > results[1].0);
    }

    #[test]
    fn search_pads_with_no_match() {
        let mut index = FlatIpIndex::new(2).unwrap();
        index.add(&[1.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1, 0);
        assert_eq!(results[1].1, NO_MATCH);
        assert_eq!(results[2].1, NO_MATCH);
    }

    #[test]
    fn retain_rows_repacks_in_order() {
        let mut index = FlatIpIndex::new(2).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[0.6, 0.8]).unwrap();

        let repacked = index.retain_rows(&[0, 2]).unwrap();
        assert_eq!(repacked.len(), 2);

        let results = repacked.search(&[0.6, 0.8], 2).unwrap();
        assert_eq!(results[0].1, 1); // the old row 2, now at position 1
        assert_eq!(results[1].1, 0);

        assert!(index.retain_rows(&[3]).is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.bin");

        let mut index = FlatIpIndex::new(2).unwrap();
        index.add(&[0.6, 0.8]).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.save(&path).unwrap();

        let restored = FlatIpIndex::load(&path).unwrap();
        assert_eq!(restored.dimension(), 2);
        assert_eq!(restored.len(), 2);

        let results = restored.search(&[0.6, 0.8], 1).unwrap();
        assert_eq!(results[0].1, 0);
    }

    #[test]
    fn load_rejects_truncated_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.bin");
        std::fs::write(&path, [0u8; 4]).unwrap();

        assert!(matches!(
            FlatIpIndex::load(&path),
            Err(crate::error::Error::Parse { .. })
        ));
    }

    #[test]
    fn load_rejects_length_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.bin");

        // Header claims 2 vectors of dimension 2, but only one is present.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&[1.0f32, 0.0]));
        std::fs::write(&path, bytes).unwrap();

        assert!(FlatIpIndex::load(&path).is_err());
    }
}
