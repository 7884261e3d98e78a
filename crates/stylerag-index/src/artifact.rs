//! On-disk format of a published index: a vector blob plus JSON metadata.
//!
//! Vector blob (`.vec`):
//!
//! ```text
//! magic "SRVX" | u32 version | u32 dim | u64 count | count*dim f32
//! ```
//!
//! all little-endian. The metadata (`.json`) lists the fragments in the same
//! order as the vectors and records the embedding model, the dimension and the
//! BLAKE3 digest of the vector blob.
use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use stylerag_core::types::Meta;

pub const VECTOR_EXT: &str = "vec";
pub const METADATA_EXT: &str = "json";
pub const FORMAT_VERSION: u32 = 1;

const MAGIC: &[u8; 4] = b"SRVX";
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFragment {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: u32,
    pub model: String,
    pub dim: usize,
    pub checksum: String,
    pub fragments: Vec<StoredFragment>,
}

/// Decoded contents of one artifact pair.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub model: String,
    pub dim: usize,
    /// Row-major, `fragments.len() * dim` values.
    pub vectors: Vec<f32>,
    pub fragments: Vec<StoredFragment>,
}

pub fn checksum(bytes: &[u8]) -> String { blake3::hash(bytes).to_hex().to_string() }

/// Serialize into `(vector blob, metadata json)`.
pub fn encode(set: &ArtifactSet) -> Result<(Vec<u8>, Vec<u8>)> {
    if set.dim == 0 { bail!("dimension must be positive"); }
    if set.vectors.len() != set.fragments.len() * set.dim {
        bail!("{} values do not form {} vectors of dim {}", set.vectors.len(), set.fragments.len(), set.dim);
    }
    let mut blob = Vec::with_capacity(HEADER_LEN + set.vectors.len() * 4);
    blob.extend_from_slice(MAGIC);
    blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    blob.extend_from_slice(&(set.dim as u32).to_le_bytes());
    blob.extend_from_slice(&(set.fragments.len() as u64).to_le_bytes());
    for v in &set.vectors { blob.extend_from_slice(&v.to_le_bytes()); }
    let meta = IndexMetadata {
        version: FORMAT_VERSION,
        model: set.model.clone(),
        dim: set.dim,
        checksum: checksum(&blob),
        fragments: set.fragments.clone(),
    };
    Ok((blob, serde_json::to_vec_pretty(&meta)?))
}

/// Parse and cross-check both files.
pub fn decode(blob: &[u8], meta_json: &[u8]) -> Result<ArtifactSet> {
    let meta: IndexMetadata = serde_json::from_slice(meta_json).map_err(|e| anyhow!("metadata is not valid JSON: {}", e))?;
    if meta.version != FORMAT_VERSION { bail!("unsupported metadata version {}", meta.version); }
    let actual = checksum(blob);
    if actual != meta.checksum { bail!("vector blob checksum mismatch (expected {}, got {})", meta.checksum, actual); }

    if blob.len() < HEADER_LEN { bail!("vector blob is truncated ({} bytes)", blob.len()); }
    if &blob[0..4] != MAGIC { bail!("vector blob has bad magic"); }
    let version = read_u32(blob, 4);
    if version != FORMAT_VERSION { bail!("unsupported vector blob version {}", version); }
    let dim = read_u32(blob, 8) as usize;
    let count = u64::from_le_bytes(blob[12..20].try_into()?) as usize;
    if dim == 0 { bail!("vector blob declares zero dimension"); }
    if dim != meta.dim { bail!("vector blob dim {} disagrees with metadata dim {}", dim, meta.dim); }
    if count != meta.fragments.len() { bail!("vector blob holds {} vectors but metadata lists {} fragments", count, meta.fragments.len()); }
    let expected_len = count.checked_mul(dim).and_then(|n| n.checked_mul(4)).and_then(|n| n.checked_add(HEADER_LEN));
    if expected_len != Some(blob.len()) { bail!("vector blob length {} does not match {} x {} floats", blob.len(), count, dim); }

    let vectors = blob[HEADER_LEN..]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(ArtifactSet { model: meta.model, dim, vectors, fragments: meta.fragments })
}

fn read_u32(blob: &[u8], at: usize) -> u32 { u32::from_le_bytes([blob[at], blob[at + 1], blob[at + 2], blob[at + 3]]) }
