//! Per-style vector indexes: artifact format, object stores, provisioning
//! into a local working directory, and top-k similarity search.
pub mod artifact;
pub mod handle;
pub mod provision;
pub mod search;
pub mod store;

pub use handle::VectorIndexHandle;
pub use provision::IndexProvisioner;
pub use search::{join_context, Retriever, DEFAULT_TOP_K};
