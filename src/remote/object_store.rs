//! Object store contract for file and model artifacts.
//!
//! Used by the ingestion job (archive objects in, extracted entries out) and
//! the distance job (scoring-model artifact). Download and decompression
//! mechanics stay behind this trait.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Enumerate every key under a prefix. Pagination is the implementor's
    /// concern; callers always receive the complete listing.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
