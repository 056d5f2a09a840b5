use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Descriptor returned by `store`; retrieval is content-hash addressable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub artifact_id: String,
    pub tenant_id: String,
    pub site_id: String,
    pub artifact_type: String,
    pub content_hash: String,
    pub size_bytes: u64,
    pub run_id: Option<String>,
    pub plan_version_id: Option<i64>,
}

/// Blob store port. Append-only from the core's perspective; paths are
/// tenant-scoped by the implementation.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store<'a>(
        &self,
        tenant_id: &str,
        site_id: &str,
        artifact_type: &str,
        content: &[u8],
        run_id: Option<&'a str>,
        plan_version_id: Option<i64>,
    ) -> anyhow::Result<ArtifactMetadata>;

    async fn get(&self, artifact_id: &str, tenant_id: &str) -> anyhow::Result<Option<Vec<u8>>>;

    async fn sign_url(
        &self,
        artifact_id: &str,
        tenant_id: &str,
        expires_in_sec: u64,
    ) -> anyhow::Result<Option<String>>;
}
