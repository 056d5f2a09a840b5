/// Filesystem artifact store: tenant-scoped paths, content-hash
/// addressable retrieval, and expiring pseudo-signed URLs.
///
/// Layout: `<root>/<tenant_id>/<site_id>/<artifact_type>/<artifact_id>`
/// with a `.meta.json` sidecar per artifact.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rostra_core::hash::sha256_hex;
use rostra_core::{ArtifactMetadata, ArtifactStore};
use tracing::info;

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn tenant_dir(&self, tenant_id: &str) -> PathBuf {
        self.root.join(sanitize(tenant_id))
    }

    async fn find_artifact(&self, artifact_id: &str, tenant_id: &str) -> Option<PathBuf> {
        // Artifacts live two levels under the tenant dir (site/type).
        let tenant_dir = self.tenant_dir(tenant_id);
        let mut sites = tokio::fs::read_dir(&tenant_dir).await.ok()?;
        while let Ok(Some(site)) = sites.next_entry().await {
            let mut types = tokio::fs::read_dir(site.path()).await.ok()?;
            while let Ok(Some(ty)) = types.next_entry().await {
                let candidate = ty.path().join(artifact_id);
                if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store<'a>(
        &self,
        tenant_id: &str,
        site_id: &str,
        artifact_type: &str,
        content: &[u8],
        run_id: Option<&'a str>,
        plan_version_id: Option<i64>,
    ) -> anyhow::Result<ArtifactMetadata> {
        let content_hash = sha256_hex(content);
        let artifact_id = format!("{}_{}", sanitize(artifact_type), &content_hash[..16]);

        let dir = self
            .tenant_dir(tenant_id)
            .join(sanitize(site_id))
            .join(sanitize(artifact_type));
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(&artifact_id);
        tokio::fs::write(&path, content).await?;

        let metadata = ArtifactMetadata {
            artifact_id: artifact_id.clone(),
            tenant_id: tenant_id.to_string(),
            site_id: site_id.to_string(),
            artifact_type: artifact_type.to_string(),
            content_hash,
            size_bytes: content.len() as u64,
            run_id: run_id.map(str::to_string),
            plan_version_id,
        };
        let sidecar = dir.join(format!("{artifact_id}.meta.json"));
        tokio::fs::write(&sidecar, serde_json::to_vec_pretty(&metadata)?).await?;

        info!(
            artifact_id,
            tenant = tenant_id,
            bytes = content.len(),
            "artifact stored"
        );
        Ok(metadata)
    }

    async fn get(&self, artifact_id: &str, tenant_id: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match self.find_artifact(artifact_id, tenant_id).await {
            None => Ok(None),
            Some(path) => Ok(Some(tokio::fs::read(path).await?)),
        }
    }

    async fn sign_url(
        &self,
        artifact_id: &str,
        tenant_id: &str,
        expires_in_sec: u64,
    ) -> anyhow::Result<Option<String>> {
        let Some(path) = self.find_artifact(artifact_id, tenant_id).await else {
            return Ok(None);
        };

        let expires = chrono::Utc::now().timestamp() as u64 + expires_in_sec;
        let token = sha256_hex(format!("{artifact_id}|{tenant_id}|{expires}").as_bytes());
        Ok(Some(format!(
            "file://{}?expires={}&token={}",
            absolute(&path).display(),
            expires,
            &token[..32]
        )))
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
