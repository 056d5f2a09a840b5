use rostra_core::ArtifactStore;
use rostra_storage::FsArtifactStore;
use tempfile::tempdir;

#[tokio::test]
async fn store_and_get_round_trip() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    let content = b"evidence pack bytes";
    let meta = store
        .store("wien", "hub-1", "proof_pack", content, Some("run-1"), Some(7))
        .await
        .unwrap();

    assert_eq!(meta.tenant_id, "wien");
    assert_eq!(meta.size_bytes, content.len() as u64);
    assert!(meta.artifact_id.starts_with("proof_pack_"));

    let fetched = store.get(&meta.artifact_id, "wien").await.unwrap();
    assert_eq!(fetched.as_deref(), Some(content.as_slice()));
}

#[tokio::test]
async fn retrieval_is_tenant_scoped() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    let meta = store
        .store("wien", "hub-1", "proof_pack", b"secret", None, None)
        .await
        .unwrap();

    // Another tenant cannot reach the artifact.
    let other = store.get(&meta.artifact_id, "graz").await.unwrap();
    assert!(other.is_none());
}

#[tokio::test]
async fn identical_content_is_hash_addressed() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    let a = store
        .store("wien", "hub-1", "kpis", b"{}", None, None)
        .await
        .unwrap();
    let b = store
        .store("wien", "hub-1", "kpis", b"{}", None, None)
        .await
        .unwrap();
    assert_eq!(a.artifact_id, b.artifact_id);
    assert_eq!(a.content_hash, b.content_hash);
}

#[tokio::test]
async fn signed_urls_expire_and_embed_a_token() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    let meta = store
        .store("wien", "hub-1", "proof_pack", b"bytes", None, None)
        .await
        .unwrap();

    let url = store
        .sign_url(&meta.artifact_id, "wien", 600)
        .await
        .unwrap()
        .unwrap();
    assert!(url.starts_with("file://"));
    assert!(url.contains("expires="));
    assert!(url.contains("token="));

    // Unknown artifacts yield no URL.
    let none = store.sign_url("nope", "wien", 600).await.unwrap();
    assert!(none.is_none());
}
