use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::StorageClient;

pub struct UploadItem<'a> {
    pub body: Bytes,
    pub content_type: &'a str,
}

/// Store one image under `prefix/` and return its storage key.
pub async fn store_image(
    storage: &dyn StorageClient,
    prefix: &str,
    image: UploadItem<'_>,
) -> anyhow::Result<String> {
    anyhow::ensure!(!image.body.is_empty(), "empty image body");

    let id = Uuid::new_v4();
    let ext = ext_from_mime(image.content_type).unwrap_or("bin");
    let key = format!("{}/{}.{}", prefix.trim_end_matches('/'), id, ext);
    storage
        .put_object(&key, image.body, image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

pub async fn presign_many(
    storage: &dyn StorageClient,
    keys: &[String],
    expires_seconds: u64,
) -> anyhow::Result<Vec<String>> {
    let mut out = Vec::with_capacity(keys.len());
    for k in keys {
        out.push(presign_key(storage, k, expires_seconds).await?);
    }
    Ok(out)
}

pub async fn presign_key(
    storage: &dyn StorageClient,
    key: &str,
    expires_seconds: u64,
) -> anyhow::Result<String> {
    storage
        .presign_get(key, expires_seconds)
        .await
        .with_context(|| format!("presign url for key {}", key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use crate::storage::fake::FakeStorage;

    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[tokio::test]
    async fn store_image_uses_prefix_and_extension() {
        let storage = FakeStorage::default();
        let key = store_image(
            &storage,
            "sessions/u/s/",
            UploadItem {
                body: Bytes::from_static(b"jpeg-bytes"),
                content_type: "image/jpeg",
            },
        )
        .await
        .unwrap();

        assert!(key.starts_with("sessions/u/s/"));
        assert!(key.ends_with(".jpg"));
        assert!(storage.objects.read().await.contains_key(&key));
    }

    #[tokio::test]
    async fn store_image_rejects_empty_body() {
        let storage = FakeStorage::default();
        let err = store_image(
            &storage,
            "pantry/u",
            UploadItem {
                body: Bytes::new(),
                content_type: "image/png",
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_presign_many_and_one() {
        let storage = FakeStorage::default();

        let urls = presign_many(&storage, &["a/b/c.jpg".into(), "x/y/z.png".into()], 1800)
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("a/b/c.jpg"));
        assert!(urls[1].contains("x/y/z.png"));

        let one = presign_key(&storage, "q/w/e.webp", 600).await.unwrap();
        assert!(one.contains("q/w/e.webp"));
    }
}
