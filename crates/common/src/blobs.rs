//! Encrypted blob storage (local filesystem/memory/S3).
//!
//! Blobs sit in one flat namespace keyed by [`BlobAddress::object_name`].
//! Bytes are encrypted on the way in and decrypted on the way out in
//! fixed-size chunks; a whole file is never held in memory.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{GetOptions, ObjectStore, WriteMultipart};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::address::BlobAddress;
use crate::config::BlobStoreConfig;
use crate::crypto::{generate_iv, plaintext_len, BlobCipher, Iv, UserKey, IV_SIZE};
use crate::error::{DriveError, Result};

/// Upper bound on multipart parts uploading concurrently for one blob.
const MAX_IN_FLIGHT_PARTS: usize = 4;

/// Prefix for uploads that have not been claimed yet. Blob object names are
/// hex digests and never contain a `/`, so this cannot collide.
const STAGING_PREFIX: &str = "staging";

/// Decrypting byte stream returned for reads.
pub type BlobStream = BoxStream<'static, Result<Bytes>>;

/// Wrapper around the configured object storage backend.
#[derive(Debug, Clone)]
pub struct BlobStorage {
    inner: Arc<dyn ObjectStore>,
    chunk_size: usize,
}

impl BlobStorage {
    /// Create a new storage backend from configuration.
    pub async fn new(config: &BlobStoreConfig, chunk_size: usize) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match config {
            BlobStoreConfig::Memory => Arc::new(InMemory::new()),

            BlobStoreConfig::Local { path } => {
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| DriveError::InvalidConfig(e.to_string()))?,
                )
            }

            BlobStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                Arc::new(
                    builder
                        .build()
                        .map_err(|e| DriveError::InvalidConfig(e.to_string()))?,
                )
            }
        };

        Ok(Self { inner, chunk_size })
    }

    /// Build the object path for a blob.
    fn blob_path(address: &BlobAddress) -> ObjectPath {
        ObjectPath::from(address.object_name())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Check if a blob exists.
    pub async fn exists(&self, address: &BlobAddress) -> Result<bool> {
        match self.inner.head(&Self::blob_path(address)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Pick the first free duplicate index for `content_hash`.
    ///
    /// Probes `{hash}`, `{hash}1`, `{hash}2`, ... in order. This is a plain
    /// probe: two callers racing on the same hash can pick the same index.
    /// Uploads go through [`BlobStorage::claim`] instead where the backend
    /// allows it.
    pub async fn allocate(&self, content_hash: &str) -> Result<BlobAddress> {
        let mut index = 0u32;
        loop {
            let candidate = BlobAddress::new(content_hash, index);
            if !self.exists(&candidate).await? {
                debug!(blob = %candidate, "allocated blob address");
                return Ok(candidate);
            }
            index = next_index(index, content_hash)?;
        }
    }

    /// Encrypt `source` into a staging object outside the addressable
    /// namespace. Pair with [`BlobStorage::claim`] or
    /// [`BlobStorage::discard`].
    pub async fn stage_encrypted<R>(&self, key: &UserKey, source: R) -> Result<StagedBlob>
    where
        R: AsyncRead + Unpin + Send,
    {
        let path = ObjectPath::from(format!("{}/{}", STAGING_PREFIX, Uuid::new_v4()));
        let size = self.write_at(&path, key, source).await?;
        debug!(staged = %path, size, "blob staged");
        Ok(StagedBlob { path, size })
    }

    /// Move a staged blob to the first free duplicate index of
    /// `content_hash`.
    ///
    /// Each candidate is claimed with an atomic create-if-absent rename, so
    /// two uploaders can never land on the same index. Backends without
    /// that primitive fall back to [`BlobStorage::allocate`] followed by a
    /// plain rename. The staged object is removed if no address is claimed.
    pub async fn claim(&self, staged: StagedBlob, content_hash: &str) -> Result<BlobAddress> {
        match self.claim_staged(&staged.path, content_hash).await {
            Ok(address) => {
                debug!(blob = %address, size = staged.size, "claimed blob address");
                Ok(address)
            }
            Err(e) => {
                self.discard(staged).await;
                Err(e)
            }
        }
    }

    async fn claim_staged(&self, from: &ObjectPath, content_hash: &str) -> Result<BlobAddress> {
        let mut index = 0u32;
        loop {
            let candidate = BlobAddress::new(content_hash, index);
            let to = Self::blob_path(&candidate);
            match self.inner.rename_if_not_exists(from, &to).await {
                Ok(()) => return Ok(candidate),
                Err(object_store::Error::AlreadyExists { .. }) => {}
                Err(object_store::Error::NotSupported { .. })
                | Err(object_store::Error::NotImplemented) => {
                    let address = self.allocate(content_hash).await?;
                    self.inner.rename(from, &Self::blob_path(&address)).await?;
                    return Ok(address);
                }
                Err(e) => return Err(e.into()),
            }
            index = next_index(index, content_hash)?;
        }
    }

    /// Remove a staged upload that will never be claimed.
    pub async fn discard(&self, staged: StagedBlob) {
        if let Err(e) = self.inner.delete(&staged.path).await {
            warn!(staged = %staged.path, error = %e, "failed to remove staged blob");
        }
    }

    async fn write_at<R>(&self, path: &ObjectPath, key: &UserKey, mut source: R) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let iv = generate_iv()?;
        let mut cipher = BlobCipher::new(key, &iv);

        let upload = self.inner.put_multipart(path).await?;
        let mut writer = WriteMultipart::new(upload);
        let mut buf = vec![0u8; self.chunk_size];
        let mut written = 0u64;

        let streamed = async {
            loop {
                let n = read_chunk(&mut source, &mut buf).await?;
                if n == 0 {
                    break;
                }
                cipher.apply(&mut buf[..n]);
                writer.wait_for_capacity(MAX_IN_FLIGHT_PARTS).await?;
                writer.write(&buf[..n]);
                written += n as u64;
                if n < buf.len() {
                    break;
                }
            }
            writer.write(&iv);
            Ok::<(), DriveError>(())
        }
        .await;

        match streamed {
            Ok(()) => {
                writer.finish().await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    warn!(path = %path, error = %abort_err, "failed to abort partial blob upload");
                }
                Err(e)
            }
        }
    }

    /// Open the blob at `address` as a decrypting stream.
    ///
    /// The IV is read from the last [`IV_SIZE`] bytes; plaintext is streamed
    /// from offset 0 in chunks clamped so the IV region is never emitted.
    /// Every range read is pinned to the object version seen when the stream
    /// was opened. If the blob is replaced mid-read, the stream fails with
    /// [`DriveError::CorruptBlob`] rather than decrypting the new bytes under
    /// the old IV.
    pub async fn read_decrypted(&self, address: &BlobAddress, key: &UserKey) -> Result<BlobStream> {
        let path = Self::blob_path(address);
        let meta = match self.inner.head(&path).await {
            Ok(meta) => meta,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(DriveError::MissingBlob(address.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let remaining = plaintext_len(meta.size).ok_or_else(|| DriveError::CorruptBlob {
            key: address.to_string(),
            reason: format!("{} bytes cannot hold a {}-byte iv", meta.size, IV_SIZE),
        })?;

        let version = PinnedVersion {
            e_tag: meta.e_tag.clone(),
            version: meta.version.clone(),
        };
        let iv_bytes = read_pinned(&self.inner, &path, address, &version, remaining..meta.size).await?;
        let iv: Iv = iv_bytes
            .as_ref()
            .try_into()
            .map_err(|_| DriveError::CorruptBlob {
                key: address.to_string(),
                reason: format!("short iv read of {} bytes", iv_bytes.len()),
            })?;

        debug!(blob = %address, size = remaining, "opening blob for read");

        let state = DecryptState {
            store: self.inner.clone(),
            path,
            address: address.clone(),
            version,
            offset: 0,
            remaining,
            chunk_size: self.chunk_size,
            cipher: BlobCipher::new(key, &iv),
        };
        Ok(stream::try_unfold(state, next_plaintext_chunk).boxed())
    }

    /// Remove staged uploads older than `older_than`.
    ///
    /// A crash between staging and claiming leaves the staged object behind;
    /// nothing references it. Returns how many objects were removed.
    pub async fn sweep_staging(&self, older_than: Duration) -> Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(older_than)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let prefix = ObjectPath::from(STAGING_PREFIX);

        let stale: Vec<ObjectPath> = self
            .inner
            .list(Some(&prefix))
            .try_filter_map(|meta| async move {
                Ok::<_, object_store::Error>(
                    (SystemTime::from(meta.last_modified) <= cutoff).then_some(meta.location),
                )
            })
            .try_collect()
            .await?;

        let mut removed = 0;
        for path in stale {
            match self.inner.delete(&path).await {
                Ok(()) => removed += 1,
                // Claimed or discarded since the listing
                Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if removed > 0 {
            debug!(removed, "swept stale staged blobs");
        }
        Ok(removed)
    }

    /// Delete a blob. Returns whether it existed.
    pub async fn delete(&self, address: &BlobAddress) -> Result<bool> {
        if !self.exists(address).await? {
            return Ok(false);
        }
        match self.inner.delete(&Self::blob_path(address)).await {
            Ok(()) => Ok(true),
            // Lost a race with another deleter
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn next_index(index: u32, content_hash: &str) -> Result<u32> {
    index.checked_add(1).ok_or_else(|| {
        DriveError::InvalidArgument(format!(
            "duplicate index space exhausted for {}",
            content_hash
        ))
    })
}

/// An encrypted upload parked under the staging prefix.
#[derive(Debug)]
pub struct StagedBlob {
    path: ObjectPath,
    size: u64,
}

impl StagedBlob {
    /// Plaintext bytes consumed while staging.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// The object version a read stream is bound to.
#[derive(Debug, Clone)]
struct PinnedVersion {
    e_tag: Option<String>,
    version: Option<String>,
}

struct DecryptState {
    store: Arc<dyn ObjectStore>,
    path: ObjectPath,
    address: BlobAddress,
    version: PinnedVersion,
    offset: usize,
    remaining: usize,
    chunk_size: usize,
    cipher: BlobCipher,
}

async fn next_plaintext_chunk(mut state: DecryptState) -> Result<Option<(Bytes, DecryptState)>> {
    if state.remaining == 0 {
        return Ok(None);
    }

    let len = state.chunk_size.min(state.remaining);
    let bytes = read_pinned(
        &state.store,
        &state.path,
        &state.address,
        &state.version,
        state.offset..state.offset + len,
    )
    .await?;
    if bytes.len() != len {
        return Err(DriveError::CorruptBlob {
            key: state.address.to_string(),
            reason: format!(
                "expected {} bytes at offset {}, got {}",
                len,
                state.offset,
                bytes.len()
            ),
        });
    }

    let mut chunk = bytes.to_vec();
    state.cipher.apply(&mut chunk);
    state.offset += len;
    state.remaining -= len;

    Ok(Some((Bytes::from(chunk), state)))
}

/// Ranged read that only succeeds against the pinned object version.
async fn read_pinned(
    store: &Arc<dyn ObjectStore>,
    path: &ObjectPath,
    address: &BlobAddress,
    pinned: &PinnedVersion,
    range: Range<usize>,
) -> Result<Bytes> {
    let options = GetOptions {
        if_match: pinned.e_tag.clone(),
        version: pinned.version.clone(),
        range: Some(range.into()),
        ..Default::default()
    };

    let fetched = match store.get_opts(path, options).await {
        Ok(result) => result.bytes().await,
        Err(e) => Err(e),
    };

    fetched.map_err(|e| match e {
        object_store::Error::NotFound { .. } => DriveError::MissingBlob(address.to_string()),
        object_store::Error::Precondition { .. } => DriveError::CorruptBlob {
            key: address.to_string(),
            reason: "blob was replaced while being read".to_string(),
        },
        e => e.into(),
    })
}

/// Fill `buf` from `source`, stopping early only at end of input.
async fn read_chunk<R>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
impl BlobStorage {
    /// Encrypt `source` straight to `address`, skipping the claim.
    pub async fn write_encrypted<R>(
        &self,
        address: &BlobAddress,
        key: &UserKey,
        source: R,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.write_at(&Self::blob_path(address), key, source).await
    }

    /// Create an in-memory storage backend (test-only).
    pub fn memory(chunk_size: usize) -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
            chunk_size,
        }
    }

    /// Raw stored bytes, ciphertext and iv included.
    pub async fn raw(&self, address: &BlobAddress) -> Result<Bytes> {
        let result = self.inner.get(&Self::blob_path(address)).await?;
        Ok(result.bytes().await?)
    }

    /// Store raw bytes without encryption.
    pub async fn put_raw(&self, address: &BlobAddress, data: Bytes) -> Result<()> {
        self.inner.put(&Self::blob_path(address), data.into()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    async fn roundtrip(storage: &BlobStorage, data: &[u8]) -> Vec<u8> {
        let key = UserKey::generate().unwrap();
        let address = storage.allocate("abc123").await.unwrap();
        let written = storage
            .write_encrypted(&address, &key, data)
            .await
            .unwrap();
        assert_eq!(written, data.len() as u64);

        let chunks: Vec<Bytes> = storage
            .read_decrypted(&address, &key)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_roundtrip_empty() {
        let storage = BlobStorage::memory(16);
        assert!(roundtrip(&storage, b"").await.is_empty());
    }

    #[tokio::test]
    async fn test_roundtrip_single_chunk() {
        let storage = BlobStorage::memory(64);
        let data = b"hello world";
        assert_eq!(roundtrip(&storage, data).await, data);
    }

    #[tokio::test]
    async fn test_roundtrip_many_chunks() {
        let storage = BlobStorage::memory(16);
        // 12.5 chunks: crosses more than ten chunk boundaries and ends mid-chunk
        let data: Vec<u8> = (0..200u32).map(|i| (i * 7 % 256) as u8).collect();
        assert_eq!(roundtrip(&storage, &data).await, data);
    }

    #[tokio::test]
    async fn test_layout_is_ciphertext_then_iv() {
        let storage = BlobStorage::memory(8);
        let key = UserKey::generate().unwrap();
        let address = BlobAddress::new("layout", 0);
        let data = b"exactly twenty bytes";

        storage
            .write_encrypted(&address, &key, &data[..])
            .await
            .unwrap();

        let raw = storage.raw(&address).await.unwrap();
        assert_eq!(raw.len(), data.len() + IV_SIZE);

        let (ciphertext, iv) = raw.split_at(data.len());
        assert_ne!(ciphertext, &data[..]);

        let iv: Iv = iv.try_into().unwrap();
        let mut plaintext = ciphertext.to_vec();
        BlobCipher::new(&key, &iv).apply(&mut plaintext);
        assert_eq!(plaintext, data);
    }

    #[tokio::test]
    async fn test_chunks_are_clamped_before_iv() {
        let storage = BlobStorage::memory(10);
        let key = UserKey::generate().unwrap();
        let address = BlobAddress::new("clamp", 0);
        let data = vec![42u8; 25];

        storage
            .write_encrypted(&address, &key, &data[..])
            .await
            .unwrap();

        let sizes: Vec<usize> = storage
            .read_decrypted(&address, &key)
            .await
            .unwrap()
            .map_ok(|chunk| chunk.len())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn test_wrong_key_yields_garbage() {
        let storage = BlobStorage::memory(32);
        let key = UserKey::generate().unwrap();
        let other = UserKey::generate().unwrap();
        let address = BlobAddress::new("wrongkey", 0);
        let data = b"secret contents of the file".to_vec();

        storage
            .write_encrypted(&address, &key, &data[..])
            .await
            .unwrap();

        let chunks: Vec<Bytes> = storage
            .read_decrypted(&address, &other)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let decrypted = chunks.concat();
        assert_eq!(decrypted.len(), data.len());
        assert_ne!(decrypted, data);
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let storage = BlobStorage::memory(16);
        let key = UserKey::generate().unwrap();
        let result = storage
            .read_decrypted(&BlobAddress::new("nope", 0), &key)
            .await;
        assert!(matches!(result, Err(DriveError::MissingBlob(_))));
    }

    #[tokio::test]
    async fn test_truncated_blob_is_corrupt() {
        let storage = BlobStorage::memory(16);
        let key = UserKey::generate().unwrap();
        let address = BlobAddress::new("short", 0);
        storage
            .put_raw(&address, Bytes::from_static(b"too short"))
            .await
            .unwrap();

        let result = storage.read_decrypted(&address, &key).await;
        assert!(matches!(result, Err(DriveError::CorruptBlob { .. })));
    }

    #[tokio::test]
    async fn test_allocate_probes_duplicate_indices() {
        let storage = BlobStorage::memory(16);

        let first = storage.allocate("feed").await.unwrap();
        assert_eq!(first.object_name(), "feed");
        storage.put_raw(&first, Bytes::from_static(b"x")).await.unwrap();

        let second = storage.allocate("feed").await.unwrap();
        assert_eq!(second.object_name(), "feed1");
        storage.put_raw(&second, Bytes::from_static(b"x")).await.unwrap();

        let third = storage.allocate("feed").await.unwrap();
        assert_eq!(third.duplicate_index(), 2);

        // A hole is reused
        storage.delete(&first).await.unwrap();
        assert_eq!(storage.allocate("feed").await.unwrap().duplicate_index(), 0);
    }

    #[tokio::test]
    async fn test_claim_takes_first_free_index() {
        let storage = BlobStorage::memory(16);
        let key = UserKey::generate().unwrap();

        let first = storage.stage_encrypted(&key, &b"one"[..]).await.unwrap();
        assert_eq!(first.size(), 3);
        let first = storage.claim(first, "cafe").await.unwrap();
        assert_eq!(first.object_name(), "cafe");

        let second = storage.stage_encrypted(&key, &b"two"[..]).await.unwrap();
        let second = storage.claim(second, "cafe").await.unwrap();
        assert_eq!(second.object_name(), "cafe1");

        // The first claim is untouched by the second
        let chunks: Vec<Bytes> = storage
            .read_decrypted(&first, &key)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), b"one");
    }

    #[tokio::test]
    async fn test_concurrent_claims_get_distinct_indices() {
        let storage = BlobStorage::memory(16);
        let key = UserKey::generate().unwrap();

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let storage = storage.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let staged = storage.stage_encrypted(&key, &[i][..]).await.unwrap();
                storage.claim(staged, "race").await.unwrap()
            }));
        }

        let mut indices = Vec::new();
        for handle in handles {
            indices.push(handle.await.unwrap().duplicate_index());
        }
        indices.sort_unstable();
        assert_eq!(indices, (0..8).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_discard_removes_staged_object() {
        let storage = BlobStorage::memory(16);
        let key = UserKey::generate().unwrap();
        let staged = storage.stage_encrypted(&key, &b"tmp"[..]).await.unwrap();
        let path = staged.path.clone();

        storage.discard(staged).await;
        assert!(matches!(
            storage.inner.head(&path).await,
            Err(object_store::Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_replaced_blob_fails_open_stream() {
        let storage = BlobStorage::memory(16);
        let key = UserKey::generate().unwrap();

        let staged = storage.stage_encrypted(&key, &[b'A'; 48][..]).await.unwrap();
        let address = storage.claim(staged, "swap").await.unwrap();

        let mut stream = storage.read_decrypted(&address, &key).await.unwrap();
        let first = stream.try_next().await.unwrap().unwrap();
        assert_eq!(&first[..], &[b'A'; 16][..]);

        // Same hash, freed index: the new blob lands on the old address
        assert!(storage.delete(&address).await.unwrap());
        let staged = storage.stage_encrypted(&key, &[b'B'; 48][..]).await.unwrap();
        assert_eq!(storage.claim(staged, "swap").await.unwrap(), address);

        let rest: Result<Vec<Bytes>> = stream.try_collect().await;
        assert!(matches!(rest, Err(DriveError::CorruptBlob { .. })));
    }

    #[tokio::test]
    async fn test_sweep_staging_removes_only_stale_uploads() {
        let storage = BlobStorage::memory(16);
        let key = UserKey::generate().unwrap();

        let kept = storage.stage_encrypted(&key, &b"fresh"[..]).await.unwrap();
        let claimed = storage.stage_encrypted(&key, &b"done"[..]).await.unwrap();
        let address = storage.claim(claimed, "kept").await.unwrap();

        assert_eq!(
            storage.sweep_staging(Duration::from_secs(3600)).await.unwrap(),
            0
        );
        assert_eq!(storage.sweep_staging(Duration::ZERO).await.unwrap(), 1);

        assert!(matches!(
            storage.inner.head(&kept.path).await,
            Err(object_store::Error::NotFound { .. })
        ));
        // Claimed blobs live outside the staging prefix
        assert!(storage.exists(&address).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let storage = BlobStorage::memory(16);
        let address = BlobAddress::new("gone", 0);
        storage.put_raw(&address, Bytes::from_static(b"x")).await.unwrap();

        assert!(storage.delete(&address).await.unwrap());
        assert!(!storage.delete(&address).await.unwrap());
        assert!(!storage.exists(&address).await.unwrap());
    }

    #[tokio::test]
    async fn test_local_storage_is_flat() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = BlobStoreConfig::Local {
            path: temp_dir.path().to_path_buf(),
        };
        let storage = BlobStorage::new(&config, 16).await.unwrap();
        let key = UserKey::generate().unwrap();
        let address = BlobAddress::new("def456", 3);

        storage
            .write_encrypted(&address, &key, &b"test data"[..])
            .await
            .unwrap();

        let file_path = temp_dir.path().join("def4563");
        assert!(file_path.exists());
        assert_eq!(
            std::fs::metadata(&file_path).unwrap().len(),
            (9 + IV_SIZE) as u64
        );
    }
}
