//! On-disk lifecycle of uploaded photos.
//!
//! Uploads land in the inbox directory, are mirrored to a to-process
//! directory for the external image classifier, and move on acceptance
//! into the published per-country photo tree (keeping a copy in done/)
//! or on rejection into rejected/. The done/rejected copies are reaped
//! by an age-based cleanup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::models::{InboxEntry, Station};
use crate::ports::{PhotoStoragePort, StorageError};

/// Upload size cap, enforced while streaming.
pub const MAX_UPLOAD_SIZE: u64 = 20_000_000;

const KEEP_FILE_COPIES_IN_DAYS_DEFAULT: u32 = 60;

/// The working directory tree for photo files.
#[derive(Debug, Clone)]
pub struct WorkDir {
    pub photos_dir: PathBuf,
    pub inbox_dir: PathBuf,
    pub inbox_processed_dir: PathBuf,
    pub inbox_to_process_dir: PathBuf,
    pub inbox_done_dir: PathBuf,
    pub inbox_rejected_dir: PathBuf,
    pub keep_file_copies_in_days: u32,
}

impl WorkDir {
    /// Create the directory layout under `root`, building any missing parts.
    pub fn create(root: &Path, keep_file_copies_in_days: Option<u32>) -> std::io::Result<Self> {
        let photos_dir = root.join("photos");
        let inbox_dir = root.join("inbox");
        let inbox_processed_dir = inbox_dir.join("processed");
        let inbox_to_process_dir = inbox_dir.join("toprocess");
        let inbox_done_dir = inbox_dir.join("done");
        let inbox_rejected_dir = inbox_dir.join("rejected");
        std::fs::create_dir_all(&photos_dir)?;
        std::fs::create_dir_all(&inbox_processed_dir)?;
        std::fs::create_dir_all(&inbox_to_process_dir)?;
        std::fs::create_dir_all(&inbox_done_dir)?;
        std::fs::create_dir_all(&inbox_rejected_dir)?;
        Ok(Self {
            photos_dir,
            inbox_dir,
            inbox_processed_dir,
            inbox_to_process_dir,
            inbox_done_dir,
            inbox_rejected_dir,
            keep_file_copies_in_days: keep_file_copies_in_days
                .unwrap_or(KEEP_FILE_COPIES_IN_DAYS_DEFAULT),
        })
    }
}

/// Replace characters unsafe for a filesystem path with underscores.
/// Applied to every externally supplied filename component.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            ' ' | '/' | ':' | '"' | '|' | '*' | '?' | '<' | '>' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// Filesystem implementation of [`PhotoStoragePort`].
pub struct PhotoFileStorage {
    work_dir: WorkDir,
    clock: Arc<dyn Clock>,
}

impl PhotoFileStorage {
    pub fn new(work_dir: WorkDir, clock: Arc<dyn Clock>) -> Self {
        Self { work_dir, clock }
    }

    /// First free published filename for the station, `<id>_1..99.<ext>`.
    async fn get_destination_file(
        &self,
        destination_dir: &Path,
        station_id: &str,
        extension: &str,
    ) -> std::io::Result<PathBuf> {
        for sequence in 1..=99 {
            let destination_file = destination_dir
                .join(sanitize_filename(&format!("{station_id}_{sequence}.{extension}")));
            if !fs::try_exists(&destination_file).await? {
                return Ok(destination_file);
            }
        }
        Err(std::io::Error::other(format!(
            "number of photos per station {}/{station_id} exceeded",
            destination_dir.display()
        )))
    }

    async fn cleanup_old_copies_from(&self, dir: &Path, max_age: std::time::SystemTime) {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("failed to list {} for cleanup: {err}", dir.display());
                return;
            }
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!("failed to read dir entry in {}: {err}", dir.display());
                    break;
                }
            };
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("unable to stat {}: {err}", path.display());
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(err) => {
                    warn!("unable to get mtime of {}: {err}", path.display());
                    continue;
                }
            };
            if modified < max_age {
                match fs::remove_file(&path).await {
                    Ok(()) => info!("deleted old copy {}", path.display()),
                    Err(err) => warn!("unable to delete {}: {err}", path.display()),
                }
            }
        }
    }
}

#[async_trait]
impl PhotoStoragePort for PhotoFileStorage {
    async fn is_processed(&self, filename: &str) -> bool {
        fs::try_exists(self.get_inbox_processed_file(filename))
            .await
            .unwrap_or(false)
    }

    async fn import_photo(
        &self,
        entry: &InboxEntry,
        station: &Station,
    ) -> std::io::Result<String> {
        let filename = entry
            .filename()
            .ok_or_else(|| std::io::Error::other("inbox entry carries no photo file"))?;
        let extension = entry.extension.as_deref().unwrap_or_default();
        let uploaded_file = self.get_upload_file(&filename);
        let processed_file = self.work_dir.inbox_processed_dir.join(&filename);

        let destination_dir = self
            .work_dir
            .photos_dir
            .join(sanitize_filename(&station.key.country));
        fs::create_dir_all(&destination_dir).await?;
        let destination_file = self
            .get_destination_file(&destination_dir, &station.key.id, extension)
            .await?;

        // The classifier-processed copy wins over the raw upload.
        if fs::try_exists(&processed_file).await? {
            fs::rename(&processed_file, &destination_file).await?;
        } else {
            fs::copy(&uploaded_file, &destination_file).await?;
        }

        // The published copy exists now; failing to archive the original
        // must not fail the import.
        let done_file = self.work_dir.inbox_done_dir.join(&filename);
        if let Err(err) = fs::rename(&uploaded_file, &done_file).await {
            warn!(
                "couldn't move original file {} to done dir: {err}",
                uploaded_file.display()
            );
        }

        Ok(format!(
            "/{}/{}",
            sanitize_filename(&station.key.country),
            destination_file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        ))
    }

    async fn reject(&self, entry: &InboxEntry) -> std::io::Result<()> {
        let Some(filename) = entry.filename() else {
            return Ok(());
        };
        let file = self.get_upload_file(&filename);
        fs::rename(&file, self.work_dir.inbox_rejected_dir.join(&filename)).await?;
        for copy in [
            self.work_dir.inbox_to_process_dir.join(&filename),
            self.work_dir.inbox_processed_dir.join(&filename),
        ] {
            if let Err(err) = fs::remove_file(&copy).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn store_upload(
        &self,
        body: &mut (dyn AsyncRead + Send + Unpin),
        filename: &str,
    ) -> Result<u32, StorageError> {
        let file = self.get_upload_file(filename);
        info!("writing photo to {}", file.display());

        // Stream to disk while hashing, so the size cap never needs the
        // whole upload in memory.
        let mut out = fs::File::create(&file).await?;
        let mut hasher = crc32fast::Hasher::new();
        let mut written: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = body.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            if written + n as u64 >= MAX_UPLOAD_SIZE {
                drop(out);
                fs::remove_file(&file).await.ok();
                return Err(StorageError::PhotoTooLarge {
                    max_size: MAX_UPLOAD_SIZE,
                });
            }
            hasher.update(&buf[..n]);
            out.write_all(&buf[..n]).await?;
            written += n as u64;
        }
        out.flush().await?;
        drop(out);

        // Mirror the upload for the external classifier. Best effort.
        let to_process = self
            .work_dir
            .inbox_to_process_dir
            .join(file.file_name().map(|name| name.to_os_string()).unwrap_or_default());
        if let Err(err) = fs::copy(&file, &to_process).await {
            warn!(
                "unable to mirror {} to the to-process dir: {err}",
                file.display()
            );
        }

        Ok(hasher.finalize())
    }

    fn get_upload_file(&self, filename: &str) -> PathBuf {
        self.work_dir.inbox_dir.join(sanitize_filename(filename))
    }

    fn get_photo_file(&self, country_code: &str, filename: &str) -> PathBuf {
        self.work_dir
            .photos_dir
            .join(sanitize_filename(country_code))
            .join(sanitize_filename(filename))
    }

    fn get_inbox_file(&self, filename: &str) -> PathBuf {
        self.work_dir.inbox_dir.join(sanitize_filename(filename))
    }

    fn get_inbox_processed_file(&self, filename: &str) -> PathBuf {
        self.work_dir
            .inbox_processed_dir
            .join(sanitize_filename(filename))
    }

    fn get_inbox_to_process_file(&self, filename: &str) -> PathBuf {
        self.work_dir
            .inbox_to_process_dir
            .join(sanitize_filename(filename))
    }

    fn get_inbox_done_file(&self, filename: &str) -> PathBuf {
        self.work_dir
            .inbox_done_dir
            .join(sanitize_filename(filename))
    }

    fn get_inbox_rejected_file(&self, filename: &str) -> PathBuf {
        self.work_dir
            .inbox_rejected_dir
            .join(sanitize_filename(filename))
    }

    async fn cleanup_old_copies(&self) {
        let max_age: std::time::SystemTime = (self.clock.now()
            - Duration::days(i64::from(self.work_dir.keep_file_copies_in_days)))
        .into();
        let done_dir = self.work_dir.inbox_done_dir.clone();
        let rejected_dir = self.work_dir.inbox_rejected_dir.clone();
        self.cleanup_old_copies_from(&done_dir, max_age).await;
        self.cleanup_old_copies_from(&rejected_dir, max_age).await;
    }
}
