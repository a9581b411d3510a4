use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex, Semaphore, mpsc, oneshot};
use tracing::{error, info};
use walkdir::WalkDir;

use crate::error::{EncoderError, EncoderResult};
use crate::infrastructure::storage::ObjectStore;

pub const UPLOAD_COMPLETED: &str = "Upload completed";

/// The single terminal signal of one upload run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed,
    /// Text of the first transfer that failed.
    Failed(String),
}

impl UploadOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            UploadOutcome::Completed => UPLOAD_COMPLETED,
            UploadOutcome::Failed(message) => message,
        }
    }
}

/// Uploads every regular file under `video_path` to `output_bucket`, keyed by
/// its path relative to `storage_root`.
pub struct VideoUpload {
    paths: Vec<PathBuf>,
    storage_root: PathBuf,
    output_bucket: String,
    store: Arc<dyn ObjectStore>,
    errors: Mutex<Vec<PathBuf>>,
}

impl VideoUpload {
    /// Collects the files to upload with one walk of `video_path`.
    pub async fn prepare(
        store: Arc<dyn ObjectStore>,
        storage_root: PathBuf,
        video_path: PathBuf,
        output_bucket: String,
    ) -> EncoderResult<Self> {
        let paths = tokio::task::spawn_blocking(move || load_paths(&video_path))
            .await
            .map_err(|e| EncoderError::transfer(format!("path walk aborted: {e}")))??;

        Ok(Self {
            paths,
            storage_root,
            output_bucket,
            store,
            errors: Mutex::new(Vec::new()),
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Paths whose transfer failed, including ones that finished after the
    /// terminal signal went out.
    pub async fn failed_paths(&self) -> Vec<PathBuf> {
        self.errors.lock().await.clone()
    }

    /// Runs one transfer per file with at most `max_concurrency` in flight
    /// and sends exactly one outcome on `done`.
    ///
    /// The first failure is sent as soon as it is seen. Transfers still in
    /// flight are left to finish; their results are only recorded.
    pub async fn process_upload(
        self: Arc<Self>,
        max_concurrency: usize,
        done: oneshot::Sender<UploadOutcome>,
    ) {
        let total = self.paths.len();
        let mut done = Some(done);

        let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
        let (report_tx, mut report_rx) =
            mpsc::channel::<(usize, EncoderResult<()>)>(max_concurrency.max(1));

        for index in 0..total {
            let upload = Arc::clone(&self);
            let permits = Arc::clone(&permits);
            let report_tx = report_tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                let result = upload.upload_object(&upload.paths[index]).await;
                let _ = report_tx.send((index, result)).await;
            });
        }
        drop(report_tx);

        let mut received = 0;
        while received < total {
            let Some((index, result)) = report_rx.recv().await else {
                break;
            };
            received += 1;

            if let Err(e) = result {
                let path = &self.paths[index];
                error!("Error during the upload of the file: {}. Error: {}", path.display(), e);
                self.errors.lock().await.push(path.clone());

                if let Some(done) = done.take() {
                    let message = match e {
                        EncoderError::Transfer(message) => message,
                        other => other.to_string(),
                    };
                    let _ = done.send(UploadOutcome::Failed(message));
                }
            }
        }

        if let Some(done) = done.take() {
            let outcome = if received == total {
                info!("⬆️ Uploaded {} files to {}", total, self.output_bucket);
                UploadOutcome::Completed
            } else {
                UploadOutcome::Failed(format!("only {received} of {total} uploads reported back"))
            };
            let _ = done.send(outcome);
        }
    }

    async fn upload_object(&self, path: &Path) -> EncoderResult<()> {
        let key = object_key(&self.storage_root, path)?;
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| EncoderError::transfer(format!("failed to read {}: {e}", path.display())))?;

        self.store
            .upload(&self.output_bucket, &key, Bytes::from(body))
            .await
    }
}

fn load_paths(root: &Path) -> EncoderResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| EncoderError::transfer(format!("failed to list outputs: {e}")))?;
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

fn object_key(storage_root: &Path, path: &Path) -> EncoderResult<String> {
    let relative = path.strip_prefix(storage_root).map_err(|_| {
        EncoderError::transfer(format!(
            "{} is outside {}",
            path.display(),
            storage_root.display()
        ))
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingStore {
        failing: HashSet<String>,
        uploaded: StdMutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn download(&self, _bucket: &str, key: &str) -> EncoderResult<Bytes> {
            Err(EncoderError::transfer(format!("unexpected download of {key}")))
        }

        async fn upload(&self, _bucket: &str, key: &str, _body: Bytes) -> EncoderResult<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(key) {
                return Err(EncoderError::transfer(format!("refused {key}")));
            }
            self.uploaded.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    fn write_tree(root: &Path, files: usize) -> PathBuf {
        let dir = root.join("video-1");
        std::fs::create_dir_all(dir.join("audio")).unwrap();
        for i in 0..files {
            let sub = if i % 2 == 0 { dir.clone() } else { dir.join("audio") };
            std::fs::write(sub.join(format!("seg-{i}.m4s")), b"data").unwrap();
        }
        dir
    }

    async fn run(
        store: Arc<RecordingStore>,
        root: &Path,
        dir: PathBuf,
        m: usize,
    ) -> (Arc<VideoUpload>, UploadOutcome) {
        let upload = Arc::new(
            VideoUpload::prepare(store, root.to_path_buf(), dir, "out".to_string())
                .await
                .unwrap(),
        );
        let (tx, rx) = oneshot::channel();
        tokio::spawn(Arc::clone(&upload).process_upload(m, tx));
        (upload, rx.await.unwrap())
    }

    #[tokio::test]
    async fn uploads_every_file_with_bounded_concurrency() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_tree(tmp.path(), 12);
        let store = Arc::new(RecordingStore::default());

        let (upload, outcome) = run(Arc::clone(&store), tmp.path(), dir, 3).await;

        assert_eq!(outcome, UploadOutcome::Completed);
        assert_eq!(outcome.as_str(), UPLOAD_COMPLETED);
        assert_eq!(upload.paths().len(), 12);
        assert_eq!(store.uploaded.lock().unwrap().len(), 12);
        assert!(store.peak.load(Ordering::SeqCst) <= 3);
        assert!(
            store
                .uploaded
                .lock()
                .unwrap()
                .iter()
                .all(|key| key.starts_with("video-1/"))
        );
    }

    #[tokio::test]
    async fn first_failure_is_the_terminal_signal() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_tree(tmp.path(), 6);
        let store = Arc::new(RecordingStore {
            failing: HashSet::from(["video-1/audio/seg-3.m4s".to_string()]),
            ..Default::default()
        });

        let (upload, outcome) = run(Arc::clone(&store), tmp.path(), dir, 2).await;

        assert_eq!(
            outcome,
            UploadOutcome::Failed("refused video-1/audio/seg-3.m4s".to_string())
        );

        // Siblings still drain after the signal.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.uploaded.lock().unwrap().len(), 5);
        assert_eq!(
            upload.failed_paths().await,
            vec![tmp.path().join("video-1/audio/seg-3.m4s")]
        );
    }

    #[tokio::test]
    async fn empty_tree_completes_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("empty");
        std::fs::create_dir_all(&dir).unwrap();

        let (_, outcome) = run(Arc::new(RecordingStore::default()), tmp.path(), dir, 4).await;
        assert_eq!(outcome, UploadOutcome::Completed);
    }

    #[tokio::test]
    async fn missing_tree_fails_to_prepare() {
        let tmp = tempfile::tempdir().unwrap();
        let result = VideoUpload::prepare(
            Arc::new(RecordingStore::default()),
            tmp.path().to_path_buf(),
            tmp.path().join("nope"),
            "out".to_string(),
        )
        .await;
        assert!(matches!(result, Err(EncoderError::Transfer(_))));
    }

    #[test]
    fn keys_are_relative_to_the_storage_root() {
        let key = object_key(Path::new("/tmp"), Path::new("/tmp/abc/video/seg.m4s")).unwrap();
        assert_eq!(key, "abc/video/seg.m4s");
        assert!(object_key(Path::new("/tmp"), Path::new("/var/x")).is_err());
    }
}
