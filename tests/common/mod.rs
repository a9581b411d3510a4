//! In-memory stand-ins for the encoder's ports.
//!
//! Every fake appends to a shared event log so tests can check the order in
//! which statuses were persisted and side effects ran.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use uuid::Uuid;

use encoder::config::settings::PipelineSettings;
use encoder::error::{EncoderError, EncoderResult};
use encoder::infrastructure::queue::{Delivery, DeliveryHandle, Notifier};
use encoder::infrastructure::storage::ObjectStore;
use encoder::infrastructure::tools::TranscodeTool;
use encoder::modules::job::model::{Job, JobStatus};
use encoder::modules::job::repository::JobRepository;
use encoder::modules::video::model::Video;
use encoder::modules::video::repository::VideoRepository;
use encoder::state::AppState;
use encoder::workers::manager::Disposition;

pub const INPUT_BUCKET: &str = "in";
pub const OUTPUT_BUCKET: &str = "out";

pub type EventLog = Arc<Mutex<Vec<String>>>;

fn record(events: &EventLog, event: impl Into<String>) {
    events.lock().unwrap().push(event.into());
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

pub struct MemoryVideoRepository {
    pub videos: Mutex<HashMap<Uuid, Video>>,
    pub fail_insert: bool,
    events: EventLog,
}

#[async_trait]
impl VideoRepository for MemoryVideoRepository {
    async fn insert(&self, video: &Video) -> EncoderResult<Uuid> {
        if self.fail_insert {
            return Err(EncoderError::Persistence("videos table is read-only".into()));
        }
        record(&self.events, "video:insert");
        self.videos.lock().unwrap().insert(video.id, video.clone());
        Ok(video.id)
    }

    async fn update(&self, video: &Video) -> EncoderResult<Video> {
        let mut videos = self.videos.lock().unwrap();
        match videos.get_mut(&video.id) {
            Some(stored) => {
                *stored = video.clone();
                Ok(video.clone())
            }
            None => Err(EncoderError::NotFound(format!("video {}", video.id))),
        }
    }

    async fn find(&self, id: Uuid) -> EncoderResult<Video> {
        self.videos
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| EncoderError::NotFound(format!("video {id}")))
    }
}

pub struct MemoryJobRepository {
    pub jobs: Mutex<HashMap<Uuid, Job>>,
    pub fail_insert: bool,
    /// Updates that would persist this status fail.
    pub fail_on: Option<JobStatus>,
    events: EventLog,
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn insert(&self, job: &Job) -> EncoderResult<Uuid> {
        if self.fail_insert {
            return Err(EncoderError::Persistence("jobs table is read-only".into()));
        }
        record(&self.events, format!("job:insert:{}", job.status));
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(job.id)
    }

    async fn update(&self, job: &Job) -> EncoderResult<Job> {
        if self.fail_on == Some(job.status) {
            return Err(EncoderError::Persistence("database unavailable".into()));
        }
        record(&self.events, format!("status:{}", job.status));

        let mut updated = job.clone();
        updated.updated_at = time::OffsetDateTime::now_utc();
        self.jobs.lock().unwrap().insert(job.id, updated.clone());
        Ok(updated)
    }

    async fn find(&self, id: Uuid) -> EncoderResult<Job> {
        self.jobs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| EncoderError::NotFound(format!("job {id}")))
    }
}

// ---------------------------------------------------------------------------
// Object store and tools
// ---------------------------------------------------------------------------

pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub uploads: Mutex<Vec<String>>,
    /// Uploads whose key ends with this suffix fail.
    pub fail_upload_suffix: Option<String>,
    events: EventLog,
}

impl MemoryStore {
    pub fn put(&self, bucket: &str, key: &str, body: &'static [u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{key}"), Bytes::from_static(body));
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, bucket: &str, key: &str) -> EncoderResult<Bytes> {
        record(&self.events, format!("download:{key}"));
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{key}"))
            .cloned()
            .ok_or_else(|| EncoderError::transfer(format!("object {bucket}/{key} doesn't exist")))
    }

    async fn upload(&self, bucket: &str, key: &str, _body: Bytes) -> EncoderResult<()> {
        record(&self.events, format!("upload:{key}"));
        if let Some(suffix) = &self.fail_upload_suffix {
            if key.ends_with(suffix.as_str()) {
                return Err(EncoderError::transfer(format!("{bucket} refused {key}")));
            }
        }
        self.uploads.lock().unwrap().push(format!("{bucket}/{key}"));
        Ok(())
    }
}

/// Mimics mp4fragment/mp4dash by writing the files they would produce.
pub struct FakeTool {
    pub fail: Option<&'static str>,
    /// Skip writing the fragment file so cleanup has something to trip on.
    pub skip_fragment_output: bool,
    events: EventLog,
}

#[async_trait]
impl TranscodeTool for FakeTool {
    async fn invoke(&self, name: &str, args: &[String]) -> EncoderResult<String> {
        record(&self.events, format!("tool:{name}"));
        if self.fail == Some(name) {
            return Err(EncoderError::tool(format!("{name} exited with exit status: 1")));
        }

        match name {
            "mp4fragment" if !self.skip_fragment_output => {
                std::fs::write(&args[1], b"fragment").map_err(|e| EncoderError::tool(e.to_string()))?;
            }
            "mp4dash" => {
                let out = Path::new(&args[3]);
                std::fs::create_dir_all(out.join("video")).map_err(|e| EncoderError::tool(e.to_string()))?;
                std::fs::write(out.join("stream.mpd"), b"<MPD/>").map_err(|e| EncoderError::tool(e.to_string()))?;
                std::fs::write(out.join("video").join("seg-1.m4s"), b"segment")
                    .map_err(|e| EncoderError::tool(e.to_string()))?;
            }
            _ => {}
        }
        Ok(format!("{name} done"))
    }
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Ledger {
    pub settled: Mutex<Vec<(String, Disposition)>>,
}

impl Ledger {
    pub fn dispositions(&self) -> Vec<(String, Disposition)> {
        self.settled.lock().unwrap().clone()
    }
}

pub struct FakeDelivery {
    body: Vec<u8>,
    id: String,
    ledger: Arc<Ledger>,
}

impl FakeDelivery {
    pub fn handle(id: impl Into<String>, body: impl Into<Vec<u8>>, ledger: &Arc<Ledger>) -> DeliveryHandle {
        Box::new(Self {
            body: body.into(),
            id: id.into(),
            ledger: Arc::clone(ledger),
        })
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    fn body(&self) -> &[u8] {
        &self.body
    }

    fn message_id(&self) -> Option<&str> {
        Some(&self.id)
    }

    async fn ack(self: Box<Self>) -> EncoderResult<()> {
        self.ledger.settled.lock().unwrap().push((self.id.clone(), Disposition::Ack));
        Ok(())
    }

    async fn reject(self: Box<Self>) -> EncoderResult<()> {
        self.ledger.settled.lock().unwrap().push((self.id.clone(), Disposition::Reject));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub published: Mutex<Vec<serde_json::Value>>,
    pub fail: bool,
}

impl FakeNotifier {
    pub fn published(&self) -> Vec<serde_json::Value> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, payload: &[u8]) -> EncoderResult<()> {
        if self.fail {
            return Err(EncoderError::Notify("exchange not found".into()));
        }
        let value = serde_json::from_slice(payload).map_err(|e| EncoderError::Notify(e.to_string()))?;
        self.published.lock().unwrap().push(value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct HarnessOptions {
    pub workers: usize,
    pub fail_video_insert: bool,
    pub fail_job_insert: bool,
    pub fail_status: Option<JobStatus>,
    pub fail_tool: Option<&'static str>,
    pub skip_fragment_output: bool,
    pub fail_upload_suffix: Option<String>,
    pub fail_notify: bool,
}

pub struct TestHarness {
    pub tmp: TempDir,
    pub state: AppState,
    pub videos: Arc<MemoryVideoRepository>,
    pub jobs: Arc<MemoryJobRepository>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<FakeNotifier>,
    pub ledger: Arc<Ledger>,
    pub events: EventLog,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(HarnessOptions::default())
    }

    pub fn with(options: HarnessOptions) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let events: EventLog = Arc::default();

        let videos = Arc::new(MemoryVideoRepository {
            videos: Mutex::default(),
            fail_insert: options.fail_video_insert,
            events: Arc::clone(&events),
        });
        let jobs = Arc::new(MemoryJobRepository {
            jobs: Mutex::default(),
            fail_insert: options.fail_job_insert,
            fail_on: options.fail_status,
            events: Arc::clone(&events),
        });
        let store = Arc::new(MemoryStore {
            objects: Mutex::default(),
            uploads: Mutex::default(),
            fail_upload_suffix: options.fail_upload_suffix,
            events: Arc::clone(&events),
        });
        store.put(INPUT_BUCKET, "clip.mp4", b"source video");

        let tool = Arc::new(FakeTool {
            fail: options.fail_tool,
            skip_fragment_output: options.skip_fragment_output,
            events: Arc::clone(&events),
        });

        let settings = PipelineSettings {
            input_bucket: INPUT_BUCKET.to_string(),
            output_bucket: OUTPUT_BUCKET.to_string(),
            local_storage_path: tmp.path().to_path_buf(),
            max_conversion_concurrency: options.workers.max(1),
            max_upload_concurrency: 4,
        };

        let state = AppState::new(
            settings,
            videos.clone(),
            jobs.clone(),
            store.clone(),
            tool,
        );

        Self {
            tmp,
            state,
            videos,
            jobs,
            store,
            notifier: Arc::new(FakeNotifier {
                published: Mutex::default(),
                fail: options.fail_notify,
            }),
            ledger: Arc::default(),
            events,
        }
    }

    pub fn delivery(&self, id: &str, body: &str) -> DeliveryHandle {
        FakeDelivery::handle(id, body.as_bytes().to_vec(), &self.ledger)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn storage_root(&self) -> PathBuf {
        self.tmp.path().to_path_buf()
    }

    pub fn stored_job(&self, id: Uuid) -> Job {
        self.jobs.jobs.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.jobs.lock().unwrap().len()
    }

    pub fn video_count(&self) -> usize {
        self.videos.videos.lock().unwrap().len()
    }
}
