//! HTTP-level tests for upload, progress feed, job status and static output.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use futures_util::StreamExt;
use hls_vault::config::settings::AppConfig;
use hls_vault::infrastructure::transcoder::{
    EventSink, FfmpegTranscoder, TranscodeError, TranscodeEvent, Transcoder,
};
use hls_vault::modules::encryption::model::EncryptionJob;
use hls_vault::{AppState, create_app};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

const BOUNDARY: &str = "hls-vault-test-boundary";

/// Stand-in for ffmpeg: reports a start and two ticks, then writes a
/// playlist and one segment, or fails like ffmpeg does on garbage input.
struct FakeTranscoder {
    fail: bool,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, job: &EncryptionJob, events: EventSink) -> Result<(), TranscodeError> {
        events(TranscodeEvent::Started {
            command: format!("ffmpeg -i {}", job.input.display()),
        });
        if self.fail {
            return Err(TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        for timemark in ["00:00:09.00", "00:00:18.00"] {
            events(TranscodeEvent::Progress {
                timemark: timemark.to_string(),
            });
        }

        let segment = job
            .segment_template
            .to_string_lossy()
            .replace("%03d", "000");
        tokio::fs::write(&segment, b"encrypted-ts").await?;
        tokio::fs::write(
            &job.playlist,
            "#EXTM3U\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXT-X-KEY:METHOD=AES-128,URI=\"/enc.key\"\n",
        )
        .await?;
        Ok(())
    }
}

struct TestApp {
    _dir: TempDir,
    state: AppState,
    router: Router,
}

impl TestApp {
    async fn build(transcoder: Arc<dyn Transcoder>, configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let key_file = dir.path().join("enc.key");
        std::fs::write(&key_file, [7u8; 16]).unwrap();

        let mut config = AppConfig {
            upload_dir: dir.path().join("uploads"),
            template_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates"),
            key_file,
            progress_poll: Duration::from_millis(5),
            ..AppConfig::default()
        };
        configure(&mut config);
        let state = AppState::new(config, transcoder);
        state.storage.ensure_layout().await.unwrap();
        let router = create_app(state.clone());

        Self {
            _dir: dir,
            state,
            router,
        }
    }

    async fn with_transcoder(transcoder: Arc<dyn Transcoder>) -> Self {
        Self::build(transcoder, |_| {}).await
    }

    async fn new() -> Self {
        Self::with_transcoder(Arc::new(FakeTranscoder { fail: false })).await
    }

    async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    fn encrypted_files(&self) -> Vec<String> {
        std::fs::read_dir(&self.state.storage.encrypted_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect()
    }
}

fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: video/mp4\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn upload_request(uri: &str, field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    multipart_request(uri, multipart_body(field, file_name, bytes))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Pulls `(id, data)` pairs out of a complete SSE body.
fn parse_events(body: &str) -> Vec<(u64, String)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut id = None;
            let mut data = None;
            let mut is_message = false;
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("id: ") {
                    id = value.parse().ok();
                } else if let Some(value) = line.strip_prefix("data: ") {
                    data = Some(value.to_string());
                } else if line == "event: message" {
                    is_message = true;
                }
            }
            match (id, data) {
                (Some(id), Some(data)) if is_message => Some((id, data)),
                _ => None,
            }
        })
        .collect()
}

#[tokio::test]
async fn test_upload_returns_fragment_and_keeps_original() {
    let app = TestApp::new().await;
    let video = b"\x00\x00\x00\x20ftypisom original bytes \xff\xfe";

    let response = app.send(upload_request("/video-upload", "video", "holiday.final.mp4", video)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let html = body_text(response).await;
    assert!(html.contains("/video/encrypted/holiday.m3u8"));
    assert!(!html.contains("@playlistName"));

    let stored = std::fs::read(app.state.storage.original_dir.join("holiday.final.mp4")).unwrap();
    assert_eq!(stored, video);

    let mut files = app.encrypted_files();
    files.sort();
    assert_eq!(files, vec!["holiday.final.mp4__segment000.ts", "holiday.m3u8"]);
}

#[tokio::test]
async fn test_failed_transcode_reports_text_with_success_status() {
    let app = TestApp::with_transcoder(Arc::new(FakeTranscoder { fail: true })).await;

    let response = app.send(upload_request("/video-upload", "video", "corrupt.mp4", b"garbage")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.starts_with("Failed to encrypt video: "));
    assert!(text.contains("Invalid data found when processing input"));

    assert_eq!(std::fs::read(app.state.storage.original_dir.join("corrupt.mp4")).unwrap(), b"garbage");
    assert!(app.encrypted_files().is_empty());
}

#[tokio::test]
async fn test_missing_ffmpeg_binary_is_reported_to_client() {
    let transcoder = FfmpegTranscoder::new("/nonexistent/bin/ffmpeg", None);
    let app = TestApp::with_transcoder(Arc::new(transcoder)).await;

    let response = app.send(upload_request("/video-upload", "video", "clip.mp4", b"bytes")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.starts_with("Failed to encrypt video: "));
    assert!(text.contains("/nonexistent/bin/ffmpeg"));
    assert!(app.state.storage.original_dir.join("clip.mp4").exists());
    assert!(app.encrypted_files().is_empty());
}

#[tokio::test]
async fn test_invalid_file_name_is_rejected_before_storing() {
    let app = TestApp::new().await;

    let response = app.send(upload_request("/video-upload", "video", ".mp4", b"bytes")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("Failed to encrypt video: invalid file name"));
    assert_eq!(std::fs::read_dir(&app.state.storage.original_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_without_video_field_is_bad_request() {
    let app = TestApp::new().await;

    let response = app.send(upload_request("/video-upload", "file", "clip.mp4", b"bytes")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_truncated_upload_is_bad_request() {
    let app = TestApp::new().await;
    let job = Uuid::new_v4();

    // Field data with no closing boundary.
    let mut body = multipart_body("video", "clip.mp4", b"partial video bytes");
    body.truncate(body.len() - format!("\r\n--{BOUNDARY}--\r\n").len());

    let response = app.send(multipart_request(&format!("/video-upload?job={job}"), body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "error");
    assert!(!body["message"].as_str().unwrap().starts_with("Failed to encrypt video"));

    assert!(!app.state.storage.original_dir.join("clip.mp4").exists());
    assert!(app.encrypted_files().is_empty());
}

#[tokio::test]
async fn test_upload_over_body_limit_is_rejected() {
    let app = TestApp::build(Arc::new(FakeTranscoder { fail: false }), |config| {
        config.max_upload_bytes = 1024;
    })
    .await;

    let response = app.send(upload_request("/video-upload", "video", "big.mp4", &[0u8; 4096])).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "error");
    assert!(app.encrypted_files().is_empty());
}

#[tokio::test]
async fn test_job_feed_reconnect_after_drain_closes() {
    let app = TestApp::new().await;
    let job = Uuid::new_v4();

    app.send(upload_request(&format!("/video-upload?job={job}"), "video", "clip.mp4", b"bytes"))
        .await;

    let response = app.send(get(&format!("/video-progress?job={job}"))).await;
    let body = tokio::time::timeout(Duration::from_secs(5), body_text(response))
        .await
        .expect("job feed should close once drained");
    assert_eq!(parse_events(&body).len(), 4);

    // EventSource reconnects by itself once the server closes the stream.
    let response = app.send(get(&format!("/video-progress?job={job}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = tokio::time::timeout(Duration::from_secs(2), body_text(response))
        .await
        .expect("reconnect to a finished job should close");
    assert!(parse_events(&body).is_empty());
    assert!(!app.state.progress.has_feed(job));
}

#[tokio::test]
async fn test_job_feed_replays_lifecycle_then_closes() {
    let app = TestApp::new().await;
    let job = Uuid::new_v4();

    let response = app
        .send(upload_request(&format!("/video-upload?job={job}"), "video", "clip.mp4", b"bytes"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get(&format!("/video-progress?job={job}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

    let body = tokio::time::timeout(Duration::from_secs(5), body_text(response))
        .await
        .expect("job feed should close once drained");
    let events = parse_events(&body);

    let data: Vec<&str> = events.iter().map(|(_, data)| data.as_str()).collect();
    assert_eq!(data.len(), 4);
    assert!(data[0].starts_with("Started ffmpeg with command: ffmpeg -i "));
    assert_eq!(data[1], "Processing: 00:00:09.00");
    assert_eq!(data[2], "Processing: 00:00:18.00");
    assert_eq!(data[3], "Finished processing video");

    let ids: Vec<u64> = events.iter().map(|(id, _)| *id).collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "ids: {:?}", ids);
}

#[tokio::test]
async fn test_shared_feed_stays_silent_when_idle() {
    let app = TestApp::new().await;

    let response = app.send(get("/video-progress")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut frames = response.into_body().into_data_stream();
    let next = tokio::time::timeout(Duration::from_millis(300), frames.next()).await;
    assert!(next.is_err(), "idle feed produced {:?}", next);
}

#[tokio::test]
async fn test_shared_feed_ids_continue_across_connections() {
    let app = TestApp::new().await;
    app.send(upload_request("/video-upload", "video", "one.mp4", b"1")).await;

    // Two shared-feed clients split the messages between them; ids keep rising.
    let mut ids = Vec::new();
    for _ in 0..2 {
        let response = app.send(get("/video-progress")).await;
        let mut frames = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .expect("shared feed should have messages")
            .unwrap()
            .unwrap();
        let events = parse_events(&String::from_utf8(frame.to_vec()).unwrap());
        ids.extend(events.into_iter().map(|(id, _)| id));
    }

    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1]);
}

#[tokio::test]
async fn test_job_status_tracks_lifecycle() {
    let app = TestApp::new().await;
    let job = Uuid::new_v4();

    app.send(upload_request(&format!("/video-upload?job={job}"), "video", "clip.mp4", b"bytes"))
        .await;

    let response = app.send(get(&format!("/video-jobs/{job}"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["data"]["id"], job.to_string());
    assert_eq!(body["data"]["file_name"], "clip.mp4");
    assert_eq!(body["data"]["state"]["status"], "completed");
    assert_eq!(body["data"]["state"]["playlist"], "clip.m3u8");
    assert!(body["data"]["finished_at"].is_string());

    let response = app.send(get(&format!("/video-jobs/{}", Uuid::new_v4()))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reused_job_id_conflicts() {
    let app = TestApp::new().await;
    let job = Uuid::new_v4();
    let uri = format!("/video-upload?job={job}");

    app.send(upload_request(&uri, "video", "clip.mp4", b"bytes")).await;
    let response = app.send(upload_request(&uri, "video", "clip.mp4", b"bytes")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_static_output_and_key_are_served() {
    let app = TestApp::new().await;
    app.send(upload_request("/video-upload", "video", "clip.mp4", b"bytes")).await;

    let response = app.send(get("/video/encrypted/clip.m3u8")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("#EXTM3U"));

    let response = app.send(get("/video/original/clip.mp4")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get("/enc.key")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let key = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(key.as_ref(), &[7u8; 16]);
}

#[tokio::test]
async fn test_entry_page_and_health() {
    let app = TestApp::new().await;

    let response = app.send(get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("/video-progress?job="));
    assert!(page.contains("/video-upload?job="));

    let response = app.send(get("/health")).await;
    assert_eq!(body_text(response).await, "ok");
}
