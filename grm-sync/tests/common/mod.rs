//! In-process fake of the GitHub releases API plus a file host.
//!
//! Routes:
//! - `GET /repos/:owner/:repo/releases`: JSON array registered via [`FakeGithub::add_release`]
//! - `GET /files/*path`: asset bodies; counts hits and concurrent in-flight requests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use grm_core::RepositoryRef;
use grm_sync::{Mirror, SyncLimits, SyncSettings};

#[derive(Default)]
pub struct ServerState {
    releases: Mutex<HashMap<String, Vec<Value>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    failures: Mutex<HashMap<String, usize>>,
    file_delay: Mutex<Duration>,
    api_hits: AtomicUsize,
    file_hits: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub struct FakeGithub {
    pub base: String,
    state: Arc<ServerState>,
}

impl FakeGithub {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new()
            .route("/repos/:owner/:repo/releases", get(releases))
            .route("/files/*path", get(file))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake github");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake github");
        });
        Self {
            base: format!("http://{addr}"),
            state,
        }
    }

    /// Append a release to `repo`'s listing. Call newest first.
    pub fn add_release(&self, repo: &str, tag: &str, assets: &[(&str, &str)]) {
        self.push_release(repo, tag, assets, false);
    }

    /// Like [`add_release`](Self::add_release), with zipball and tarball URLs.
    pub fn add_release_with_sources(&self, repo: &str, tag: &str, assets: &[(&str, &str)]) {
        self.push_release(repo, tag, assets, true);
    }

    fn push_release(&self, repo: &str, tag: &str, assets: &[(&str, &str)], sources: bool) {
        let mut asset_json = Vec::new();
        for (name, body) in assets {
            let path = format!("{repo}/{tag}/{name}");
            self.put_file(&path, body.as_bytes());
            asset_json.push(json!({
                "name": name,
                "size": body.len(),
                "browser_download_url": self.file_url(&path),
            }));
        }
        let mut release = json!({
            "tag_name": tag,
            "name": format!("Release {tag}"),
            "assets": asset_json,
        });
        if sources {
            let zip = format!("{repo}/{tag}/source.zip");
            let tar = format!("{repo}/{tag}/source.tar.gz");
            self.put_file(&zip, format!("zip of {tag}").as_bytes());
            self.put_file(&tar, format!("tar of {tag}").as_bytes());
            release["zipball_url"] = json!(self.file_url(&zip));
            release["tarball_url"] = json!(self.file_url(&tar));
        }
        self.state
            .releases
            .lock()
            .unwrap()
            .entry(repo.to_owned())
            .or_default()
            .push(release);
    }

    /// Register a release whose only asset URL is not served (404).
    pub fn add_release_with_missing_asset(&self, repo: &str, tag: &str, present: (&str, &str), missing: &str) {
        self.add_release(repo, tag, &[present]);
        let url = self.file_url(&format!("{repo}/{tag}/{missing}"));
        let mut releases = self.state.releases.lock().unwrap();
        let release = releases
            .get_mut(repo)
            .and_then(|list| list.last_mut())
            .expect("release just added");
        release["assets"]
            .as_array_mut()
            .expect("assets array")
            .push(json!({"name": missing, "browser_download_url": url}));
    }

    pub fn put_file(&self, path: &str, body: &[u8]) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(path.to_owned(), body.to_vec());
    }

    /// Answer the next `times` requests for `path` with 503.
    pub fn fail_file(&self, path: &str, times: usize) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(path.to_owned(), times);
    }

    pub fn set_file_delay(&self, delay: Duration) {
        *self.state.file_delay.lock().unwrap() = delay;
    }

    pub fn file_url(&self, path: &str) -> String {
        format!("{}/files/{path}", self.base)
    }

    pub fn api_hits(&self) -> usize {
        self.state.api_hits.load(Ordering::SeqCst)
    }

    pub fn file_hits(&self) -> usize {
        self.state.file_hits.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn settings(&self, base_dir: &FsPath, repos: &[&str], max_versions: usize) -> SyncSettings {
        SyncSettings {
            repositories: repos
                .iter()
                .map(|r| {
                    let (owner, name) = r.split_once('/').expect("owner/name");
                    RepositoryRef::new(owner, name)
                })
                .collect(),
            base_dir: base_dir.to_path_buf(),
            max_versions,
            proxy_prefix: String::new(),
            api_base: self.base.clone(),
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
            limits: SyncLimits::default(),
        }
    }

    pub fn mirror(&self, base_dir: &FsPath, repos: &[&str], max_versions: usize) -> Mirror {
        Mirror::new(self.settings(base_dir, repos, max_versions)).expect("mirror")
    }
}

async fn releases(
    State(state): State<Arc<ServerState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Response {
    state.api_hits.fetch_add(1, Ordering::SeqCst);
    let listing = state
        .releases
        .lock()
        .unwrap()
        .get(&format!("{owner}/{repo}"))
        .cloned();
    match listing {
        Some(list) => Json(Value::Array(list)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response(),
    }
}

async fn file(State(state): State<Arc<ServerState>>, Path(path): Path<String>) -> Response {
    state.file_hits.fetch_add(1, Ordering::SeqCst);
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let delay = *state.file_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let fail = {
        let mut failures = state.failures.lock().unwrap();
        match failures.get_mut(&path) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    };
    let body = state.files.lock().unwrap().get(&path).cloned();

    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    match (fail, body) {
        (true, _) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        (false, Some(body)) => (StatusCode::OK, body).into_response(),
        (false, None) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Names of the entries directly inside `dir`, sorted.
pub fn dir_listing(dir: &FsPath) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
