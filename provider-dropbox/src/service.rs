//! Dropbox directory browser
//!
//! [`DropboxService`] owns the stored credentials, lists remote directories,
//! resolves streaming URLs and drives recursive scans.
//!
//! ## Scanning
//!
//! A scan is a queue of tasks driven by `FuturesUnordered`:
//!
//! ```text
//! List(path) ──► directory ──► List(child)
//!            └─► playable  ──► FetchContent(entry) ──► ReadTags(descriptor)
//!            └─► other     ──► skipped
//! ```
//!
//! At most `max_concurrent_requests` tasks are in flight. A failed task is
//! logged, published as `LibraryEvent::ScanStepFailed` and recorded in the
//! [`ScanReport`]; the rest of the tree is still walked.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::tags::{TagData, TagReader};
use bridge_traits::url_handler::{UrlHandler, UrlHandlerRegistry};
use bytes::Bytes;
use core_runtime::config::CoreConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, LibraryEvent, ScanStage};
use core_runtime::logging::strip_path;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::authenticator::{AuthenticationResult, DropboxAuthenticator, RequestSigner};
use crate::config::DropboxConfig;
use crate::credentials::{CredentialStore, Credentials, SettingsCredentialStore};
use crate::error::{DropboxError, Result};
use crate::types::{ListingResponse, MediaResponse, MetadataEntry, StreamDescriptor};
use crate::url_handler::{remote_path_from_url, song_url_for_path, DropboxUrlHandler};

/// Provider name used in events
pub const PROVIDER_NAME: &str = "Dropbox";

/// Longest error body kept in an `ApiError`
const MAX_ERROR_BODY: usize = 512;

/// What `connect()` did.
#[derive(Debug)]
pub enum ConnectOutcome {
    /// No stored credentials; `AuthEvent::AuthenticationRequired` was published
    AuthenticationRequired,
    /// Credentials were present and a root scan ran
    Scanned(ScanReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub path: String,
    pub stage: ScanStage,
    pub message: String,
}

/// A playable file found during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredTrack {
    /// `dropbox://` URL to store in playlists
    pub song_url: String,
    pub descriptor: StreamDescriptor,
    /// `None` if the tag read failed
    pub tags: Option<TagData>,
}

/// Summary of one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub root: String,
    /// Directories successfully listed, root included
    pub directories: u64,
    pub tracks: Vec<DiscoveredTrack>,
    /// Files skipped for an unsupported MIME type
    pub skipped: u64,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    fn new(root: &str) -> Self {
        Self {
            scan_id: Uuid::new_v4().to_string(),
            root: root.to_string(),
            ..Self::default()
        }
    }

    fn failure(&mut self, path: &str, stage: ScanStage, error: &DropboxError) {
        self.failures.push(ScanFailure {
            path: path.to_string(),
            stage,
            message: error.to_string(),
        });
    }
}

enum ScanTask {
    List(String),
    FetchContent(MetadataEntry),
    ReadTags(StreamDescriptor),
}

enum TaskOutcome {
    Listed {
        path: String,
        result: Result<Vec<MetadataEntry>>,
    },
    Fetched {
        entry: MetadataEntry,
        result: Result<MediaResponse>,
    },
    TagsRead {
        descriptor: StreamDescriptor,
        result: Result<TagData>,
    },
}

/// Dropbox browser: credentials, listings, streaming URLs and scans.
///
/// Always handled through `Arc`; the registered URL handler keeps a weak
/// reference back to it.
pub struct DropboxService {
    config: DropboxConfig,
    http_client: Arc<dyn HttpClient>,
    signer: Arc<dyn RequestSigner>,
    credential_store: Arc<dyn CredentialStore>,
    tag_reader: Arc<dyn TagReader>,
    event_bus: EventBus,
    /// Registry and the handler this service put into it
    url_registration: Option<(Arc<dyn UrlHandlerRegistry>, Arc<dyn UrlHandler>)>,
    credentials: RwLock<Credentials>,
    scan_token: Mutex<CancellationToken>,
}

impl DropboxService {
    pub fn builder(config: DropboxConfig) -> DropboxServiceBuilder {
        DropboxServiceBuilder::new(config)
    }

    /// Build a service from the shared host bridges.
    ///
    /// Credentials live in `core.settings_store` under `config.settings_group`.
    pub async fn from_core_config(config: DropboxConfig, core: &CoreConfig) -> Result<Arc<Self>> {
        let credential_store = Arc::new(SettingsCredentialStore::new(
            core.settings_store.clone(),
            config.settings_group.clone(),
        ));

        let mut builder = Self::builder(config)
            .http_client(core.http_client.clone())
            .credential_store(credential_store)
            .tag_reader(core.tag_reader.clone())
            .event_bus(EventBus::new(core.event_buffer_size));
        if let Some(registry) = &core.url_registry {
            builder = builder.url_registry(registry.clone());
        }

        builder.build().await
    }

    pub fn config(&self) -> &DropboxConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// True once a non-empty access token is loaded.
    pub fn has_credentials(&self) -> bool {
        !self.credentials().is_empty()
    }

    fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn replace_credentials(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(|e| e.into_inner()) = credentials;
    }

    /// `Authorization` header for the current credentials.
    ///
    /// Without credentials this is the unsigned form, which the API rejects.
    pub fn authorization_header(&self) -> String {
        self.signer.authorization_header(&self.credentials())
    }

    /// Start browsing: scan from the root, or ask the host to authenticate.
    pub async fn connect(&self) -> Result<ConnectOutcome> {
        if !self.has_credentials() {
            info!("No Dropbox credentials, authentication required");
            self.event_bus
                .emit(CoreEvent::Auth(AuthEvent::AuthenticationRequired {
                    provider: PROVIDER_NAME.to_string(),
                }))
                .ok();
            return Ok(ConnectOutcome::AuthenticationRequired);
        }

        let report = self.scan("").await?;
        Ok(ConnectOutcome::Scanned(report))
    }

    /// Persist a finished authorization, switch to it and scan from the root.
    #[instrument(skip(self, result))]
    pub async fn complete_authentication(&self, result: AuthenticationResult) -> Result<ScanReport> {
        let AuthenticationResult {
            credentials,
            account_name,
        } = result;

        self.credential_store
            .save(&credentials, &account_name)
            .await?;
        self.replace_credentials(credentials);

        info!("Dropbox connected");
        self.event_bus
            .emit(CoreEvent::Auth(AuthEvent::Connected {
                provider: PROVIDER_NAME.to_string(),
                account_name,
            }))
            .ok();

        self.scan("").await
    }

    /// Fails with `NotAuthenticated` rather than send a request the API
    /// would reject.
    fn signed_request(&self, method: HttpMethod, url: String) -> Result<HttpRequest> {
        let credentials = self.credentials();
        if credentials.is_empty() {
            return Err(DropboxError::NotAuthenticated);
        }

        Ok(HttpRequest::new(method, url)
            .authorization(self.signer.authorization_header(&credentials))
            .timeout(self.config.request_timeout))
    }

    fn ensure_success(response: &HttpResponse) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        let mut message = String::from_utf8_lossy(&response.body).into_owned();
        if message.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }

        Err(DropboxError::ApiError {
            status: response.status,
            message,
        })
    }

    /// List the direct children of `path` (`""` or `/` for the root).
    #[instrument(skip(self))]
    pub async fn list_directory(&self, path: &str) -> Result<Vec<MetadataEntry>> {
        let request = self.signed_request(HttpMethod::Get, self.config.metadata_url(path))?;
        let response = self.http_client.execute(request).await?;
        Self::ensure_success(&response)?;

        let listing: ListingResponse = serde_json::from_slice(&response.body)
            .map_err(|e| DropboxError::ParseError(format!("metadata {}: {}", path, e)))?;

        debug!(entries = listing.contents.len(), "Listed directory");
        Ok(listing.contents)
    }

    /// Ask for a temporary streaming URL for the file at `path`.
    #[instrument(skip(self))]
    pub async fn fetch_content_url(&self, path: &str) -> Result<MediaResponse> {
        let request = self
            .signed_request(HttpMethod::Post, self.config.media_url(path))?
            .body(Bytes::new());
        let response = self.http_client.execute(request).await?;
        Self::ensure_success(&response)?;

        let media: MediaResponse = serde_json::from_slice(&response.body)
            .map_err(|e| DropboxError::ParseError(format!("media {}: {}", path, e)))?;

        if media.url.is_empty() {
            return Err(DropboxError::MissingStreamUrl(path.to_string()));
        }

        Ok(media)
    }

    /// Map a `dropbox://` song URL to a temporary streaming URL.
    pub async fn resolve_streaming_url(&self, song_url: &str) -> Result<String> {
        let path = remote_path_from_url(song_url)?;
        let media = self.fetch_content_url(&path).await?;
        Ok(media.url)
    }

    /// Blocking form of [`resolve_streaming_url`](Self::resolve_streaming_url).
    ///
    /// Blocks only the calling thread. Inside a multi-thread runtime the
    /// worker is handed off with `block_in_place` so the other workers keep
    /// serving the host; outside any runtime the request runs on a private
    /// one. From a current-thread runtime this fails with
    /// [`DropboxError::Config`] without sending anything.
    pub fn resolve_streaming_url_blocking(&self, song_url: &str) -> Result<String> {
        block_on_caller(self.resolve_streaming_url(song_url))?
    }

    /// Cancel every running scan. Scans started afterwards are unaffected.
    pub fn cancel_scans(&self) {
        let mut token = self.scan_token.lock().unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
    }

    /// Recursively walk `root`, resolving and tagging every playable file.
    pub async fn scan(&self, root: &str) -> Result<ScanReport> {
        let token = self
            .scan_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .child_token();
        self.scan_with_token(root, token).await
    }

    /// [`scan`](Self::scan) with a caller-owned cancellation token.
    #[instrument(skip(self, cancel))]
    pub async fn scan_with_token(&self, root: &str, cancel: CancellationToken) -> Result<ScanReport> {
        if !self.has_credentials() {
            return Err(DropboxError::NotAuthenticated);
        }

        let mut report = ScanReport::new(root);
        let max_in_flight = self.config.max_concurrent_requests.max(1);

        info!(scan_id = %report.scan_id, "Scan started");
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::ScanStarted {
                scan_id: report.scan_id.clone(),
                provider: PROVIDER_NAME.to_string(),
                root: root.to_string(),
            }))
            .ok();

        let mut pending = VecDeque::from([ScanTask::List(root.to_string())]);
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < max_in_flight {
                match pending.pop_front() {
                    Some(task) => in_flight.push(self.run_task(task)),
                    None => break,
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(scan_id = %report.scan_id, "Scan cancelled");
                    return Err(DropboxError::Cancelled);
                }
                next = in_flight.next() => match next {
                    Some(outcome) => outcome,
                    None => break,
                },
            };

            self.handle_outcome(outcome, &mut pending, &mut report);
        }

        info!(
            scan_id = %report.scan_id,
            directories = report.directories,
            tracks = report.tracks.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            "Scan completed"
        );
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::ScanCompleted {
                scan_id: report.scan_id.clone(),
                directories: report.directories,
                tracks: report.tracks.len() as u64,
                skipped: report.skipped,
                failures: report.failures.len() as u64,
            }))
            .ok();

        Ok(report)
    }

    fn run_task(&self, task: ScanTask) -> BoxFuture<'_, TaskOutcome> {
        match task {
            ScanTask::List(path) => async move {
                let result = self.list_directory(&path).await;
                TaskOutcome::Listed { path, result }
            }
            .boxed(),
            ScanTask::FetchContent(entry) => async move {
                let result = self.fetch_content_url(&entry.path).await;
                TaskOutcome::Fetched { entry, result }
            }
            .boxed(),
            ScanTask::ReadTags(descriptor) => async move {
                let result = self
                    .tag_reader
                    .read_cloud_file(descriptor.to_tag_request())
                    .await
                    .map_err(DropboxError::from);
                TaskOutcome::TagsRead { descriptor, result }
            }
            .boxed(),
        }
    }

    fn handle_outcome(
        &self,
        outcome: TaskOutcome,
        pending: &mut VecDeque<ScanTask>,
        report: &mut ScanReport,
    ) {
        match outcome {
            TaskOutcome::Listed {
                path,
                result: Ok(entries),
            } => {
                report.directories += 1;
                for entry in entries {
                    if entry.is_dir {
                        pending.push_back(ScanTask::List(entry.path));
                    } else if entry.is_playable() {
                        debug!(path = %entry.path, "Found");
                        pending.push_back(ScanTask::FetchContent(entry));
                    } else {
                        report.skipped += 1;
                    }
                }
                debug!(path = %path, queued = pending.len(), "Directory processed");
            }
            TaskOutcome::Listed {
                path,
                result: Err(error),
            } => {
                self.record_failure(report, &path, ScanStage::Listing, error);
            }
            TaskOutcome::Fetched {
                entry,
                result: Ok(media),
            } => {
                let descriptor = StreamDescriptor::new(&entry, media);
                debug!(
                    path = %descriptor.original_path,
                    size = descriptor.size,
                    mime_type = %descriptor.mime_type,
                    "Resolved streaming URL"
                );
                self.event_bus
                    .emit(CoreEvent::Library(LibraryEvent::TrackDiscovered {
                        path: descriptor.original_path.clone(),
                        mime_type: descriptor.mime_type.clone(),
                        size: descriptor.size,
                    }))
                    .ok();
                pending.push_back(ScanTask::ReadTags(descriptor));
            }
            TaskOutcome::Fetched {
                entry,
                result: Err(error),
            } => {
                self.record_failure(report, &entry.path, ScanStage::ContentUrl, error);
            }
            TaskOutcome::TagsRead {
                descriptor,
                result: Ok(tags),
            } => {
                debug!(file = %strip_path(&descriptor.original_path), ?tags, "Tags read");
                self.event_bus
                    .emit(CoreEvent::Library(LibraryEvent::TagsRead {
                        path: descriptor.original_path.clone(),
                        title: tags.title.clone(),
                        artist: tags.artist.clone(),
                        album: tags.album.clone(),
                    }))
                    .ok();
                report.tracks.push(DiscoveredTrack {
                    song_url: song_url_for_path(&descriptor.original_path),
                    descriptor,
                    tags: Some(tags),
                });
            }
            TaskOutcome::TagsRead {
                descriptor,
                result: Err(error),
            } => {
                self.record_failure(report, &descriptor.original_path, ScanStage::Tags, error);
                report.tracks.push(DiscoveredTrack {
                    song_url: song_url_for_path(&descriptor.original_path),
                    descriptor,
                    tags: None,
                });
            }
        }
    }

    fn record_failure(
        &self,
        report: &mut ScanReport,
        path: &str,
        stage: ScanStage,
        error: DropboxError,
    ) {
        warn!(path = %path, ?stage, error = %error, "Scan step failed");
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::ScanStepFailed {
                path: path.to_string(),
                stage,
                message: error.to_string(),
            }))
            .ok();
        report.failure(path, stage, &error);
    }
}

/// Run `future` to completion on the calling thread.
///
/// Refused on a current-thread runtime: its only thread also drives the
/// host's I/O, so waiting there would never see the response.
fn block_on_caller<F: Future>(future: F) -> Result<F::Output> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        Ok(_) => Err(DropboxError::Config(
            "Blocking resolve is unavailable on a current-thread runtime; \
             await resolve_streaming_url instead"
                .to_string(),
        )),
        Err(_) => block_on_private(future),
    }
}

fn block_on_private<F: Future>(future: F) -> Result<F::Output> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            DropboxError::Config(format!("Failed to create runtime for blocking call: {}", e))
        })?;
    Ok(runtime.block_on(future))
}

/// Builder for [`DropboxService`].
pub struct DropboxServiceBuilder {
    config: DropboxConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    signer: Option<Arc<dyn RequestSigner>>,
    credential_store: Option<Arc<dyn CredentialStore>>,
    tag_reader: Option<Arc<dyn TagReader>>,
    event_bus: Option<EventBus>,
    url_registry: Option<Arc<dyn UrlHandlerRegistry>>,
}

impl DropboxServiceBuilder {
    fn new(config: DropboxConfig) -> Self {
        Self {
            config,
            http_client: None,
            signer: None,
            credential_store: None,
            tag_reader: None,
            event_bus: None,
            url_registry: None,
        }
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Defaults to a [`DropboxAuthenticator`] over the same HTTP client.
    pub fn signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn tag_reader(mut self, reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = Some(reader);
        self
    }

    /// Defaults to a fresh bus with the default capacity.
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn url_registry(mut self, registry: Arc<dyn UrlHandlerRegistry>) -> Self {
        self.url_registry = Some(registry);
        self
    }

    /// Validate, load stored credentials and register the `dropbox` URL handler.
    pub async fn build(self) -> Result<Arc<DropboxService>> {
        self.config.validate()?;

        let http_client = self
            .http_client
            .ok_or_else(|| DropboxError::Config("HttpClient is required".to_string()))?;
        let credential_store = self
            .credential_store
            .ok_or_else(|| DropboxError::Config("CredentialStore is required".to_string()))?;
        let tag_reader = self
            .tag_reader
            .ok_or_else(|| DropboxError::Config("TagReader is required".to_string()))?;
        let signer = match self.signer {
            Some(signer) => signer,
            None => Arc::new(DropboxAuthenticator::new(
                self.config.clone(),
                http_client.clone(),
            )),
        };

        let credentials = credential_store.load().await?.unwrap_or_default();
        debug!(has_credentials = !credentials.is_empty(), "Loaded Dropbox credentials");

        let service = Arc::new_cyclic(|weak| {
            let url_registration = self.url_registry.map(|registry| {
                let handler: Arc<dyn UrlHandler> = Arc::new(DropboxUrlHandler::new(weak.clone()));
                (registry, handler)
            });

            DropboxService {
                config: self.config,
                http_client,
                signer,
                credential_store,
                tag_reader,
                event_bus: self.event_bus.unwrap_or_default(),
                url_registration,
                credentials: RwLock::new(credentials),
                scan_token: Mutex::new(CancellationToken::new()),
            }
        });

        if let Some((registry, handler)) = &service.url_registration {
            registry.register(handler.clone());
        }

        Ok(service)
    }
}

impl Drop for DropboxService {
    fn drop(&mut self) {
        self.cancel_scans();
        if let Some((registry, handler)) = &self.url_registration {
            registry.unregister(handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::tags::CloudFileRequest;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        pub Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    mock! {
        pub Tags {}

        #[async_trait]
        impl TagReader for Tags {
            async fn read_cloud_file(&self, request: CloudFileRequest) -> BridgeResult<TagData>;
        }
    }

    mock! {
        pub Store {}

        #[async_trait]
        impl CredentialStore for Store {
            async fn load(&self) -> Result<Option<Credentials>>;
            async fn save(&self, credentials: &Credentials, name: &str) -> Result<()>;
        }
    }

    fn json(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    async fn service(http: MockHttp, stored: Option<Credentials>) -> Arc<DropboxService> {
        let mut store = MockStore::new();
        store.expect_load().returning(move || Ok(stored.clone()));

        DropboxService::builder(DropboxConfig::new("key", "secret"))
            .http_client(Arc::new(http))
            .credential_store(Arc::new(store))
            .tag_reader(Arc::new(MockTags::new()))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_builder_requires_bridges() {
        let result = DropboxService::builder(DropboxConfig::new("key", "secret"))
            .http_client(Arc::new(MockHttp::new()))
            .build()
            .await;
        assert!(matches!(result, Err(DropboxError::Config(msg)) if msg.contains("CredentialStore")));
    }

    #[tokio::test]
    async fn test_builder_validates_config() {
        let result = DropboxService::builder(DropboxConfig::new("", "secret"))
            .build()
            .await;
        assert!(matches!(result, Err(DropboxError::Config(_))));
    }

    #[tokio::test]
    async fn test_has_credentials_reflects_store() {
        assert!(!service(MockHttp::new(), None).await.has_credentials());
        assert!(
            service(MockHttp::new(), Some(Credentials::new("tok", "sec")))
                .await
                .has_credentials()
        );
    }

    #[tokio::test]
    async fn test_connect_without_credentials_requests_authentication() {
        let mut http = MockHttp::new();
        http.expect_execute().times(0);

        let service = service(http, None).await;
        let mut events = service.event_bus().subscribe();

        let outcome = service.connect().await.unwrap();
        assert!(matches!(outcome, ConnectOutcome::AuthenticationRequired));
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::AuthenticationRequired {
                provider: "Dropbox".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_list_directory_sends_signed_get() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url == "https://api.dropbox.com/1/metadata/dropbox/Music"
                    && req.headers["Authorization"].contains("oauth_token=\"tok\"")
            })
            .times(1)
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{"contents":[{"path":"/Music/a.ogg","is_dir":false,"mime_type":"audio/ogg","bytes":7}]}"#,
                ))
            });

        let service = service(http, Some(Credentials::new("tok", "sec"))).await;
        let entries = service.list_directory("/Music").await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/Music/a.ogg");
        assert_eq!(entries[0].bytes, 7);
    }

    #[tokio::test]
    async fn test_list_directory_errors() {
        let mut http = MockHttp::new();
        let mut seq = mockall::Sequence::new();
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json(401, r#"{"error": "Unauthorized"}"#)));
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json(200, "not json")));

        let service = service(http, Some(Credentials::new("tok", "sec"))).await;

        match service.list_directory("").await {
            Err(DropboxError::ApiError { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("Unauthorized"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
        assert!(matches!(
            service.list_directory("").await,
            Err(DropboxError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_content_url_posts_empty_body() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.url == "https://api.dropbox.com/1/media/dropbox/b.mp3"
                    && req.body.as_ref().map(|b| b.is_empty()) == Some(true)
            })
            .times(1)
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{"url":"https://dl.dropbox.com/0/view/b.mp3","expires":"Thu, 16 Sep 2011 01:01:25 +0000"}"#,
                ))
            });

        let service = service(http, Some(Credentials::new("tok", "sec"))).await;
        let media = service.fetch_content_url("/b.mp3").await.unwrap();
        assert_eq!(media.url, "https://dl.dropbox.com/0/view/b.mp3");
    }

    #[tokio::test]
    async fn test_fetch_content_url_without_url() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(json(200, r#"{"expires":"never"}"#)));

        let service = service(http, Some(Credentials::new("tok", "sec"))).await;
        assert!(matches!(
            service.fetch_content_url("/b.mp3").await,
            Err(DropboxError::MissingStreamUrl(path)) if path == "/b.mp3"
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_foreign_urls() {
        let mut http = MockHttp::new();
        http.expect_execute().times(0);

        let service = service(http, Some(Credentials::new("tok", "sec"))).await;
        assert!(matches!(
            service.resolve_streaming_url("spotify://track/1").await,
            Err(DropboxError::InvalidSongUrl(_))
        ));
    }

    #[test]
    fn test_error_body_is_truncated() {
        let body: &'static str = Box::leak("é".repeat(600).into_boxed_str());
        match DropboxService::ensure_success(&json(500, body)) {
            Err(DropboxError::ApiError { message, .. }) => {
                assert!(message.len() <= MAX_ERROR_BODY);
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_block_on_caller_outside_runtime() {
        let value = block_on_caller(async { 42 }).unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_caller_inside_multi_thread_runtime() {
        let value = block_on_caller(async {
            tokio::task::yield_now().await;
            7
        })
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_block_on_caller_refuses_current_thread_runtime() {
        let polled = Arc::new(Mutex::new(false));
        let flag = polled.clone();
        let result = block_on_caller(async move {
            *flag.lock().unwrap() = true;
        });

        assert!(matches!(result, Err(DropboxError::Config(msg)) if msg.contains("current-thread")));
        assert!(!*polled.lock().unwrap());
    }

    #[tokio::test]
    async fn test_requests_need_credentials() {
        let mut http = MockHttp::new();
        http.expect_execute().times(0);

        let service = service(http, None).await;
        let mut events = service.event_bus().subscribe();

        assert!(matches!(
            service.list_directory("/Music").await,
            Err(DropboxError::NotAuthenticated)
        ));
        assert!(matches!(
            service.fetch_content_url("/b.mp3").await,
            Err(DropboxError::NotAuthenticated)
        ));
        assert!(matches!(
            service.resolve_streaming_url("dropbox://b.mp3").await,
            Err(DropboxError::NotAuthenticated)
        ));
        assert!(matches!(service.scan("").await, Err(DropboxError::NotAuthenticated)));
        assert!(events.try_recv().is_err());
    }
}
