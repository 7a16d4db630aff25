use anyhow::Result;
use ::common::{DumpReplayParser, Profile, ReplayParser, UnknownPlayerPolicy};
use server::config::Config;
use server::http_server::{run_http_server_with_listener, HttpServerState};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A replay server bound to an ephemeral local port, staging uploads in its
/// own temporary directory.
pub struct TestServer {
    addr: SocketAddr,
    staging: TempDir,
    cancellation_token: CancellationToken,
    handle: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        TestServerBuilder::new().start().await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of files currently left in the staging directory
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.cancellation_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

pub struct TestServerBuilder {
    profile: Profile,
    unknown_player: UnknownPlayerPolicy,
    max_upload_bytes: Option<usize>,
    parser: Arc<dyn ReplayParser>,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        Self {
            profile: Profile::Full,
            unknown_player: UnknownPlayerPolicy::Reject,
            max_upload_bytes: None,
            parser: Arc::new(DumpReplayParser),
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_unknown_player(mut self, policy: UnknownPlayerPolicy) -> Self {
        self.unknown_player = policy;
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = Some(limit);
        self
    }

    pub async fn start(self) -> Result<TestServer> {
        let staging = tempfile::tempdir()?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let defaults = Config::default();
        let config = Config {
            addr: addr.to_string(),
            profile: self.profile,
            unknown_player: self.unknown_player,
            staging_dir: staging.path().to_path_buf(),
            max_upload_bytes: self.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
            trusted_proxies: Vec::new(),
        };

        let state = HttpServerState::new(config, self.parser);
        let cancellation_token = CancellationToken::new();
        let handle = tokio::spawn(run_http_server_with_listener(
            listener,
            state,
            cancellation_token.clone(),
        ));

        Ok(TestServer {
            addr,
            staging,
            cancellation_token,
            handle: Some(handle),
        })
    }
}
