use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{info, warn};
use url::Url;

/// Per-connection read/write deadline.
const IO_TIMEOUT: Duration = Duration::from_secs(20);
/// Upper bound on the request head the server is willing to buffer.
const MAX_HEAD_BYTES: usize = 1 << 20;

const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Health-check endpoint configuration. Loaded from a JSON file, with
/// `HTTP_HOST`, `HTTP_PORT` and `TLS_ENABLED` environment overrides on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls_enabled: false,
        }
    }
}

impl ApiConfig {
    /// Explicitly named config files must exist; with no path the defaults
    /// are used. Environment overrides apply either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("config file not found: {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env()?;

        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("HTTP_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("HTTP_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("parsing HTTP_PORT value {port:?}"))?;
        }
        if let Ok(tls) = std::env::var("TLS_ENABLED") {
            self.tls_enabled = matches!(tls.to_ascii_lowercase().as_str(), "true" | "1");
        }

        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL seen by the client. `tls_enabled` only switches the scheme;
    /// the server itself always speaks plain HTTP.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls_enabled { "https" } else { "http" };

        format!("{scheme}://{}", self.addr())
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("api config: host cannot be empty");
        }
        if self.port == 0 {
            anyhow::bail!("api config: port cannot be 0");
        }

        Ok(())
    }
}

/// Fixed-route HTTP server answering `GET /health`.
pub struct HealthServer {
    cfg: ApiConfig,
}

impl HealthServer {
    pub fn new(cfg: ApiConfig) -> Result<Self> {
        cfg.validate().context("constructing health server")?;

        Ok(Self { cfg })
    }

    /// Binds, then serves until ctrl-c (or SIGTERM on unix).
    pub fn run(&self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building server runtime")?;

        runtime.block_on(async {
            let listener = TcpListener::bind(self.cfg.addr())
                .await
                .with_context(|| format!("binding {}", self.cfg.addr()))?;

            info!(
                action = "start",
                component = "health_server",
                addr = %self.cfg.addr(),
                tls_enabled = self.cfg.tls_enabled,
                "Starting to listen and serve"
            );

            serve(listener).await
        })
    }
}

async fn serve(listener: TcpListener) -> Result<()> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("listening for shutdown signal")?;
                info!(action = "stop", component = "health_server", "Shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                // A failed accept is transient; the server keeps listening.
                match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream).await {
                                warn!(
                                    action = "serve",
                                    component = "health_server",
                                    peer = %peer,
                                    err = %err,
                                    "Connection failed"
                                );
                            }
                        });
                    }
                    Err(err) => {
                        warn!(
                            action = "accept",
                            component = "health_server",
                            err = %err,
                            "Accepting connection failed"
                        );
                    }
                }
            }
        }
    }
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await
}

async fn handle_connection(mut stream: TcpStream) -> Result<()> {
    let head = timeout(IO_TIMEOUT, read_head(&mut stream))
        .await
        .context("read timed out")??;

    let response = respond_to(&head);
    timeout(IO_TIMEOUT, stream.write_all(response.as_bytes()))
        .await
        .context("write timed out")?
        .context("writing response")?;
    stream.shutdown().await.context("closing connection")?;

    Ok(())
}

async fn read_head(stream: &mut TcpStream) -> Result<Vec<u8>> {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await.context("reading request")?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);

        if head.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
        if head.len() > MAX_HEAD_BYTES {
            anyhow::bail!("request head exceeds {MAX_HEAD_BYTES} bytes");
        }
    }

    Ok(head)
}

fn respond_to(head: &[u8]) -> &'static str {
    let head = String::from_utf8_lossy(head);
    let mut request_line = head.lines().next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("");
    let path = request_line.next().unwrap_or("");

    match (method, path) {
        ("GET", "/health") => "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        (_, "/health") => {
            "HTTP/1.1 405 Method Not Allowed\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
        }
        _ => "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
    }
}

/// Blocking client for the health endpoint. The URL is joined once at
/// construction; a malformed host fails here instead of at request time.
pub struct HealthClient {
    client: reqwest::blocking::Client,
    health_url: Url,
}

impl HealthClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        Self::with_timeout(cfg, DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn with_timeout(cfg: &ApiConfig, request_timeout: Duration) -> Result<Self> {
        cfg.validate().context("constructing health client")?;

        let base = Url::parse(&format!("{}/", cfg.base_url()))
            .with_context(|| format!("parsing base url {}", cfg.base_url()))?;
        let health_url = base.join("health").context("joining health path")?;

        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("building http client")?;

        Ok(Self { client, health_url })
    }

    /// Fails on transport errors only; the status code is returned for the
    /// caller to judge.
    pub fn check_health(&self) -> Result<StatusCode> {
        info!(
            action = "check",
            component = "health_client",
            url = %self.health_url,
            "Running health check"
        );

        let response = self
            .client
            .get(self.health_url.clone())
            .send()
            .with_context(|| format!("requesting {}", self.health_url))?;

        Ok(response.status())
    }
}
