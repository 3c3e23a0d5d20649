//! Remote build service
//!
//! One connection is served at a time. Each connection may carry several
//! request/response exchanges; `close` ends it, as does a read that returns
//! nothing. The service loop ends when the acceptor stops producing
//! connections or the shutdown future resolves.
//!
//! ```text
//! Listening -> Accepting -> Receiving -> Decoding -> Dispatching -> Responding
//!                  ^            ^                                      |
//!                  |            +--------------------------------------+
//!                  +-- (close / empty read) ------------------------> Closed
//! ```

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

use bw_build::BuildContext;
use bw_catalog::CatalogError;
use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::{BuildScope, ServiceConfig};
use crate::error::ServiceError;
use crate::protocol::{WireRequest, WireResponse};

/// Random characters appended to a task name per request
pub const SUFFIX_LEN: usize = 5;

/// Where the service is in its connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Bound, not yet accepting
    Listening,
    /// Waiting for a connection
    Accepting,
    /// Reading a message
    Receiving,
    /// Decoding a message
    Decoding,
    /// Ingesting and building
    Dispatching,
    /// Writing the reply
    Responding,
    /// Connection or service finished
    Closed,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Listening => "listening",
            Self::Accepting => "accepting",
            Self::Receiving => "receiving",
            Self::Decoding => "decoding",
            Self::Dispatching => "dispatching",
            Self::Responding => "responding",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// Client sent `close`
    Closed,
    /// Client sent nothing (peer hung up)
    Dropped,
}

/// Source of connections
#[async_trait::async_trait]
pub trait Acceptor: Send {
    /// Connection stream
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Next connection and a peer description, or `None` when no more will come
    async fn accept(&mut self) -> Option<(Self::Stream, String)>;
}

/// [`Acceptor`] over a TCP listener
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    /// Bind `addr`
    ///
    /// # Errors
    /// [`ServiceError::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServiceError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServiceError::Bind { addr, source })?;
        Ok(Self { listener })
    }

    /// Wrap an already-bound listener
    #[inline]
    #[must_use]
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listener }
    }

    /// Bound address
    ///
    /// # Errors
    /// Propagates the socket error.
    pub fn local_addr(&self) -> Result<SocketAddr, ServiceError> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait::async_trait]
impl Acceptor for TcpAcceptor {
    type Stream = TcpStream;

    async fn accept(&mut self) -> Option<(TcpStream, String)> {
        match self.listener.accept().await {
            Ok((stream, peer)) => Some((stream, peer.to_string())),
            Err(e) => {
                error!(error = %e, "Accept failed");
                None
            }
        }
    }
}

/// Accepts build requests and drives the pipeline for each
#[derive(Debug)]
pub struct RemoteBuildService {
    context: BuildContext,
    config: ServiceConfig,
    state: ServiceState,
}

impl RemoteBuildService {
    /// Service with a fresh context built from `config.build`
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        let context = BuildContext::new(config.build.clone());
        Self::with_context(config, context)
    }

    /// Service over an existing context
    #[must_use]
    pub fn with_context(config: ServiceConfig, context: BuildContext) -> Self {
        Self { context, config, state: ServiceState::Listening }
    }

    /// Build context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Mutable build context
    #[inline]
    pub fn context_mut(&mut self) -> &mut BuildContext {
        &mut self.context
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ServiceState {
        self.state
    }

    fn transition(&mut self, next: ServiceState) {
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    /// Serve until the acceptor yields no connection
    pub async fn serve<A: Acceptor>(&mut self, acceptor: A) {
        self.serve_with_shutdown(acceptor, std::future::pending()).await;
    }

    /// Serve until the acceptor yields no connection or `shutdown` resolves.
    ///
    /// Shutdown is only observed between connections.
    pub async fn serve_with_shutdown<A, F>(&mut self, mut acceptor: A, shutdown: F)
    where
        A: Acceptor,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(bind = %self.config.bind, "Remote build service started");

        loop {
            self.transition(ServiceState::Accepting);
            let accepted = tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    None
                }
                accepted = acceptor.accept() => accepted,
            };
            let Some((mut stream, peer)) = accepted else {
                break;
            };

            info!(%peer, "Accepted connection");
            match self.handle_connection(&mut stream).await {
                Ok(end) => debug!(%peer, ?end, "Connection finished"),
                Err(e) => warn!(%peer, error = %e, "Connection aborted"),
            }
        }

        self.transition(ServiceState::Closed);
        info!("Remote build service stopped");
    }

    /// Serve every exchange on one connection.
    ///
    /// # Errors
    /// Only socket I/O failures; request and build failures are answered with
    /// `Compile failed` and the connection stays open.
    pub async fn handle_connection<S>(&mut self, stream: &mut S) -> Result<ConnectionEnd, ServiceError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        loop {
            self.transition(ServiceState::Receiving);
            let Some(message) = self.receive(stream).await? else {
                debug!("No data received, dropping connection");
                self.transition(ServiceState::Closed);
                return Ok(ConnectionEnd::Dropped);
            };

            self.transition(ServiceState::Decoding);
            let response = match WireRequest::decode(&message) {
                Ok(WireRequest::Close) => {
                    info!("Close requested");
                    self.transition(ServiceState::Closed);
                    return Ok(ConnectionEnd::Closed);
                }
                Ok(WireRequest::Build { task_name, confuse, yaml }) => {
                    self.transition(ServiceState::Dispatching);
                    match self.dispatch(&task_name, confuse, &yaml).await {
                        Ok(name) => WireResponse::FileName(name),
                        Err(e) => {
                            error!(task = %task_name, error = %e, "Dispatch failed");
                            WireResponse::CompileFailed
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, size = message.len(), "Malformed request");
                    WireResponse::CompileFailed
                }
            };

            self.transition(ServiceState::Responding);
            stream.write_all(&response.encode()).await?;
            stream.flush().await?;
            info!(%response, "Response sent");
        }
    }

    /// Read until a read comes back shorter than the buffer
    async fn receive<S>(&self, stream: &mut S) -> Result<Option<Vec<u8>>, ServiceError>
    where
        S: AsyncRead + Unpin + Send,
    {
        let mut buffer = vec![0u8; self.config.buffer_size.max(1)];
        let mut message = Vec::new();
        loop {
            let read = stream.read(&mut buffer).await?;
            message.extend_from_slice(&buffer[..read]);
            debug!(bytes = read, "Received");
            if read < buffer.len() {
                break;
            }
        }
        Ok((!message.is_empty()).then_some(message))
    }

    /// Ingest, look up, rename, flag and build
    #[tracing::instrument(skip(self, yaml), fields(payload = yaml.len()))]
    async fn dispatch(&mut self, task_name: &str, confuse: bool, yaml: &str) -> Result<String, ServiceError> {
        let catalog = self.context.catalog_mut();
        catalog.ingest_yaml(yaml)?;
        let task = catalog
            .task_by_name(task_name)
            .ok_or_else(|| ServiceError::TaskNotFound { name: task_name.to_string() })?;
        let (id, primary) = (task.id, task.primary_version());

        let renamed = randomized_name(task_name);
        catalog.rename_task(id, renamed.clone())?;
        catalog.set_obfuscate(id, confuse)?;

        let report = match self.config.scope {
            BuildScope::AllCompatible => self.context.build(id).await?,
            BuildScope::Primary => {
                let version = primary.ok_or_else(|| CatalogError::EmptyVersionList { task: renamed.clone() })?;
                self.context.build_versions(id, &[version]).await?
            }
        };

        if report.is_complete_success() {
            info!(task = %renamed, versions = report.succeeded().len(), "Task built");
            Ok(renamed)
        } else {
            Err(ServiceError::IncompleteBuild {
                task: renamed,
                failed: report.failed().into_iter().map(|(version, _)| version).collect(),
            })
        }
    }
}

/// `base` plus `_` and [`SUFFIX_LEN`] random ASCII alphanumerics
#[must_use]
pub fn randomized_name(base: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{base}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn randomized_names_follow_contract() {
        for _ in 0..200 {
            let name = randomized_name("Shell");
            let suffix = name.strip_prefix("Shell_").unwrap();
            assert_eq!(suffix.len(), SUFFIX_LEN);
            assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn names_with_underscores_keep_their_base() {
        let name = randomized_name("Invoke_Shell");
        assert!(name.starts_with("Invoke_Shell_"));
        assert_eq!(name.len(), "Invoke_Shell_".len() + SUFFIX_LEN);
    }

    #[test]
    fn state_names() {
        assert_eq!(ServiceState::Dispatching.to_string(), "dispatching");
        assert_eq!(RemoteBuildService::new(ServiceConfig::new()).state(), ServiceState::Listening);
    }
}
