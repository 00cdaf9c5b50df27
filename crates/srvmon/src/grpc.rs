//! gRPC adapter: the `srvmon.v1.Srvmon` service plus the standard
//! `grpc.health.v1.Health` liveness service.

use crate::checker::CheckContext;
use crate::error::MonitorError;
use crate::monitor::{Monitor, listen_address};
use crate::types::{CheckResult, HealthResponse, ReadinessResponse, Status};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tonic::metadata::MetadataMap;
use tonic::transport::Server;
use tonic::transport::server::{Connected, TcpConnectInfo};
use tonic::{Request, Response};
use tonic_health::ServingStatus;
use tonic_health::server::HealthReporter;
use tracing::{debug, error, info};

/// Generated protobuf messages and service stubs.
pub mod pb {
    tonic::include_proto!("srvmon.v1");
}

use pb::srvmon_server::{Srvmon, SrvmonServer};

const MAX_CONCURRENT_STREAMS: u32 = 10;
const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_CONNECTION_AGE: Duration = Duration::from_secs(60);
const MAX_CONNECTION_AGE_GRACE: Duration = Duration::from_secs(5);

/// `Srvmon` service implementation backed by a [`Monitor`].
pub struct SrvmonService {
    monitor: Arc<Monitor>,
}

impl SrvmonService {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self { monitor }
    }
}

#[tonic::async_trait]
impl Srvmon for SrvmonService {
    async fn health(
        &self,
        request: Request<pb::HealthRequest>,
    ) -> Result<Response<pb::HealthResponse>, tonic::Status> {
        let ctx = request_context(request.metadata());
        let report = self
            .monitor
            .health(&ctx)
            .await
            .map_err(|e| tonic::Status::internal(e.to_string()))?;
        Ok(Response::new(report.into()))
    }

    async fn ready(
        &self,
        request: Request<pb::ReadinessRequest>,
    ) -> Result<Response<pb::ReadinessResponse>, tonic::Status> {
        let ctx = request_context(request.metadata());
        let report = self
            .monitor
            .ready(&ctx)
            .await
            .map_err(|e| tonic::Status::internal(e.to_string()))?;
        Ok(Response::new(report.into()))
    }
}

/// Evaluation context for one RPC, bounded by the client's `grpc-timeout`.
fn request_context(metadata: &MetadataMap) -> CheckContext {
    let ctx = CheckContext::new();
    match metadata
        .get("grpc-timeout")
        .and_then(|value| value.to_str().ok())
        .and_then(parse_grpc_timeout)
    {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    }
}

/// Parse a `grpc-timeout` header value: up to 8 digits and a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if !value.is_ascii() || value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    Some(match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    })
}

impl From<Status> for pb::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Up => pb::Status::Up,
            Status::Down => pb::Status::Down,
            Status::Degraded => pb::Status::Degraded,
            Status::Unknown => pb::Status::Unknown,
        }
    }
}

impl From<pb::Status> for Status {
    fn from(status: pb::Status) -> Self {
        match status {
            pb::Status::Up => Status::Up,
            pb::Status::Down => Status::Down,
            pb::Status::Degraded => Status::Degraded,
            pb::Status::Unknown => Status::Unknown,
        }
    }
}

impl From<CheckResult> for pb::CheckResult {
    fn from(result: CheckResult) -> Self {
        Self {
            name: result.name,
            status: pb::Status::from(result.status) as i32,
            message: result.message,
            error: result.error,
            timestamp: Some(result.timestamp.into()),
        }
    }
}

impl From<HealthResponse> for pb::HealthResponse {
    fn from(resp: HealthResponse) -> Self {
        Self {
            status: pb::Status::from(resp.status) as i32,
            version: resp.version,
            checks: resp.checks.into_iter().map(Into::into).collect(),
            timestamp: Some(resp.timestamp.into()),
        }
    }
}

impl From<ReadinessResponse> for pb::ReadinessResponse {
    fn from(resp: ReadinessResponse) -> Self {
        Self {
            ready: resp.ready,
            reason: resp.reason,
            checks: resp.checks.into_iter().map(Into::into).collect(),
            timestamp: Some(resp.timestamp.into()),
        }
    }
}

/// Bound, not yet serving, gRPC listener.
pub(crate) struct GrpcServer {
    monitor: Arc<Monitor>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

/// Running gRPC server.
pub(crate) struct GrpcHandle {
    reporter: HealthReporter,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

/// Accepted connection whose IO fails once `stop` is cancelled.
///
/// tonic serves every connection on its own task, so aborting the accept
/// loop alone leaves open connections running.
struct StoppableStream {
    inner: TcpStream,
    stop: CancellationToken,
    stopped: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl StoppableStream {
    fn new(inner: TcpStream, stop: CancellationToken) -> Self {
        let stopped = Box::pin(stop.clone().cancelled_owned());
        Self {
            inner,
            stop,
            stopped,
        }
    }

    /// Fails after cancellation; otherwise registers the task for wakeup.
    fn poll_stopped(&mut self, cx: &mut Context<'_>) -> io::Result<()> {
        if self.stop.is_cancelled() || self.stopped.as_mut().poll(cx).is_ready() {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "gRPC server stopped",
            ));
        }
        Ok(())
    }
}

impl Connected for StoppableStream {
    type ConnectInfo = TcpConnectInfo;

    fn connect_info(&self) -> Self::ConnectInfo {
        self.inner.connect_info()
    }
}

impl AsyncRead for StoppableStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.poll_stopped(cx)?;
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for StoppableStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.poll_stopped(cx)?;
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.poll_stopped(cx)?;
        Pin::new(&mut this.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.poll_stopped(cx)?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

impl GrpcServer {
    /// Bind the gRPC listener
    pub(crate) async fn bind(monitor: Arc<Monitor>) -> Result<Self, MonitorError> {
        let address = listen_address(&monitor.config().grpc_address);
        let bind_err = |source| MonitorError::GrpcBind {
            address: address.clone(),
            source,
        };

        let listener = TcpListener::bind(&address).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        Ok(Self {
            monitor,
            listener,
            local_addr,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start serving on the bound listener
    pub(crate) async fn start(self) -> GrpcHandle {
        let (reporter, health_service) = tonic_health::server::health_reporter();
        // Liveness of the process itself, independent of dependency state.
        reporter
            .set_service_status("", ServingStatus::Serving)
            .await;
        reporter.set_serving::<SrvmonServer<SrvmonService>>().await;

        let service = SrvmonServer::new(SrvmonService::new(self.monitor))
            .max_decoding_message_size(MAX_MESSAGE_SIZE)
            .max_encoding_message_size(MAX_MESSAGE_SIZE);

        let router = Server::builder()
            .http2_keepalive_interval(Some(KEEPALIVE_INTERVAL))
            .http2_keepalive_timeout(Some(KEEPALIVE_TIMEOUT))
            .max_connection_age(MAX_CONNECTION_AGE)
            .max_connection_age_grace(MAX_CONNECTION_AGE_GRACE)
            .max_concurrent_streams(Some(MAX_CONCURRENT_STREAMS))
            .trace_fn(|request| tracing::info_span!("grpc", path = %request.uri().path()))
            .add_service(health_service)
            .add_service(service);

        info!(address = %self.local_addr, "Starting srvmon gRPC server");

        let stop = CancellationToken::new();
        let connections = stop.clone();
        let incoming = TcpListenerStream::new(self.listener).map(move |conn| {
            conn.map(|stream| {
                // Listener accepts bypass tonic's own TcpIncoming setup.
                let _ = stream.set_nodelay(true);
                StoppableStream::new(stream, connections.clone())
            })
        });
        let task = tokio::spawn(async move {
            if let Err(e) = router.serve_with_incoming(incoming).await {
                error!(error = %e, "Serve gRPC");
            }
        });

        GrpcHandle {
            reporter,
            stop,
            task,
        }
    }
}

impl GrpcHandle {
    /// Stop immediately: open connections are closed and in-flight RPCs
    /// are dropped
    pub(crate) async fn stop(self) {
        self.reporter
            .set_service_status("", ServingStatus::NotServing)
            .await;
        self.reporter
            .set_not_serving::<SrvmonServer<SrvmonService>>()
            .await;

        self.stop.cancel();
        self.task.abort();
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                error!(error = %e, "gRPC server task failed");
            }
        }
        debug!("gRPC server stopped");
    }
}
