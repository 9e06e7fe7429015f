//! Listener lifecycle and graceful shutdown
//!
//! Binds the listener, marks the process healthy, and on a termination
//! request marks it unhealthy, stops accepting connections and drains
//! in-flight requests within a bounded timeout.

use crate::error::ExporterError;
use crate::service::health::HealthState;
use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower::Service;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept so a full fd table does not spin the loop
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Owns the health state and drives the server through its lifecycle
pub struct LifecycleController {
    health: HealthState,
    drain_timeout: Duration,
}

impl LifecycleController {
    /// Create a controller; health starts as `starting`
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            health: HealthState::new(),
            drain_timeout,
        }
    }

    /// Read handle on the health state
    pub fn health(&self) -> HealthState {
        self.health.clone()
    }

    /// Bind the listener
    ///
    /// The IPv6 wildcard falls back to the IPv4 wildcard on hosts without
    /// IPv6. Health stays `starting` when this fails.
    pub async fn bind(&self, addr: SocketAddr) -> Result<TcpListener, ExporterError> {
        match TcpListener::bind(addr).await {
            Ok(listener) => Ok(listener),
            Err(e)
                if addr.ip() == Ipv6Addr::UNSPECIFIED && e.kind() != io::ErrorKind::AddrInUse =>
            {
                warn!(error = %e, "IPv6 wildcard unavailable, listening on IPv4 only");
                let fallback = SocketAddr::from((Ipv4Addr::UNSPECIFIED, addr.port()));
                TcpListener::bind(fallback)
                    .await
                    .map_err(|source| ExporterError::ListenerBind {
                        addr: fallback,
                        source,
                    })
            }
            Err(source) => Err(ExporterError::ListenerBind { addr, source }),
        }
    }

    /// Serve `router` on `listener` until `shutdown` resolves, then drain
    ///
    /// Every connection runs in a tracked task. On shutdown the listener is
    /// closed, idle connections are told to close, and in-flight requests
    /// get the drain timeout to finish. Connections still open after that
    /// are aborted and `ShutdownDrainTimeout` is returned.
    pub async fn serve<F>(
        &self,
        listener: TcpListener,
        router: Router,
        shutdown: F,
    ) -> Result<(), ExporterError>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        self.health.mark_healthy();
        info!(addr = %local_addr, "Server is ready to handle requests");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            router.clone(),
                            stop_rx.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!("Server is shutting down...");
        self.health.mark_unhealthy();
        drop(listener);
        let _ = stop_tx.send(true);

        let drain = async { while connections.join_next().await.is_some() {} };
        let drained = tokio::time::timeout(self.drain_timeout, drain).await;

        match drained {
            Ok(()) => {
                info!("Server stopped");
                Ok(())
            }
            Err(_) => {
                error!(
                    timeout = ?self.drain_timeout,
                    open_connections = connections.len(),
                    "In-flight requests did not finish, forcing shutdown"
                );
                connections.shutdown().await;
                Err(ExporterError::ShutdownDrainTimeout {
                    timeout: self.drain_timeout,
                })
            }
        }
    }
}

/// Serve one HTTP/1 connection until it ends or the stop flag flips
///
/// After the flag flips the connection finishes its current request and
/// closes; an idle keep-alive connection closes right away.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    mut stop: watch::Receiver<bool>,
) {
    let service = service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        router.clone().call(request)
    });
    let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let mut stopping = false;
    loop {
        tokio::select! {
            result = connection.as_mut() => {
                if let Err(e) = result {
                    debug!(peer = %peer, error = %e, "Connection closed with error");
                }
                return;
            }
            _ = stop.changed(), if !stopping => {
                stopping = true;
                connection.as_mut().graceful_shutdown();
            }
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
