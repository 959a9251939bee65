//! Local HTTP callback server for the browser SAML flow
//!
//! A loopback-only listener that accepts exactly one SAML assertion
//! delivered by the browser extension, plus a liveness probe the
//! extension uses to decide whether a CLI instance is waiting at all.

use super::types::{AuthError, AuthResult};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default well-known port the browser extension delivers to
pub const DEFAULT_CALLBACK_PORT: u16 = 8765;

/// Grace period for draining connections on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><body><h1>\u{2713} Success</h1>\
<p>You can close this window.</p></body></html>";

/// Form body the extension POSTs to `/callback`
#[derive(Debug, Deserialize)]
struct CallbackForm {
    #[serde(rename = "SAMLResponse", default)]
    saml_response: Option<String>,
}

/// State shared with the accept loop: the single-slot delivery channel
/// and the delivered flag backing the liveness probe.
#[derive(Clone)]
struct ListenerState {
    tx: mpsc::Sender<String>,
    delivered: Arc<AtomicBool>,
}

/// Running callback server
///
/// Bound and accepting before `bind` returns, so the browser can be
/// pointed at the identity provider without racing the listener. At most
/// one assertion is ever accepted per instance.
pub struct CallbackServer {
    addr: SocketAddr,
    rx: mpsc::Receiver<String>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<std::io::Result<()>>,
}

impl CallbackServer {
    /// Bind the loopback listener on `port` (0 picks an ephemeral port)
    /// and start serving in a background task.
    pub async fn bind(port: u16) -> AuthResult<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|e| AuthError::CallbackServer(format!("failed to bind 127.0.0.1:{port}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AuthError::CallbackServer(format!("failed to read local addr: {e}")))?;

        let (tx, rx) = mpsc::channel(1);
        let state = ListenerState {
            tx,
            delivered: Arc::new(AtomicBool::new(false)),
        };

        let app = Router::new()
            .route("/callback", post(handle_callback))
            .route("/status", get(handle_status))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        debug!("callback server listening on http://{addr}");

        Ok(Self {
            addr,
            rx,
            shutdown_tx: Some(shutdown_tx),
            server,
        })
    }

    /// Port the listener actually bound
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Block until the assertion is delivered, the server fails, or the
    /// timeout elapses, whichever happens first.
    pub async fn wait_for_assertion(&mut self, timeout: Duration) -> AuthResult<String> {
        tokio::select! {
            delivery = self.rx.recv() => delivery.ok_or_else(|| {
                AuthError::CallbackServer("delivery channel closed unexpectedly".to_string())
            }),
            result = &mut self.server => {
                let detail = match result {
                    Ok(Ok(())) => "server exited before delivery".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => e.to_string(),
                };
                Err(AuthError::CallbackServer(detail))
            }
            _ = tokio::time::sleep(timeout) => Err(AuthError::Timeout),
        }
    }

    /// Stop the listener, waiting up to the grace period for in-flight
    /// connections before aborting outright.
    pub async fn shutdown(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if !self.server.is_finished()
            && tokio::time::timeout(SHUTDOWN_GRACE, &mut self.server)
                .await
                .is_err()
        {
            warn!("callback server did not stop within grace period, aborting");
            self.server.abort();
        }
    }
}

async fn handle_callback(State(state): State<ListenerState>, Form(form): Form<CallbackForm>) -> Response {
    let saml = match form.saml_response.filter(|s| !s.is_empty()) {
        Some(saml) => saml,
        None => return (StatusCode::BAD_REQUEST, "Missing SAML").into_response(),
    };

    // First delivery wins; losers see busy and the stored assertion is
    // untouched.
    if state
        .delivered
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return (StatusCode::SERVICE_UNAVAILABLE, "Busy").into_response();
    }

    debug!("SAML assertion received ({} bytes)", saml.len());
    // Capacity 1 and the flag was just claimed, so this cannot fail while
    // the waiter is alive.
    if state.tx.try_send(saml).is_err() {
        state.delivered.store(false, Ordering::SeqCst);
        return (StatusCode::SERVICE_UNAVAILABLE, "Busy").into_response();
    }

    Html(SUCCESS_PAGE).into_response()
}

async fn handle_status(State(state): State<ListenerState>) -> StatusCode {
    if state.delivered.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}
