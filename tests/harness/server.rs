//! In-process stand-in for the server under test.
//!
//! Serves `/health`, `/auth/login` and the three `/ws/*` routes with axum,
//! upgrading through hyper and speaking WebSocket with the crate's own
//! server-role `Connection`. Every session records how it ended so tests
//! can tell a close frame apart from a reset.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use ws_resilience::{Connection, Limits, Message, Role, compute_accept_key};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "admin123";
pub const TOKEN: &str = "test-token";

/// Interval between pushed channel messages.
const TICK: Duration = Duration::from_millis(50);

#[derive(Default)]
pub struct ServerState {
    healthy: AtomicBool,
    /// Sessions that completed the upgrade.
    sessions: AtomicUsize,
    /// Sessions still being served.
    active: AtomicUsize,
    /// Sessions that ended with a close frame from the client.
    close_frames: AtomicUsize,
    /// Sessions that ended with EOF or a reset.
    disconnects: AtomicUsize,
    /// Auth messages that carried the wrong token.
    rejected: AtomicUsize,
    /// `(route, text)` for every text message received.
    received: Mutex<Vec<(String, String)>>,
}

/// Handle to a running mock target.
pub struct TestServer {
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind a random local port and start serving.
    pub async fn spawn() -> (Self, SocketAddr) {
        let state = Arc::new(ServerState::default());
        state.healthy.store(true, Ordering::SeqCst);

        let app = Router::new()
            .route("/health", get(health))
            .route("/auth/login", post(login))
            .route("/ws/terminal", get(ws_handler))
            .route("/ws/metrics", get(ws_handler))
            .route("/ws/logs", get(ws_handler))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (Self { state, handle }, addr)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> usize {
        self.state.sessions.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    pub fn close_frames(&self) -> usize {
        self.state.close_frames.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn rejected(&self) -> usize {
        self.state.rejected.load(Ordering::SeqCst)
    }

    pub async fn received(&self) -> Vec<(String, String)> {
        self.state.received.lock().await.clone()
    }

    /// Wait until no session is being served, or `limit` elapses.
    pub async fn wait_idle(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if self.active() == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.active() == 0
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

async fn health(State(state): State<Arc<ServerState>>) -> StatusCode {
    if state.healthy.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        Json(json!({ "data": { "token": TOKEN } })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid credentials" }))).into_response()
    }
}

async fn ws_handler(State(state): State<Arc<ServerState>>, mut req: Request) -> Response {
    let Some(key) = req
        .headers()
        .get("sec-websocket-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    else {
        return (StatusCode::BAD_REQUEST, "Missing Sec-WebSocket-Key").into_response();
    };
    let route = req.uri().path().to_string();

    tokio::spawn(async move {
        if let Ok(upgraded) = hyper::upgrade::on(&mut req).await {
            let conn = Connection::new(TokioIo::new(upgraded), Role::Server, Limits::default());
            state.sessions.fetch_add(1, Ordering::SeqCst);
            state.active.fetch_add(1, Ordering::SeqCst);
            serve_session(&state, &route, conn).await;
            state.active.fetch_sub(1, Ordering::SeqCst);
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::UPGRADE, "websocket")
        .header(header::CONNECTION, "Upgrade")
        .header("Sec-WebSocket-Accept", compute_accept_key(&key))
        .body(axum::body::Body::empty())
        .unwrap()
}

enum Ended {
    CloseFrame,
    Disconnect,
}

async fn serve_session<T>(state: &ServerState, route: &str, mut conn: Connection<T>)
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let counter = match run_session(state, route, &mut conn).await {
        Ended::CloseFrame => &state.close_frames,
        Ended::Disconnect => &state.disconnects,
    };
    counter.fetch_add(1, Ordering::SeqCst);
}

async fn run_session<T>(state: &ServerState, route: &str, conn: &mut Connection<T>) -> Ended
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let channel = route.trim_start_matches("/ws/").to_string();
    let mut subscribed = false;
    let mut authenticated = false;
    let mut seq = 0u64;

    loop {
        let message = match tokio::time::timeout(TICK, conn.recv()).await {
            Err(_) => {
                if subscribed {
                    seq += 1;
                    let tick = json!({ "type": channel, "seq": seq }).to_string();
                    if conn.send(Message::Text(tick)).await.is_err() {
                        return Ended::Disconnect;
                    }
                }
                continue;
            }
            Ok(Ok(message)) => message,
            Ok(Err(_)) => return Ended::Disconnect,
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return Ended::CloseFrame,
            _ => continue,
        };
        state
            .received
            .lock()
            .await
            .push((route.to_string(), text.clone()));

        let Ok(envelope) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let reply = match envelope["type"].as_str() {
            Some("auth") if envelope["token"] == TOKEN => {
                authenticated = true;
                Some(json!({ "type": "auth_success" }))
            }
            // A bad token gets an error envelope; the socket stays open.
            Some("auth") => {
                state.rejected.fetch_add(1, Ordering::SeqCst);
                Some(json!({ "type": "error", "error": "Invalid token" }))
            }
            Some("subscribe") if authenticated => {
                subscribed = true;
                None
            }
            Some("input") if authenticated => {
                Some(json!({ "type": "output", "data": envelope["data"] }))
            }
            _ => None,
        };
        if let Some(reply) = reply {
            if conn.send(Message::Text(reply.to_string())).await.is_err() {
                return Ended::Disconnect;
            }
        }
    }
}
