//! SSE transport
//!
//! Every `GET /sse` connection owns one [`SseSession`]. The session pushes the
//! `initialized` and `tools/list` notifications, then emits a keep-alive
//! comment on a fixed wall-clock period until the peer goes away or the
//! server shuts down. It never reads from the connection.

use crate::http::{ApiError, AppState};
use crate::mcp::errors::McpResult;
use crate::mcp::protocol::{JsonRpcNotification, ListToolsResult, METHOD_TOOLS_LIST};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::Stream;
use serde::Serialize;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info};

/// Comment-only frame; conformant parsers ignore it
pub const KEEP_ALIVE_FRAME: &str = ": keep-alive\n\n";

/// Frame a message as a single SSE `data:` event
#[inline]
pub fn data_frame<T: Serialize>(message: &T) -> McpResult<Bytes> {
    let json = serde_json::to_string(message)?;
    Ok(Bytes::from(format!("data: {}\n\n", json)))
}

/// Lifecycle of one SSE connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Streaming,
    Closed,
}

/// Counts live SSE sessions across the server
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl SessionTracker {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions whose resources have not been released yet
    #[inline]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Register a new session; the count drops when the guard is dropped
    #[inline]
    pub fn track(&self) -> SessionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        SessionGuard {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            active: Arc::clone(&self.active),
        }
    }
}

/// Holds one slot in the [`SessionTracker`] count
#[derive(Debug)]
pub struct SessionGuard {
    id: u64,
    active: Arc<AtomicUsize>,
}

impl SessionGuard {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for SessionGuard {
    #[inline]
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Server side of one SSE connection.
///
/// The keep-alive timer and the tracker slot are owned by the session, so
/// dropping the session (peer disconnect drops the response body) releases
/// both.
#[derive(Debug)]
pub struct SseSession {
    state: SessionState,
    pending: VecDeque<Bytes>,
    keep_alive: Interval,
    shutdown: watch::Receiver<bool>,
    guard: SessionGuard,
}

impl SseSession {
    /// Create a session in the `Opening` state. Must be called within a tokio runtime.
    #[inline]
    pub fn new(guard: SessionGuard, period: Duration, shutdown: watch::Receiver<bool>) -> Self {
        let mut keep_alive = interval_at(Instant::now() + period, period);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            state: SessionState::Opening,
            pending: VecDeque::new(),
            keep_alive,
            shutdown,
            guard,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.guard.id()
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Queue the handshake notifications and start streaming
    #[inline]
    pub fn open(&mut self, tools: &ListToolsResult) -> McpResult<()> {
        if self.state != SessionState::Opening {
            return Ok(());
        }

        let initialized = data_frame(&JsonRpcNotification::initialized())?;
        let tools_list = data_frame(&JsonRpcNotification::new(
            METHOD_TOOLS_LIST,
            serde_json::to_value(tools)?,
        ))?;

        self.pending.push_back(initialized);
        self.pending.push_back(tools_list);
        self.state = SessionState::Streaming;
        info!("SSE session {} opened", self.id());
        Ok(())
    }

    /// Next frame to write, or `None` once the session is closed
    #[inline]
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        if self.state == SessionState::Closed {
            return None;
        }

        if let Some(frame) = self.pending.pop_front() {
            return Some(frame);
        }

        if *self.shutdown.borrow() {
            self.close();
            return None;
        }

        tokio::select! {
            _ = self.keep_alive.tick() => {
                debug!("SSE session {} keep-alive", self.id());
                Some(Bytes::from_static(KEEP_ALIVE_FRAME.as_bytes()))
            }
            _ = self.shutdown.changed() => {
                // A dropped sender means the server is gone as well
                self.close();
                None
            }
        }
    }

    #[inline]
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Closed;
            self.pending.clear();
            info!("SSE session {} closed by server", self.id());
        }
    }

    /// Turn the session into a response body stream
    #[inline]
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        futures::stream::unfold(self, |mut session| async move {
            session
                .next_frame()
                .await
                .map(|frame| (Ok(frame), session))
        })
    }
}

impl Drop for SseSession {
    #[inline]
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            info!("SSE session {} closed by peer", self.id());
        }
    }
}

/// `GET /sse`
pub(crate) async fn connect(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut session = state.new_session();
    session.open(&state.dispatcher.list_tools())?;

    let headers = [
        (header::CONTENT_TYPE, "text/event-stream"),
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    ];

    Ok((headers, Body::from_stream(session.into_stream())).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::Dispatcher;
    use serde_json::Value;

    fn parse_data(frame: &Bytes) -> Value {
        let text = std::str::from_utf8(frame).expect("utf-8 frame");
        let json = text
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("data frame");
        serde_json::from_str(json).expect("frame carries JSON")
    }

    fn tools() -> ListToolsResult {
        Dispatcher::with_builtin_tools()
            .expect("built-in tools")
            .list_tools()
    }

    #[test]
    fn data_frame_framing() {
        let frame = data_frame(&serde_json::json!({"a": 1})).expect("frames");
        assert_eq!(&frame[..], b"data: {\"a\":1}\n\n");
    }

    #[test]
    fn tracker_counts_guards() {
        let tracker = SessionTracker::new();
        let first = tracker.track();
        let second = tracker.track();
        assert_eq!(tracker.active(), 2);
        assert_ne!(first.id(), second.id());

        drop(first);
        assert_eq!(tracker.active(), 1);
        drop(second);
        assert_eq!(tracker.active(), 0);
    }

    #[tokio::test]
    async fn handshake_precedes_keep_alive() {
        let tracker = SessionTracker::new();
        let (_tx, rx) = watch::channel(false);
        let mut session = SseSession::new(tracker.track(), Duration::from_millis(20), rx);
        assert_eq!(session.state(), SessionState::Opening);

        session.open(&tools()).expect("handshake frames");
        assert_eq!(session.state(), SessionState::Streaming);

        let initialized = parse_data(&session.next_frame().await.expect("first frame"));
        assert_eq!(initialized["method"], "initialized");
        assert_eq!(initialized["params"], serde_json::json!({}));

        let listing = parse_data(&session.next_frame().await.expect("second frame"));
        assert_eq!(listing["method"], "tools/list");
        assert_eq!(listing["params"]["tools"].as_array().map(Vec::len), Some(4));

        let keep_alive = session.next_frame().await.expect("keep-alive frame");
        assert_eq!(&keep_alive[..], KEEP_ALIVE_FRAME.as_bytes());
    }

    #[tokio::test]
    async fn opening_twice_does_not_repeat_handshake() {
        let tracker = SessionTracker::new();
        let (_tx, rx) = watch::channel(false);
        let mut session = SseSession::new(tracker.track(), Duration::from_secs(60), rx);

        session.open(&tools()).expect("first open");
        session.open(&tools()).expect("second open is a no-op");
        assert_eq!(session.pending.len(), 2);
    }

    #[tokio::test]
    async fn shutdown_closes_session() {
        let tracker = SessionTracker::new();
        let (tx, rx) = watch::channel(false);
        let mut session = SseSession::new(tracker.track(), Duration::from_secs(60), rx);
        session.open(&tools()).expect("handshake frames");

        tx.send(true).expect("receiver alive");

        // Queued handshake frames still drain first
        assert!(session.next_frame().await.is_some());
        assert!(session.next_frame().await.is_some());
        assert!(session.next_frame().await.is_none());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn dropping_session_releases_slot() {
        let tracker = SessionTracker::new();
        let (_tx, rx) = watch::channel(false);

        let sessions: Vec<SseSession> = (0..5)
            .map(|_| SseSession::new(tracker.track(), Duration::from_secs(60), rx.clone()))
            .collect();
        assert_eq!(tracker.active(), 5);

        drop(sessions);
        assert_eq!(tracker.active(), 0);
    }
}
