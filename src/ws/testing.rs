//! In-memory sockets and a scripted engine for subscription tests.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream};
use futures_util::{FutureExt, Sink, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::messages::Envelope;
use crate::engine::{ExecutionEngine, ExecutionResult, GraphQLRequest};

pub(crate) type TestStream = BoxStream<'static, Result<Message, String>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(100);

/// Write half handed to the server side; records frames and closes.
#[derive(Debug)]
pub(crate) struct RecordingSink {
    tx: mpsc::UnboundedSender<Message>,
    fail: Arc<AtomicBool>,
    stall: Arc<AtomicBool>,
    stalled: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Sink<Message> for RecordingSink {
    type Error = String;

    /// Never becomes ready while stalled, like a peer that stopped reading.
    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        if self.stall.load(Ordering::SeqCst) {
            self.stalled.fetch_add(1, Ordering::SeqCst);
            return Poll::Pending;
        }
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("connection reset by peer".to_string());
        }
        self.tx.send(item).map_err(|_| "peer dropped".to_string())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Client end of an in-memory socket.
#[derive(Debug)]
pub(crate) struct TestPeer {
    to_server: Option<mpsc::UnboundedSender<Result<Message, String>>>,
    from_server: mpsc::UnboundedReceiver<Message>,
    fail: Arc<AtomicBool>,
    stall: Arc<AtomicBool>,
    stalled: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

/// Creates a connected `(server sink, server stream, client)` triple.
pub(crate) fn socket_pair() -> (RecordingSink, TestStream, TestPeer) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<Result<Message, String>>();
    let fail = Arc::new(AtomicBool::new(false));
    let stall = Arc::new(AtomicBool::new(false));
    let stalled = Arc::new(AtomicUsize::new(0));
    let closes = Arc::new(AtomicUsize::new(0));

    let sink = RecordingSink {
        tx: out_tx,
        fail: Arc::clone(&fail),
        stall: Arc::clone(&stall),
        stalled: Arc::clone(&stalled),
        closes: Arc::clone(&closes),
    };
    let stream = stream::unfold(in_rx, |mut rx| async move {
        rx.recv().await.map(|frame| (frame, rx))
    })
    .boxed();
    let peer = TestPeer {
        to_server: Some(in_tx),
        from_server: out_rx,
        fail,
        stall,
        stalled,
        closes,
    };
    (sink, stream, peer)
}

impl TestPeer {
    pub(crate) fn send_text(&self, text: &str) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(Ok(Message::text(text.to_string())));
        }
    }

    pub(crate) fn send_json(&self, value: Value) {
        self.send_text(&value.to_string());
    }

    pub(crate) fn start(&self, id: &str, query: &str) {
        self.send_json(json!({ "type": "start", "id": id, "payload": { "query": query } }));
    }

    pub(crate) fn stop(&self, id: &str) {
        self.send_json(json!({ "type": "stop", "id": id }));
    }

    pub(crate) fn send_read_error(&self) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(Err("read timed out".to_string()));
        }
    }

    pub(crate) fn send_close(&self) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(Ok(Message::Close(None)));
        }
    }

    /// Ends the inbound stream as a peer disconnect would.
    pub(crate) fn hang_up(&mut self) {
        self.to_server = None;
    }

    pub(crate) fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Stops accepting frames; pending writes hang until abandoned.
    pub(crate) fn stall_writes(&self) {
        self.stall.store(true, Ordering::SeqCst);
    }

    /// Number of times a write found the socket stalled.
    pub(crate) fn stalled_writes(&self) -> usize {
        self.stalled.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Next envelope written by the server, or `None` on timeout/close.
    pub(crate) async fn next_envelope(&mut self) -> Option<Envelope> {
        let frame = tokio::time::timeout(RECV_TIMEOUT, self.from_server.recv())
            .await
            .ok()
            .flatten()?;
        match frame {
            Message::Text(text) => Envelope::decode(text.as_str().as_bytes()).ok(),
            _ => None,
        }
    }

    /// Asserts nothing is written for a short window.
    #[allow(clippy::panic)]
    pub(crate) async fn expect_silence(&mut self) {
        if let Ok(Some(frame)) = tokio::time::timeout(SILENCE_WINDOW, self.from_server.recv()).await {
            panic!("expected no frame, got {frame:?}");
        }
    }
}

/// Engine whose subscription streams are fed by the test.
///
/// Each `subscribe` call takes the oldest feed registered with
/// [`ScriptedEngine::feed`]; without one, the stream is empty.
#[derive(Debug, Default)]
pub(crate) struct ScriptedEngine {
    feeds: Mutex<VecDeque<mpsc::UnboundedReceiver<ExecutionResult>>>,
    calls: Mutex<Vec<(GraphQLRequest, CancellationToken)>>,
    executed: Mutex<Vec<GraphQLRequest>>,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn feed(&self) -> mpsc::UnboundedSender<ExecutionResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(rx);
        tx
    }

    /// Cancellation scopes handed to `subscribe`, oldest first.
    pub(crate) fn scopes(&self) -> Vec<CancellationToken> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, scope)| scope.clone())
            .collect()
    }

    /// Requests handed to `execute`, oldest first.
    pub(crate) fn executed(&self) -> Vec<GraphQLRequest> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(request, _)| request.query.clone())
            .collect()
    }
}

impl ExecutionEngine for ScriptedEngine {
    fn execute(&self, request: GraphQLRequest) -> BoxFuture<'static, ExecutionResult> {
        let result = if request.is_blank() {
            ExecutionResult::from_error("Must provide an operation.")
        } else {
            ExecutionResult::from_data(json!({ "query": &request.query }))
        };
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        std::future::ready(result).boxed()
    }

    fn subscribe(
        &self,
        request: GraphQLRequest,
        cancel: CancellationToken,
    ) -> BoxStream<'static, ExecutionResult> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((request, cancel));
        let feed = self
            .feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match feed {
            Some(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed(),
            None => stream::empty::<ExecutionResult>().boxed(),
        }
    }
}

/// Shorthand for a result whose data is `{"onEvent": value}`.
pub(crate) fn event(value: &str) -> ExecutionResult {
    ExecutionResult::from_data(json!({ "onEvent": value }))
}

/// Polls `check` until it holds or the receive timeout elapses.
pub(crate) async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
