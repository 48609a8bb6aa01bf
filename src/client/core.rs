//! Presence client and its connection state machine.
//!
//! The [`Client`] is the single owner of the connection to the peer. All
//! state changes (connect, disconnect, reconnect, presence updates and
//! session notifications) serialize through one lock, which is never held
//! across an await point.
//!
//! # Example
//!
//! ```no_run
//! use rich_presence_ipc::{Activity, Client};
//!
//! # async fn example() -> rich_presence_ipc::Result<()> {
//! let client = Client::builder(1_234_567_890_u64).build()?;
//!
//! let result = client.connect().await;
//! if let Some(e) = result.error() {
//!     eprintln!("not connected yet: {e}");
//! }
//!
//! client.update(Some(Activity::builder().details("Editing main.rs").build()?));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::activity::Activity;
use crate::error::Error;
use crate::identifiers::{ClientId, SessionId};
use crate::transport::{self, Session, SessionEvent, Transport};

use super::builder::ClientBuilder;
use super::handle::ConnectHandle;
use super::state::{ConnectResult, ConnectionState};
use super::throttle::{Decision, Throttle};

// ============================================================================
// Types
// ============================================================================

/// Settings fixed at construction.
#[derive(Debug, Clone)]
pub(crate) struct ClientConfig {
    pub client_id: ClientId,
    pub candidates: Vec<PathBuf>,
    pub auto_reconnect: bool,
    pub reconnect_delay: Duration,
    pub update_interval: Duration,
}

/// A connect attempt that has not finished yet.
pub(crate) struct InFlight {
    pub handle: ConnectHandle,
    pub token: CancellationToken,
}

/// Everything guarded by the client lock.
pub(crate) struct ClientState {
    pub state: ConnectionState,
    /// Id used by the next session.
    pub client_id: ClientId,
    /// Live session. Set exactly when the state is `Connected` or `Ready`.
    pub session: Option<Session>,
    pub connect: Option<InFlight>,
    pub reconnect: Option<CancellationToken>,
    pub throttle: Throttle,
}

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    pub config: ClientConfig,
    pub runtime: Handle,
    pub state: Mutex<ClientState>,
    /// Published copy of `ClientState::state`.
    pub state_tx: watch::Sender<ConnectionState>,
    pub events_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Parent of every task token. Cancelled on close or drop.
    pub root: CancellationToken,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

// ============================================================================
// Client
// ============================================================================

/// Rich presence client.
///
/// Cheap to clone; clones share one connection. Dropping the last clone
/// closes the client.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl Client {
    /// Creates a configuration builder for the given application id.
    #[inline]
    #[must_use]
    pub fn builder(client_id: impl Into<ClientId>) -> ClientBuilder {
        ClientBuilder::new(client_id)
    }

    /// Starts connecting to the peer.
    ///
    /// While an attempt is in flight every call returns a clone of the same
    /// handle. When already connected the handle resolves to
    /// [`ConnectResult::AlreadyConnected`] and nothing changes.
    ///
    /// A user connect cancels a pending automatic reconnect.
    pub fn connect(&self) -> ConnectHandle {
        let mut st = self.inner.state.lock();
        self.inner.connect_locked(&mut st, true)
    }

    /// Closes the session and cancels pending work.
    ///
    /// Returns `false` if the client was already disconnected.
    pub fn disconnect(&self) -> bool {
        let mut st = self.inner.state.lock();
        self.inner.disconnect_locked(&mut st)
    }

    /// Disconnects and connects again under one lock.
    ///
    /// Never resolves to [`ConnectResult::AlreadyConnected`].
    pub fn reconnect(&self) -> ConnectHandle {
        let mut st = self.inner.state.lock();
        self.inner.disconnect_locked(&mut st);
        self.inner.connect_locked(&mut st, true)
    }

    /// Requests a presence update. `None` clears the presence.
    ///
    /// Requests equal to the previous one are ignored. Sends are spaced by
    /// at least [`UPDATE_INTERVAL`](super::UPDATE_INTERVAL); requests made
    /// inside the window are coalesced into one deferred send of the latest
    /// value. While not ready the value is kept and sent once the peer
    /// reports `READY`.
    pub fn update(&self, activity: Option<Activity>) {
        let mut st = self.inner.state.lock();
        if !st.throttle.request(activity) {
            trace!("Presence unchanged, skipping update");
            return;
        }
        self.inner.flush_locked(&mut st);
    }

    /// Clears the presence.
    #[inline]
    pub fn clear(&self) {
        self.update(None);
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribes to state changes.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Returns the id used by the next connection.
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.inner.state.lock().client_id
    }

    /// Changes the application id.
    ///
    /// Takes effect on the next connection; call [`Client::reconnect`] to
    /// apply it now.
    pub fn set_client_id(&self, client_id: impl Into<ClientId>) {
        let client_id = client_id.into();
        self.inner.state.lock().client_id = client_id;
        debug!(%client_id, "Client id changed");
    }

    /// Disconnects and cancels every task owned by this client.
    ///
    /// Later calls to [`Client::connect`] resolve to
    /// [`ConnectResult::Cancelled`].
    pub fn close(&self) {
        {
            let mut st = self.inner.state.lock();
            self.inner.disconnect_locked(&mut st);
        }
        self.inner.root.cancel();
        info!("Client closed");
    }
}

// ============================================================================
// Client - Internal API
// ============================================================================

impl Client {
    /// Creates the client and starts its event pump.
    pub(crate) fn new(config: ClientConfig, runtime: Handle) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let root = CancellationToken::new();

        let inner = Arc::new(ClientInner {
            state: Mutex::new(ClientState {
                state: ConnectionState::Disconnected,
                client_id: config.client_id,
                session: None,
                connect: None,
                reconnect: None,
                throttle: Throttle::new(config.update_interval),
            }),
            config,
            runtime,
            state_tx,
            events_tx,
            root,
        });

        inner.runtime.spawn(pump_events(
            Arc::downgrade(&inner),
            events_rx,
            inner.root.clone(),
        ));

        debug!(
            client_id = %inner.config.client_id,
            candidates = inner.config.candidates.len(),
            auto_reconnect = inner.config.auto_reconnect,
            "Client initialized"
        );

        Self { inner }
    }
}

/// Feeds session events into the state machine until the client is gone.
async fn pump_events(
    client: Weak<ClientInner>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    root: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = root.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let Some(inner) = client.upgrade() else {
            break;
        };

        match event {
            SessionEvent::Ready(id) => inner.on_ready(id),
            SessionEvent::Closed(id) => inner.on_closed(id),
        }
    }

    trace!("Event pump stopped");
}

// ============================================================================
// ClientInner - State Machine
// ============================================================================

impl ClientInner {
    /// Moves to `next` and publishes it.
    pub(crate) fn set_state(&self, st: &mut ClientState, next: ConnectionState) {
        if st.state == next {
            return;
        }
        trace!(from = %st.state, to = %next, "State changed");
        st.state = next;
        self.state_tx.send_replace(next);
    }

    pub(crate) fn connect_locked(
        self: &Arc<Self>,
        st: &mut ClientState,
        user_triggered: bool,
    ) -> ConnectHandle {
        match st.state {
            ConnectionState::Connected | ConnectionState::Ready => {
                return ConnectHandle::ready(ConnectResult::AlreadyConnected);
            }
            ConnectionState::Connecting => {
                if let Some(in_flight) = &st.connect {
                    return in_flight.handle.clone();
                }
            }
            ConnectionState::Disconnected => {}
        }

        if self.root.is_cancelled() {
            return ConnectHandle::ready(ConnectResult::Cancelled);
        }

        if user_triggered {
            self.cancel_reconnect(st);
        }

        let token = self.root.child_token();
        self.set_state(st, ConnectionState::Connecting);
        debug!(user_triggered, "Connecting to peer");

        let attempt = Arc::clone(self).run_connect(token.clone(), user_triggered);
        let handle = ConnectHandle::spawn(&self.runtime, attempt);
        st.connect = Some(InFlight {
            handle: handle.clone(),
            token,
        });
        handle
    }

    /// One discovery pass. Runs on its own task.
    async fn run_connect(
        self: Arc<Self>,
        token: CancellationToken,
        user_triggered: bool,
    ) -> ConnectResult {
        let opened = tokio::select! {
            _ = token.cancelled() => return ConnectResult::Cancelled,
            opened = transport::open(&self.config.candidates) => opened,
        };

        let mut st = self.state.lock();
        if token.is_cancelled() {
            // Dropping the transport here closes it.
            debug!("Connect attempt cancelled");
            return ConnectResult::Cancelled;
        }
        st.connect = None;

        match opened {
            Ok(transport) => {
                let session_id = self.attach_locked(&mut st, transport);
                info!(%session_id, "Connected to peer");
                ConnectResult::Success
            }
            Err(e) => {
                match &e {
                    Error::PeerNotFound if user_triggered => info!("Discord is not running"),
                    Error::PeerNotFound => debug!("Discord is not running"),
                    _ => error!(error = %e, "Failed to connect to peer"),
                }
                self.set_state(&mut st, ConnectionState::Disconnected);
                self.schedule_reconnect(&mut st);
                ConnectResult::Failed(Arc::new(e))
            }
        }
    }

    /// Starts a session over `transport` and moves to `Connected`.
    pub(crate) fn attach_locked(&self, st: &mut ClientState, transport: Transport) -> SessionId {
        let session = Session::spawn(
            &self.runtime,
            st.client_id,
            transport,
            self.events_tx.clone(),
            self.root.child_token(),
        );
        let session_id = session.id();
        st.session = Some(session);
        self.set_state(st, ConnectionState::Connected);
        session_id
    }

    pub(crate) fn disconnect_locked(&self, st: &mut ClientState) -> bool {
        self.cancel_reconnect(st);
        st.throttle.cancel_deferred();
        if let Some(in_flight) = st.connect.take() {
            in_flight.token.cancel();
        }

        match st.state {
            ConnectionState::Disconnected => false,
            ConnectionState::Connecting => {
                debug!("Cancelled in-flight connect");
                self.set_state(st, ConnectionState::Disconnected);
                true
            }
            ConnectionState::Connected | ConnectionState::Ready => {
                if let Some(session) = st.session.take() {
                    session.close();
                    info!(session_id = %session.id(), "Disconnected from peer");
                }
                self.set_state(st, ConnectionState::Disconnected);
                true
            }
        }
    }

    /// Returns the live session if its id is `id`.
    fn current_session(st: &ClientState, id: SessionId) -> Option<Session> {
        st.session.as_ref().filter(|s| s.id() == id).cloned()
    }

    pub(crate) fn on_ready(self: &Arc<Self>, id: SessionId) {
        let mut st = self.state.lock();
        let Some(session) = Self::current_session(&st, id) else {
            debug!(session_id = %id, "Ignoring READY from stale session");
            return;
        };

        st.throttle.cancel_deferred();
        if let Some(pending) = st.throttle.pending()
            && session.send_activity(pending)
        {
            st.throttle.mark_sent(Instant::now());
        }

        self.set_state(&mut st, ConnectionState::Ready);
        info!(session_id = %id, "Peer is ready");
    }

    pub(crate) fn on_closed(self: &Arc<Self>, id: SessionId) {
        let mut st = self.state.lock();
        if Self::current_session(&st, id).is_none() {
            trace!(session_id = %id, "Ignoring close of stale session");
            return;
        }

        st.session = None;
        st.throttle.cancel_deferred();
        self.set_state(&mut st, ConnectionState::Disconnected);
        info!(session_id = %id, "Connection to peer closed");
        self.schedule_reconnect(&mut st);
    }
}

// ============================================================================
// ClientInner - Presence
// ============================================================================

impl ClientInner {
    /// Sends or schedules the pending presence according to the throttle.
    pub(crate) fn flush_locked(self: &Arc<Self>, st: &mut ClientState) {
        if st.state != ConnectionState::Ready {
            return;
        }

        let now = Instant::now();
        match st.throttle.decide(now) {
            Decision::SendNow => {
                st.throttle.cancel_deferred();
                Self::send_pending(st, now);
            }
            Decision::Defer(delay) => self.schedule_deferred(st, delay),
            Decision::Idle => trace!("Presence send already scheduled"),
        }
    }

    fn send_pending(st: &mut ClientState, now: Instant) {
        let (Some(session), Some(pending)) = (st.session.as_ref(), st.throttle.pending()) else {
            return;
        };
        if session.send_activity(pending) {
            st.throttle.mark_sent(now);
        }
    }

    fn schedule_deferred(self: &Arc<Self>, st: &mut ClientState, delay: Duration) {
        let token = self.root.child_token();
        st.throttle.set_deferred(token.clone());
        trace!(delay_ms = delay.as_millis() as u64, "Deferring presence send");

        let client = Arc::downgrade(self);
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let Some(inner) = client.upgrade() else {
                return;
            };
            let mut st = inner.state.lock();
            if token.is_cancelled() {
                return;
            }
            st.throttle.clear_deferred();

            if st.state == ConnectionState::Ready {
                Self::send_pending(&mut st, Instant::now());
                debug!("Sent deferred presence");
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};
    use tokio::io::DuplexStream;
    use tokio::time::timeout;

    use crate::protocol::{Frame, Opcode, read_frame, write_frame};

    const WAIT: Duration = Duration::from_secs(60);

    fn offline_client() -> Client {
        Client::builder(42_u64)
            .candidate_dirs(Vec::<PathBuf>::new())
            .auto_reconnect(false)
            .build()
            .unwrap()
    }

    /// Installs a session over an in-memory transport.
    fn attach(client: &Client) -> (SessionId, DuplexStream) {
        let (local, peer) = tokio::io::duplex(64 * 1024);
        let mut st = client.inner.state.lock();
        let id = client.inner.attach_locked(&mut st, Box::new(local));
        (id, peer)
    }

    async fn next_frame(peer: &mut DuplexStream) -> Frame {
        timeout(WAIT, read_frame(peer)).await.unwrap().unwrap()
    }

    async fn next_details(peer: &mut DuplexStream) -> Value {
        let frame = next_frame(peer).await;
        assert_eq!(frame.opcode, Opcode::Message.as_i32());
        let message: Value = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(message["cmd"], "SET_ACTIVITY");
        message["args"]["activity"]["details"].clone()
    }

    async fn make_ready(client: &Client, peer: &mut DuplexStream) {
        let handshake = next_frame(peer).await;
        assert_eq!(handshake.opcode, Opcode::Handshake.as_i32());

        let ready = json!({ "cmd": "DISPATCH", "evt": "READY", "data": {}, "nonce": null });
        write_frame(peer, &Frame::json(Opcode::Message, &ready).unwrap())
            .await
            .unwrap();

        let mut states = client.subscribe();
        timeout(WAIT, states.wait_for(|s| s.is_ready()))
            .await
            .unwrap()
            .unwrap();
    }

    fn activity(details: &str) -> Activity {
        Activity {
            details: Some(details.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connect_twice_joins_in_flight_attempt() {
        let client = offline_client();

        let first = client.connect();
        let second = client.connect();
        assert!(first.ptr_eq(&second));
        assert_eq!(client.state(), ConnectionState::Connecting);

        let (a, b) = tokio::join!(first, second);
        assert!(a.error().is_some_and(Error::is_peer_not_found));
        assert!(b.error().is_some_and(Error::is_peer_not_found));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_while_ready_is_already_connected() {
        let client = offline_client();
        let (id, mut peer) = attach(&client);
        make_ready(&client, &mut peer).await;

        let result = client.connect().await;
        assert!(matches!(result, ConnectResult::AlreadyConnected));

        let st = client.inner.state.lock();
        assert_eq!(st.session.as_ref().map(Session::id), Some(id));
    }

    #[tokio::test]
    async fn test_disconnect_during_connect_cancels_attempt() {
        let client = offline_client();
        let handle = client.connect();

        assert!(client.disconnect());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(matches!(handle.await, ConnectResult::Cancelled));
        assert!(!client.disconnect());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disconnect_after_open_closes_transport() {
        use tokio::io::AsyncReadExt;
        use tokio::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let listener = UnixListener::bind(dir.path().join("discord-ipc-0")).unwrap();
        let client = Client::builder(42_u64)
            .candidate_dirs([dir.path()])
            .auto_reconnect(false)
            .build()
            .unwrap();

        // Holding the lock parks the attempt between opening the socket
        // and attaching a session.
        let mut st = client.inner.state.lock();
        let handle = client.inner.connect_locked(&mut st, true);
        let (mut peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(client.inner.disconnect_locked(&mut st));
        drop(st);

        assert!(matches!(handle.await, ConnectResult::Cancelled));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.inner.state.lock().session.is_none());

        // No handshake was written before the transport was closed.
        let mut received = Vec::new();
        let read = timeout(WAIT, peer.read_to_end(&mut received)).await.unwrap();
        assert_eq!(read.unwrap(), 0);
    }

    #[test]
    fn test_session_runs_on_client_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let client = runtime.block_on(async { offline_client() });

        // Attached from a thread that is not inside any runtime.
        let (id, mut peer) = std::thread::spawn({
            let client = client.clone();
            move || attach(&client)
        })
        .join()
        .unwrap();

        let handshake = runtime.block_on(next_frame(&mut peer));
        assert_eq!(handshake.opcode, Opcode::Handshake.as_i32());
        assert_eq!(
            client.inner.state.lock().session.as_ref().map(Session::id),
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_stale_session_events_are_ignored() {
        let client = offline_client();
        let (current, _peer) = attach(&client);
        let stale = SessionId::next();

        client.inner.on_ready(stale);
        assert_eq!(client.state(), ConnectionState::Connected);

        client.inner.on_closed(stale);
        assert_eq!(client.state(), ConnectionState::Connected);

        let st = client.inner.state.lock();
        assert_eq!(st.session.as_ref().map(Session::id), Some(current));
    }

    #[tokio::test]
    async fn test_superseded_session_ready_does_not_win() {
        let client = offline_client();
        let (first, _first_peer) = attach(&client);
        assert!(client.disconnect());
        let (second, _second_peer) = attach(&client);

        client.inner.on_ready(first);
        assert_eq!(client.state(), ConnectionState::Connected);

        client.inner.on_ready(second);
        assert_eq!(client.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn test_pending_activity_flushed_on_ready() {
        let client = offline_client();
        client.update(Some(activity("Before ready")));

        let (_, mut peer) = attach(&client);
        make_ready(&client, &mut peer).await;

        assert_eq!(next_details(&mut peer).await, "Before ready");
    }

    #[tokio::test]
    async fn test_clear_sends_null_activity() {
        let client = offline_client();
        let (_, mut peer) = attach(&client);
        make_ready(&client, &mut peer).await;

        client.clear();

        let frame = next_frame(&mut peer).await;
        let message: Value = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(message["args"]["activity"], Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_are_coalesced_within_interval() {
        let client = offline_client();
        let (_, mut peer) = attach(&client);
        make_ready(&client, &mut peer).await;

        let start = Instant::now();
        client.update(Some(activity("A")));
        assert_eq!(next_details(&mut peer).await, "A");

        tokio::time::sleep(Duration::from_secs(3)).await;
        client.update(Some(activity("B")));
        tokio::time::sleep(Duration::from_secs(3)).await;
        client.update(Some(activity("C")));

        assert_eq!(next_details(&mut peer).await, "C");
        assert!(start.elapsed() >= Duration::from_secs(15));

        // Identical request: nothing goes out.
        client.update(Some(activity("C")));
        let idle = timeout(Duration::from_secs(30), read_frame(&mut peer)).await;
        assert!(idle.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_deferred_send() {
        let client = offline_client();
        let (_, mut peer) = attach(&client);
        make_ready(&client, &mut peer).await;

        client.update(Some(activity("A")));
        assert_eq!(next_details(&mut peer).await, "A");

        client.update(Some(activity("B")));
        assert!(client.inner.state.lock().throttle.has_deferred());
        assert!(client.disconnect());
        assert!(!client.inner.state.lock().throttle.has_deferred());

        // The session closes without ever sending B.
        let rest = timeout(Duration::from_secs(30), read_frame(&mut peer)).await.unwrap();
        assert!(matches!(rest, Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_peer_close_moves_to_disconnected() {
        let client = offline_client();
        let (_, peer) = attach(&client);
        let mut states = client.subscribe();

        drop(peer);

        timeout(WAIT, states.wait_for(|s| *s == ConnectionState::Disconnected))
            .await
            .unwrap()
            .unwrap();
        assert!(client.inner.state.lock().session.is_none());
    }

    #[tokio::test]
    async fn test_close_cancels_future_connects() {
        let client = offline_client();
        let (_, _peer) = attach(&client);

        client.close();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(matches!(client.connect().await, ConnectResult::Cancelled));
    }

    #[tokio::test]
    async fn test_set_client_id_applies_to_next_session() {
        let client = offline_client();
        client.set_client_id(777_u64);
        assert_eq!(client.client_id(), ClientId::new(777));

        let (_, mut peer) = attach(&client);
        let handshake = next_frame(&mut peer).await;
        let body: Value = serde_json::from_slice(&handshake.payload).unwrap();
        assert_eq!(body["client_id"], "777");
    }
}
