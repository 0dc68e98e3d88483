//! Client sessions.
//!
//! Each accepted stream is split into a read pump, which decodes frames and
//! drives the join handshake, and a write pump, which owns the socket's
//! write half and serialises everything the client receives: queued frames,
//! periodic heartbeats and, once joined, the snapshot stream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::codec::{read_frame, BoatActionKind, EncodeError, JoinRole, Message, Packet};
use crate::game::RaceSnapshot;
use crate::network::broadcast::{join_packets, snapshot_packets, SERVER_SOURCE_ID};
use crate::network::context::{now_millis, ServerContext};
use crate::network::handshake::{ConnectionState, Handshake};
use crate::network::heartbeat::{HeartbeatEmitter, HeartbeatMonitor};
use crate::network::liveness::SessionId;
use crate::network::router::{route, Route};
use crate::network::simulation::EngineInput;

/// How long a closing session waits for queued frames to go out.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Bytes of a rejected frame dumped at trace level.
const HEX_DUMP_LEN: usize = 32;

/// Session errors. Each one ends only the session it occurred in.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Socket failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An outgoing message could not be framed.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The simulation task is gone.
    #[error("simulation stopped")]
    EngineClosed,
}

/// Registry entry for a live session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    /// Session id.
    pub id: SessionId,
    /// Remote address.
    pub peer: SocketAddr,
    /// Last heartbeat from the client.
    pub heartbeat: HeartbeatMonitor,
    /// Cancels both pumps.
    pub cancel: CancellationToken,
}

impl SessionHandle {
    /// Handle for a session accepted at `now_ms`.
    pub fn new(
        id: SessionId,
        peer: SocketAddr,
        now_ms: u64,
        liveness_threshold_ms: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            peer,
            heartbeat: HeartbeatMonitor::new(now_ms, liveness_threshold_ms),
            cancel,
        }
    }
}

/// Work for the write pump.
#[derive(Debug)]
pub enum Outbound {
    /// An encoded frame.
    Frame(Vec<u8>),
    /// Start forwarding snapshots.
    Subscribe(broadcast::Receiver<Arc<RaceSnapshot>>),
    /// Flush and close.
    Close,
}

/// Read side of one client connection.
pub struct ClientSession {
    handle: SessionHandle,
    ctx: Arc<ServerContext>,
    handshake: Handshake,
    outbound: mpsc::Sender<Outbound>,
}

impl ClientSession {
    /// Serve one client until it leaves, is declined, or is cancelled.
    ///
    /// Returns the final handshake state. A boat bound to the client is
    /// retired before returning.
    #[instrument(skip_all, fields(session = handle.id, peer = %handle.peer))]
    pub async fn run<S>(
        stream: S,
        ctx: Arc<ServerContext>,
        handle: SessionHandle,
    ) -> Result<ConnectionState, SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (tx, rx) = mpsc::channel(ctx.config.outbound_queue.max(1));
        let mut writer_task = tokio::spawn(write_pump(writer, rx, ctx.clone(), handle.cancel.clone()));

        let mut session = ClientSession {
            handle: handle.clone(),
            ctx: ctx.clone(),
            handshake: Handshake::new(),
            outbound: tx,
        };
        let read_result = session.read_pump(reader).await;
        session.handshake.close();
        let state = session.handshake.state();
        let bound = session.handshake.source_id();
        // Closes the outbound queue so the write pump drains and stops
        drop(session);

        match tokio::time::timeout(FLUSH_TIMEOUT, &mut writer_task).await {
            Ok(Ok(Ok(()))) => {}
            // Usually the peer hanging up mid-write
            Ok(Ok(Err(e))) => debug!("Write pump stopped: {}", e),
            Ok(Err(e)) => warn!("Write pump panicked: {}", e),
            Err(_) => {
                debug!("Write pump did not drain in time");
                writer_task.abort();
            }
        }
        handle.cancel.cancel();

        if let Some(source_id) = bound {
            let _ = ctx.engine.send(EngineInput::Leave { source_id }).await;
        }

        debug!(?state, "Session finished");
        read_result?;
        Ok(state)
    }

    async fn read_pump<R>(&mut self, mut reader: R) -> Result<(), SessionError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let frame = tokio::select! {
                _ = self.handle.cancel.cancelled() => return Ok(()),
                frame = read_frame(&mut reader) => frame?,
            };
            let Some(bytes) = frame else {
                debug!("Peer closed the stream");
                return Ok(());
            };

            self.handle_frame(&bytes).await?;
            if self.handshake.state() == ConnectionState::Declined {
                return Ok(());
            }
        }
    }

    async fn handle_frame(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let packet = match Packet::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(len = bytes.len(), "Dropping frame: {}", e);
                trace!(
                    head = %hex::encode(&bytes[..bytes.len().min(HEX_DUMP_LEN)]),
                    "Dropped frame bytes"
                );
                return Ok(());
            }
        };

        match route(self.handshake.state(), &packet.message) {
            Route::Join(role) => self.join(role).await,
            Route::Heartbeat => {
                self.handle.heartbeat.record(now_millis());
                Ok(())
            }
            Route::Action(action) => self.forward(action).await,
            Route::Ignore => {
                trace!(
                    type_code = packet.message.type_code(),
                    state = ?self.handshake.state(),
                    "Ignoring message"
                );
                Ok(())
            }
        }
    }

    async fn join(&mut self, role: JoinRole) -> Result<(), SessionError> {
        if let Err(e) = self.handshake.request(role) {
            debug!("{}", e);
            return Ok(());
        }

        let (reply, mut answer) = oneshot::channel();
        self.ctx
            .engine
            .send(EngineInput::Join { role, reply })
            .await
            .map_err(|_| SessionError::EngineClosed)?;

        let decided = tokio::select! {
            _ = self.handle.cancel.cancelled() => None,
            admission = &mut answer => Some(admission),
        };
        let admission = match decided {
            Some(admission) => admission.map_err(|_| SessionError::EngineClosed)?,
            None => {
                // A decision may have landed just as we were cancelled
                answer.close();
                if let Some(source_id) = answer.try_recv().ok().and_then(|a| a.boat()) {
                    let _ = self.ctx.engine.send(EngineInput::Leave { source_id }).await;
                }
                return Ok(());
            }
        };

        let acceptance = self.handshake.complete(admission);
        let now = now_millis();
        self.send(Packet::new(now, admission.source_id, Message::JoinAcceptance(acceptance)))
            .await?;

        if !admission.kind.is_success() {
            info!(?role, kind = ?admission.kind, "Join declined");
            self.queue(Outbound::Close).await;
            return Ok(());
        }

        info!(?role, kind = ?admission.kind, source_id = admission.source_id, "Client joined");
        let ctx = self.ctx.clone();
        for packet in join_packets(&ctx.documents, ctx.race_id, ctx.start_time_ms, now, &ctx.acks) {
            self.send(packet).await?;
        }
        self.queue(Outbound::Subscribe(ctx.snapshots.subscribe())).await;
        Ok(())
    }

    async fn forward(&self, action: BoatActionKind) -> Result<(), SessionError> {
        // Spectators have nothing to steer
        let Some(source_id) = self.handshake.source_id() else {
            trace!(?action, "Action without a boat");
            return Ok(());
        };
        self.ctx
            .engine
            .send(EngineInput::Action { source_id, action })
            .await
            .map_err(|_| SessionError::EngineClosed)
    }

    async fn send(&self, packet: Packet) -> Result<(), SessionError> {
        let bytes = packet.encode()?;
        self.queue(Outbound::Frame(bytes)).await;
        Ok(())
    }

    async fn queue(&self, item: Outbound) {
        // The write pump only stops once the session is ending
        if self.outbound.send(item).await.is_err() {
            trace!("Write pump already stopped");
        }
    }
}

async fn write_pump<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Outbound>,
    ctx: Arc<ServerContext>,
    cancel: CancellationToken,
) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    let result = pump_frames(&mut writer, &mut outbound, &ctx, &cancel).await;
    // A dead writer takes the read pump with it
    cancel.cancel();
    let _ = writer.shutdown().await;
    result
}

async fn pump_frames<W>(
    writer: &mut W,
    outbound: &mut mpsc::Receiver<Outbound>,
    ctx: &ServerContext,
    cancel: &CancellationToken,
) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    let mut heartbeat = interval(ctx.config.heartbeat_interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut emitter = HeartbeatEmitter::default();
    let mut snapshots: Option<broadcast::Receiver<Arc<RaceSnapshot>>> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => return Ok(()),

            item = outbound.recv() => match item {
                Some(Outbound::Frame(bytes)) => writer.write_all(&bytes).await?,
                Some(Outbound::Subscribe(receiver)) => snapshots = Some(receiver),
                Some(Outbound::Close) | None => {
                    writer.flush().await?;
                    return Ok(());
                }
            },

            _ = heartbeat.tick() => {
                let packet = Packet::new(now_millis(), SERVER_SOURCE_ID, Message::Heartbeat(emitter.next()));
                writer.write_all(&packet.encode()?).await?;
            }

            received = next_snapshot(&mut snapshots) => match received {
                Ok(snapshot) => {
                    let mut batch = Vec::new();
                    for packet in snapshot_packets(&snapshot) {
                        batch.extend_from_slice(&packet.encode()?);
                    }
                    writer.write_all(&batch).await?;
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Client fell behind, snapshots skipped");
                }
                Err(RecvError::Closed) => snapshots = None,
            },
        }
    }
}

async fn next_snapshot(
    snapshots: &mut Option<broadcast::Receiver<Arc<RaceSnapshot>>>,
) -> Result<Arc<RaceSnapshot>, RecvError> {
    match snapshots {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BoatAction, Heartbeat, JoinAcceptanceKind, RequestToJoin};
    use crate::config::ServerConfig;
    use crate::game::Admission;
    use crate::network::context::AckSequencer;
    use tokio::io::{duplex, DuplexStream};

    struct Harness {
        client: DuplexStream,
        engine: mpsc::Receiver<EngineInput>,
        handle: SessionHandle,
        session: tokio::task::JoinHandle<Result<ConnectionState, SessionError>>,
    }

    fn start() -> Harness {
        let (engine_tx, engine) = mpsc::channel(16);
        let (snapshots, _) = broadcast::channel(16);
        let ctx = Arc::new(ServerContext {
            config: ServerConfig::default(),
            race_id: 1,
            start_time_ms: 0,
            documents: Vec::new(),
            acks: Arc::new(AckSequencer::new()),
            engine: engine_tx,
            snapshots,
        });
        let (client, server) = duplex(64 * 1024);
        let handle = SessionHandle::new(
            1,
            SocketAddr::from(([127, 0, 0, 1], 9)),
            now_millis(),
            10_000,
            CancellationToken::new(),
        );
        let session = tokio::spawn(ClientSession::run(server, ctx, handle.clone()));
        Harness {
            client,
            engine,
            handle,
            session,
        }
    }

    async fn send(client: &mut DuplexStream, message: Message) {
        let bytes = Packet::new(now_millis(), 0, message).encode().unwrap();
        client.write_all(&bytes).await.unwrap();
    }

    /// Next message from the server that is not a heartbeat.
    async fn receive(client: &mut DuplexStream) -> Option<Message> {
        loop {
            let bytes = read_frame(client).await.unwrap()?;
            match Packet::decode(&bytes).unwrap().message {
                Message::Heartbeat(_) => continue,
                other => return Some(other),
            }
        }
    }

    async fn answer_join(engine: &mut mpsc::Receiver<EngineInput>, admission: Admission) -> JoinRole {
        match engine.recv().await {
            Some(EngineInput::Join { role, reply }) => {
                reply.send(admission).unwrap();
                role
            }
            other => panic!("expected a join, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_actions_only_after_connect() {
        let mut h = start();
        send(&mut h.client, Message::BoatAction(BoatAction { action: BoatActionKind::Upwind })).await;
        send(&mut h.client, Message::RequestToJoin(RequestToJoin { role: JoinRole::Participant })).await;

        // The early action must not have reached the race
        let role = answer_join(
            &mut h.engine,
            Admission {
                kind: JoinAcceptanceKind::Participant,
                source_id: 121,
            },
        )
        .await;
        assert_eq!(role, JoinRole::Participant);

        match receive(&mut h.client).await {
            Some(Message::JoinAcceptance(acceptance)) => {
                assert_eq!(acceptance.kind, JoinAcceptanceKind::Participant);
                assert_eq!(acceptance.source_id, 121);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
        assert!(matches!(receive(&mut h.client).await, Some(Message::RaceStartStatus(_))));

        send(&mut h.client, Message::BoatAction(BoatAction { action: BoatActionKind::TackGybe })).await;
        match h.engine.recv().await {
            Some(EngineInput::Action { source_id, action }) => {
                assert_eq!(source_id, 121);
                assert_eq!(action, BoatActionKind::TackGybe);
            }
            other => panic!("expected an action, got {:?}", other),
        }

        drop(h.client);
        assert!(matches!(
            h.engine.recv().await,
            Some(EngineInput::Leave { source_id: 121 })
        ));
        assert_eq!(h.session.await.unwrap().unwrap(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_declined_join_closes_stream() {
        let mut h = start();
        send(&mut h.client, Message::RequestToJoin(RequestToJoin { role: JoinRole::Ghost })).await;
        answer_join(
            &mut h.engine,
            Admission {
                kind: JoinAcceptanceKind::ServerFull,
                source_id: 0,
            },
        )
        .await;

        match receive(&mut h.client).await {
            Some(Message::JoinAcceptance(acceptance)) => {
                assert_eq!(acceptance.kind, JoinAcceptanceKind::ServerFull);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
        assert_eq!(receive(&mut h.client).await, None);
        assert_eq!(h.session.await.unwrap().unwrap(), ConnectionState::Declined);
        // Nothing to retire
        assert!(h.engine.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_before_join_times_out() {
        let h = start();
        drop(h.client);
        assert_eq!(h.session.await.unwrap().unwrap(), ConnectionState::TimedOut);
    }

    #[tokio::test]
    async fn test_bad_frames_are_skipped() {
        let mut h = start();
        let mut corrupt = Packet::new(0, 0, Message::Heartbeat(Heartbeat { sequence: 1 }))
            .encode()
            .unwrap();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;
        h.client.write_all(&corrupt).await.unwrap();

        // The session is still reading
        send(&mut h.client, Message::RequestToJoin(RequestToJoin { role: JoinRole::Spectator })).await;
        answer_join(
            &mut h.engine,
            Admission {
                kind: JoinAcceptanceKind::Spectator,
                source_id: 0,
            },
        )
        .await;
        assert!(matches!(receive(&mut h.client).await, Some(Message::JoinAcceptance(_))));

        // Spectator actions go nowhere
        send(&mut h.client, Message::BoatAction(BoatAction { action: BoatActionKind::Vmg })).await;
        h.handle.cancel.cancel();
        assert_eq!(h.session.await.unwrap().unwrap(), ConnectionState::Connected);
        assert!(h.engine.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_heartbeat_refreshes_liveness() {
        let mut h = start();
        let before = h.handle.heartbeat.last_seen();
        tokio::time::sleep(Duration::from_millis(5)).await;
        send(&mut h.client, Message::Heartbeat(Heartbeat { sequence: 0 })).await;
        send(&mut h.client, Message::RequestToJoin(RequestToJoin { role: JoinRole::Spectator })).await;
        // Frames are handled in order, so the heartbeat is in by now
        let _ = h.engine.recv().await;
        assert!(h.handle.heartbeat.last_seen() > before);
        h.handle.cancel.cancel();
        let _ = h.session.await;
    }
}
