//! Race Server
//!
//! TCP acceptor for race clients. Owns the listener, the session registry,
//! the liveness sweeper and the simulation task.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{RaceConfig, ServerConfig};
use crate::game::{CourseError, RaceEngine};
use crate::network::context::{now_millis, AckSequencer, ServerContext};
use crate::network::liveness::{LivenessTracker, SessionId};
use crate::network::session::{ClientSession, SessionHandle};
use crate::network::simulation::{run_simulation, EngineInput};

/// Depth of the shared command channel into the simulation.
const ENGINE_QUEUE: usize = 1024;

/// Live sessions by id.
pub type SessionRegistry = Arc<RwLock<BTreeMap<SessionId, SessionHandle>>>;

/// Race server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address requested.
        addr: SocketAddr,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// Socket error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured course cannot be raced.
    #[error("Invalid course: {0}")]
    Course(#[from] CourseError),
}

/// Handle for stopping a running server and inspecting its sessions.
#[derive(Clone, Debug)]
pub struct ServerHandle {
    shutdown_tx: broadcast::Sender<()>,
    sessions: SessionRegistry,
}

impl ServerHandle {
    /// Ask the server to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Number of registered sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// The race server.
pub struct RaceServer {
    /// Server configuration.
    config: ServerConfig,
    /// Bound listener.
    listener: TcpListener,
    /// State shared with sessions.
    ctx: Arc<ServerContext>,
    /// Engine, handed to the simulation task on `run`.
    engine: RaceEngine,
    /// Receiving end of the command channel.
    inputs: mpsc::Receiver<EngineInput>,
    /// Live sessions.
    sessions: SessionRegistry,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl RaceServer {
    /// Set up the race and bind the listener.
    pub async fn bind(config: ServerConfig, race: RaceConfig) -> Result<Self, ServerError> {
        let engine = RaceEngine::new(&race, now_millis())?;
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr,
                source,
            })?;

        let (engine_tx, inputs) = mpsc::channel(ENGINE_QUEUE);
        let (snapshots, _) = broadcast::channel(config.outbound_queue.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);

        let state = engine.state();
        let ctx = Arc::new(ServerContext {
            config: config.clone(),
            race_id: state.race_id,
            start_time_ms: state.start_time_ms,
            documents: state.course.join_documents(state.race_id),
            acks: Arc::new(AckSequencer::new()),
            engine: engine_tx,
            snapshots,
        });

        Ok(Self {
            config,
            listener,
            ctx,
            engine,
            inputs,
            sessions: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared server context.
    pub fn context(&self) -> Arc<ServerContext> {
        self.ctx.clone()
    }

    /// Handle for shutdown and session counts.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown_tx: self.shutdown_tx.clone(),
            sessions: self.sessions.clone(),
        }
    }

    /// Run the server until shutdown.
    ///
    /// At most `max_clients` sessions are served at once; further clients
    /// wait in the listen backlog until a session ends.
    #[instrument(skip(self), fields(addr = %self.config.bind_addr))]
    pub async fn run(self) -> Result<(), ServerError> {
        let RaceServer {
            config,
            listener,
            ctx,
            engine,
            inputs,
            sessions,
            shutdown_tx,
        } = self;
        info!("Race server listening on {}", listener.local_addr()?);

        let root = CancellationToken::new();

        // Spawn simulation task
        let simulation_handle = tokio::spawn(run_simulation(
            engine,
            inputs,
            ctx.snapshots.clone(),
            ctx.acks.clone(),
            config.frame_period(),
            root.child_token(),
        ));

        // Spawn liveness sweeper
        let sweeper_handle = tokio::spawn(run_liveness_sweep(
            sessions.clone(),
            config.clone(),
            root.child_token(),
        ));

        let permits = Arc::new(Semaphore::new(config.max_clients.max(1)));
        let mut shutdown_rx = shutdown_tx.subscribe();
        let mut next_session: SessionId = 1;

        loop {
            // Hold a slot before accepting so a full server leaves clients queued
            let permit = tokio::select! {
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            };

            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!("New connection from {}", addr);
                            let id = next_session;
                            next_session += 1;
                            Self::handle_connection(stream, addr, id, permit, &ctx, &sessions, &root).await;
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Stops sessions, the sweeper and the simulation
        root.cancel();
        if let Err(e) = sweeper_handle.await {
            warn!("Liveness sweeper failed: {}", e);
        }
        if let Err(e) = simulation_handle.await {
            warn!("Simulation task failed: {}", e);
        }

        Ok(())
    }

    /// Register a session and spawn it.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        id: SessionId,
        permit: OwnedSemaphorePermit,
        ctx: &Arc<ServerContext>,
        sessions: &SessionRegistry,
        root: &CancellationToken,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", addr, e);
        }

        let handle = SessionHandle::new(
            id,
            addr,
            now_millis(),
            ctx.config.liveness_threshold_ms,
            root.child_token(),
        );
        sessions.write().await.insert(id, handle.clone());

        let ctx = ctx.clone();
        let sessions = sessions.clone();
        tokio::spawn(async move {
            // Released when the session ends
            let _permit = permit;

            match ClientSession::run(stream, ctx, handle).await {
                Ok(state) => debug!("Session {} ended in state {:?}", id, state),
                Err(e) => warn!("Session {} from {} failed: {}", id, addr, e),
            }

            sessions.write().await.remove(&id);
            info!("Client {} cleaned up", addr);
        });
    }
}

/// Periodically evict sessions that have stopped sending heartbeats.
#[instrument(skip_all)]
pub async fn run_liveness_sweep(sessions: SessionRegistry, config: ServerConfig, cancel: CancellationToken) {
    let mut sweep = interval(config.sweep_interval());
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tracker = LivenessTracker::new(config.max_failed_sweeps);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sweep.tick() => {}
        }

        let now = now_millis();
        // Sessions already cancelled are on their way out
        let checks: Vec<(SessionHandle, bool)> = sessions
            .read()
            .await
            .values()
            .filter(|handle| !handle.cancel.is_cancelled())
            .map(|handle| (handle.clone(), handle.heartbeat.is_alive(now)))
            .collect();
        tracker.retain(|id| checks.iter().any(|(handle, _)| handle.id == id));

        for (handle, alive) in checks {
            if !tracker.record(handle.id, alive) {
                continue;
            }
            tracker.forget(handle.id);
            warn!(
                "Evicting unresponsive client {} (silent {} ms)",
                handle.peer,
                now.saturating_sub(handle.heartbeat.last_seen())
            );
            // The session task retires its boat and leaves the registry
            handle.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn local_config() -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = RaceServer::bind(local_config(), RaceConfig::default()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.context().race_id, 1);
        assert!(!server.context().documents.is_empty());
        assert_eq!(server.handle().session_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_course_fails_to_bind() {
        let mut race = RaceConfig::default();
        race.course.participants.clear();
        assert!(matches!(
            RaceServer::bind(local_config(), race).await,
            Err(ServerError::Course(_))
        ));
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = RaceServer::bind(local_config(), RaceConfig::default()).await.unwrap();
        let handle = server.handle();
        let task = tokio::spawn(server.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.shutdown();
        let result = tokio::time::timeout(Duration::from_secs(2), task).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn test_sweeper_evicts_silent_session() {
        let sessions: SessionRegistry = Arc::new(RwLock::new(BTreeMap::new()));
        let token = CancellationToken::new();
        // Last heard from long ago
        let handle = SessionHandle::new(7, "127.0.0.1:9".parse().unwrap(), 0, 100, token.clone());
        sessions.write().await.insert(7, handle);

        let config = ServerConfig {
            sweep_interval_ms: 5,
            max_failed_sweeps: 2,
            ..ServerConfig::default()
        };
        let cancel = CancellationToken::new();
        let sweeper = tokio::spawn(run_liveness_sweep(sessions.clone(), config, cancel.clone()));

        tokio::time::timeout(Duration::from_secs(2), token.cancelled())
            .await
            .unwrap();
        // Removal is left to the session task
        assert_eq!(sessions.read().await.len(), 1);

        cancel.cancel();
        sweeper.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_keeps_live_session() {
        let sessions: SessionRegistry = Arc::new(RwLock::new(BTreeMap::new()));
        let token = CancellationToken::new();
        let handle = SessionHandle::new(
            3,
            "127.0.0.1:9".parse().unwrap(),
            now_millis(),
            60_000,
            token.clone(),
        );
        sessions.write().await.insert(3, handle);

        let config = ServerConfig {
            sweep_interval_ms: 5,
            max_failed_sweeps: 0,
            ..ServerConfig::default()
        };
        let cancel = CancellationToken::new();
        let sweeper = tokio::spawn(run_liveness_sweep(sessions.clone(), config, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!token.is_cancelled());
        assert_eq!(sessions.read().await.len(), 1);

        cancel.cancel();
        sweeper.await.unwrap();
    }
}
