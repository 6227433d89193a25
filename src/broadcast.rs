use crate::protocol::ServerMessage;
use crate::session::{SessionEvent, SessionPhase};
use crate::state::AppState;
use crate::types::{PlayerId, Role, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

/// Who receives a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every connection, whatever its role
    All,
    Admin,
    Display,
    Player(PlayerId),
    /// Everyone except this player
    Others(PlayerId),
}

/// The single ordered queue of one connection
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

pub type ConnectionId = String;

struct Registered {
    role: Role,
    sender: PlayerSender,
}

/// Fan-out of server messages to connected clients.
///
/// Every connection registers one queue. Role-wide and per-player messages are
/// pushed into that same queue, so a client receives them in emission order.
/// Sending to nobody is fine.
#[derive(Clone)]
pub struct Broadcaster {
    connections: Arc<RwLock<HashMap<ConnectionId, Registered>>>,
    players: Arc<RwLock<HashMap<PlayerId, PlayerSender>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            players: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start delivering role-wide messages to this connection's queue
    pub async fn register(&self, role: Role, sender: PlayerSender) -> ConnectionId {
        let id = ulid::Ulid::new().to_string();
        let mut connections = self.connections.write().await;
        connections.retain(|_, c| !c.sender.is_closed());
        connections.insert(id.clone(), Registered { role, sender });
        id
    }

    pub async fn unregister(&self, id: &ConnectionId) {
        self.connections.write().await.remove(id);
    }

    /// Register a fresh queue for `role` and hand back its receiving end
    pub async fn subscribe(&self, role: Role) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(role, tx).await;
        rx
    }

    /// Route a player's messages to this connection, replacing any older one
    pub async fn attach_player(&self, player_id: &PlayerId, sender: PlayerSender) {
        let previous = self
            .players
            .write()
            .await
            .insert(player_id.clone(), sender);
        if previous.is_some() {
            tracing::debug!("Player {} re-attached on a new connection", player_id);
        }
    }

    /// Detach a player, unless a newer connection already took over
    pub async fn detach_player(&self, player_id: &PlayerId, sender: &PlayerSender) {
        let mut players = self.players.write().await;
        if players
            .get(player_id)
            .is_some_and(|current| current.same_channel(sender))
        {
            players.remove(player_id);
        }
    }

    pub async fn is_attached(&self, player_id: &PlayerId) -> bool {
        self.players.read().await.contains_key(player_id)
    }

    async fn send_to_roles(&self, msg: &ServerMessage, accepts: impl Fn(&Role) -> bool) {
        let connections = self.connections.read().await;
        for c in connections.values().filter(|c| accepts(&c.role)) {
            let _ = c.sender.send(msg.clone());
        }
    }

    pub async fn emit(&self, target: Target, msg: ServerMessage) {
        match target {
            Target::All => self.send_to_roles(&msg, |_| true).await,
            Target::Admin => self.send_to_roles(&msg, |r| *r == Role::Admin).await,
            Target::Display => self.send_to_roles(&msg, |r| *r == Role::Display).await,
            Target::Player(id) => {
                let players = self.players.read().await;
                match players.get(&id) {
                    Some(sender) => {
                        if sender.send(msg).is_err() {
                            tracing::debug!("Player {} connection closed, message dropped", id);
                        }
                    }
                    None => tracing::debug!("Player {} not connected, message dropped", id),
                }
            }
            Target::Others(except) => {
                self.send_to_roles(&msg, |r| *r != Role::Player).await;
                let players = self.players.read().await;
                for (id, sender) in players.iter() {
                    if *id != except {
                        let _ = sender.send(msg.clone());
                    }
                }
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire `CountdownElapsed` after the countdown, unless the session moved on
pub fn spawn_countdown_timer(state: Arc<AppState>, session_id: SessionId, seconds: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        state
            .dispatch_timer(&session_id, SessionEvent::CountdownElapsed)
            .await;
    });
}

/// Fire `GameOverElapsed` once the results have been shown long enough
pub fn spawn_game_over_timer(state: Arc<AppState>, session_id: SessionId, seconds: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        state
            .dispatch_timer(&session_id, SessionEvent::GameOverElapsed)
            .await;
    });
}

/// Spawn a background task that completes the active game when its time budget runs out
pub fn spawn_deadline_watcher(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(500)).await;

            let expired = {
                let session = state.session.read().await;
                match session.as_ref() {
                    Some(s) if s.deadline_passed(chrono::Utc::now()) => Some(s.id.clone()),
                    _ => None,
                }
            };

            if let Some(session_id) = expired {
                tracing::info!("Time budget of session {} exhausted", session_id);
                state
                    .dispatch_timer(&session_id, SessionEvent::BudgetExhausted)
                    .await;
            }
        }
    });
}

/// Spawn a background task that sends connection counts to admins
pub fn spawn_connection_stats(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut last = None;
        loop {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let counts = state.connection_counts().await;
            if last.as_ref() == Some(&counts) {
                continue;
            }
            state
                .broadcaster
                .emit(
                    Target::Admin,
                    ServerMessage::ConnectionStats {
                        players: counts.players,
                        displays: counts.displays,
                        admins: counts.admins,
                    },
                )
                .await;
            last = Some(counts);
        }
    });
}

/// Start the timer that entering `phase` calls for, if any
pub fn schedule_for_phase(state: &Arc<AppState>, session_id: &SessionId, phase: SessionPhase) {
    let config = &state.config.session;
    match phase {
        SessionPhase::Countdown => {
            spawn_countdown_timer(state.clone(), session_id.clone(), config.countdown_seconds)
        }
        SessionPhase::Completed => spawn_game_over_timer(
            state.clone(),
            session_id.clone(),
            config.game_over_delay_seconds,
        ),
        _ => {}
    }
}
