//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::room::{GameRoom, MAX_SEATS};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Wall-clock milliseconds handed to the engine
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Server state shared across all connections.
pub struct ServerState {
    /// All active rooms
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from player ID to their room ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    pub fn send_error(&self, player_id: Uuid, error: impl ToString) {
        self.send_to_player(player_id, ServerMessage::error(error));
    }

    /// Broadcast a message to all players in a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        let members: Vec<Uuid> = match self.rooms.get(&room_id) {
            Some(room) => room.players.keys().copied().collect(),
            None => return,
        };
        for player_id in members {
            self.send_to_player(player_id, msg.clone());
        }
    }

    pub fn broadcast_room_info(&self, room_id: Uuid) {
        let info = match self.rooms.get(&room_id) {
            Some(room) => room.to_info(),
            None => return,
        };
        self.broadcast_to_room(room_id, ServerMessage::Room { room: info });
    }

    /// Send every member the game as their own seat sees it.
    pub fn broadcast_state(&self, room_id: Uuid) {
        let views: Vec<_> = match self.rooms.get(&room_id) {
            Some(room) => room
                .players
                .keys()
                .filter_map(|&id| room.view_for(id).map(|view| (id, view)))
                .collect(),
            None => return,
        };
        for (player_id, view) in views {
            self.send_to_player(
                player_id,
                ServerMessage::State {
                    state: Box::new(view),
                },
            );
        }
    }

    /// Get list of waiting rooms.
    pub fn get_waiting_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }

    fn room_of(&self, player_id: Uuid) -> Option<Uuid> {
        self.player_rooms.get(&player_id).map(|r| *r)
    }

    /// Run default moves in every live game whose deadline has passed.
    /// Returns how many rooms advanced.
    pub fn sweep_timeouts(&self, now_ms: u64) -> usize {
        let live: Vec<Uuid> = self
            .rooms
            .iter()
            .filter(|r| r.status == RoomStatus::InGame)
            .map(|r| r.id)
            .collect();

        let mut advanced = 0;
        for room_id in live {
            let ticked = match self.rooms.get_mut(&room_id) {
                Some(mut room) => room.tick(now_ms).is_some(),
                None => false,
            };
            if ticked {
                advanced += 1;
                self.broadcast_state(room_id);
            }
        }
        advanced
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Hex Settlers server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Drive phase timeouts for every room until the process exits.
pub async fn run_sweeper(state: Arc<ServerState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let advanced = state.sweep_timeouts(now_ms());
        if advanced > 0 {
            debug!(advanced, "Timeout sweep advanced rooms");
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a player ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", player_id, text);
                    state.send_error(player_id, format!("Invalid message: {e}"));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
pub fn handle_message(player_id: Uuid, msg: ClientMessage, state: &ServerState) {
    match msg {
        ClientMessage::CreateRoom {
            player_name,
            max_players,
            rules,
        } => {
            if state.room_of(player_id).is_some() {
                state.send_error(player_id, "Already in a room");
                return;
            }
            let room_id = Uuid::new_v4();
            let mut room = GameRoom::new(
                room_id,
                player_id,
                player_name,
                max_players.unwrap_or(MAX_SEATS),
            );
            if let Some(patch) = rules {
                room.rules = patch.apply(&room.rules);
            }
            let room_info = room.to_info();
            info!(room = %room_id, scenario = %room.rules.scenario, "Room created");

            state.rooms.insert(room_id, room);
            state.player_rooms.insert(player_id, room_id);
            state.send_to_player(player_id, ServerMessage::Room { room: room_info });
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => {
            if state.room_of(player_id).is_some() {
                state.send_error(player_id, "Already in a room");
                return;
            }
            let joined = match state.rooms.get_mut(&room_id) {
                Some(mut room) => room.add_player(player_id, player_name),
                None => {
                    state.send_error(player_id, "Room not found");
                    return;
                }
            };
            match joined {
                Ok(()) => {
                    state.player_rooms.insert(player_id, room_id);
                    state.broadcast_room_info(room_id);
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::LeaveRoom => {
            if leave_room(player_id, state) {
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::ListRooms => {
            let rooms = state.get_waiting_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }

        room_msg => {
            let Some(room_id) = state.room_of(player_id) else {
                state.send_error(player_id, "Not in a room");
                return;
            };
            handle_room_message(player_id, room_id, room_msg, state);
        }
    }
}

/// Messages that act on the sender's current room.
fn handle_room_message(player_id: Uuid, room_id: Uuid, msg: ClientMessage, state: &ServerState) {
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        state.send_error(player_id, "Room not found");
        return;
    };
    let now = now_ms();

    match msg {
        ClientMessage::SetRules { rules } => {
            let result = room.set_rules(player_id, &rules);
            drop(room);
            match result {
                Ok(()) => state.broadcast_room_info(room_id),
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::StartGame => {
            let result = room.start_game(player_id, now);
            drop(room);
            match result {
                Ok(()) => {
                    info!(room = %room_id, "Game started");
                    state.broadcast_room_info(room_id);
                    state.broadcast_state(room_id);
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::GameAction { action } => {
            let kind = action.kind();
            let result = room.apply_action(player_id, action, now);
            let winner = room.get_winner();
            drop(room);
            match result {
                Ok(events) => {
                    debug!(room = %room_id, action = %kind, events = events.len(), "Action applied");
                    if let Some((seat, name)) = winner {
                        info!(room = %room_id, seat, winner = %name, "Game over");
                        state.broadcast_room_info(room_id);
                    }
                    state.broadcast_state(room_id);
                }
                Err(e) => {
                    debug!(room = %room_id, action = %kind, error = %e, "Action rejected");
                    let changed = e.changes_state();
                    state.send_error(player_id, e);
                    if changed {
                        state.broadcast_state(room_id);
                    }
                }
            }
        }

        ClientMessage::PauseGame { paused } => {
            let result = room.set_paused(player_id, paused, now);
            drop(room);
            match result {
                Ok(true) => state.broadcast_state(room_id),
                Ok(false) => {}
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::QueryBuildOptions {
            target_kind,
            target_id,
        } => {
            let result = room.build_options(player_id, target_kind.target(target_id));
            drop(room);
            match result {
                Ok(options) => {
                    state.send_to_player(player_id, ServerMessage::BuildOptions { options })
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::GetState => {
            let view = room.view_for(player_id);
            let info = room.to_info();
            drop(room);
            state.send_to_player(player_id, ServerMessage::Room { room: info });
            if let Some(view) = view {
                state.send_to_player(
                    player_id,
                    ServerMessage::State {
                        state: Box::new(view),
                    },
                );
            }
        }

        ClientMessage::CreateRoom { .. }
        | ClientMessage::JoinRoom { .. }
        | ClientMessage::LeaveRoom
        | ClientMessage::ListRooms
        | ClientMessage::Ping => {}
    }
}

/// Take a player out of their room. Seats in a running game are kept and
/// marked disconnected so the timeout sweep plays for them.
fn leave_room(player_id: Uuid, state: &ServerState) -> bool {
    let Some((_, room_id)) = state.player_rooms.remove(&player_id) else {
        return false;
    };
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        return true;
    };

    let should_remove = if room.status == RoomStatus::Waiting {
        room.remove_player(player_id).unwrap_or(false)
    } else {
        room.set_player_connected(player_id, false);
        room.players.values().all(|p| !p.connected)
    };
    drop(room);

    if should_remove {
        state.rooms.remove(&room_id);
        info!(room = %room_id, "Room closed");
    } else {
        state.broadcast_room_info(room_id);
    }
    true
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &ServerState) {
    leave_room(player_id, state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TargetKind;
    use hexsettlers_core::GameAction;

    fn connect(state: &ServerState) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.player_senders.insert(id, tx);
        (id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn started_room(state: &ServerState) -> (Uuid, Uuid, Uuid) {
        let (host, _) = connect(state);
        let (guest, _) = connect(state);
        handle_message(
            host,
            ClientMessage::CreateRoom {
                player_name: "Host".into(),
                max_players: None,
                rules: None,
            },
            state,
        );
        let room_id = state.room_of(host).unwrap();
        handle_message(
            guest,
            ClientMessage::JoinRoom {
                room_id,
                player_name: "Guest".into(),
            },
            state,
        );
        handle_message(host, ClientMessage::StartGame, state);
        (room_id, host, guest)
    }

    #[test]
    fn test_rejected_action_only_reaches_actor() {
        let state = ServerState::new();
        let (host, mut host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);
        handle_message(
            host,
            ClientMessage::CreateRoom {
                player_name: "Host".into(),
                max_players: Some(2),
                rules: None,
            },
            &state,
        );
        let room_id = state.room_of(host).unwrap();
        handle_message(
            guest,
            ClientMessage::JoinRoom {
                room_id,
                player_name: "Guest".into(),
            },
            &state,
        );
        handle_message(host, ClientMessage::StartGame, &state);
        drain(&mut host_rx);
        drain(&mut guest_rx);

        handle_message(
            guest,
            ClientMessage::GameAction {
                action: GameAction::EndTurn,
            },
            &state,
        );
        let to_guest = drain(&mut guest_rx);
        assert_eq!(to_guest.len(), 1);
        assert!(matches!(to_guest[0], ServerMessage::Error { .. }));
        assert!(drain(&mut host_rx).is_empty());
    }

    #[test]
    fn test_start_sends_each_seat_its_view() {
        let state = ServerState::new();
        let (host, mut host_rx) = connect(&state);
        handle_message(
            host,
            ClientMessage::CreateRoom {
                player_name: "Host".into(),
                max_players: None,
                rules: None,
            },
            &state,
        );
        let room_id = state.room_of(host).unwrap();
        let (guest, _guest_rx) = connect(&state);
        handle_message(
            guest,
            ClientMessage::JoinRoom {
                room_id,
                player_name: "Guest".into(),
            },
            &state,
        );
        drain(&mut host_rx);
        handle_message(host, ClientMessage::StartGame, &state);

        let views: Vec<_> = drain(&mut host_rx)
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::State { state } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].viewer, Some(0));
    }

    #[test]
    fn test_sweep_advances_expired_games() {
        let state = ServerState::new();
        let (room_id, _, _) = started_room(&state);
        assert_eq!(state.sweep_timeouts(0), 0);

        let deadline = state
            .rooms
            .get(&room_id)
            .and_then(|r| r.game.as_ref().and_then(|g| g.timer))
            .map(|t| t.ends_at)
            .unwrap();
        assert_eq!(state.sweep_timeouts(deadline), 1);
    }

    #[test]
    fn test_build_options_requires_room() {
        let state = ServerState::new();
        let (loner, mut rx) = connect(&state);
        handle_message(
            loner,
            ClientMessage::QueryBuildOptions {
                target_kind: TargetKind::Node,
                target_id: 0,
            },
            &state,
        );
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ServerMessage::Error { .. }]
        ));
    }

    #[test]
    fn test_last_disconnect_closes_running_room() {
        let state = ServerState::new();
        let (room_id, host, guest) = started_room(&state);
        handle_disconnect(host, &state);
        assert!(state.rooms.contains_key(&room_id));
        assert!(!state.rooms.get(&room_id).unwrap().players[&host].connected);
        handle_disconnect(guest, &state);
        assert!(!state.rooms.contains_key(&room_id));
    }
}
