//! Shared session state for one table.

use std::{fmt, sync::Arc};

use tokio::sync::Mutex;

use crate::{game::entities::Hand, net::utils::Connection};

/// Unique, never reused player identifier. Wide enough that a
/// long-running server never exhausts it.
pub type PlayerId = u64;

/// A client seated at (or waiting for) the table.
///
/// Cloning is cheap and shares the connection, which lets the scheduler
/// play a round from a snapshot without holding the table lock.
#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Rounds left before the server closes this connection
    pub remaining_rounds: u8,
    pub hand: Hand,
    pub is_busted: bool,
    pub is_standing: bool,
    conn: Arc<Connection>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, remaining_rounds: u8, conn: Arc<Connection>) -> Self {
        Self {
            id,
            name,
            remaining_rounds,
            hand: Hand::new(),
            is_busted: false,
            is_standing: false,
            conn,
        }
    }

    pub fn conn(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Whether this player's turn is over for the current round.
    pub fn is_done(&self) -> bool {
        self.is_busted || self.is_standing
    }

    pub fn reset_hand(&mut self) {
        self.hand.clear();
        self.is_busted = false;
        self.is_standing = false;
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TableStatus {
    #[default]
    Waiting,
    InProgress,
}

/// Where a newly registered player was seated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Seating {
    /// Will play the upcoming round
    Active,
    /// A round is running; plays the next one
    WaitingRoom,
}

#[derive(Debug)]
struct TableState {
    active_players: Vec<Player>,
    waiting_room: Vec<Player>,
    dealer_hand: Hand,
    status: TableStatus,
    next_player_id: PlayerId,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            active_players: Vec::new(),
            waiting_room: Vec::new(),
            dealer_hand: Hand::new(),
            status: TableStatus::Waiting,
            next_player_id: 1,
        }
    }
}

impl TableState {
    fn take(&mut self, id: PlayerId) -> Option<Player> {
        if let Some(idx) = self.active_players.iter().position(|p| p.id == id) {
            return Some(self.active_players.remove(idx));
        }
        let idx = self.waiting_room.iter().position(|p| p.id == id)?;
        Some(self.waiting_room.remove(idx))
    }
}

/// The table every task shares.
///
/// All state sits behind one lock and is only reachable through these
/// methods, none of which perform network I/O while holding it.
#[derive(Debug, Default)]
pub struct Table {
    state: Mutex<TableState>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id and seats the player according to the table status.
    pub async fn register(
        &self,
        name: String,
        rounds: u8,
        conn: Arc<Connection>,
    ) -> (PlayerId, Seating) {
        let mut state = self.state.lock().await;
        let id = state.next_player_id;
        state.next_player_id += 1;
        let player = Player::new(id, name, rounds, conn);
        let seating = match state.status {
            TableStatus::Waiting => {
                state.active_players.push(player);
                Seating::Active
            }
            TableStatus::InProgress => {
                state.waiting_room.push(player);
                Seating::WaitingRoom
            }
        };
        (id, seating)
    }

    pub async fn status(&self) -> TableStatus {
        self.state.lock().await.status
    }

    /// Players seated or waiting.
    pub async fn player_count(&self) -> usize {
        let state = self.state.lock().await;
        state.active_players.len() + state.waiting_room.len()
    }

    pub async fn active_ids(&self) -> Vec<PlayerId> {
        let state = self.state.lock().await;
        state.active_players.iter().map(|p| p.id).collect()
    }

    pub async fn waiting_ids(&self) -> Vec<PlayerId> {
        let state = self.state.lock().await;
        state.waiting_room.iter().map(|p| p.id).collect()
    }

    pub async fn active_snapshot(&self) -> Vec<Player> {
        self.state.lock().await.active_players.clone()
    }

    pub async fn dealer_hand(&self) -> Hand {
        self.state.lock().await.dealer_hand.clone()
    }

    /// Publishes the dealer's hand. Ignored unless a round is in progress,
    /// so the dealer hand is only ever non-empty mid-round.
    pub async fn set_dealer_hand(&self, hand: Hand) {
        let mut state = self.state.lock().await;
        if state.status == TableStatus::InProgress {
            state.dealer_hand = hand;
        }
    }

    /// Merges the waiting room into the active players and, if anyone is
    /// left to play, marks the round in progress. Returns the players of
    /// the round with fresh hands; empty if nobody is seated.
    pub async fn begin_round(&self) -> Vec<Player> {
        let mut state = self.state.lock().await;
        let waiting = std::mem::take(&mut state.waiting_room);
        state.active_players.extend(waiting);
        if state.active_players.is_empty() {
            return Vec::new();
        }
        state.status = TableStatus::InProgress;
        state
            .active_players
            .iter()
            .cloned()
            .map(|mut player| {
                player.reset_hand();
                player
            })
            .collect()
    }

    /// Ends the round: charges one round to every player that played and
    /// is still seated, unseats and closes those with none left, clears
    /// the dealer hand and reopens the table. Returns the ids retired.
    pub async fn finish_round(&self, played: &[PlayerId]) -> Vec<PlayerId> {
        let retired = {
            let mut state = self.state.lock().await;
            for player in state.active_players.iter_mut() {
                if played.contains(&player.id) {
                    player.remaining_rounds = player.remaining_rounds.saturating_sub(1);
                }
            }
            let (retired, staying): (Vec<Player>, Vec<Player>) =
                std::mem::take(&mut state.active_players)
                    .into_iter()
                    .partition(|p| p.remaining_rounds == 0);
            state.active_players = staying;
            state.dealer_hand.clear();
            state.status = TableStatus::Waiting;
            retired
        };

        for player in &retired {
            log::info!("{} finished all their rounds", player);
            player.conn().close().await;
        }
        retired.iter().map(|p| p.id).collect()
    }

    /// Unseats a player from wherever they are and closes their socket.
    /// Returns `false` if they were already gone.
    pub async fn drop_player(&self, id: PlayerId) -> bool {
        let removed = self.state.lock().await.take(id);
        match removed {
            Some(player) => {
                log::info!("removing {} ({})", player, player.conn().addr());
                player.conn().close().await;
                true
            }
            None => false,
        }
    }
}
