//! The round engine: deal, player turns, dealer play, settlement.
//!
//! A [`Round`] works on its own snapshot of the seated players and only
//! touches the shared [`Table`] to publish the dealer's hand, to fan frames
//! out, and to unseat players whose connection fails. Turns run one player
//! at a time in seating order.
//!
//! A player who busts gets the busting card as a LOSS result right away and
//! no second result at settlement. While still seated they keep receiving
//! the dealer's reveal and draws as NOT_OVER card frames. Those look like
//! any other card frame: a client that wants to tell them from the next
//! deal has to track the dealer's total against the stand value itself.

use tokio::time::{Instant, timeout_at};

use super::entities::{Deck, Hand, Outcome};
use crate::{
    net::{
        errors::ConnectionError,
        messages::{Decision, OpponentEvent, Payload},
    },
    table::{
        config::TableConfig,
        fanout,
        state::{Player, PlayerId, Table},
    },
};

/// What a finished round produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundSummary {
    /// Every player dealt into the round, in seating order
    pub played: Vec<PlayerId>,
    /// Outcomes of the players still seated at settlement
    pub results: Vec<(PlayerId, Outcome)>,
    pub dealer: Hand,
}

/// Why a player's wait for a decision ended without one.
enum NoDecision {
    TimedOut,
    Disconnected,
}

pub struct Round<'a> {
    table: &'a Table,
    config: &'a TableConfig,
    deck: Deck,
    seats: Vec<Player>,
    dealer: Hand,
}

impl<'a> Round<'a> {
    pub fn new(table: &'a Table, config: &'a TableConfig, seats: Vec<Player>) -> Self {
        Self::with_deck(table, config, seats, Deck::shuffled())
    }

    pub fn with_deck(
        table: &'a Table,
        config: &'a TableConfig,
        seats: Vec<Player>,
        deck: Deck,
    ) -> Self {
        Self {
            table,
            config,
            deck,
            seats,
            dealer: Hand::new(),
        }
    }

    /// Plays the round to completion and sends every result frame.
    pub async fn play(mut self) -> RoundSummary {
        let played = self.seat_order();
        log::info!("dealing a round to {} player(s)", played.len());

        self.deal().await;
        for id in &played {
            if self.seat(*id).is_some_and(|p| !p.is_done()) {
                self.take_turn(*id).await;
            }
        }
        self.play_dealer().await;
        let results = self.settle().await;

        RoundSummary {
            played,
            results,
            dealer: self.dealer,
        }
    }

    fn seat_order(&self) -> Vec<PlayerId> {
        self.seats.iter().map(|p| p.id).collect()
    }

    fn seat(&self, id: PlayerId) -> Option<&Player> {
        self.seats.iter().find(|p| p.id == id)
    }

    fn seat_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.seats.iter_mut().find(|p| p.id == id)
    }

    fn forget(&mut self, ids: &[PlayerId]) {
        self.seats.retain(|p| !ids.contains(&p.id));
    }

    /// Sends to one seated player. On failure they are unseated and
    /// dropped from this round.
    async fn send_to(&mut self, id: PlayerId, payload: Payload) -> bool {
        let Some(player) = self.seat(id) else {
            return false;
        };
        let delivered = fanout::deliver(self.table, player, &payload).await;
        if !delivered {
            self.forget(&[id]);
        }
        delivered
    }

    async fn broadcast(&mut self, payload: Payload, skip: Option<PlayerId>) {
        let failed = fanout::broadcast(self.table, &payload, skip).await;
        self.forget(&failed);
    }

    async fn tell_opponents(&mut self, event: OpponentEvent) {
        self.broadcast(event.into(), Some(event.player())).await;
    }

    async fn deal(&mut self) {
        for idx in 0..self.seats.len() {
            for _ in 0..2 {
                let card = self.deck.deal_card();
                self.seats[idx].hand.push(card);
            }
        }
        for _ in 0..2 {
            let card = self.deck.deal_card();
            self.dealer.push(card);
        }
        self.table.set_dealer_hand(self.dealer.clone()).await;

        for id in self.seat_order() {
            let Some(cards) = self.seat(id).map(|p| p.hand.cards().to_vec()) else {
                continue;
            };
            let mut delivered = true;
            for card in &cards {
                if !self.send_to(id, Payload::update(*card)).await {
                    delivered = false;
                    break;
                }
            }
            if !delivered {
                continue;
            }
            for card in cards {
                self.tell_opponents(OpponentEvent::CardDrawn { player: id, card })
                    .await;
            }
        }

        // The second dealer card stays hidden until the dealer plays.
        let up_card = self.dealer.cards()[0];
        self.broadcast(Payload::update(up_card), None).await;
    }

    async fn take_turn(&mut self, id: PlayerId) {
        loop {
            self.discard_stale_input(id).await;
            if !self.send_to(id, Payload::your_turn()).await {
                return;
            }
            let decision = match self.await_decision(id).await {
                Ok(decision) => decision,
                Err(NoDecision::TimedOut) => {
                    self.auto_stand(id).await;
                    return;
                }
                Err(NoDecision::Disconnected) => return,
            };

            match decision {
                Decision::Hit => {
                    if self.hit(id).await {
                        return;
                    }
                }
                Decision::Stand => {
                    if let Some(player) = self.seat_mut(id) {
                        player.is_standing = true;
                    }
                    log::debug!("player {} stands", id);
                    self.tell_opponents(OpponentEvent::ActionTaken {
                        player: id,
                        action: Decision::Stand,
                    })
                    .await;
                    return;
                }
            }
        }
    }

    /// Anything the player sent before being asked (a late answer to an
    /// expired turn, a decision typed during someone else's turn) is not a
    /// reply to the next turn signal.
    async fn discard_stale_input(&self, id: PlayerId) {
        let Some(player) = self.seat(id) else {
            return;
        };
        let dropped = player.conn().discard_pending().await;
        if dropped > 0 {
            log::debug!("discarded {} stale byte(s) from {}", dropped, player);
        }
    }

    /// Waits for a hit or stand until the turn deadline. Frames that don't
    /// decode, or carry no valid decision, are skipped; they never extend
    /// the deadline.
    async fn await_decision(&mut self, id: PlayerId) -> Result<Decision, NoDecision> {
        let Some(conn) = self.seat(id).map(|p| p.conn().clone()) else {
            return Err(NoDecision::Disconnected);
        };
        let deadline = Instant::now() + self.config.turn_timeout;
        loop {
            match timeout_at(deadline, conn.recv()).await {
                Err(_) => return Err(NoDecision::TimedOut),
                Ok(Ok(payload)) => match payload.parse_decision() {
                    Some(decision) => return Ok(decision),
                    None => log::debug!("player {} sent a frame with no decision", id),
                },
                Ok(Err(ConnectionError::Protocol(error))) => {
                    log::debug!("player {} sent a malformed frame: {}", id, error);
                }
                Ok(Err(error)) => {
                    log::warn!("player {} disconnected mid-turn: {}", id, error);
                    self.table.drop_player(id).await;
                    self.forget(&[id]);
                    return Err(NoDecision::Disconnected);
                }
            }
        }
    }

    async fn auto_stand(&mut self, id: PlayerId) {
        let Some(player) = self.seat_mut(id) else {
            return;
        };
        player.is_standing = true;
        log::info!("{} ran out of time and stands", player);
        self.tell_opponents(OpponentEvent::ActionTaken {
            player: id,
            action: Decision::Stand,
        })
        .await;
        // Clears the client's turn indicator.
        self.send_to(id, Payload::heartbeat()).await;
    }

    /// Draws a card for the player. Returns `true` when the turn is over,
    /// either because they busted or because they are gone.
    async fn hit(&mut self, id: PlayerId) -> bool {
        let card = self.deck.deal_card();
        let Some(player) = self.seat_mut(id) else {
            return true;
        };
        player.hand.push(card);
        let busted = player.hand.is_bust();
        player.is_busted = busted;
        log::debug!("{} hits {} -> {}", player, card, player.hand);

        // A bust is final: the card arrives as the player's LOSS result.
        let own_frame = if busted {
            Payload::outcome(Outcome::Loss, card)
        } else {
            Payload::update(card)
        };
        let delivered = self.send_to(id, own_frame).await;

        self.tell_opponents(OpponentEvent::ActionTaken {
            player: id,
            action: Decision::Hit,
        })
        .await;
        self.tell_opponents(OpponentEvent::CardDrawn { player: id, card })
            .await;

        busted || !delivered
    }

    async fn play_dealer(&mut self) {
        let hidden = self.dealer.cards()[1];
        self.broadcast(Payload::update(hidden), None).await;

        while self.dealer.value() < self.config.dealer_stand_value {
            let card = self.deck.deal_card();
            self.dealer.push(card);
            self.broadcast(Payload::update(card), None).await;
        }
        self.table.set_dealer_hand(self.dealer.clone()).await;
        log::info!("dealer finishes with {}", self.dealer);
    }

    async fn settle(&mut self) -> Vec<(PlayerId, Outcome)> {
        let Some(final_card) = self.dealer.last() else {
            return Vec::new();
        };
        let mut results = Vec::with_capacity(self.seats.len());
        for id in self.seat_order() {
            let Some(player) = self.seat(id) else {
                continue;
            };
            let busted = player.is_busted;
            let outcome = Outcome::settle(&player.hand, busted, &self.dealer);
            log::info!("{} {} with {}", player, outcome, player.hand);
            // Busted players already received their LOSS when they busted.
            if !busted && !self.send_to(id, Payload::outcome(outcome, final_card)).await {
                continue;
            }
            results.push((id, outcome));
        }
        results
    }
}
