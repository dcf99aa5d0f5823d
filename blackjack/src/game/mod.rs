//! Blackjack game logic.
//!
//! - [`entities`]: cards, decks, hands, and the hand-value rule
//! - [`round`]: the round engine that deals, runs turns, plays the dealer,
//!   and settles every seated player

pub mod entities;
pub mod round;

pub use round::{Round, RoundSummary};
