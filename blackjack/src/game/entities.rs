use rand::{rng, seq::SliceRandom};
use std::fmt;

/// Card suits in wire order (0..=3).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Suit {
    Heart,
    Diamond,
    Club,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];

    /// The 2-bit wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Only the low 2 bits are considered, so every byte maps to a suit.
    pub fn from_code(code: u8) -> Self {
        Self::ALL[usize::from(code & 0b11)]
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Heart => "♥",
            Self::Diamond => "♦",
            Self::Club => "♣",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Card rank. 1 is an ace, 11/12/13 are face cards.
pub type Rank = u8;

pub const ACE: Rank = 1;

/// Hand values at or below this are still alive.
pub const BLACKJACK: u32 = 21;

/// A playing card, `Card(rank, suit)`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Card(pub Rank, pub Suit);

impl Card {
    pub fn rank(&self) -> Rank {
        self.0
    }

    pub fn suit(&self) -> Suit {
        self.1
    }

    /// Points this card contributes to a hand. Aces always count 11.
    pub fn points(&self) -> u32 {
        match self.0 {
            ACE => 11,
            r if r >= 10 => 10,
            r => u32::from(r),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            ACE => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        write!(f, "[{value}{}]", self.1)
    }
}

/// Value of a set of cards.
///
/// Aces are never reduced from 11 to 1, even when that busts the hand.
/// Clients compute outcomes against this same rule, so it has to stay
/// exactly as is.
pub fn hand_value(cards: &[Card]) -> u32 {
    cards.iter().map(Card::points).sum()
}

/// An ordered set of cards held by a player or the dealer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Hand(Vec<Card>);

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.0.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.0
    }

    pub fn last(&self) -> Option<Card> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn value(&self) -> u32 {
        hand_value(&self.0)
    }

    pub fn is_bust(&self) -> bool {
        self.value() > BLACKJACK
    }
}

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Self {
        Self(cards)
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for card in &self.0 {
            write!(f, "{card}")?;
        }
        write!(f, " ({})", self.value())
    }
}

/// A 52-card deck, dealt from the back.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A freshly shuffled full deck.
    pub fn shuffled() -> Self {
        let mut deck = Self::default();
        deck.cards.shuffle(&mut rng());
        deck
    }

    /// Deals the next card. An exhausted deck is replaced by a new
    /// shuffled one so very large tables can still finish a round.
    pub fn deal_card(&mut self) -> Card {
        loop {
            if let Some(card) = self.cards.pop() {
                return card;
            }
            log::warn!("deck exhausted mid-round, opening a fresh deck");
            *self = Self::shuffled();
        }
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

impl Default for Deck {
    /// Unshuffled, in rank-major order.
    fn default() -> Self {
        let cards = (1..=13)
            .flat_map(|rank| Suit::ALL.into_iter().map(move |suit| Card(rank, suit)))
            .collect();
        Self { cards }
    }
}

/// A stacked deck; the last card of the vector is dealt first.
impl From<Vec<Card>> for Deck {
    fn from(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

/// How a seated player's hand ended against the dealer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Tie,
    Loss,
    Win,
}

impl Outcome {
    /// Settles one hand against the dealer's final hand.
    pub fn settle(player: &Hand, busted: bool, dealer: &Hand) -> Self {
        if busted {
            return Self::Loss;
        }
        let (mine, theirs) = (player.value(), dealer.value());
        if theirs > BLACKJACK || mine > theirs {
            Self::Win
        } else if mine < theirs {
            Self::Loss
        } else {
            Self::Tie
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Tie => "tie",
            Self::Loss => "loss",
            Self::Win => "win",
        };
        write!(f, "{repr}")
    }
}
