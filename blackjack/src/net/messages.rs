//! Fixed-layout frames exchanged between clients and the server.
//!
//! Every frame starts with [`MAGIC_COOKIE`] and a one-byte message type,
//! and all integers are big-endian:
//!
//! | frame    | layout                                                          | bytes |
//! |----------|-----------------------------------------------------------------|-------|
//! | offer    | cookie `u32`, type `u8`=2, tcp port `u16`, name `[u8; 32]`      | 39    |
//! | request  | cookie `u32`, type `u8`=3, rounds `u8`, name `[u8; 32]`         | 38    |
//! | payload  | cookie `u32`, type `u8`=4, decision `[u8; 5]`, result `u8`, rank `u16`, suit `u8` | 14 |

use std::fmt;

use super::errors::FrameError;
use crate::{
    game::entities::{Card, Outcome, Suit},
    table::PlayerId,
};

pub const MAGIC_COOKIE: u32 = 0xABCD_DCBA;

pub const OFFER_TYPE: u8 = 0x2;
pub const REQUEST_TYPE: u8 = 0x3;
pub const PAYLOAD_TYPE: u8 = 0x4;

/// Names are NUL-padded to this many bytes.
pub const NAME_LEN: usize = 32;

pub const OFFER_LEN: usize = 39;
pub const REQUEST_LEN: usize = 38;
pub const PAYLOAD_LEN: usize = 14;

const HEADER_LEN: usize = 5;

pub const HIT: [u8; 5] = *b"Hittt";
pub const STAND: [u8; 5] = *b"Stand";

/// Decision bytes on server-to-client frames. Carries no meaning.
pub const PLACEHOLDER_DECISION: [u8; 5] = [0; 5];

fn write_header(buf: &mut [u8], msg_type: u8) {
    buf[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    buf[4] = msg_type;
}

fn check_header(buf: &[u8], expected_len: usize, msg_type: u8) -> Result<(), FrameError> {
    if buf.len() < expected_len {
        return Err(FrameError::TooShort {
            expected: expected_len,
            actual: buf.len(),
        });
    }
    let cookie = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if cookie != MAGIC_COOKIE {
        return Err(FrameError::BadCookie(cookie));
    }
    if buf[4] != msg_type {
        return Err(FrameError::BadMessageType {
            expected: msg_type,
            actual: buf[4],
        });
    }
    Ok(())
}

/// Truncates to [`NAME_LEN`] bytes without splitting a character.
fn encode_name(name: &str, out: &mut [u8]) {
    let mut end = name.len().min(NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    out[..end].copy_from_slice(&name.as_bytes()[..end]);
}

fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Server advertisement sent over UDP broadcast.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Offer {
    pub tcp_port: u16,
    pub server_name: String,
}

impl Offer {
    pub fn encode(&self) -> [u8; OFFER_LEN] {
        let mut buf = [0; OFFER_LEN];
        write_header(&mut buf, OFFER_TYPE);
        buf[5..7].copy_from_slice(&self.tcp_port.to_be_bytes());
        encode_name(&self.server_name, &mut buf[7..]);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        check_header(buf, OFFER_LEN, OFFER_TYPE)?;
        Ok(Self {
            tcp_port: u16::from_be_bytes([buf[5], buf[6]]),
            server_name: decode_name(&buf[7..OFFER_LEN]),
        })
    }
}

/// The first and only frame a client sends before the game starts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinRequest {
    pub rounds: u8,
    pub client_name: String,
}

impl JoinRequest {
    pub fn encode(&self) -> [u8; REQUEST_LEN] {
        let mut buf = [0; REQUEST_LEN];
        write_header(&mut buf, REQUEST_TYPE);
        buf[HEADER_LEN] = self.rounds;
        encode_name(&self.client_name, &mut buf[6..]);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        check_header(buf, REQUEST_LEN, REQUEST_TYPE)?;
        Ok(Self {
            rounds: buf[HEADER_LEN],
            client_name: decode_name(&buf[6..REQUEST_LEN]),
        })
    }
}

/// Meaning of a payload's result byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ResultCode {
    NotOver = 0,
    Tie = 1,
    Loss = 2,
    Win = 3,
    YourTurn = 4,
    OpponentEvent = 5,
}

impl TryFrom<u8> for ResultCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::NotOver,
            1 => Self::Tie,
            2 => Self::Loss,
            3 => Self::Win,
            4 => Self::YourTurn,
            5 => Self::OpponentEvent,
            other => return Err(other),
        })
    }
}

impl From<Outcome> for ResultCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Tie => Self::Tie,
            Outcome::Loss => Self::Loss,
            Outcome::Win => Self::Win,
        }
    }
}

impl ResultCode {
    /// The round outcome this code reports, if it is a final result.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            Self::Tie => Some(Outcome::Tie),
            Self::Loss => Some(Outcome::Loss),
            Self::Win => Some(Outcome::Win),
            _ => None,
        }
    }
}

/// A player's move.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Hit,
    Stand,
}

impl Decision {
    pub fn as_bytes(self) -> [u8; 5] {
        match self {
            Self::Hit => HIT,
            Self::Stand => STAND,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Hit => "hit",
            Self::Stand => "stand",
        };
        write!(f, "{repr}")
    }
}

/// Action codes carried in an opponent event with rank 0.
const ACTION_HIT: u8 = 0;
const ACTION_STAND: u8 = 1;

/// Opponent ids occupy the high 6 bits of the suit byte.
const OPPONENT_ID_MASK: u8 = 0b0011_1111;

/// Something another player did, as seen from across the table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpponentEvent {
    CardDrawn { player: PlayerId, card: Card },
    ActionTaken { player: PlayerId, action: Decision },
}

impl OpponentEvent {
    pub fn player(&self) -> PlayerId {
        match self {
            Self::CardDrawn { player, .. } | Self::ActionTaken { player, .. } => *player,
        }
    }
}

impl fmt::Display for OpponentEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::CardDrawn { player, card } => write!(f, "player {player} drew {card}"),
            Self::ActionTaken { player, action } => write!(f, "player {player} chose {action}"),
        }
    }
}

/// The 14-byte frame used for all in-game traffic.
///
/// Fields are kept raw so any well-framed payload survives decoding;
/// the typed accessors interpret them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Payload {
    pub decision: [u8; 5],
    pub result: u8,
    pub rank: u16,
    pub suit: u8,
}

impl Payload {
    fn server(result: ResultCode, rank: u16, suit: u8) -> Self {
        Self {
            decision: PLACEHOLDER_DECISION,
            result: result as u8,
            rank,
            suit,
        }
    }

    /// A client decision frame.
    pub fn decision(decision: Decision) -> Self {
        Self {
            decision: decision.as_bytes(),
            result: ResultCode::NotOver as u8,
            rank: 0,
            suit: 0,
        }
    }

    /// "No event yet"; also clears a client's turn indicator.
    pub fn heartbeat() -> Self {
        Self::server(ResultCode::NotOver, 0, 0)
    }

    /// A card the recipient can see: its own, or the dealer's.
    pub fn update(card: Card) -> Self {
        Self::server(ResultCode::NotOver, u16::from(card.rank()), card.suit().code())
    }

    pub fn your_turn() -> Self {
        Self::server(ResultCode::YourTurn, 0, 0)
    }

    /// A final result, carrying the card that decided it.
    pub fn outcome(outcome: Outcome, card: Card) -> Self {
        Self::server(outcome.into(), u16::from(card.rank()), card.suit().code())
    }

    pub fn result_code(&self) -> Option<ResultCode> {
        ResultCode::try_from(self.result).ok()
    }

    /// The client's decision, if the decision bytes spell one exactly.
    pub fn parse_decision(&self) -> Option<Decision> {
        match self.decision {
            HIT => Some(Decision::Hit),
            STAND => Some(Decision::Stand),
            _ => None,
        }
    }

    /// The card carried by an update or result frame.
    pub fn card(&self) -> Option<Card> {
        match u8::try_from(self.rank) {
            Ok(rank @ 1..=13) => Some(Card(rank, Suit::from_code(self.suit))),
            _ => None,
        }
    }

    pub fn opponent_event(&self) -> Option<OpponentEvent> {
        if self.result_code() != Some(ResultCode::OpponentEvent) {
            return None;
        }
        let player = PlayerId::from(self.suit >> 2);
        let low = self.suit & 0b11;
        if self.rank == 0 {
            let action = match low {
                ACTION_HIT => Decision::Hit,
                ACTION_STAND => Decision::Stand,
                _ => return None,
            };
            Some(OpponentEvent::ActionTaken { player, action })
        } else {
            self.card().map(|card| OpponentEvent::CardDrawn { player, card })
        }
    }

    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        let mut buf = [0; PAYLOAD_LEN];
        write_header(&mut buf, PAYLOAD_TYPE);
        buf[5..10].copy_from_slice(&self.decision);
        buf[10] = self.result;
        buf[11..13].copy_from_slice(&self.rank.to_be_bytes());
        buf[13] = self.suit;
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        check_header(buf, PAYLOAD_LEN, PAYLOAD_TYPE)?;
        let mut decision = [0; 5];
        decision.copy_from_slice(&buf[5..10]);
        Ok(Self {
            decision,
            result: buf[10],
            rank: u16::from_be_bytes([buf[11], buf[12]]),
            suit: buf[13],
        })
    }
}

impl From<OpponentEvent> for Payload {
    fn from(event: OpponentEvent) -> Self {
        let (player, rank, low) = match event {
            OpponentEvent::CardDrawn { player, card } => {
                (player, u16::from(card.rank()), card.suit().code())
            }
            OpponentEvent::ActionTaken { player, action } => {
                let code = match action {
                    Decision::Hit => ACTION_HIT,
                    Decision::Stand => ACTION_STAND,
                };
                (player, 0, code)
            }
        };
        // Only the low 6 bits of the id fit on the wire.
        let id_bits = (player as u8) & OPPONENT_ID_MASK;
        Self::server(ResultCode::OpponentEvent, rank, (id_bits << 2) | low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_layout() {
        let buf = Offer {
            tcp_port: 0x1234,
            server_name: "BlackjackServer".to_string(),
        }
        .encode();
        assert_eq!(&buf[..4], &[0xAB, 0xCD, 0xDC, 0xBA]);
        assert_eq!(buf[4], OFFER_TYPE);
        assert_eq!(&buf[5..7], &[0x12, 0x34]);
        assert_eq!(&buf[7..22], b"BlackjackServer");
        assert!(buf[22..].iter().all(|&b| b == 0));
    }

    #[test]
    fn request_tolerates_trailing_newline() {
        let mut bytes = JoinRequest {
            rounds: 3,
            client_name: "Team Israel".to_string(),
        }
        .encode()
        .to_vec();
        bytes.push(b'\n');
        let request = JoinRequest::decode(&bytes).unwrap();
        assert_eq!(request.rounds, 3);
        assert_eq!(request.client_name, "Team Israel");
    }

    #[test]
    fn payload_layout() {
        let buf = Payload::update(Card(12, Suit::Club)).encode();
        assert_eq!(buf.len(), PAYLOAD_LEN);
        assert_eq!(buf[4], PAYLOAD_TYPE);
        assert_eq!(&buf[5..10], &PLACEHOLDER_DECISION);
        assert_eq!(buf[10], ResultCode::NotOver as u8);
        assert_eq!(&buf[11..13], &[0, 12]);
        assert_eq!(buf[13], 2);
    }

    #[test]
    fn decode_rejects_short_frames() {
        let buf = Payload::your_turn().encode();
        assert_eq!(
            Payload::decode(&buf[..13]),
            Err(FrameError::TooShort {
                expected: PAYLOAD_LEN,
                actual: 13
            })
        );
    }

    #[test]
    fn decode_rejects_bad_cookie() {
        let mut buf = Payload::your_turn().encode();
        buf[0] = 0;
        assert!(matches!(Payload::decode(&buf), Err(FrameError::BadCookie(_))));
    }

    #[test]
    fn decode_rejects_wrong_type() {
        let mut buf = Payload::your_turn().encode().to_vec();
        buf.extend_from_slice(&[0; 24]);
        assert_eq!(
            JoinRequest::decode(&buf),
            Err(FrameError::BadMessageType {
                expected: REQUEST_TYPE,
                actual: PAYLOAD_TYPE
            })
        );
    }

    #[test]
    fn long_names_truncate_on_char_boundary() {
        let name = "é".repeat(20);
        let offer = Offer {
            tcp_port: 1,
            server_name: name,
        };
        let decoded = Offer::decode(&offer.encode()).unwrap();
        assert_eq!(decoded.server_name, "é".repeat(16));
    }

    #[test]
    fn decisions_must_match_exactly() {
        assert_eq!(Payload::decision(Decision::Hit).parse_decision(), Some(Decision::Hit));
        assert_eq!(Payload::decision(Decision::Stand).parse_decision(), Some(Decision::Stand));
        let mut noise = Payload::decision(Decision::Hit);
        noise.decision = *b"Hit\0\0";
        assert_eq!(noise.parse_decision(), None);
    }

    #[test]
    fn opponent_card_packs_id_and_suit() {
        let event = OpponentEvent::CardDrawn {
            player: 5,
            card: Card(7, Suit::Spade),
        };
        let payload = Payload::from(event);
        assert_eq!(payload.result, ResultCode::OpponentEvent as u8);
        assert_eq!(payload.rank, 7);
        assert_eq!(payload.suit, (5 << 2) | 3);
        assert_eq!(payload.opponent_event(), Some(event));
    }

    #[test]
    fn opponent_action_uses_rank_zero() {
        let event = OpponentEvent::ActionTaken {
            player: 63,
            action: Decision::Stand,
        };
        let payload = Payload::from(event);
        assert_eq!(payload.rank, 0);
        assert_eq!(payload.suit, 0xFD);
        assert_eq!(payload.opponent_event(), Some(event));
    }

    #[test]
    fn opponent_ids_alias_past_six_bits() {
        let payload = Payload::from(OpponentEvent::ActionTaken {
            player: 65,
            action: Decision::Hit,
        });
        assert_eq!(payload.opponent_event().map(|e| e.player()), Some(1));
    }

    #[test]
    fn plain_updates_are_not_opponent_events() {
        assert_eq!(Payload::update(Card(2, Suit::Heart)).opponent_event(), None);
        assert_eq!(Payload::heartbeat().card(), None);
    }

    #[test]
    fn outcome_frames_carry_card() {
        let payload = Payload::outcome(Outcome::Win, Card(1, Suit::Diamond));
        assert_eq!(payload.result_code(), Some(ResultCode::Win));
        assert_eq!(payload.result_code().and_then(ResultCode::outcome), Some(Outcome::Win));
        assert_eq!(payload.card(), Some(Card(1, Suit::Diamond)));
    }
}
