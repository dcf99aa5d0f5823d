//! The round scheduler: the single task that drives the table.
//!
//! ```text
//! WAITING --(someone seated)--> JOIN_WINDOW --(window elapsed)--> IN_PROGRESS
//!    ^                               |                               |
//!    |                       (nobody left to play)                   v
//!    +-------------------------------+------------------------- SETTLEMENT
//! ```

use std::{fmt, sync::Arc};

use tokio::time::sleep;

use super::{config::TableConfig, state::Table};
use crate::game::round::{Round, RoundSummary};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Waiting,
    JoinWindow,
    InProgress,
    Settlement,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::JoinWindow => "join window",
            Self::InProgress => "in progress",
            Self::Settlement => "settlement",
        };
        write!(f, "{repr}")
    }
}

pub struct Scheduler {
    table: Arc<Table>,
    config: Arc<TableConfig>,
    phase: Phase,
    rounds_played: u64,
}

impl Scheduler {
    pub fn new(table: Arc<Table>, config: Arc<TableConfig>) -> Self {
        Self {
            table,
            config,
            phase: Phase::Waiting,
            rounds_played: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("table phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Drives rounds forever.
    pub async fn run(mut self) {
        log::info!("round scheduler started");
        loop {
            self.run_once().await;
        }
    }

    /// One full cycle, from waiting for players back to waiting. Returns
    /// `None` when everyone left during the join window.
    pub async fn run_once(&mut self) -> Option<RoundSummary> {
        self.enter(Phase::Waiting);
        while self.table.player_count().await == 0 {
            sleep(self.config.poll_interval).await;
        }

        self.enter(Phase::JoinWindow);
        log::info!(
            "players present, starting in {:?}",
            self.config.join_window
        );
        sleep(self.config.join_window).await;

        let seats = self.table.begin_round().await;
        if seats.is_empty() {
            log::info!("everyone left before the deal");
            self.enter(Phase::Waiting);
            return None;
        }

        self.enter(Phase::InProgress);
        let summary = Round::new(&self.table, &self.config, seats).play().await;

        self.enter(Phase::Settlement);
        let retired = self.table.finish_round(&summary.played).await;
        self.rounds_played += 1;
        log::info!(
            "round {} over: {} result(s), {} player(s) done",
            self.rounds_played,
            summary.results.len(),
            retired.len()
        );

        self.enter(Phase::Waiting);
        Some(summary)
    }
}
