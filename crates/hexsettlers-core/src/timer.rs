//! Phase deadlines and pausing. The engine has no clock; callers pass the
//! current time in milliseconds.

use crate::board::PlayerId;
use crate::game::GameState;
use crate::log::LogKind;
use crate::phase::PhaseKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimer {
    pub phase: PhaseKind,
    pub started_at: u64,
    pub ends_at: u64,
    pub duration_ms: u64,
}

impl PhaseTimer {
    pub fn start(phase: PhaseKind, now_ms: u64, duration_ms: u64) -> Self {
        Self {
            phase,
            started_at: now_ms,
            ends_at: now_ms + duration_ms,
            duration_ms,
        }
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.ends_at.saturating_sub(now_ms)
    }

    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.ends_at
    }
}

/// Main-phase time left when the phase was interrupted mid-turn, restored
/// if the same turn returns to its main phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkedDeadline {
    pub turn: u32,
    pub remaining_ms: u64,
}

/// Who paused the game and how much time the phase had left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseState {
    pub by: PlayerId,
    pub at: u64,
    pub remaining_ms: u64,
}

impl GameState {
    /// Start a new deadline whenever the phase kind changed. Finished
    /// games carry no timer and a paused timer is left alone. Leaving the
    /// main phase parks what was left of it for the rest of the turn.
    pub fn sync_timer(&mut self, now_ms: u64) {
        if self.is_finished() {
            self.timer = None;
            return;
        }
        if self.is_paused() {
            return;
        }
        let kind = self.phase.kind();
        match self.timer {
            Some(timer) if timer.phase == kind => {}
            Some(timer) if timer.phase == PhaseKind::MainActions => {
                self.parked_main = Some(ParkedDeadline {
                    turn: self.turn_number,
                    remaining_ms: timer.remaining_ms(now_ms),
                });
                self.restart_timer(now_ms);
            }
            _ => self.restart_timer(now_ms),
        }
    }

    /// Start the current phase's budget. A main phase resumed within the
    /// turn that parked it only gets the time it had left.
    pub fn restart_timer(&mut self, now_ms: u64) {
        let kind = self.phase.kind();
        if kind == PhaseKind::MainActions {
            let turn = self.turn_number;
            if let Some(parked) = self.parked_main.take().filter(|p| p.turn == turn) {
                self.timer = Some(PhaseTimer::start(kind, now_ms, parked.remaining_ms));
                return;
            }
        }
        self.timer = Some(PhaseTimer::start(
            kind,
            now_ms,
            self.rules.phase_duration_ms(kind),
        ));
    }

    pub fn time_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        match (&self.pause, &self.timer) {
            (Some(pause), _) => Some(pause.remaining_ms),
            (None, Some(timer)) => Some(timer.remaining_ms(now_ms)),
            (None, None) => None,
        }
    }

    /// Freeze the deadline. Returns false if already paused or finished.
    pub fn pause(&mut self, by: PlayerId, now_ms: u64) -> bool {
        if self.is_paused() || self.is_finished() {
            return false;
        }
        let remaining_ms = self.timer.map_or(0, |t| t.remaining_ms(now_ms));
        self.pause = Some(PauseState {
            by,
            at: now_ms,
            remaining_ms,
        });
        let name = self.name_of(by);
        self.log.push(LogKind::System, format!("{name} paused the game"));
        true
    }

    /// Rebase the frozen deadline onto `now_ms`
    pub fn resume(&mut self, now_ms: u64) -> bool {
        let Some(pause) = self.pause.take() else {
            return false;
        };
        if let Some(timer) = self.timer.as_mut() {
            timer.ends_at = now_ms + pause.remaining_ms;
        }
        self.log.push(LogKind::System, "Game resumed");
        true
    }

    pub fn set_paused(&mut self, by: PlayerId, paused: bool, now_ms: u64) -> bool {
        if paused {
            self.pause(by, now_ms)
        } else {
            self.resume(now_ms)
        }
    }
}
