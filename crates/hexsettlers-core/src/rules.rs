//! Table rules chosen before a game starts.

use crate::phase::PhaseKind;
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};

pub const DISCARD_LIMIT_RANGE: (u32, u32) = (3, 30);
pub const PHASE_MS_RANGE: (u64, u64) = (5_000, 300_000);
pub const VICTORY_POINTS_RANGE: (u32, u32) = (3, 30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    /// Hands above this size lose half on a seven
    pub discard_limit: u32,
    pub setup_turn_ms: u64,
    pub play_turn_ms: u64,
    /// Budget for rolling, discarding and robber/pirate steps
    pub micro_phase_ms: u64,
    pub scenario: Scenario,
    pub victory_points_to_win: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            discard_limit: 7,
            setup_turn_ms: 60_000,
            play_turn_ms: 30_000,
            micro_phase_ms: 15_000,
            scenario: Scenario::Classic,
            victory_points_to_win: Scenario::Classic.default_victory_points(),
        }
    }
}

impl Rules {
    pub fn for_scenario(scenario: Scenario) -> Self {
        Self {
            scenario,
            victory_points_to_win: scenario.default_victory_points(),
            ..Self::default()
        }
    }

    /// Time budget for a phase; zero means untimed
    pub fn phase_duration_ms(&self, phase: PhaseKind) -> u64 {
        match phase {
            PhaseKind::SetupSettlement | PhaseKind::SetupRoad => self.setup_turn_ms,
            PhaseKind::MainActions => self.play_turn_ms,
            PhaseKind::AwaitRoll
            | PhaseKind::Discard
            | PhaseKind::ThiefChoice
            | PhaseKind::RobberMove
            | PhaseKind::RobberSteal
            | PhaseKind::PirateMove
            | PhaseKind::PirateSteal => self.micro_phase_ms,
            PhaseKind::GameOver => 0,
        }
    }
}

/// A partial rules update as sent by a host. Every field is optional and
/// numbers may arrive as floats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesPatch {
    pub discard_limit: Option<f64>,
    pub setup_turn_ms: Option<f64>,
    pub play_turn_ms: Option<f64>,
    pub micro_phase_ms: Option<f64>,
    pub map_mode: Option<String>,
    #[serde(alias = "scenario")]
    pub seafarers_scenario: Option<String>,
    #[serde(alias = "victoryTarget")]
    pub victory_points_to_win: Option<f64>,
}

fn clamp_u32(value: f64, (lo, hi): (u32, u32)) -> u32 {
    if value.is_finite() {
        (value.floor().max(lo as f64).min(hi as f64)) as u32
    } else {
        lo
    }
}

fn clamp_u64(value: f64, (lo, hi): (u64, u64)) -> u64 {
    if value.is_finite() {
        (value.floor().max(lo as f64).min(hi as f64)) as u64
    } else {
        lo
    }
}

impl RulesPatch {
    /// Merge onto `base`, clamping every value into range. A missing victory
    /// target resets to the chosen scenario's default.
    pub fn apply(&self, base: &Rules) -> Rules {
        let map_mode = self
            .map_mode
            .as_deref()
            .unwrap_or(base.scenario.map_mode());
        let selector = self.seafarers_scenario.as_deref().unwrap_or(
            if base.scenario.is_seafarers() {
                base.scenario.as_str()
            } else {
                ""
            },
        );
        let scenario = Scenario::parse(map_mode, selector);

        Rules {
            discard_limit: self
                .discard_limit
                .map_or(base.discard_limit, |v| clamp_u32(v, DISCARD_LIMIT_RANGE)),
            setup_turn_ms: self
                .setup_turn_ms
                .map_or(base.setup_turn_ms, |v| clamp_u64(v, PHASE_MS_RANGE)),
            play_turn_ms: self
                .play_turn_ms
                .map_or(base.play_turn_ms, |v| clamp_u64(v, PHASE_MS_RANGE)),
            micro_phase_ms: self
                .micro_phase_ms
                .map_or(base.micro_phase_ms, |v| clamp_u64(v, PHASE_MS_RANGE)),
            scenario,
            victory_points_to_win: self.victory_points_to_win.map_or(
                scenario.default_victory_points(),
                |v| clamp_u32(v, VICTORY_POINTS_RANGE),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let rules = Rules::default();
        assert_eq!(rules.discard_limit, 7);
        assert_eq!(rules.victory_points_to_win, 10);
        assert_eq!(rules.phase_duration_ms(PhaseKind::MainActions), 30_000);
        assert_eq!(rules.phase_duration_ms(PhaseKind::GameOver), 0);
    }

    #[test]
    fn test_patch_clamps_values() {
        let patch = RulesPatch {
            discard_limit: Some(1.0),
            setup_turn_ms: Some(1_000_000.0),
            play_turn_ms: Some(12_345.9),
            victory_points_to_win: Some(99.0),
            ..Default::default()
        };
        let rules = patch.apply(&Rules::default());
        assert_eq!(rules.discard_limit, 3);
        assert_eq!(rules.setup_turn_ms, 300_000);
        assert_eq!(rules.play_turn_ms, 12_345);
        assert_eq!(rules.victory_points_to_win, 30);
        assert_eq!(rules.micro_phase_ms, 15_000);
    }

    #[test]
    fn test_patch_picks_scenario_default_target() {
        let patch: RulesPatch =
            serde_json::from_str(r#"{"mapMode":"seafarers","seafarersScenario":"through-the-desert"}"#)
                .unwrap();
        let rules = patch.apply(&Rules::default());
        assert_eq!(rules.scenario, Scenario::ThroughTheDesert);
        assert_eq!(rules.victory_points_to_win, 14);
    }

    #[test]
    fn test_patch_keeps_seafarers_scenario_when_omitted() {
        let base = Rules::for_scenario(Scenario::FogIsland);
        let rules = RulesPatch {
            discard_limit: Some(9.0),
            ..Default::default()
        }
        .apply(&base);
        assert_eq!(rules.scenario, Scenario::FogIsland);
        assert_eq!(rules.discard_limit, 9);
    }
}
