//! WebAssembly bindings for local and hot-seat play.
//!
//! The browser supplies the clock: every timed call takes `now_ms`.

use wasm_bindgen::prelude::*;

use crate::actions::{BuildTarget, GameAction};
use crate::game::GameState;
use crate::rules::{Rules, RulesPatch};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
}

#[wasm_bindgen]
impl WasmGame {
    /// `rules_json` is a partial rules object; missing fields take defaults
    #[wasm_bindgen(constructor)]
    pub fn new(player_names_json: &str, rules_json: &str) -> Result<WasmGame, JsValue> {
        let player_names: Vec<String> = serde_json::from_str(player_names_json)
            .map_err(|e| js_error(format!("Invalid player names: {e}")))?;
        let patch: RulesPatch = if rules_json.trim().is_empty() {
            RulesPatch::default()
        } else {
            serde_json::from_str(rules_json).map_err(|e| js_error(format!("Invalid rules: {e}")))?
        };
        let rules = patch.apply(&Rules::default());
        let state = GameState::new(rules, player_names).map_err(js_error)?;
        Ok(WasmGame { state })
    }

    /// Full state as the given seat sees it
    #[wasm_bindgen(js_name = getView)]
    pub fn get_view(&self, viewer: u8) -> String {
        serde_json::to_string(&self.state.view_for(Some(viewer)))
            .unwrap_or_else(|_| "{}".to_string())
    }

    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.state.current_player
    }

    /// Apply an action from JSON, returns events JSON or the error message
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str, now_ms: f64) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| js_error(format!("Invalid action JSON: {e}")))?;
        let events = self.state.apply_action(player, action).map_err(js_error)?;
        self.state.sync_timer(now_ms as u64);
        Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Run the timeout supervisor; returns the outcome JSON or `null`
    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> String {
        match self.state.handle_timeout(now_ms as u64) {
            Some(outcome) => serde_json::to_string(&outcome).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }

    #[wasm_bindgen(js_name = setPaused)]
    pub fn set_paused(&mut self, player: u8, paused: bool, now_ms: f64) -> bool {
        self.state.set_paused(player, paused, now_ms as u64)
    }

    /// `target_json` is `{"targetKind": "node" | "edge", "targetId": n}`
    #[wasm_bindgen(js_name = buildOptions)]
    pub fn build_options(&self, viewer: u8, target_json: &str) -> Result<String, JsValue> {
        let target: BuildTarget = serde_json::from_str(target_json)
            .map_err(|e| js_error(format!("Invalid target: {e}")))?;
        let options = self.state.build_options(viewer, target);
        Ok(serde_json::to_string(&options).unwrap_or_else(|_| "[]".to_string()))
    }

    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<u8> {
        self.state.winner()
    }
}
