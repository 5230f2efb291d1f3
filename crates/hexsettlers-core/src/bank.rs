//! The shared resource bank and per-player flow tallies.
//!
//! Every grant to a player (production, setup, discovery, invention) is drawn
//! through [`Bank::give`] and every payment (building, development cards,
//! discards, bank trades) goes back through [`Bank::receive`], so bank stock
//! plus all hands never exceeds [`BANK_SUPPLY`] per resource.

use crate::board::Resource;
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cards per resource in a full bank
pub const BANK_SUPPLY: u32 = 19;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    stock: ResourceHand,
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}

impl Bank {
    pub fn new() -> Self {
        Self {
            stock: ResourceHand::uniform(BANK_SUPPLY),
        }
    }

    pub fn stock(&self) -> &ResourceHand {
        &self.stock
    }

    pub fn available(&self, resource: Resource) -> u32 {
        self.stock.get(resource)
    }

    /// Hand out up to `wanted`; returns what was actually given.
    pub fn give(&mut self, resource: Resource, wanted: u32) -> u32 {
        self.stock.take(resource, wanted)
    }

    /// Take back `amount`, clamped at the supply cap; returns what was stored.
    pub fn receive(&mut self, resource: Resource, amount: u32) -> u32 {
        let current = self.stock.get(resource);
        let stored = amount.min(BANK_SUPPLY.saturating_sub(current));
        self.stock.set(resource, current + stored);
        stored
    }
}

/// Where resources a player gained came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainSource {
    Setup,
    Production,
    Discovery,
    Trade,
    Steal,
    DevCard,
}

/// Where resources a player lost went
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossSource {
    Build,
    Trade,
    Steal,
    Discard,
    DevCard,
}

/// Running totals of resources gained and lost, by source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTally {
    pub gained: BTreeMap<GainSource, ResourceHand>,
    pub lost: BTreeMap<LossSource, ResourceHand>,
}

impl ResourceTally {
    pub fn record_gain(&mut self, source: GainSource, resource: Resource, amount: u32) {
        if amount > 0 {
            self.gained.entry(source).or_default().add(resource, amount);
        }
    }

    pub fn record_loss(&mut self, source: LossSource, resource: Resource, amount: u32) {
        if amount > 0 {
            self.lost.entry(source).or_default().add(resource, amount);
        }
    }

    pub fn total_gained(&self) -> u32 {
        self.gained.values().map(ResourceHand::total).sum()
    }

    pub fn total_lost(&self) -> u32 {
        self.lost.values().map(ResourceHand::total).sum()
    }
}
