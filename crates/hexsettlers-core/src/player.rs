//! Player state and resource management.
//!
//! This module contains:
//! - Player struct with resources, development cards, and achievements
//! - ResourceHand for managing resource counts
//! - Development card types and deck management
//! - Building costs

use crate::bank::ResourceTally;
use crate::board::{PlayerId, Resource};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Player color for UI rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Orange,
    White,
}

impl PlayerColor {
    /// Get color for a seat index
    pub fn for_player(id: PlayerId) -> Self {
        match id % 6 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Green,
            3 => PlayerColor::Yellow,
            4 => PlayerColor::Orange,
            _ => PlayerColor::White,
        }
    }

}

/// Development card kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevCardKind {
    /// Move the robber (or pirate) and steal; counts toward Largest Army
    Knight,
    /// Place two roads for free
    RoadBuilding,
    /// Take any two resources from the bank
    Invention,
    /// Every opponent hands over all of one resource
    Monopoly,
    /// One victory point, revealed when played
    VictoryPoint,
}

impl DevCardKind {
    /// Create the standard development card deck (25 cards)
    pub fn standard_deck() -> Vec<DevCardKind> {
        let mut deck = Vec::with_capacity(25);
        deck.extend(std::iter::repeat(DevCardKind::Knight).take(14));
        deck.extend(std::iter::repeat(DevCardKind::RoadBuilding).take(2));
        deck.extend(std::iter::repeat(DevCardKind::Invention).take(2));
        deck.extend(std::iter::repeat(DevCardKind::Monopoly).take(2));
        deck.extend(std::iter::repeat(DevCardKind::VictoryPoint).take(5));
        deck
    }

    /// Create a shuffled deck
    pub fn shuffled_deck<R: Rng>(rng: &mut R) -> Vec<DevCardKind> {
        let mut deck = Self::standard_deck();
        deck.shuffle(rng);
        deck
    }

    pub fn label(&self) -> &'static str {
        match self {
            DevCardKind::Knight => "Knight",
            DevCardKind::RoadBuilding => "Road Building",
            DevCardKind::Invention => "Invention",
            DevCardKind::Monopoly => "Monopoly",
            DevCardKind::VictoryPoint => "Victory Point",
        }
    }
}

/// A development card held by a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevCard {
    pub id: u32,
    pub kind: DevCardKind,
    pub bought_on_turn: u32,
    pub played: bool,
}

/// A hand of resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceHand {
    pub brick: u32,
    pub lumber: u32,
    pub ore: u32,
    pub grain: u32,
    pub wool: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(brick: u32, lumber: u32, ore: u32, grain: u32, wool: u32) -> Self {
        Self {
            brick,
            lumber,
            ore,
            grain,
            wool,
        }
    }

    /// The same amount of every resource
    pub fn uniform(amount: u32) -> Self {
        Self::with_amounts(amount, amount, amount, amount, amount)
    }

    /// Total number of resource cards, saturating at `u32::MAX`
    pub fn total(&self) -> u32 {
        Resource::ALL
            .into_iter()
            .fold(0u32, |sum, r| sum.saturating_add(self.get(r)))
    }

    /// Check if hand is empty
    pub fn is_empty(&self) -> bool {
        Resource::ALL.into_iter().all(|r| self.get(r) == 0)
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Brick => self.brick,
            Resource::Lumber => self.lumber,
            Resource::Ore => self.ore,
            Resource::Grain => self.grain,
            Resource::Wool => self.wool,
        }
    }

    /// Set count of a specific resource
    pub fn set(&mut self, resource: Resource, count: u32) {
        match resource {
            Resource::Brick => self.brick = count,
            Resource::Lumber => self.lumber = count,
            Resource::Ore => self.ore = count,
            Resource::Grain => self.grain = count,
            Resource::Wool => self.wool = count,
        }
    }

    /// Add resources to hand
    pub fn add(&mut self, resource: Resource, amount: u32) {
        let current = self.get(resource);
        self.set(resource, current.saturating_add(amount));
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for (resource, amount) in other.iter() {
            self.add(resource, amount);
        }
    }

    /// Remove up to `amount` of a resource, returning how many were removed
    pub fn take(&mut self, resource: Resource, amount: u32) -> u32 {
        let current = self.get(resource);
        let taken = current.min(amount);
        self.set(resource, current - taken);
        taken
    }

    /// Check if can afford a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        cost.iter().all(|(resource, amount)| self.get(resource) >= amount)
    }

    /// Pick a resource kind uniformly among the kinds present
    pub fn random_kind<R: Rng>(&self, rng: &mut R) -> Option<Resource> {
        let kinds: Vec<Resource> = Resource::ALL
            .into_iter()
            .filter(|&r| self.get(r) > 0)
            .collect();
        kinds.choose(rng).copied()
    }

    /// Pick `count` random cards, weighted by how many of each are held
    pub fn random_cards<R: Rng>(&self, count: u32, rng: &mut R) -> ResourceHand {
        let mut pool = self.clone();
        let mut picked = ResourceHand::new();
        for _ in 0..count {
            let total = pool.total();
            if total == 0 {
                break;
            }
            let mut roll = rng.gen_range(0..total);
            for resource in Resource::ALL {
                let held = pool.get(resource);
                if roll < held {
                    pool.take(resource, 1);
                    picked.add(resource, 1);
                    break;
                }
                roll -= held;
            }
        }
        picked
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Non-zero entries in a fixed resource order
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .into_iter()
            .map(move |r| (r, self.get(r)))
            .filter(|&(_, n)| n > 0)
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// Cost to build a road: 1 brick, 1 lumber
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// Cost to build a ship: 1 lumber, 1 wool
    pub fn ship() -> ResourceHand {
        ResourceHand::with_amounts(0, 1, 0, 0, 1)
    }

    /// Cost to build a settlement: 1 brick, 1 lumber, 1 grain, 1 wool
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 1, 1)
    }

    /// Cost to upgrade to city: 3 ore, 2 grain
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 3, 2, 0)
    }

    /// Cost to buy a development card: 1 ore, 1 grain, 1 wool
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// A single player's state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Seat index
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Player color
    pub color: PlayerColor,
    /// Current resources
    pub resources: ResourceHand,
    /// Development cards, played ones included
    pub dev_cards: Vec<DevCard>,
    /// Derived; refreshed after every scoring change
    pub victory_points: u32,
    /// Knights played (for Largest Army)
    pub army_size: u32,
    /// Longest continuous route owned
    pub longest_road_length: u32,
    /// Victory point cards turned face up
    pub revealed_vp_cards: u32,
    /// Points from settling new islands
    pub island_bonus_vp: u32,
    /// Points from reaching the far side of the desert
    pub far_side_bonus_vp: u32,
    /// Turn on which a non-VP development card was last played
    pub dev_played_turn: Option<u32>,
    /// Resources gained and lost, by source
    pub tally: ResourceTally,
}

impl Player {
    /// Create a new player
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            color: PlayerColor::for_player(id),
            resources: ResourceHand::new(),
            dev_cards: Vec::new(),
            victory_points: 0,
            army_size: 0,
            longest_road_length: 0,
            revealed_vp_cards: 0,
            island_bonus_vp: 0,
            far_side_bonus_vp: 0,
            dev_played_turn: None,
            tally: ResourceTally::default(),
        }
    }

    /// Points that do not come from the board or the two awards
    pub fn bonus_points(&self) -> u32 {
        self.revealed_vp_cards + self.island_bonus_vp + self.far_side_bonus_vp
    }

    /// Cards not yet played
    pub fn unplayed_dev_cards(&self) -> usize {
        self.dev_cards.iter().filter(|c| !c.played).count()
    }

    pub fn dev_card(&self, id: u32) -> Option<&DevCard> {
        self.dev_cards.iter().find(|c| c.id == id)
    }

    pub fn dev_card_mut(&mut self, id: u32) -> Option<&mut DevCard> {
        self.dev_cards.iter_mut().find(|c| c.id == id)
    }
}
