//! Bank, port and player-to-player trading.

use crate::actions::GameEvent;
use crate::bank::{GainSource, LossSource};
use crate::board::{PlayerId, Resource};
use crate::game::{GameError, GameState};
use crate::log::LogKind;
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResponse {
    Accept,
    Reject,
}

/// The single open player trade, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTrade {
    pub id: u32,
    pub from: PlayerId,
    pub offer: ResourceHand,
    pub request: ResourceHand,
    /// Every other seat; `None` until they answer
    pub responses: BTreeMap<PlayerId, Option<TradeResponse>>,
}

impl PendingTrade {
    pub fn all_rejected(&self) -> bool {
        !self.responses.is_empty()
            && self
                .responses
                .values()
                .all(|r| *r == Some(TradeResponse::Reject))
    }

    pub fn accepted_by(&self, player: PlayerId) -> bool {
        self.responses.get(&player).copied().flatten() == Some(TradeResponse::Accept)
    }
}

impl GameState {
    /// Bank rate for giving up `resource`: 4, 3 with a generic port, 2 with
    /// a matching one
    pub fn trade_ratio(&self, player: PlayerId, resource: Resource) -> u32 {
        self.board.trade_ratio(player, resource)
    }

    pub(crate) fn bank_trade(
        &mut self,
        player: PlayerId,
        give: Resource,
        take: Resource,
        take_qty: u32,
        force_ratio: Option<u32>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        if give == take {
            return Err(GameError::InvalidTrade(
                "cannot trade a resource for itself".into(),
            ));
        }
        if take_qty == 0 {
            return Err(GameError::InvalidTrade("must take at least one".into()));
        }
        let ratio = match force_ratio {
            None => self.trade_ratio(player, give),
            Some(4) => 4,
            Some(other) => {
                return Err(GameError::InvalidTrade(format!(
                    "unsupported forced ratio {other}"
                )))
            }
        };
        let cost = ratio
            .checked_mul(take_qty)
            .ok_or(GameError::NotEnough(give))?;
        if self.seat(player).resources.get(give) < cost {
            return Err(GameError::NotEnough(give));
        }
        if self.bank.available(take) < take_qty {
            return Err(GameError::BankShort(take));
        }

        self.pay(player, &ResourceHand::single(give, cost), LossSource::Trade);
        let took = self.grant(player, take, take_qty, GainSource::Trade);
        events.push(GameEvent::BankTraded {
            player,
            gave: give,
            gave_amount: cost,
            took: take,
            took_amount: took,
        });
        let name = self.name_of(player);
        self.log.push(
            LogKind::Trade,
            format!("{name} traded {cost} {give} for {took} {take} ({ratio}:1)"),
        );
        Ok(())
    }

    pub(crate) fn propose_trade(
        &mut self,
        player: PlayerId,
        offer: ResourceHand,
        request: ResourceHand,
        replace_trade_id: Option<u32>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        if let Some(pending) = &self.pending_trade {
            let revising = replace_trade_id == Some(pending.id) && pending.from == player;
            if !revising {
                return Err(GameError::TradePending);
            }
        }
        if offer.is_empty() || request.is_empty() {
            return Err(GameError::InvalidTrade(
                "both sides of a trade need resources".into(),
            ));
        }
        if !self.seat(player).resources.can_afford(&offer) {
            return Err(GameError::CannotAfford);
        }

        let responses = self
            .players
            .iter()
            .filter(|p| p.id != player)
            .map(|p| (p.id, None))
            .collect();
        let id = self.counters.next_trade();
        self.pending_trade = Some(PendingTrade {
            id,
            from: player,
            offer,
            request,
            responses,
        });
        events.push(GameEvent::TradeProposed { trade_id: id, from: player });
        let name = self.name_of(player);
        self.log.push(LogKind::Trade, format!("{name} proposed a trade"));
        Ok(())
    }

    pub(crate) fn respond_trade(
        &mut self,
        player: PlayerId,
        trade_id: u32,
        response: TradeResponse,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let pending = self.pending_trade.as_mut().ok_or(GameError::NoActiveTrade)?;
        if pending.id != trade_id {
            return Err(GameError::TradeMismatch);
        }
        if pending.from == player {
            return Err(GameError::OwnTrade);
        }
        pending.responses.insert(player, Some(response));
        events.push(GameEvent::TradeResponded {
            trade_id,
            player,
            response,
        });
        if pending.all_rejected() {
            self.pending_trade = None;
            events.push(GameEvent::TradeWithdrawn { trade_id });
            self.log
                .push(LogKind::Trade, "Trade withdrawn: everyone declined");
        }
        Ok(())
    }

    /// Swap both sides atomically. Holdings are re-checked first: a proposer
    /// who no longer has the offer loses the trade, and a counterpart who no
    /// longer has the request is counted as rejecting. Both cases move no
    /// cards and return an error, but the withdrawal or rejection stays.
    pub(crate) fn finalize_trade(
        &mut self,
        player: PlayerId,
        trade_id: u32,
        with: PlayerId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let pending = self.pending_trade.as_ref().ok_or(GameError::NoActiveTrade)?;
        if pending.id != trade_id {
            return Err(GameError::TradeMismatch);
        }
        if pending.from != player {
            return Err(GameError::NotYourTrade);
        }
        if !pending.accepted_by(with) {
            return Err(GameError::NotAccepted);
        }
        if !self.seat(player).resources.can_afford(&pending.offer) {
            self.pending_trade = None;
            events.push(GameEvent::TradeWithdrawn { trade_id });
            let name = self.name_of(player);
            self.log.push(
                LogKind::Trade,
                format!("Trade withdrawn: {name} no longer holds the offer"),
            );
            return Err(GameError::ProposerShort);
        }
        if !self.seat(with).resources.can_afford(&pending.request) {
            self.respond_trade(with, trade_id, TradeResponse::Reject, events)?;
            return Err(GameError::CounterpartShort);
        }

        let offer = pending.offer.clone();
        let request = pending.request.clone();
        for (resource, amount) in offer.iter() {
            self.transfer(player, with, resource, amount, GainSource::Trade, LossSource::Trade);
        }
        for (resource, amount) in request.iter() {
            self.transfer(with, player, resource, amount, GainSource::Trade, LossSource::Trade);
        }
        self.pending_trade = None;
        events.push(GameEvent::TradeCompleted {
            trade_id,
            from: player,
            with,
        });
        let (a, b) = (self.name_of(player), self.name_of(with));
        self.log.push(LogKind::Trade, format!("{a} traded with {b}"));
        Ok(())
    }
}
