//! Finance engine: treasury waterfall, auto-borrowing, interest,
//! credit limit and debt-stress tiers.
//!
//! Every earlier stage books gold into the turn ledger instead of
//! touching the treasury; this stage applies the ledger in one place:
//!   1. treasury += revenues − expenditures
//!   2. borrow any shortfall up to the credit headroom
//!   3. debit interest (debt × rate)
//!   4. borrow again if interest pushed the treasury negative
//!   5. recompute the three stress tiers
//! A shortfall the headroom cannot cover leaves the treasury negative
//! and marks the nation defaulted. Default is a flag, never an error.
//!
//! Execution: every turn, after trade.

use crate::{
    config::{FinanceConfig, SimConfig},
    error::SimResult,
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    rng::GateRng,
    state::EconomyState,
    types::Resource,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Gold and FX booked by stages during one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnLedger {
    revenues: BTreeMap<&'static str, f64>,
    expenditures: BTreeMap<&'static str, f64>,
    pub fx_earned: f64,
    pub fx_spent: f64,
}

impl TurnLedger {
    pub fn book_revenue(&mut self, category: &'static str, amount: f64) {
        if amount != 0.0 {
            *self.revenues.entry(category).or_insert(0.0) += amount;
        }
    }

    pub fn book_expense(&mut self, category: &'static str, amount: f64) {
        if amount != 0.0 {
            *self.expenditures.entry(category).or_insert(0.0) += amount;
        }
    }

    pub fn total_revenue(&self) -> f64 {
        self.revenues.values().sum()
    }

    pub fn total_expenditure(&self) -> f64 {
        self.expenditures.values().sum()
    }

    pub fn expense(&self, category: &str) -> f64 {
        self.expenditures.get(category).copied().unwrap_or(0.0)
    }

    pub fn revenue(&self, category: &str) -> f64 {
        self.revenues.get(category).copied().unwrap_or(0.0)
    }

    /// Gold still uncommitted this turn.
    pub fn spendable_gold(&self, treasury: f64) -> f64 {
        treasury + self.total_revenue() - self.total_expenditure()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtStress {
    pub elevated: bool,
    pub high: bool,
    pub critical: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinanceSummary {
    pub revenues: f64,
    pub expenditures: f64,
    pub net_borrowing: f64,
    pub interest: f64,
    pub defaulted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceState {
    pub debt: f64,
    pub credit_limit: f64,
    pub interest_rate: f64,
    pub defaulted: bool,
    pub stress: DebtStress,
    pub summary: FinanceSummary,
}

impl Default for FinanceState {
    fn default() -> Self {
        Self::from_config(&FinanceConfig::default())
    }
}

impl FinanceState {
    pub fn from_config(config: &FinanceConfig) -> Self {
        Self {
            debt: 0.0,
            credit_limit: config.credit_limit,
            interest_rate: config.interest_rate,
            defaulted: false,
            stress: DebtStress::default(),
            summary: FinanceSummary::default(),
        }
    }

    pub fn headroom(&self) -> f64 {
        (self.credit_limit - self.debt).max(0.0)
    }

    /// Borrow against a negative treasury. Returns (borrowed, covered).
    fn borrow(&mut self, treasury: &mut f64) -> (f64, bool) {
        if *treasury >= 0.0 {
            return (0.0, true);
        }
        let shortfall = -*treasury;
        let borrowed = shortfall.min(self.headroom());
        self.debt += borrowed;
        *treasury += borrowed;
        (borrowed, borrowed >= shortfall)
    }

    fn recompute_stress(&mut self, thresholds: &[f64; 3]) {
        let level = |fraction: f64| self.debt > 0.0 && self.debt >= fraction * self.credit_limit;
        self.stress = DebtStress {
            elevated: level(thresholds[0]),
            high: level(thresholds[1]),
            critical: level(thresholds[2]),
        };
    }

    /// Run the waterfall against `treasury`.
    ///
    /// Interest is paid from the treasury, never added to debt directly.
    /// Debt grows by the interest only when the payment itself has to be
    /// borrowed, so an empty treasury compounds once per turn at `rate`.
    pub fn settle(
        &mut self,
        treasury: &mut f64,
        revenues: f64,
        expenditures: f64,
        stress_thresholds: &[f64; 3],
    ) -> FinanceSummary {
        *treasury += revenues - expenditures;
        let (first, covered_first) = self.borrow(treasury);

        let interest = self.debt * self.interest_rate;
        *treasury -= interest;
        let (second, covered_second) = self.borrow(treasury);

        self.defaulted = !(covered_first && covered_second);
        self.recompute_stress(stress_thresholds);
        self.summary = FinanceSummary {
            revenues,
            expenditures,
            net_borrowing: first + second,
            interest,
            defaulted: self.defaulted,
        };
        self.summary
    }
}

pub struct FinanceGate {
    config: Arc<SimConfig>,
}

impl FinanceGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }
}

impl TurnGate for FinanceGate {
    fn name(&self) -> &'static str {
        "finance"
    }

    fn resolve(
        &mut self,
        state: &mut EconomyState,
        turn: &mut TurnContext<'_>,
        _rng: &mut GateRng,
    ) -> SimResult<()> {
        let fx_net = turn.ledger.fx_earned - turn.ledger.fx_spent;
        state.stockpile.add(Resource::ForeignExchange, fx_net);

        let mut treasury = state.treasury();
        let summary = state.finance.settle(
            &mut treasury,
            turn.ledger.total_revenue(),
            turn.ledger.total_expenditure(),
            &self.config.finance.stress_thresholds,
        );
        state.stockpile.set(Resource::Gold, treasury);

        if summary.net_borrowing > 0.0 {
            turn.emit(TurnEvent::Borrowed {
                turn: turn.turn,
                amount: summary.net_borrowing,
            });
        }
        if summary.defaulted {
            log::warn!(
                "turn={} finance: DEFAULT debt={:.2} limit={:.2} treasury={:.2}",
                turn.turn,
                state.finance.debt,
                state.finance.credit_limit,
                treasury
            );
            turn.emit(TurnEvent::Defaulted {
                turn: turn.turn,
                debt: state.finance.debt,
                treasury,
            });
        }

        log::debug!(
            "turn={} finance: rev={:.2} exp={:.2} borrowed={:.2} interest={:.2} debt={:.2} fx_net={:.2}",
            turn.turn,
            summary.revenues,
            summary.expenditures,
            summary.net_borrowing,
            summary.interest,
            state.finance.debt,
            fx_net
        );
        Ok(())
    }
}
