//! Welfare engine: education, healthcare and social-support sliders.
//!
//! Sliders move at most one tier per turn away from the *active* tier.
//! A submission writes the `next` policy and is charged at once; the
//! carryover phase promotes `next` to `current`. Only `current` feeds
//! the modifiers read by the labor, production and development stages.

use crate::{
    config::{SimConfig, WelfareConfig},
    labor,
    lagged::Lagged,
    state::EconomyState,
    types::Resource,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelfarePolicy {
    pub education: u8,
    pub healthcare: u8,
    pub social_support: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelfareState {
    pub policy: Lagged<WelfarePolicy>,
    /// Gold charged for the submission still waiting to take effect.
    /// Refunded if the player resubmits before the turn resolves.
    pub pending_charge: f64,
}

impl Default for WelfareState {
    fn default() -> Self {
        Self {
            policy: Lagged::new(WelfarePolicy::default()),
            pending_charge: 0.0,
        }
    }
}

impl WelfareState {
    pub fn current(&self) -> WelfarePolicy {
        self.policy.current()
    }

    pub fn next(&self) -> WelfarePolicy {
        self.policy.next()
    }

    /// Carryover step: promote the staged policy.
    pub fn apply_pending(&mut self) -> Option<WelfarePolicy> {
        self.pending_charge = 0.0;
        self.policy.apply_pending()
    }
}

/// Modifiers derived from the active policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WelfareModifiers {
    pub labor_shift_pp: f64,
    pub research_bonus_pct: f64,
    pub happiness: f64,
    pub development: f64,
}

pub fn modifiers(config: &WelfareConfig, policy: &WelfarePolicy) -> WelfareModifiers {
    WelfareModifiers {
        labor_shift_pp: config.labor_shift_pp.total(policy),
        research_bonus_pct: config.research_bonus_pct.total(policy),
        happiness: config.happiness.total(policy),
        development: config.development.total(policy),
    }
}

/// Clamp a desired tier to one step from the active tier.
pub fn step_toward(current: u8, desired: u8, max_tier: u8) -> u8 {
    let lo = current.saturating_sub(1);
    let hi = current.saturating_add(1).min(max_tier).max(lo);
    desired.clamp(lo, hi)
}

/// Stage a policy change and charge for it. Returns the gold charged.
///
/// The charge is per worker of the workforce the staged policy will
/// govern, so it does not depend on whether a labor stage has run yet.
pub fn submit_policy(state: &mut EconomyState, rules: &SimConfig, desired: WelfarePolicy) -> f64 {
    let config = &rules.welfare;
    let refund = state.welfare.pending_charge;
    if refund > 0.0 {
        state.stockpile.add(Resource::Gold, refund);
    }

    let current = state.welfare.current();
    let next = WelfarePolicy {
        education: step_toward(current.education, desired.education, config.max_tier),
        healthcare: step_toward(current.healthcare, desired.healthcare, config.max_tier),
        social_support: step_toward(current.social_support, desired.social_support, config.max_tier),
    };
    state.welfare.policy.stage(next);

    let shift = modifiers(config, &next).labor_shift_pp;
    let workers = labor::projected_workforce(&rules.labor, state, shift);
    let cost = f64::from(workers) * config.cost_per_worker.total(&next);
    state.stockpile.add(Resource::Gold, -cost);
    state.welfare.pending_charge = cost;

    log::debug!(
        "turn={} welfare: staged {:?} (desired {:?}) workers={} cost={:.2}",
        state.turn,
        next,
        desired,
        workers,
        cost
    );
    cost
}

/// Drop a staged policy that has not taken effect yet and refund its
/// charge. Used when a replacement plan carries no welfare sliders.
pub fn withdraw_policy(state: &mut EconomyState) -> f64 {
    let refund = std::mem::take(&mut state.welfare.pending_charge);
    if refund > 0.0 {
        state.stockpile.add(Resource::Gold, refund);
    }
    let current = state.welfare.current();
    state.welfare.policy.stage(current);
    refund
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_is_limited_to_one_tier() {
        assert_eq!(step_toward(0, 2, 4), 1);
        assert_eq!(step_toward(3, 0, 4), 2);
        assert_eq!(step_toward(4, 4, 4), 4);
        assert_eq!(step_toward(4, 9, 4), 4);
        assert_eq!(step_toward(0, 0, 4), 0);
    }
}
