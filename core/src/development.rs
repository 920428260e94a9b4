//! Development engine: the meter that drives urbanization.
//!
//! Each turn every canton rolls a base gain and adds its modifiers
//! (welfare development and happiness, minus a penalty per shortage).
//! Negative totals count as zero. Any decay flag knocks the *next*
//! urbanization level down one and empties the meter, and decay beats
//! growth. Otherwise a full meter raises the next level by one and
//! keeps at most `carry_cap` of the remainder, so one turn can never
//! step twice.
//!
//! The level is only staged here; the next carryover applies it.
//!
//! Execution: every turn, after finance. The base roll is the one
//! random draw in the pipeline.

use crate::{
    config::{DevelopmentConfig, SimConfig},
    error::SimResult,
    gate::{TurnContext, TurnGate},
    rng::GateRng,
    state::{DecayFlags, EconomyState},
    welfare,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterOutcome {
    pub meter: f64,
    pub next_level: u8,
}

/// Gain after flooring at zero and applying the optional cap.
pub fn clamp_gain(config: &DevelopmentConfig, raw: f64) -> f64 {
    let gain = raw.max(0.0);
    match config.gain_cap {
        Some(cap) => gain.min(cap.max(0.0)),
        None => gain,
    }
}

pub fn advance_meter(config: &DevelopmentConfig, level: u8, meter: f64, gain: f64, decay: bool) -> MeterOutcome {
    let level = level.clamp(1, config.max_level);
    if decay {
        return MeterOutcome {
            meter: 0.0,
            next_level: level.saturating_sub(1).max(1),
        };
    }
    let filled = meter.max(0.0) + gain.max(0.0);
    if filled >= config.meter_threshold && level < config.max_level {
        MeterOutcome {
            meter: (filled - config.meter_threshold).min(config.carry_cap),
            next_level: level + 1,
        }
    } else if filled >= config.meter_threshold {
        MeterOutcome {
            meter: filled.min(config.carry_cap),
            next_level: level,
        }
    } else {
        MeterOutcome {
            meter: filled,
            next_level: level,
        }
    }
}

pub struct DevelopmentGate {
    config: Arc<SimConfig>,
}

impl DevelopmentGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }
}

impl TurnGate for DevelopmentGate {
    fn name(&self) -> &'static str {
        "development"
    }

    fn resolve(
        &mut self,
        state: &mut EconomyState,
        turn: &mut TurnContext<'_>,
        rng: &mut GateRng,
    ) -> SimResult<()> {
        let config = &self.config.development;
        let mods = welfare::modifiers(&self.config.welfare, &state.welfare.current());
        let policy_bonus = mods.development + mods.happiness * config.happiness_weight;

        let mut staged = 0usize;
        for canton in state.cantons.values_mut() {
            let crisis = turn.external.crisis(&canton.id);
            let decay = DecayFlags {
                siege: crisis.siege,
                catastrophe: crisis.catastrophe,
                energy: canton.brownout,
                food: canton.shortages.food,
            };
            let shortages = u32::from(canton.shortages.food) + u32::from(canton.shortages.luxury);
            let roll = f64::from(rng.roll_inclusive(config.base_roll_min, config.base_roll_max));
            let gain = clamp_gain(config, roll + policy_bonus - config.shortage_penalty * f64::from(shortages));

            let outcome = advance_meter(config, canton.urbanization_level(), canton.development, gain, decay.any());
            canton.development = outcome.meter;
            canton.urbanization.stage(outcome.next_level);
            if canton.urbanization.is_pending() {
                staged += 1;
                log::debug!(
                    "turn={} development: {} UL {} -> {} (decay={})",
                    turn.turn,
                    canton.id,
                    canton.urbanization_level(),
                    outcome.next_level,
                    decay.any()
                );
            }
        }
        log::debug!("turn={} development: {} UL changes staged", turn.turn, staged);
        Ok(())
    }
}
