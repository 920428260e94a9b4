//! Output resolution and upkeep.
//!
//! Production: every utilised slot yields its sector's output resource
//! times the canton's suitability multiplier. Sectors with inputs draw
//! them from the national stockpile first; when an input runs short the
//! sector's output scales down with the fraction it could source.
//! Research output carries the active welfare research bonus. Running
//! capital projects add their catalogue yields.
//!
//! Upkeep: O&M for active facilities (national ones at the national
//! multiplier) and running projects, and the labor tax on effective
//! workers, are booked on the turn ledger for the finance stage.

use crate::{
    config::SimConfig,
    error::SimResult,
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    infrastructure, projects,
    rng::GateRng,
    state::{CantonEconomy, EconomyState, Stockpile},
    suitability,
    types::{Resource, Sector},
    welfare,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fraction of `utilized` slots' inputs the stockpile can cover.
pub fn input_fraction(stockpile: &Stockpile, inputs: &BTreeMap<Resource, f64>, utilized: u32) -> f64 {
    inputs
        .iter()
        .filter(|(_, per_slot)| **per_slot > 0.0)
        .map(|(resource, per_slot)| {
            let need = per_slot * f64::from(utilized);
            (stockpile.get(*resource).max(0.0) / need).min(1.0)
        })
        .fold(1.0, f64::min)
}

pub struct ProductionGate {
    config: Arc<SimConfig>,
}

impl ProductionGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }

    fn resolve_canton(
        &self,
        canton: &mut CantonEconomy,
        stockpile: &mut Stockpile,
        research_bonus_pct: f64,
        turn: &mut TurnContext<'_>,
    ) -> BTreeMap<Resource, f64> {
        let production = &self.config.production;
        let profile = suitability::cached_profile(&self.config.suitability, canton);
        let mut output = BTreeMap::new();

        for sector in Sector::ALL {
            let utilized = canton.sector(sector).utilization;
            let Some(resource) = sector.output_resource() else {
                continue;
            };
            if utilized == 0 {
                continue;
            }

            let fraction = match production.inputs_per_slot.get(&sector) {
                Some(inputs) => {
                    let fraction = input_fraction(stockpile, inputs, utilized);
                    for (input, per_slot) in inputs {
                        let need = per_slot * f64::from(utilized);
                        let available = stockpile.get(*input).max(0.0);
                        if available < need {
                            turn.emit(TurnEvent::ResourceShortage {
                                turn: turn.turn,
                                canton: canton.id.clone(),
                                resource: *input,
                                shortfall: need - available,
                            });
                        }
                        stockpile.take_up_to(*input, need * fraction);
                    }
                    fraction
                }
                None => 1.0,
            };

            let per_slot = production.output_per_slot.get(&sector).copied().unwrap_or(0.0);
            let mut amount = f64::from(utilized) * per_slot * profile.multiplier(sector) * fraction;
            if sector == Sector::Research {
                amount *= 1.0 + research_bonus_pct / 100.0;
            }
            *output.entry(resource).or_insert(0.0) += amount;
        }
        output
    }
}

impl TurnGate for ProductionGate {
    fn name(&self) -> &'static str {
        "production"
    }

    fn resolve(
        &mut self,
        state: &mut EconomyState,
        turn: &mut TurnContext<'_>,
        _rng: &mut GateRng,
    ) -> SimResult<()> {
        let bonus = welfare::modifiers(&self.config.welfare, &state.welfare.current()).research_bonus_pct;
        let mut produced: BTreeMap<Resource, f64> = BTreeMap::new();

        let ids: Vec<String> = state.cantons.keys().cloned().collect();
        for id in ids {
            let Some(canton) = state.cantons.get_mut(&id) else {
                continue;
            };
            let output = self.resolve_canton(canton, &mut state.stockpile, bonus, turn);
            for (resource, amount) in output {
                *produced.entry(resource).or_insert(0.0) += amount;
            }
        }
        for (resource, amount) in projects::yields(state, &self.config.projects) {
            *produced.entry(resource).or_insert(0.0) += amount;
        }
        for (&resource, &amount) in &produced {
            state.stockpile.add(resource, amount);
        }

        log::debug!(
            "turn={} production: {}",
            turn.turn,
            produced
                .iter()
                .map(|(r, a)| format!("{r}={a:.1}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(())
    }
}

pub struct UpkeepGate {
    config: Arc<SimConfig>,
}

impl UpkeepGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }
}

impl TurnGate for UpkeepGate {
    fn name(&self) -> &'static str {
        "upkeep"
    }

    fn resolve(
        &mut self,
        state: &mut EconomyState,
        turn: &mut TurnContext<'_>,
        _rng: &mut GateRng,
    ) -> SimResult<()> {
        let facility_om = infrastructure::upkeep(state, &self.config.infrastructure);
        let project_om = projects::upkeep(state, &self.config.projects);
        let workers: u32 = state.cantons.values().map(CantonEconomy::effective_labor).sum();
        let labor_tax = f64::from(workers) * self.config.finance.labor_tax_per_worker;

        turn.ledger.book_expense("facility_om", facility_om);
        turn.ledger.book_expense("project_om", project_om);
        turn.ledger.book_revenue("labor_tax", labor_tax);

        log::debug!(
            "turn={} upkeep: facility_om={:.2} project_om={:.2} labor_tax={:.2}",
            turn.turn,
            facility_om,
            project_om,
            labor_tax
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scarcest_input_bounds_the_fraction() {
        let mut stock = Stockpile::default();
        stock.set(Resource::Production, 10.0);
        stock.set(Resource::Materials, 2.0);
        let inputs: BTreeMap<Resource, f64> = [(Resource::Production, 0.5), (Resource::Materials, 0.5)].into();
        // 8 slots need 4 of each; materials cover half.
        assert!((input_fraction(&stock, &inputs, 8) - 0.5).abs() < 1e-12);
        stock.set(Resource::Materials, 9.0);
        assert_eq!(input_fraction(&stock, &inputs, 8), 1.0);
    }
}
