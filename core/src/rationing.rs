//! Shared scarcity arithmetic for the energy and logistics gates.
//!
//! Uniform mode scales every funded count by the same ratio, rounding
//! down. Essentials-first serves a priority list of sectors to
//! completion, in order, and leaves whatever supply remains for the
//! caller to spread uniformly over everything else.

use crate::types::{CantonId, Sector};

/// Tolerance so that `13 × (10/13)` floors to 10, not 9.
const FLOOR_EPSILON: f64 = 1e-9;

/// `min(1, supply / demand)`, or 1 when nothing is demanded.
pub fn ratio(supply: f64, demand: f64) -> f64 {
    if demand <= 0.0 {
        1.0
    } else {
        (supply.max(0.0) / demand).min(1.0)
    }
}

pub fn scaled_slots(slots: u32, ratio: f64) -> u32 {
    let scaled = (f64::from(slots) * ratio.clamp(0.0, 1.0) + FLOOR_EPSILON).floor();
    (scaled as u32).min(slots)
}

/// Funded slots of one sector in one canton and what each one draws.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDemand {
    pub canton: CantonId,
    pub sector: Sector,
    pub slots: u32,
    pub per_slot: f64,
}

impl SlotDemand {
    pub fn total(&self) -> f64 {
        f64::from(self.slots) * self.per_slot
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotGrant {
    pub canton: CantonId,
    pub sector: Sector,
    pub before: u32,
    pub after: u32,
    /// Supply consumed by the slots that kept running.
    pub granted: f64,
}

impl SlotGrant {
    pub fn was_cut(&self) -> bool {
        self.after < self.before
    }
}

pub fn uniform(demands: &[SlotDemand], ratio: f64) -> Vec<SlotGrant> {
    demands
        .iter()
        .map(|d| {
            let after = scaled_slots(d.slots, ratio);
            SlotGrant {
                canton: d.canton.clone(),
                sector: d.sector,
                before: d.slots,
                after,
                granted: f64::from(after) * d.per_slot,
            }
        })
        .collect()
}

/// Serve `priority` sectors in order. Returns the grants for every
/// demand in a priority sector and the supply left over.
pub fn essentials_first(demands: &[SlotDemand], supply: f64, priority: &[Sector]) -> (Vec<SlotGrant>, f64) {
    let mut remaining = supply.max(0.0);
    let mut grants = Vec::new();
    let mut seen: Vec<Sector> = Vec::new();

    for &sector in priority {
        if seen.contains(&sector) {
            continue;
        }
        seen.push(sector);

        for d in demands.iter().filter(|d| d.sector == sector) {
            let need = d.total();
            let after = if d.per_slot <= 0.0 || remaining + FLOOR_EPSILON >= need {
                d.slots
            } else {
                ((remaining / d.per_slot + FLOOR_EPSILON).floor() as u32).min(d.slots)
            };
            let granted = f64::from(after) * d.per_slot;
            remaining = (remaining - granted).max(0.0);
            grants.push(SlotGrant {
                canton: d.canton.clone(),
                sector: d.sector,
                before: d.slots,
                after,
                granted,
            });
        }
    }
    (grants, remaining)
}

/// Demands not covered by `priority`.
pub fn outside_priority(demands: &[SlotDemand], priority: &[Sector]) -> Vec<SlotDemand> {
    demands
        .iter()
        .filter(|d| !priority.contains(&d.sector))
        .cloned()
        .collect()
}
