//! Rule tables for one game.
//!
//! Every modifier table the pipeline reads lives here and is owned by a
//! single engine through `Arc<SimConfig>`. Nothing is process-global, so
//! concurrent games can run different rule sets side by side.
//!
//! Each section carries the built-in rules as its `Default` and is
//! `#[serde(default)]`, so a rules file only has to name what it changes.

use crate::{
    energy::PlantKind,
    infrastructure::FacilityKind,
    types::{Resource, Sector, TileType, TransportMode},
    welfare::WelfarePolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn sector_table(values: [f64; 7]) -> BTreeMap<Sector, f64> {
    Sector::ALL.into_iter().zip(values).collect()
}

// ── Budget ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Gold needed to fund one slot for one turn.
    pub slot_om_cost: BTreeMap<Sector, f64>,
    /// Fraction of one slot's O&M charged for each idle slot.
    pub idle_tax_rate: f64,
    /// Turns a retooled slot is out of service.
    pub retool_turns: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            slot_om_cost: sector_table([4.0, 5.0, 8.0, 10.0, 6.0, 12.0, 5.0]),
            idle_tax_rate: 0.25,
            retool_turns: 2,
        }
    }
}

impl BudgetConfig {
    pub fn cost_per_slot(&self, sector: Sector) -> f64 {
        self.slot_om_cost.get(&sector).copied().unwrap_or(0.0)
    }
}

// ── Energy ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantSpec {
    pub base_output: f64,
    #[serde(default)]
    pub fuel: Option<Resource>,
    #[serde(default)]
    pub fuel_per_turn: f64,
    pub om_cost: f64,
    #[serde(default)]
    pub renewable: bool,
    pub build_turns: u32,
    pub build_production: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Energy drawn by one funded slot.
    pub sector_demand: BTreeMap<Sector, f64>,
    /// Output scaling applied to wind and solar.
    pub renewable_capacity_factor: f64,
    pub plants: BTreeMap<PlantKind, PlantSpec>,
    /// Default priority order for essentials-first rationing.
    pub essentials: Vec<Sector>,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        let plant = |base_output, fuel, fuel_per_turn, om_cost, renewable, build_turns, build_production| PlantSpec {
            base_output,
            fuel,
            fuel_per_turn,
            om_cost,
            renewable,
            build_turns,
            build_production,
        };
        Self {
            sector_demand: sector_table([1.0, 2.0, 3.0, 3.0, 1.0, 2.0, 1.0]),
            renewable_capacity_factor: 0.6,
            plants: [
                (PlantKind::Coal, plant(40.0, Some(Resource::Coal), 2.0, 6.0, false, 3, 40.0)),
                (PlantKind::Oil, plant(35.0, Some(Resource::Oil), 2.0, 6.0, false, 3, 40.0)),
                (PlantKind::Gas, plant(30.0, Some(Resource::Gas), 2.0, 5.0, false, 2, 35.0)),
                (PlantKind::Nuclear, plant(100.0, Some(Resource::Uranium), 1.0, 15.0, false, 6, 120.0)),
                (PlantKind::Hydro, plant(30.0, None, 0.0, 4.0, false, 4, 60.0)),
                (PlantKind::Wind, plant(25.0, None, 0.0, 2.0, true, 2, 30.0)),
                (PlantKind::Solar, plant(20.0, None, 0.0, 2.0, true, 2, 30.0)),
            ]
            .into(),
            essentials: vec![Sector::Agriculture, Sector::Logistics, Sector::Extraction],
        }
    }
}

impl EnergyConfig {
    pub fn demand_per_slot(&self, sector: Sector) -> f64 {
        self.sector_demand.get(&sector).copied().unwrap_or(0.0)
    }
}

// ── Logistics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModeSpec {
    /// LP per unit shipped per hop.
    pub cost_per_hop: f64,
    /// Shipments needing more hops than this arrive next turn.
    pub hop_threshold: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GatewaySpec {
    /// Units per turn the national gateway can clear.
    pub capacity: f64,
    pub lp_per_unit: f64,
    pub fx_per_unit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticsConfig {
    pub lp_per_slot: f64,
    /// LP consumed by one funded slot to keep operating.
    pub operating_cost: BTreeMap<Sector, f64>,
    pub modes: BTreeMap<TransportMode, ModeSpec>,
    pub gateways: BTreeMap<FacilityKind, GatewaySpec>,
    pub essentials: Vec<Sector>,
}

impl Default for LogisticsConfig {
    fn default() -> Self {
        Self {
            lp_per_slot: 10.0,
            operating_cost: sector_table([0.5, 1.0, 1.5, 1.5, 0.5, 0.5, 0.0]),
            modes: [
                (TransportMode::Rail, ModeSpec { cost_per_hop: 0.10, hop_threshold: 6 }),
                (TransportMode::Sea, ModeSpec { cost_per_hop: 0.15, hop_threshold: 8 }),
                (TransportMode::Air, ModeSpec { cost_per_hop: 0.40, hop_threshold: 1 }),
            ]
            .into(),
            gateways: [
                (FacilityKind::Port, GatewaySpec { capacity: 200.0, lp_per_unit: 0.5, fx_per_unit: 0.2 }),
                (FacilityKind::Airport, GatewaySpec { capacity: 50.0, lp_per_unit: 1.5, fx_per_unit: 0.5 }),
                (FacilityKind::RailHub, GatewaySpec { capacity: 120.0, lp_per_unit: 0.8, fx_per_unit: 0.3 }),
            ]
            .into(),
            essentials: vec![Sector::Agriculture, Sector::Extraction, Sector::Industry],
        }
    }
}

impl LogisticsConfig {
    pub fn operating_per_slot(&self, sector: Sector) -> f64 {
        self.operating_cost.get(&sector).copied().unwrap_or(0.0)
    }
}

// ── Labor ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LaborRow {
    pub general: u32,
    pub skilled: u32,
    pub specialist: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborConfig {
    /// Base pool per urbanization level; index 0 is UL 1.
    pub pools_by_ul: Vec<LaborRow>,
    /// Upper bound on any one class's share of the pool.
    pub max_class_share: f64,
    /// Share of the labor-mix transfer going to skilled (rest to specialist).
    pub skilled_transfer_share: f64,
}

impl Default for LaborConfig {
    fn default() -> Self {
        Self {
            pools_by_ul: (1..=12u32)
                .map(|ul| LaborRow {
                    general: 30 + 10 * ul,
                    skilled: 4 + 4 * ul,
                    specialist: 1 + 2 * ul,
                })
                .collect(),
            max_class_share: 0.90,
            skilled_transfer_share: 2.0 / 3.0,
        }
    }
}

// ── Suitability ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityConfig {
    /// Percent modifier per sector per tile type, weighted by share.
    pub geography: BTreeMap<Sector, BTreeMap<TileType, f64>>,
    /// Percent modifier per sector per urbanization level (index 0 is UL 1).
    pub urbanization: BTreeMap<Sector, Vec<f64>>,
    pub min_percent: i32,
    pub max_percent: i32,
}

impl Default for SuitabilityConfig {
    fn default() -> Self {
        use TileType::*;
        let tiles = [Plains, Forest, Hills, Mountains, Desert, Coast, Wetland, Tundra];
        let row = |values: [f64; 8]| -> BTreeMap<TileType, f64> { tiles.into_iter().zip(values).collect() };
        Self {
            geography: [
                (Sector::Agriculture, row([30.0, -10.0, 0.0, -40.0, -50.0, 10.0, 5.0, -40.0])),
                (Sector::Extraction, row([-10.0, 10.0, 25.0, 40.0, 10.0, -20.0, -20.0, 10.0])),
                (Sector::Industry, row([10.0, 0.0, 5.0, -20.0, -10.0, 15.0, -15.0, -20.0])),
                (Sector::Ordnance, row([5.0, 0.0, 10.0, 0.0, 0.0, 5.0, -15.0, -10.0])),
                (Sector::Luxury, row([5.0, 15.0, 0.0, -10.0, -20.0, 20.0, 0.0, -30.0])),
                (Sector::Research, row([0.0, 0.0, 0.0, 0.0, -5.0, 5.0, 0.0, -10.0])),
                (Sector::Logistics, row([15.0, -10.0, -10.0, -40.0, -20.0, 20.0, -30.0, -30.0])),
            ]
            .into(),
            urbanization: [
                (Sector::Agriculture, vec![10.0, 8.0, 6.0, 4.0, 2.0, 0.0, -2.0, -4.0, -6.0, -8.0, -10.0, -12.0]),
                (Sector::Extraction, vec![5.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0, 0.0, -2.0, -4.0, -6.0, -8.0]),
                (Sector::Industry, vec![-10.0, -6.0, -3.0, 0.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 20.0, 22.0]),
                (Sector::Ordnance, vec![-5.0, -3.0, 0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0]),
                (Sector::Luxury, vec![-10.0, -8.0, -5.0, -2.0, 0.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 20.0]),
                (Sector::Research, vec![-20.0, -15.0, -10.0, -5.0, 0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0]),
                (Sector::Logistics, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]),
            ]
            .into(),
            min_percent: -60,
            max_percent: 50,
        }
    }
}

// ── Production ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// Units of the sector's output resource per utilised slot.
    pub output_per_slot: BTreeMap<Sector, f64>,
    /// Resources consumed per utilised slot.
    pub inputs_per_slot: BTreeMap<Sector, BTreeMap<Resource, f64>>,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            output_per_slot: sector_table([3.0, 2.0, 2.0, 1.0, 1.5, 1.0, 0.0]),
            inputs_per_slot: [
                (Sector::Industry, [(Resource::Materials, 1.0)].into()),
                (
                    Sector::Ordnance,
                    [(Resource::Production, 0.5), (Resource::Materials, 0.5)].into(),
                ),
                (Sector::Luxury, [(Resource::Materials, 0.5)].into()),
            ]
            .into(),
        }
    }
}

// ── Welfare ────────────────────────────────────────────────────────

/// One value per tier (0..=4) for each slider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelfareTable {
    pub education: Vec<f64>,
    pub healthcare: Vec<f64>,
    pub social_support: Vec<f64>,
}

impl WelfareTable {
    fn tier_value(values: &[f64], tier: u8) -> f64 {
        values.get(usize::from(tier)).copied().unwrap_or(0.0)
    }

    /// Sum of the three sliders' entries at the policy's tiers.
    pub fn total(&self, policy: &WelfarePolicy) -> f64 {
        Self::tier_value(&self.education, policy.education)
            + Self::tier_value(&self.healthcare, policy.healthcare)
            + Self::tier_value(&self.social_support, policy.social_support)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WelfareConfig {
    /// Gold per worker per tier.
    pub cost_per_worker: WelfareTable,
    /// Percentage points moved from general toward skilled/specialist.
    pub labor_shift_pp: WelfareTable,
    pub research_bonus_pct: WelfareTable,
    pub happiness: WelfareTable,
    /// Added to every canton's development roll.
    pub development: WelfareTable,
    pub max_tier: u8,
}

impl Default for WelfareConfig {
    fn default() -> Self {
        let t = |e: [f64; 5], h: [f64; 5], s: [f64; 5]| WelfareTable {
            education: e.to_vec(),
            healthcare: h.to_vec(),
            social_support: s.to_vec(),
        };
        Self {
            cost_per_worker: t(
                [0.0, 0.05, 0.10, 0.20, 0.35],
                [0.0, 0.05, 0.10, 0.20, 0.35],
                [0.0, 0.04, 0.08, 0.15, 0.25],
            ),
            labor_shift_pp: t([0.0, 2.0, 4.0, 7.0, 10.0], [0.0, 1.0, 2.0, 3.0, 4.0], [0.0; 5]),
            research_bonus_pct: t([0.0, 5.0, 10.0, 15.0, 25.0], [0.0; 5], [0.0; 5]),
            happiness: t(
                [0.0, 1.0, 1.0, 2.0, 2.0],
                [0.0, 1.0, 2.0, 3.0, 4.0],
                [0.0, 2.0, 3.0, 4.0, 5.0],
            ),
            development: t(
                [0.0, 0.10, 0.20, 0.30, 0.50],
                [0.0, 0.10, 0.15, 0.20, 0.30],
                [0.0, 0.05, 0.10, 0.15, 0.20],
            ),
            max_tier: 4,
        }
    }
}

// ── Finance ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceConfig {
    pub credit_limit: f64,
    pub interest_rate: f64,
    /// Debt-stress tiers as fractions of the credit limit, ascending.
    pub stress_thresholds: [f64; 3],
    /// Gold booked as revenue per effective worker each turn.
    pub labor_tax_per_worker: f64,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            credit_limit: 1_000.0,
            interest_rate: 0.02,
            stress_thresholds: [0.50, 0.75, 0.90],
            labor_tax_per_worker: 0.2,
        }
    }
}

// ── Development ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevelopmentConfig {
    pub base_roll_min: u32,
    pub base_roll_max: u32,
    /// Optional ceiling on one turn's meter gain.
    pub gain_cap: Option<f64>,
    pub meter_threshold: f64,
    /// Most of the remainder a level-up may carry.
    pub carry_cap: f64,
    pub max_level: u8,
    pub happiness_weight: f64,
    /// Subtracted from the roll per shortage flag in the canton.
    pub shortage_penalty: f64,
}

impl Default for DevelopmentConfig {
    fn default() -> Self {
        Self {
            base_roll_min: 0,
            base_roll_max: 2,
            gain_cap: None,
            meter_threshold: 4.0,
            carry_cap: 3.0,
            max_level: 12,
            happiness_weight: 0.05,
            shortage_penalty: 0.5,
        }
    }
}

// ── Infrastructure ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FacilitySpec {
    pub build_turns: u32,
    pub build_production: f64,
    pub build_gold: f64,
    pub om_cost: f64,
    pub max_hp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfrastructureConfig {
    pub facilities: BTreeMap<FacilityKind, FacilitySpec>,
    pub national_build_multiplier: f64,
    pub national_om_multiplier: f64,
    pub repair_production: f64,
    /// Each port links to this many nearest ports.
    pub port_neighbours: usize,
    pub port_max_edge_distance: f64,
    pub rail_impassable: Vec<TileType>,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        let spec = |build_turns, build_production, build_gold, om_cost, max_hp| FacilitySpec {
            build_turns,
            build_production,
            build_gold,
            om_cost,
            max_hp,
        };
        Self {
            facilities: [
                (FacilityKind::Airport, spec(4, 60.0, 80.0, 6.0, 100.0)),
                (FacilityKind::Port, spec(3, 50.0, 60.0, 5.0, 100.0)),
                (FacilityKind::RailHub, spec(3, 70.0, 50.0, 5.0, 120.0)),
            ]
            .into(),
            national_build_multiplier: 1.5,
            national_om_multiplier: 2.0,
            repair_production: 20.0,
            port_neighbours: 2,
            port_max_edge_distance: 12.0,
            rail_impassable: vec![TileType::Mountains, TileType::Wetland],
        }
    }
}

// ── Projects ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub build_turns: u32,
    pub cost: BTreeMap<Resource, f64>,
    pub om_cost: f64,
    pub max_hp: f64,
    /// Resources produced each turn while active.
    pub yields: BTreeMap<Resource, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectCatalog {
    pub kinds: BTreeMap<String, ProjectSpec>,
    pub cancel_production_refund: f64,
    pub cancel_strategic_refund: f64,
    pub repair_production: f64,
}

impl Default for ProjectCatalog {
    fn default() -> Self {
        Self {
            kinds: [
                (
                    "granary".to_string(),
                    ProjectSpec {
                        build_turns: 3,
                        cost: [(Resource::Production, 40.0), (Resource::Gold, 30.0)].into(),
                        om_cost: 2.0,
                        max_hp: 80.0,
                        yields: [(Resource::Food, 5.0)].into(),
                    },
                ),
                (
                    "foundry".to_string(),
                    ProjectSpec {
                        build_turns: 4,
                        cost: [(Resource::Production, 60.0), (Resource::Coal, 10.0)].into(),
                        om_cost: 4.0,
                        max_hp: 100.0,
                        yields: [(Resource::Production, 4.0)].into(),
                    },
                ),
                (
                    "observatory".to_string(),
                    ProjectSpec {
                        build_turns: 5,
                        cost: [(Resource::Production, 50.0), (Resource::Gold, 60.0)].into(),
                        om_cost: 5.0,
                        max_hp: 60.0,
                        yields: [(Resource::Research, 3.0)].into(),
                    },
                ),
            ]
            .into(),
            cancel_production_refund: 0.25,
            cancel_strategic_refund: 0.50,
            repair_production: 15.0,
        }
    }
}

// ── Aggregate ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub budget: BudgetConfig,
    pub energy: EnergyConfig,
    pub logistics: LogisticsConfig,
    pub labor: LaborConfig,
    pub suitability: SuitabilityConfig,
    pub production: ProductionConfig,
    pub welfare: WelfareConfig,
    pub finance: FinanceConfig,
    pub development: DevelopmentConfig,
    pub infrastructure: InfrastructureConfig,
    pub projects: ProjectCatalog,
}

impl SimConfig {
    /// The built-in rule set.
    pub fn default_rules() -> Self {
        Self::default()
    }

    /// Load a rules file. Sections and fields it omits keep their
    /// built-in values.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid rules in {path}: {e}"))?;
        Ok(config)
    }

    /// Reject tables that would break the stages' arithmetic.
    pub fn validate(&self) -> anyhow::Result<()> {
        let shares = [
            ("labor.skilled_transfer_share", self.labor.skilled_transfer_share),
            ("labor.max_class_share", self.labor.max_class_share),
        ];
        for (name, value) in shares {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{name} must be within [0, 1], got {value}");
            }
        }
        if self.labor.pools_by_ul.is_empty() {
            anyhow::bail!("labor.pools_by_ul must list at least one level");
        }
        Ok(())
    }
}
