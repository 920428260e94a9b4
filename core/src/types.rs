//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A game turn. Turn 0 is the initial state before any resolution.
pub type Turn = u64;

/// Stable canton identifier supplied by the map service.
pub type CantonId = String;

/// Stable nation identifier (owner of cantons, facilities, projects).
pub type NationId = String;

/// Identifier for facilities, projects and power plants.
pub type EntityId = String;

/// Every named quantity held in the national stockpile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Gold,
    ForeignExchange,
    Food,
    Materials,
    Production,
    Ordnance,
    Luxury,
    Energy,
    Coal,
    Oil,
    Gas,
    Uranium,
    Research,
    Logistics,
    Labor,
}

impl Resource {
    pub const ALL: [Resource; 15] = [
        Resource::Gold,
        Resource::ForeignExchange,
        Resource::Food,
        Resource::Materials,
        Resource::Production,
        Resource::Ordnance,
        Resource::Luxury,
        Resource::Energy,
        Resource::Coal,
        Resource::Oil,
        Resource::Gas,
        Resource::Uranium,
        Resource::Research,
        Resource::Logistics,
        Resource::Labor,
    ];

    /// The four strategic fuels. Cancelling a project refunds half of
    /// any of these it consumed.
    pub fn is_strategic(self) -> bool {
        matches!(
            self,
            Resource::Coal | Resource::Oil | Resource::Gas | Resource::Uranium
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Gold => "gold",
            Resource::ForeignExchange => "foreign_exchange",
            Resource::Food => "food",
            Resource::Materials => "materials",
            Resource::Production => "production",
            Resource::Ordnance => "ordnance",
            Resource::Luxury => "luxury",
            Resource::Energy => "energy",
            Resource::Coal => "coal",
            Resource::Oil => "oil",
            Resource::Gas => "gas",
            Resource::Uranium => "uranium",
            Resource::Research => "research",
            Resource::Logistics => "logistics",
            Resource::Labor => "labor",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Economic sectors. Each canton holds slot capacity per sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Agriculture,
    Extraction,
    Industry,
    Ordnance,
    Luxury,
    Research,
    Logistics,
}

impl Sector {
    pub const ALL: [Sector; 7] = [
        Sector::Agriculture,
        Sector::Extraction,
        Sector::Industry,
        Sector::Ordnance,
        Sector::Luxury,
        Sector::Research,
        Sector::Logistics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sector::Agriculture => "agriculture",
            Sector::Extraction => "extraction",
            Sector::Industry => "industry",
            Sector::Ordnance => "ordnance",
            Sector::Luxury => "luxury",
            Sector::Research => "research",
            Sector::Logistics => "logistics",
        }
    }

    /// The labor class a funded slot of this sector draws on.
    pub fn labor_class(self) -> LaborClass {
        match self {
            Sector::Agriculture | Sector::Extraction | Sector::Logistics => LaborClass::General,
            Sector::Industry | Sector::Ordnance | Sector::Luxury => LaborClass::Skilled,
            Sector::Research => LaborClass::Specialist,
        }
    }

    /// The stockpile resource produced by a utilised slot, if any.
    /// Logistics slots generate LP in the logistics gate instead.
    pub fn output_resource(self) -> Option<Resource> {
        match self {
            Sector::Agriculture => Some(Resource::Food),
            Sector::Extraction => Some(Resource::Materials),
            Sector::Industry => Some(Resource::Production),
            Sector::Ordnance => Some(Resource::Ordnance),
            Sector::Luxury => Some(Resource::Luxury),
            Sector::Research => Some(Resource::Research),
            Sector::Logistics => None,
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaborClass {
    General,
    Skilled,
    Specialist,
}

/// Tile types making up a canton's geography mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    Plains,
    Forest,
    Hills,
    Mountains,
    Desert,
    Coast,
    Wetland,
    Tundra,
}

/// Transport modes for domestic shipments. Declaration order is the
/// tie-break preference: rail beats sea beats air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Rail,
    Sea,
    Air,
}

impl TransportMode {
    pub const ALL: [TransportMode; 3] = [TransportMode::Rail, TransportMode::Sea, TransportMode::Air];
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportMode::Rail => "rail",
            TransportMode::Sea => "sea",
            TransportMode::Air => "air",
        })
    }
}

/// How a scarce supply is shared out across demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RationingMode {
    #[default]
    Uniform,
    EssentialsFirst,
}
