//! Static per-kind data for buildings and vehicles.
//!
//! The catalog is a plain data provider: footprints, construction timing,
//! production, relocation cost and vehicle speed. It can be built from the
//! standard entries or parsed from TOML.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellRectSize, ResourceBundle, ResourceKind};

/// Types of buildings that can be placed in the settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Dwelling with no production.
    House,
    /// Produces food.
    Farm,
    /// Produces wood.
    Sawmill,
    /// Produces stone.
    Quarry,
    /// Large storage building.
    Warehouse,
}

impl BuildingKind {
    /// Every building kind in declaration order.
    pub const ALL: [BuildingKind; 5] = [
        Self::House,
        Self::Farm,
        Self::Sawmill,
        Self::Quarry,
        Self::Warehouse,
    ];
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::House => "house",
            Self::Farm => "farm",
            Self::Sawmill => "sawmill",
            Self::Quarry => "quarry",
            Self::Warehouse => "warehouse",
        };
        f.write_str(label)
    }
}

/// Types of vehicles that can travel across the settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    /// Slow single-cell hauler.
    Cart,
    /// Faster single-cell hauler.
    Truck,
}

impl VehicleKind {
    /// Every vehicle kind in declaration order.
    pub const ALL: [VehicleKind; 2] = [Self::Cart, Self::Truck];
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cart => "cart",
            Self::Truck => "truck",
        };
        f.write_str(label)
    }
}

/// Periodic resource output of a finished building.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductionSpec {
    /// Resources credited every time the countdown elapses.
    pub output: ResourceBundle,
    /// Countdown length in seconds.
    pub interval_secs: f32,
    /// Whether the countdown re-arms instead of completing.
    #[serde(default = "default_looping")]
    pub looping: bool,
}

impl ProductionSpec {
    /// Countdown length as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f32(self.interval_secs.max(0.0))
    }
}

fn default_looping() -> bool {
    true
}

/// Catalog entry describing one building kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildingSpec {
    /// Footprint measured in cells.
    pub footprint: CellRectSize,
    /// Resources debited on construction.
    pub cost: ResourceBundle,
    /// Resources debited on every relocation.
    #[serde(default)]
    pub relocation_cost: ResourceBundle,
    /// Seconds between placement and completion.
    pub construction_secs: f32,
    /// Output once constructed, if any.
    #[serde(default)]
    pub production: Option<ProductionSpec>,
}

impl BuildingSpec {
    /// Construction countdown as a [`Duration`].
    #[must_use]
    pub fn construction_time(&self) -> Duration {
        Duration::from_secs_f32(self.construction_secs.max(0.0))
    }
}

/// Catalog entry describing one vehicle kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleSpec {
    /// Footprint measured in cells.
    pub footprint: CellRectSize,
    /// Travel speed in world units per second.
    pub speed: f32,
}

/// Lookup table from kinds to their static data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    buildings: BTreeMap<BuildingKind, BuildingSpec>,
    #[serde(default)]
    vehicles: BTreeMap<VehicleKind, VehicleSpec>,
}

impl Catalog {
    /// Creates a catalog with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            buildings: BTreeMap::new(),
            vehicles: BTreeMap::new(),
        }
    }

    /// Built-in entries for every building and vehicle kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        catalog.insert_building(
            BuildingKind::House,
            BuildingSpec {
                footprint: CellRectSize::new(2, 2),
                cost: ResourceBundle::new().with(ResourceKind::Wood, 10),
                relocation_cost: ResourceBundle::new().with(ResourceKind::Gold, 2),
                construction_secs: 3.0,
                production: None,
            },
        );
        catalog.insert_building(
            BuildingKind::Farm,
            BuildingSpec {
                footprint: CellRectSize::new(3, 2),
                cost: ResourceBundle::new()
                    .with(ResourceKind::Wood, 15)
                    .with(ResourceKind::Stone, 5),
                relocation_cost: ResourceBundle::new().with(ResourceKind::Gold, 4),
                construction_secs: 4.0,
                production: Some(ProductionSpec {
                    output: ResourceBundle::new().with(ResourceKind::Food, 5),
                    interval_secs: 5.0,
                    looping: true,
                }),
            },
        );
        catalog.insert_building(
            BuildingKind::Sawmill,
            BuildingSpec {
                footprint: CellRectSize::new(2, 2),
                cost: ResourceBundle::new()
                    .with(ResourceKind::Wood, 5)
                    .with(ResourceKind::Stone, 10),
                relocation_cost: ResourceBundle::new().with(ResourceKind::Gold, 4),
                construction_secs: 5.0,
                production: Some(ProductionSpec {
                    output: ResourceBundle::new().with(ResourceKind::Wood, 4),
                    interval_secs: 4.0,
                    looping: true,
                }),
            },
        );
        catalog.insert_building(
            BuildingKind::Quarry,
            BuildingSpec {
                footprint: CellRectSize::new(2, 3),
                cost: ResourceBundle::new().with(ResourceKind::Wood, 20),
                relocation_cost: ResourceBundle::new().with(ResourceKind::Gold, 6),
                construction_secs: 6.0,
                production: Some(ProductionSpec {
                    output: ResourceBundle::new().with(ResourceKind::Stone, 3),
                    interval_secs: 6.0,
                    looping: true,
                }),
            },
        );
        catalog.insert_building(
            BuildingKind::Warehouse,
            BuildingSpec {
                footprint: CellRectSize::new(4, 3),
                cost: ResourceBundle::new()
                    .with(ResourceKind::Wood, 30)
                    .with(ResourceKind::Stone, 20),
                relocation_cost: ResourceBundle::new().with(ResourceKind::Gold, 10),
                construction_secs: 8.0,
                production: None,
            },
        );
        catalog.insert_vehicle(
            VehicleKind::Cart,
            VehicleSpec {
                footprint: CellRectSize::new(1, 1),
                speed: 1.0,
            },
        );
        catalog.insert_vehicle(
            VehicleKind::Truck,
            VehicleSpec {
                footprint: CellRectSize::new(1, 1),
                speed: 2.5,
            },
        );
        catalog
    }

    /// Parses and validates a catalog from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(contents)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Adds or replaces a building entry.
    pub fn insert_building(&mut self, kind: BuildingKind, spec: BuildingSpec) {
        let _ = self.buildings.insert(kind, spec);
    }

    /// Adds or replaces a vehicle entry.
    pub fn insert_vehicle(&mut self, kind: VehicleKind, spec: VehicleSpec) {
        let _ = self.vehicles.insert(kind, spec);
    }

    /// Static data for a building kind.
    #[must_use]
    pub fn building(&self, kind: BuildingKind) -> Option<&BuildingSpec> {
        self.buildings.get(&kind)
    }

    /// Static data for a vehicle kind.
    #[must_use]
    pub fn vehicle(&self, kind: VehicleKind) -> Option<&VehicleSpec> {
        self.vehicles.get(&kind)
    }

    /// Overlays every entry of `other` on top of this catalog.
    pub fn merge(&mut self, other: Catalog) {
        self.buildings.extend(other.buildings);
        self.vehicles.extend(other.vehicles);
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for (kind, spec) in &self.buildings {
            if spec.footprint.is_empty() {
                return Err(CatalogError::EmptyBuildingFootprint(*kind));
            }
            if !spec.construction_secs.is_finite() || spec.construction_secs < 0.0 {
                return Err(CatalogError::InvalidDuration(kind.to_string()));
            }
            if let Some(production) = &spec.production {
                if !production.interval_secs.is_finite() || production.interval_secs <= 0.0 {
                    return Err(CatalogError::InvalidDuration(kind.to_string()));
                }
            }
        }

        for (kind, spec) in &self.vehicles {
            if spec.footprint.is_empty() {
                return Err(CatalogError::EmptyVehicleFootprint(*kind));
            }
            if !spec.speed.is_finite() || spec.speed <= 0.0 {
                return Err(CatalogError::NonPositiveSpeed(*kind));
            }
        }

        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The TOML text could not be parsed.
    #[error("could not parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    /// A building entry declared a zero-area footprint.
    #[error("building kind {0} has an empty footprint")]
    EmptyBuildingFootprint(BuildingKind),
    /// A vehicle entry declared a zero-area footprint.
    #[error("vehicle kind {0} has an empty footprint")]
    EmptyVehicleFootprint(VehicleKind),
    /// A vehicle entry declared a speed that is not strictly positive.
    #[error("vehicle kind {0} must have a positive speed")]
    NonPositiveSpeed(VehicleKind),
    /// A timing value was negative, zero where forbidden, or not finite.
    #[error("entry {0} declares an invalid duration")]
    InvalidDuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_covers_every_kind() {
        let catalog = Catalog::standard();
        for kind in BuildingKind::ALL {
            assert!(catalog.building(kind).is_some(), "missing {kind}");
        }
        for kind in VehicleKind::ALL {
            assert!(catalog.vehicle(kind).is_some(), "missing {kind}");
        }
    }

    #[test]
    fn parses_toml_entries() {
        let catalog = Catalog::from_toml_str(
            r#"
            [buildings.house]
            footprint = { width = 1, height = 2 }
            cost = { wood = 3 }
            construction_secs = 1.5

            [buildings.farm]
            footprint = { width = 2, height = 2 }
            cost = { wood = 1 }
            construction_secs = 0.0
            production = { output = { food = 2 }, interval_secs = 1.0, looping = false }

            [vehicles.cart]
            footprint = { width = 1, height = 1 }
            speed = 4.0
            "#,
        )
        .expect("catalog parses");

        let house = catalog.building(BuildingKind::House).expect("house entry");
        assert_eq!(house.footprint, CellRectSize::new(1, 2));
        assert_eq!(house.cost.amount(ResourceKind::Wood), 3);
        assert!(house.relocation_cost.is_empty());
        assert_eq!(house.construction_time(), Duration::from_millis(1500));

        let farm = catalog.building(BuildingKind::Farm).expect("farm entry");
        let production = farm.production.as_ref().expect("farm produces");
        assert!(!production.looping);
        assert_eq!(production.output.amount(ResourceKind::Food), 2);

        assert!(catalog.vehicle(VehicleKind::Truck).is_none());
    }

    #[test]
    fn rejects_non_positive_speed() {
        let error = Catalog::from_toml_str(
            r#"
            [vehicles.truck]
            footprint = { width = 1, height = 1 }
            speed = 0.0
            "#,
        )
        .expect_err("zero speed must be rejected");
        assert!(matches!(
            error,
            CatalogError::NonPositiveSpeed(VehicleKind::Truck)
        ));
    }

    #[test]
    fn rejects_empty_footprint() {
        let error = Catalog::from_toml_str(
            r#"
            [buildings.quarry]
            footprint = { width = 0, height = 3 }
            cost = {}
            construction_secs = 1.0
            "#,
        )
        .expect_err("empty footprint must be rejected");
        assert!(matches!(
            error,
            CatalogError::EmptyBuildingFootprint(BuildingKind::Quarry)
        ));
    }

    #[test]
    fn merge_overrides_existing_entries() {
        let mut catalog = Catalog::standard();
        let mut overrides = Catalog::empty();
        overrides.insert_vehicle(
            VehicleKind::Cart,
            VehicleSpec {
                footprint: CellRectSize::new(1, 1),
                speed: 9.0,
            },
        );
        catalog.merge(overrides);

        let cart = catalog.vehicle(VehicleKind::Cart).expect("cart entry");
        assert!((cart.speed - 9.0).abs() < f32::EPSILON);
        assert!(catalog.vehicle(VehicleKind::Truck).is_some());
    }
}
