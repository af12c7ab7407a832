//! Scripted scenarios read from TOML.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use settlement_core::{BuildingKind, CellCoord, Catalog, ResourceBundle, VehicleKind};
use settlement_system_builder::{Session, Tool};
use settlement_world::{query, WorldConfig};
use tracing::{info, warn};

/// Scenario shipped with the binary, used when no path is given.
pub(crate) const BUILT_IN: &str = include_str!("../../../scenarios/village.toml");

/// Grid, starting balances and the steps to play.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    pub(crate) grid: GridSection,
    #[serde(default)]
    pub(crate) resources: ResourceBundle,
    /// Catalog file merged over the built-in entries, relative to the scenario.
    #[serde(default)]
    pub(crate) catalog: Option<String>,
    #[serde(default)]
    pub(crate) steps: Vec<Step>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GridSection {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    #[serde(default = "default_cell_size")]
    pub(crate) cell_size: f32,
}

fn default_cell_size() -> f32 {
    1.0
}

fn default_count() -> u32 {
    1
}

/// One scripted player action.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Step {
    Construct { kind: BuildingKind, at: CellCoord },
    Relocate { from: CellCoord, to: CellCoord },
    SpawnVehicle { kind: VehicleKind, at: CellCoord },
    Select { at: CellCoord },
    Move { to: CellCoord },
    Hover { at: Option<CellCoord> },
    Tick {
        #[serde(default = "default_count")]
        count: u32,
    },
    Undo,
}

impl Scenario {
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(contents).context("failed to parse scenario")?;
        if scenario.grid.columns == 0 || scenario.grid.rows == 0 {
            bail!(
                "grid must have at least one cell, got {}x{}",
                scenario.grid.columns,
                scenario.grid.rows
            );
        }
        if scenario.grid.cell_size <= 0.0 {
            bail!("cell size must be positive, got {}", scenario.grid.cell_size);
        }
        Ok(scenario)
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    /// Builds the world configuration, resolving the catalog file against
    /// `base` when one is named.
    pub(crate) fn world_config(&self, base: Option<&Path>) -> Result<WorldConfig> {
        let mut catalog = Catalog::standard();
        if let Some(file) = &self.catalog {
            let path = base.map_or_else(|| Path::new(file).to_path_buf(), |dir| dir.join(file));
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read catalog at {}", path.display()))?;
            let overrides = Catalog::from_toml_str(&contents)
                .with_context(|| format!("invalid catalog at {}", path.display()))?;
            catalog.merge(overrides);
        }

        Ok(WorldConfig {
            columns: self.grid.columns,
            rows: self.grid.rows,
            cell_size: self.grid.cell_size,
            catalog,
            starting_resources: self.resources.clone(),
        })
    }
}

/// Plays every step against `session`, advancing `dt` per tick.
pub(crate) fn play(session: &mut Session, steps: &[Step], dt: Duration) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        let applied = apply(session, step, dt)
            .with_context(|| format!("step {} ({step:?}) failed", index + 1))?;
        if applied {
            info!(step = index + 1, ?step, "step applied");
        } else {
            warn!(step = index + 1, ?step, "step declined");
        }
    }
    Ok(())
}

fn apply(session: &mut Session, step: &Step, dt: Duration) -> Result<bool> {
    let applied = match *step {
        Step::Construct { kind, at } => {
            session.set_tool(Tool::Construct(kind));
            session.hover(Some(at));
            session.click()? > 0
        }
        Step::Relocate { from, to } => {
            let Some(building) = query::building_at(session.world(), from) else {
                bail!("no building covers {from}");
            };
            session.set_tool(Tool::Relocate(building));
            session.hover(Some(to));
            let moved = session.click()? > 0;
            session.set_tool(Tool::Select);
            moved
        }
        Step::SpawnVehicle { kind, at } => {
            let _ = session
                .world_mut()
                .build_vehicle(kind, at)
                .with_context(|| format!("cannot spawn {kind} at {at}"))?;
            true
        }
        Step::Select { at } => {
            session.set_tool(Tool::Select);
            session.hover(Some(at));
            session.click()? > 0
        }
        Step::Move { to } => {
            if query::selected_vehicle(session.world()).is_none() {
                bail!("no vehicle is selected");
            }
            session.set_tool(Tool::Select);
            session.hover(Some(to));
            session.click()? > 0
        }
        Step::Hover { at } => {
            session.hover(at);
            true
        }
        Step::Tick { count } => {
            for _ in 0..count {
                session.tick(dt);
            }
            true
        }
        Step::Undo => session.undo_last(),
    };
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_core::ResourceKind;

    #[test]
    fn built_in_scenario_parses() {
        let scenario = Scenario::from_toml_str(BUILT_IN).expect("built-in scenario is valid");
        assert!(scenario.grid.columns > 0);
        assert!(!scenario.steps.is_empty());
        assert!(scenario.resources.amount(ResourceKind::Wood) > 0);
    }

    #[test]
    fn steps_use_action_tags() {
        let scenario = Scenario::from_toml_str(
            r#"
            grid = { columns = 8, rows = 6 }

            [[steps]]
            action = "construct"
            kind = "house"
            at = { x = 1, y = 2 }

            [[steps]]
            action = "tick"

            [[steps]]
            action = "undo"
            "#,
        )
        .expect("scenario parses");

        assert_eq!(
            scenario.steps,
            vec![
                Step::Construct {
                    kind: BuildingKind::House,
                    at: CellCoord::new(1, 2),
                },
                Step::Tick { count: 1 },
                Step::Undo,
            ]
        );
    }

    #[test]
    fn rejects_empty_grid() {
        let error = Scenario::from_toml_str("grid = { columns = 0, rows = 4 }")
            .expect_err("zero columns");
        assert!(error.to_string().contains("at least one cell"));
    }

    #[test]
    fn playing_steps_mutates_the_session() {
        let scenario = Scenario::from_toml_str(
            r#"
            grid = { columns = 8, rows = 8 }
            resources = { wood = 20 }

            [[steps]]
            action = "construct"
            kind = "house"
            at = { x = 0, y = 0 }

            [[steps]]
            action = "spawn_vehicle"
            kind = "cart"
            at = { x = 5, y = 5 }

            [[steps]]
            action = "select"
            at = { x = 5, y = 5 }

            [[steps]]
            action = "move"
            to = { x = 5, y = 7 }

            [[steps]]
            action = "tick"
            count = 30
            "#,
        )
        .expect("scenario parses");
        let config = scenario.world_config(None).expect("no catalog file");
        let mut session = Session::new(config);

        play(&mut session, &scenario.steps, Duration::from_millis(200)).expect("steps apply");

        let world = session.world();
        assert_eq!(query::buildings(world).count(), 1);
        assert_eq!(world.ledger().balance(ResourceKind::Wood), 10);
        let cart = query::vehicle_at(world, CellCoord::new(5, 7));
        assert!(cart.is_some(), "cart arrived");
        assert_eq!(session.history().len(), 3);
    }

    #[test]
    fn relocating_an_empty_cell_fails() {
        let mut session = Session::new(WorldConfig::with_dimensions(4, 4));
        let error = play(
            &mut session,
            &[Step::Relocate {
                from: CellCoord::new(1, 1),
                to: CellCoord::new(2, 2),
            }],
            Duration::from_millis(100),
        )
        .expect_err("nothing to relocate");
        assert!(format!("{error:#}").contains("no building covers (1, 1)"));
    }
}
