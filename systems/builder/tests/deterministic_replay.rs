use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use settlement_core::{BuildingKind, CellCoord, ResourceBundle, ResourceKind, VehicleKind};
use settlement_system_builder::{Session, Tool};
use settlement_world::{query, WorldConfig};

const TICK: Duration = Duration::from_millis(250);

fn config() -> WorldConfig {
    WorldConfig::with_dimensions(16, 12).with_resources(
        ResourceBundle::new()
            .with(ResourceKind::Wood, 120)
            .with(ResourceKind::Stone, 60)
            .with(ResourceKind::Gold, 30),
    )
}

fn play() -> Session {
    let mut session = Session::new(config());
    let _ = session
        .world_mut()
        .build_vehicle(VehicleKind::Cart, CellCoord::new(0, 0))
        .expect("cart fits");
    let _ = session
        .world_mut()
        .build_vehicle(VehicleKind::Truck, CellCoord::new(15, 0))
        .expect("truck fits");

    session.set_tool(Tool::Construct(BuildingKind::Farm));
    for origin in [CellCoord::new(2, 2), CellCoord::new(6, 2)] {
        session.hover(Some(origin));
        let _ = session.click().expect("farm placement never faults");
    }
    session.set_tool(Tool::Construct(BuildingKind::Sawmill));
    session.hover(Some(CellCoord::new(10, 6)));
    let _ = session.click().expect("sawmill placement never faults");

    session.set_tool(Tool::Select);
    session.hover(Some(CellCoord::new(0, 0)));
    let _ = session.click().expect("selection never faults");
    session.hover(Some(CellCoord::new(9, 9)));
    let _ = session.click().expect("move never faults");

    for _ in 0..12 {
        session.tick(TICK);
    }
    session.hover(Some(CellCoord::new(0, 11)));
    let _ = session.click().expect("second move never faults");

    for _ in 0..40 {
        session.tick(TICK);
    }
    assert!(session.undo_last(), "last move can be undone");

    let farm = query::building_at(session.world(), CellCoord::new(6, 2)).expect("farm stands");
    session.set_tool(Tool::Relocate(farm));
    session.hover(Some(CellCoord::new(6, 8)));
    let _ = session.click().expect("relocation never faults");

    for _ in 0..40 {
        session.tick(TICK);
    }
    session
}

fn fingerprint(session: &Session) -> u64 {
    let mut hasher = DefaultHasher::new();
    let world = session.world();

    for building in query::buildings(world) {
        building.id().hash(&mut hasher);
        building.kind().hash(&mut hasher);
        building.origin().hash(&mut hasher);
        building.is_constructed().hash(&mut hasher);
    }
    for vehicle in query::vehicles(world) {
        vehicle.id().hash(&mut hasher);
        vehicle.cell().hash(&mut hasher);
        for component in vehicle.position().to_array() {
            component.to_bits().hash(&mut hasher);
        }
    }
    query::balances(world).hash(&mut hasher);
    query::selected_vehicle(world).hash(&mut hasher);
    session.history().listing().hash(&mut hasher);
    session.scheduler().listing().hash(&mut hasher);
    hasher.finish()
}

#[test]
fn replaying_the_same_input_reproduces_the_same_state() {
    let first = play();
    let second = play();

    assert!(query::occupancy_is_consistent(first.world()));
    assert_eq!(fingerprint(&first), fingerprint(&second));
    assert_eq!(first.events(), second.events());
}

#[test]
fn replay_produces_resources_and_keeps_history() {
    let session = play();
    let world = session.world();

    assert!(
        query::buildings(world).all(|building| building.is_constructed()),
        "every construction finished during the replay"
    );
    assert!(world.ledger().balance(ResourceKind::Food) > 0);
    assert!(world.ledger().balance(ResourceKind::Gold) < 30, "relocation was paid");
    assert_eq!(session.history().len(), 6);
}
