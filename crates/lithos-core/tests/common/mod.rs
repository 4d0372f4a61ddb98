//! Shared helpers for integration tests.

#![allow(dead_code)]

use lithos_core::{Component, ComponentId, ComponentType, HorizonsStack, Model};
use std::sync::Once;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Install a test subscriber once, honouring `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub fn horizon(id: Uuid) -> ComponentId {
    ComponentId::new(ComponentType::Horizon, id)
}

pub fn unit(id: Uuid) -> ComponentId {
    ComponentId::new(ComponentType::StratigraphicUnit, id)
}

/// Scenario A column: H2 / U1 / H1 / U0 / H0 from top to bottom, every
/// component named after its role.
pub fn scenario_a() -> (HorizonsStack, [Uuid; 3], [Uuid; 2]) {
    let mut stack = HorizonsStack::named("scenario-a");
    let mut builder = stack.builder();
    let h = [
        builder.add_horizon().expect("H0"),
        builder.add_horizon().expect("H1"),
        builder.add_horizon().expect("H2"),
    ];
    let u = [
        builder.add_stratigraphic_unit().expect("U0"),
        builder.add_stratigraphic_unit().expect("U1"),
    ];
    for (i, id) in h.iter().enumerate() {
        builder.set_horizon_name(id, format!("H{i}")).expect("name");
    }
    for (i, id) in u.iter().enumerate() {
        builder.set_stratigraphic_unit_name(id, format!("U{i}")).expect("name");
    }
    builder.set_horizon_under(&h[0], &u[0]).expect("H0 under U0");
    builder.set_horizon_above(&h[1], &u[0]).expect("H1 above U0");
    builder.set_horizon_under(&h[1], &u[1]).expect("H1 under U1");
    builder.set_horizon_above(&h[2], &u[1]).expect("H2 above U1");
    (stack, h, u)
}

/// Look a stack member up by name.
pub fn by_name(stack: &HorizonsStack, name: &str) -> ComponentId {
    if let Some(h) = stack.horizons().find(|h| h.name() == name) {
        return horizon(h.id());
    }
    let u = stack
        .stratigraphic_units()
        .find(|u| u.name() == name)
        .expect("component with that name");
    unit(u.id())
}

/// Every "directly above" pair of a model, by component names.
pub fn named_relations<M: Model>(model: &M) -> Vec<(String, String)> {
    let registries = model.registries();
    let name_of = |id: &ComponentId| {
        registries
            .view(id.ty)
            .and_then(|view| view.name_of(&id.id))
            .map(str::to_string)
            .unwrap_or_default()
    };
    let mut pairs: Vec<_> = model
        .ordering()
        .relations()
        .iter()
        .map(|(upper, lower)| (name_of(upper), name_of(lower)))
        .collect();
    pairs.sort();
    pairs
}
