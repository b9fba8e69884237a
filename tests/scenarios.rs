//! End-to-end threat scenarios driven through the public world API
//!
//! Worlds here carry only the player faction, so the AI stays silent and the
//! threat pipeline can be observed on its own.

use glam::DVec3;

use global_watch::actions::{ActionCatalog, ActionContext};
use global_watch::core::config::SimulationConfig;
use global_watch::core::types::{FactionId, RegionId, ThreatId};
use global_watch::data;
use global_watch::faction::{Faction, FactionKind, FactionManager, Resources};
use global_watch::narrative::EventType;
use global_watch::region::{Buff, BuffType};
use global_watch::threat::properties::{QuantumProperties, WmdProperties};
use global_watch::threat::{
    DomainProperties, InteractionMatrix, Threat, ThreatDomain, ThreatSpawn, ThreatType,
};
use global_watch::world::{World, WorldCommand};

const PLAYER: FactionId = FactionId(0);

fn quiet_world(funds: f64) -> World {
    let config = SimulationConfig::default();
    let regions = data::default_regions(config.planet_radius).unwrap();
    let factions = FactionManager::new(vec![Faction::new(
        PLAYER,
        "Directorate",
        FactionKind::Player,
        Resources::new(funds, 100.0, 50.0),
    )]);
    World::from_parts(
        config,
        regions,
        factions,
        data::default_actions().unwrap(),
        data::default_abilities().unwrap(),
    )
}

fn centre(world: &World, region: u32) -> DVec3 {
    world.regions.get(RegionId(region)).unwrap().position
}

#[test]
fn test_unaffordable_action_is_rejected_whole() {
    let mut world = quiet_world(500.0);
    let extra = ActionCatalog::from_toml_str(
        r#"
        [[action]]
        id = "GRAND_PROJECT"
        name = "Grand Project"
        cost = { funds = 1000 }

        [[action.effects]]
        target = "world"
        method = "advance_research"
        params = ["playerFaction", 0.5]
        "#,
    )
    .unwrap();
    world
        .actions
        .insert(extra.get("GRAND_PROJECT").unwrap().clone());

    assert!(!world.execute_action("GRAND_PROJECT", &ActionContext::new(PLAYER)));
    let faction = world.factions.get(PLAYER).unwrap();
    assert_eq!(faction.resources().funds, 500.0);
    assert_eq!(faction.research.progress(), 0.0);
    assert_eq!(world.log.of_type(EventType::ActionExecuted).count(), 0);
}

#[test]
fn test_quantum_collapse_halves_severity_once() {
    let mut world = quiet_world(1000.0);
    let id = world.spawn_threat(
        ThreatSpawn::new(ThreatDomain::Quantum, ThreatType::Real, 1.0, centre(&world, 3))
            .with_properties(DomainProperties::Quantum(QuantumProperties {
                coherence_time: 0.5,
                entanglement: 0.0,
                effects: vec![],
            })),
    );

    world.tick(60.0);
    assert_eq!(world.threats.get(id).unwrap().severity(), 0.5);

    for _ in 0..5 {
        world.tick(60.0);
    }
    assert_eq!(world.log.of_type(EventType::QuantumCollapse).count(), 1);
    assert_eq!(world.threats.get(id).unwrap().severity(), 0.5);
}

#[test]
fn test_quarantined_bio_decays_and_is_contained() {
    let mut world = quiet_world(1000.0);
    world
        .regions
        .get_mut(RegionId(5))
        .unwrap()
        .add_buff(Buff::new(BuffType::Quarantine, 1000.0, None));
    let id = world.spawn_threat(ThreatSpawn::new(
        ThreatDomain::Bio,
        ThreatType::Real,
        0.71,
        centre(&world, 5),
    ));

    let infectivity = |world: &World| match world.threats.get(id).unwrap().properties() {
        DomainProperties::Biological(bio) => bio.infectivity,
        other => panic!("unexpected bag {:?}", other),
    };

    let threats_before = world.threats.len();
    let mut last = infectivity(&world);
    let steps = world.config.bio_spread_interval as usize;
    for _ in 0..steps {
        world.tick(1.0);
        let now = infectivity(&world);
        assert!(now <= last, "infectivity rose from {} to {}", last, now);
        last = now;
    }
    assert_eq!(world.log.of_type(EventType::ContagionContained).count(), 1);
    assert_eq!(world.log.of_type(EventType::ThreatSpread).count(), 0);
    assert_eq!(world.threats.len(), threats_before);
}

#[test]
fn test_cyber_rad_transfer_matches_rates() {
    let matrix = InteractionMatrix::with_defaults();
    let position = DVec3::Z * 100.0;
    let mut cyber = Threat::new(
        ThreatId(1),
        ThreatSpawn::new(ThreatDomain::Cyber, ThreatType::Real, 0.8, position),
        0.0,
    );
    let mut rad = Threat::new(
        ThreatId(2),
        ThreatSpawn::new(ThreatDomain::Rad, ThreatType::Real, 0.2, position),
        0.0,
    );
    assert!(matrix.apply(&mut cyber, &mut rad, 1.0).is_some());
    assert_eq!(rad.severity(), 0.2 + 0.001 * 0.8 * 1.0);
    assert_eq!(cyber.severity(), 0.8 + 0.0005 * 0.2 * 1.0);
}

#[test]
fn test_cyber_rad_transfer_through_full_tick() {
    let mut world = quiet_world(1000.0);
    let at = centre(&world, 2);
    let cyber = world.spawn_threat(ThreatSpawn::new(ThreatDomain::Cyber, ThreatType::Real, 0.8, at));
    let rad = world.spawn_threat(ThreatSpawn::new(ThreatDomain::Rad, ThreatType::Real, 0.2, at));

    world.tick(1.0);

    let cyber_after = world.threats.get(cyber).unwrap().severity();
    let rad_after = world.threats.get(rad).unwrap().severity();

    // RAD decays before the pair sweep, CYBER grows before it
    let rad_before_sweep = 0.2 - 0.2 * std::f64::consts::LN_2 / 600.0 * 1.0;
    let cyber_before_sweep = cyber_after - 0.0005 * rad_before_sweep;
    assert!(cyber_before_sweep > 0.8);
    assert!(
        (rad_after - (rad_before_sweep + 0.001 * cyber_before_sweep)).abs() < 1e-12,
        "rad severity {} after one tick",
        rad_after
    );
    assert!((rad_after - 0.2008).abs() < 1e-3);
    assert!(cyber_after > 0.8);
}

#[test]
fn test_colocated_interaction_logged_once() {
    let mut world = quiet_world(1000.0);
    let at = centre(&world, 2);
    world.spawn_threat(ThreatSpawn::new(ThreatDomain::Cyber, ThreatType::Real, 0.8, at));
    world.spawn_threat(ThreatSpawn::new(ThreatDomain::Rad, ThreatType::Real, 0.2, at));
    for _ in 0..10 {
        world.tick(1.0);
    }
    assert_eq!(world.log.of_type(EventType::CrossDomainInteraction).count(), 1);
}

#[test]
fn test_wmd_detonation_spawns_fallout_same_tick() {
    let mut world = quiet_world(1000.0);
    world.spawn_threat(
        ThreatSpawn::new(ThreatDomain::Wmd, ThreatType::Real, 1.0, centre(&world, 7)).with_properties(
            DomainProperties::Wmd(WmdProperties {
                yield_kt: 50.0,
                fallout_potential: 0.6,
            }),
        ),
    );

    world.tick(world.config.fixed_dt);
    let rads = world
        .threats
        .iter()
        .filter(|t| t.domain == ThreatDomain::Rad)
        .count();
    assert_eq!(rads, 1);
    assert!(world.threats.iter().all(|t| t.domain != ThreatDomain::Wmd));

    world.tick(world.config.fixed_dt);
    let rads = world
        .threats
        .iter()
        .filter(|t| t.domain == ThreatDomain::Rad)
        .count();
    assert_eq!(rads, 1);
}

#[test]
fn test_debug_threat_command_runs_through_queue() {
    let mut world = quiet_world(1000.0);
    world.queue_command(WorldCommand::DebugCreateThreat {
        domain: ThreatDomain::Info,
        threat_type: ThreatType::Real,
        severity: 0.3,
        position: centre(&world, 1) * 3.0,
    });
    assert!(world.threats.is_empty());
    world.tick(world.config.fixed_dt);
    let threat = world.threats.iter().next().unwrap();
    assert!((threat.position.length() - world.config.planet_radius).abs() < 1e-9);
    assert_eq!(threat.apparent_type(), ThreatType::Unknown);
}

#[test]
fn test_investigate_and_mitigate_through_commands() {
    let mut world = quiet_world(2000.0);
    let id = world.spawn_threat(ThreatSpawn::new(
        ThreatDomain::Econ,
        ThreatType::Real,
        0.4,
        centre(&world, 4),
    ));
    for _ in 0..3 {
        world.queue_command(WorldCommand::ExecuteAction {
            action: "INVESTIGATE".into(),
            faction: None,
            threat: Some(id),
            region: None,
        });
    }
    world.tick(1.0);
    assert!(world.threats.get(id).unwrap().is_investigated());

    world.queue_command(WorldCommand::ExecuteAction {
        action: "MITIGATE".into(),
        faction: None,
        threat: Some(id),
        region: None,
    });
    world.tick(1.0);
    assert!(world.threats.get(id).is_none());
    assert_eq!(world.threats.mitigated_by_player(), 1);
}
