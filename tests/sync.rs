//! Delta extraction and the simulation worker, seen from the presentation side

use global_watch::core::config::SimulationConfig;
use global_watch::core::types::RegionId;
use global_watch::sync::{
    DeltaTracker, EntityKey, EntityKind, EntitySnapshot, PresentationMirror, SimulationWorker,
    StateUpdate, WorkerCommand,
};
use global_watch::threat::{ThreatDomain, ThreatSpawn, ThreatType};
use global_watch::world::{World, WorldCommand};

fn world() -> World {
    World::new(SimulationConfig::default()).unwrap()
}

fn threat_severity(mirror: &PresentationMirror, id: u32) -> Option<f64> {
    match mirror.get(&EntityKey {
        kind: EntityKind::Threat,
        id,
    }) {
        Some(EntitySnapshot::Threat(t)) => Some(t.severity()),
        _ => None,
    }
}

#[test]
fn test_mirror_tracks_world_through_deltas() {
    let mut world = world();
    let mut tracker = DeltaTracker::new();
    let mut mirror = PresentationMirror::new();
    mirror.apply(StateUpdate::Snapshot(Box::new(tracker.full_snapshot(&mut world))));

    let at = world.regions.get(RegionId(6)).unwrap().position;
    let dt = world.config.fixed_dt;
    for step in 0..300 {
        if step == 10 {
            world.queue_command(WorldCommand::DebugCreateThreat {
                domain: ThreatDomain::Geo,
                threat_type: ThreatType::Real,
                severity: 0.6,
                position: at,
            });
            world.queue_command(WorldCommand::DebugCreateThreat {
                domain: ThreatDomain::Cyber,
                threat_type: ThreatType::Real,
                severity: 0.4,
                position: at,
            });
        }
        world.tick(dt);
        mirror.apply(StateUpdate::Delta(Box::new(tracker.extract(&mut world))));
    }

    let truth: Vec<EntityKey> = DeltaTracker::new()
        .full_snapshot(&mut world)
        .entities
        .iter()
        .map(|e| e.key())
        .collect();
    let mirrored: Vec<EntityKey> = mirror.entities().map(|e| e.key()).collect();
    let mut truth_sorted = truth.clone();
    truth_sorted.sort();
    assert_eq!(mirrored, truth_sorted);

    for threat in world.threats.iter() {
        assert_eq!(threat_severity(&mirror, threat.id.0), Some(threat.severity()));
    }
    for faction in world.factions.iter() {
        match mirror.get(&EntityKey {
            kind: EntityKind::Faction,
            id: faction.id.0,
        }) {
            Some(EntitySnapshot::Faction(f)) => assert_eq!(f.resources(), faction.resources()),
            other => panic!("faction missing from mirror: {:?}", other),
        }
    }
    assert_eq!(mirror.header.tick, world.tick_count());
    assert_eq!(mirror.events().len(), world.log.len());
}

#[test]
fn test_one_shot_threat_created_then_removed() {
    let mut world = world();
    let mut tracker = DeltaTracker::new();
    tracker.full_snapshot(&mut world);

    let at = world.regions.get(RegionId(2)).unwrap().position;
    let id = world.spawn_threat(ThreatSpawn::new(ThreatDomain::Geo, ThreatType::Real, 0.5, at));
    let key = EntityKey {
        kind: EntityKind::Threat,
        id: id.0,
    };

    let first = tracker.extract(&mut world);
    assert!(first.new.iter().any(|e| e.key() == key));
    assert!(first.updated.iter().all(|e| e.key() != key));

    // GEO hits once and ends itself; the sweep removes it
    world.tick(world.config.fixed_dt);
    world.tick(world.config.fixed_dt);
    let second = tracker.extract(&mut world);
    assert!(second.removed.contains(&key));

    world.tick(world.config.fixed_dt);
    let third = tracker.extract(&mut world);
    assert!(!third.removed.contains(&key));
}

#[test]
fn test_deltas_serialize_for_the_wire() {
    let mut world = world();
    let mut tracker = DeltaTracker::new();
    let snapshot = tracker.full_snapshot(&mut world);
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"kind\":\"region\""));

    world.tick(1.0);
    let delta = tracker.extract(&mut world);
    let json = serde_json::to_value(&delta).unwrap();
    assert_eq!(json["header"]["tick"], 1);
}

#[test]
fn test_worker_feeds_mirror() {
    let config = SimulationConfig::default();
    let mut worker = SimulationWorker::spawn(&config).unwrap();
    let mut mirror = PresentationMirror::new();

    assert!(worker.send(WorkerCommand::Init(Box::new(config))));
    mirror.apply(worker.recv_blocking().unwrap());
    let regions = mirror
        .entities()
        .filter(|e| e.key().kind == EntityKind::Region)
        .count();
    assert!(regions > 0);

    assert!(worker.send(WorkerCommand::Command(WorldCommand::DebugCreateThreat {
        domain: ThreatDomain::Info,
        threat_type: ThreatType::Fake,
        severity: 0.2,
        position: glam::DVec3::Z * 100.0,
    })));
    assert!(worker.send(WorkerCommand::Step(2)));
    loop {
        let update = worker.recv_blocking().unwrap();
        let is_delta = matches!(update, StateUpdate::Delta(_));
        mirror.apply(update);
        if is_delta {
            break;
        }
    }
    assert_eq!(mirror.header.tick, 2);
    assert!(mirror
        .entities()
        .any(|e| e.key().kind == EntityKind::Threat));
    worker.shutdown();
}

#[test]
fn test_dropping_worker_stops_thread() {
    let config = SimulationConfig::default();
    let worker = SimulationWorker::spawn(&config).unwrap();
    assert!(worker.send(WorkerCommand::Init(Box::new(config))));
    assert!(worker.send(WorkerCommand::Start));
    drop(worker);
}
