use std::collections::HashMap;
use std::sync::Arc;

use cosmogen::coords::{Level, Position, Scale};
use cosmogen::core::logging;
use cosmogen::generation::{
    CascadeSettings, CompletionQueues, FieldPipeline, GenerationState, NoiseKernel,
};
use cosmogen::hierarchy::{FieldOwner, NodeKey, NodeKind};
use cosmogen::streaming::{MemoryStore, NullStore, RequestState, Scheduler};
use glam::DVec2;

fn small_cascade() -> CascadeSettings {
    let mut cascade = CascadeSettings::default();
    cascade.universe.chunk_size = 8;
    cascade.universe.chunk_count = 2;
    cascade.filament.chunk_size = 4;
    cascade.filament.chunk_count = 2;
    cascade.sector.chunk_size = 4;
    cascade.sector.chunk_count = 2;
    cascade.region.chunk_size = 2;
    cascade.region.chunk_count = 2;
    cascade
}

fn small_scheduler() -> Scheduler {
    logging::init_for_tests();
    Scheduler::new(small_cascade(), Arc::new(NoiseKernel), Arc::new(NullStore)).unwrap()
}

#[test]
fn default_universe_field_covers_grid_in_range() {
    logging::init_for_tests();
    let cascade = Arc::new(CascadeSettings::default());
    let queues = CompletionQueues::new();
    let pipeline = FieldPipeline::new(cascade.clone(), Arc::new(NoiseKernel), queues.senders());

    let fields = pipeline.generate_universe_field().unwrap();
    assert_eq!(fields.state(), GenerationState::Generated);
    assert_eq!(fields.fields().len(), 1);

    let field = &fields.fields()[0];
    assert_eq!(field.len(), 1024 * 1024);
    let (lo, hi) = (cascade.universe.remap.to_min, cascade.universe.remap.to_max);
    assert_eq!((lo, hi), (0.0, 1.0));
    assert!(field.values().iter().all(|v| (lo..=hi).contains(v)));
}

#[test]
fn duplicate_filament_request_builds_once() {
    logging::init_for_tests();
    let mut s = Scheduler::with_defaults(Arc::new(NullStore)).unwrap();
    let p = Position::filament(0, 0);

    s.request(NodeKind::Filament, p).unwrap();
    s.request(NodeKind::Filament, p).unwrap();
    assert_eq!(s.pending(NodeKind::Filament).len(), 1);

    s.run_until_idle(10).unwrap();
    assert!(s.is_idle());
    assert_eq!(s.registry().count(NodeKind::Filament), 1);
    assert!(!s.pending(NodeKind::Filament).contains(&p));
    assert_eq!(s.registry().universe().children().len(), 1);
}

#[test]
fn sector_chunk_waits_until_sector_loaded() {
    let mut s = small_scheduler();
    let chunk = Position::sector_chunk(5, 3);
    let sector = s.coords().to_other_scale(chunk, Scale::Grid(Level::Sector));
    let filament = s.coords().to_other_scale(chunk, Scale::Grid(Level::Filament));

    s.request(NodeKind::SectorChunk, chunk).unwrap();
    s.request(NodeKind::Filament, filament).unwrap();
    s.run_until_idle(30).unwrap();
    // Filament loaded, sector never requested
    assert!(s.registry().is_generated(FieldOwner::Node(NodeKey::new(NodeKind::Filament, filament))));
    assert_eq!(s.state(NodeKind::SectorChunk, chunk), RequestState::Queued);
    assert!(!s.is_idle());

    s.request(NodeKind::Sector, sector).unwrap();
    let mut sector_done_at = None;
    for tick in 0..30 {
        s.tick().unwrap();
        let sector_owner = FieldOwner::Node(NodeKey::new(NodeKind::Sector, sector));
        if sector_done_at.is_none() && s.registry().is_generated(sector_owner) {
            sector_done_at = Some(tick);
        }
        if s.state(NodeKind::SectorChunk, chunk) == RequestState::Completed {
            // The sector's result is applied at the start of the tick that builds the chunk
            assert_eq!(sector_done_at, Some(tick));
            break;
        }
    }
    assert_eq!(s.state(NodeKind::SectorChunk, chunk), RequestState::Completed);
}

#[test]
fn world_origin_round_trips_through_filament() {
    let s = Scheduler::with_defaults(Arc::new(NullStore)).unwrap();
    let coords = s.coords();
    let origin = DVec2::ZERO;

    let filament = coords.to_position(Scale::Grid(Level::Filament), origin);
    assert_eq!(filament, Position::filament(0, 0));
    let back = coords.to_world_position(filament);
    assert_eq!(coords.to_position(Scale::Grid(Level::Universe), back), Position::universe_cell(0, 0));
    assert_eq!(coords.to_position(Scale::Grid(Level::Filament), back), filament);
}

#[test]
fn same_settings_same_fields() {
    let build = || {
        let mut s = small_scheduler();
        s.request(NodeKind::Filament, Position::filament(1, 1)).unwrap();
        s.request(NodeKind::Sector, Position::sector(9, 10)).unwrap();
        s.run_until_idle(30).unwrap();
        s
    };
    let a = build();
    let b = build();

    for kind in [NodeKind::Filament, NodeKind::Sector] {
        for node in a.registry().nodes(kind) {
            let other = b.registry().get(&node.key()).unwrap();
            assert_eq!(node.seed(), other.seed());
            assert!(node.is_generated());
            assert_eq!(node.fields(), other.fields());
        }
    }
    assert_eq!(a.registry().count(NodeKind::Sector), 1);

    let mut reseeded = small_cascade();
    reseeded.universe.seed = 7;
    let mut c = Scheduler::new(reseeded, Arc::new(NoiseKernel), Arc::new(NullStore)).unwrap();
    c.request(NodeKind::Filament, Position::filament(1, 1)).unwrap();
    c.run_until_idle(30).unwrap();
    let key = NodeKey::new(NodeKind::Filament, Position::filament(1, 1));
    assert_ne!(
        c.registry().get(&key).unwrap().fields(),
        a.registry().get(&key).unwrap().fields()
    );
}

#[test]
fn states_only_move_forward() {
    let mut s = small_scheduler();
    let requests = [
        (NodeKind::RegionChunk, Position::region_chunk(3, 2)),
        (NodeKind::Region, Position::region(1, 1)),
        (NodeKind::Sector, Position::sector(0, 0)),
        (NodeKind::Filament, Position::filament(0, 0)),
        (NodeKind::FilamentChunk, Position::filament_chunk(1, 0)),
        (NodeKind::SectorChunk, Position::sector_chunk(0, 1)),
    ];
    for (kind, p) in requests {
        s.request(kind, p).unwrap();
    }

    let mut last_request: HashMap<NodeKey, RequestState> = HashMap::new();
    let mut last_field: HashMap<NodeKey, GenerationState> = HashMap::new();
    for _ in 0..40 {
        s.tick().unwrap();
        for (kind, p) in requests {
            let key = NodeKey::new(kind, p);
            let state = s.state(kind, p);
            if let Some(prev) = last_request.insert(key, state) {
                assert!(state >= prev, "{} went from {:?} to {:?}", key, prev, state);
            }
            if let Some(node) = s.registry().get(&key) {
                let state = node.state();
                if let Some(GenerationState::Generated) = last_field.insert(key, state) {
                    assert_eq!(state, GenerationState::Generated);
                }
            }
        }
    }
    assert!(s.is_idle());
    for (kind, p) in requests {
        assert!(s.registry().is_generated(FieldOwner::Node(NodeKey::new(kind, p))));
    }
}

#[test]
fn nodes_built_only_on_generated_parents() {
    let mut s = small_scheduler();
    // Children requested before their ancestors
    s.request(NodeKind::RegionChunk, Position::region_chunk(0, 0)).unwrap();
    s.request(NodeKind::Region, Position::region(0, 0)).unwrap();
    s.request(NodeKind::SectorChunk, Position::sector_chunk(0, 0)).unwrap();
    s.request(NodeKind::Sector, Position::sector(0, 0)).unwrap();
    s.request(NodeKind::FilamentChunk, Position::filament_chunk(0, 0)).unwrap();
    s.request(NodeKind::Filament, Position::filament(0, 0)).unwrap();

    for _ in 0..40 {
        let report = s.tick().unwrap();
        for key in report.constructed {
            let node = s.registry().get(&key).unwrap();
            assert!(s.registry().is_generated(node.parent()), "{} built before {}", key, node.parent());
            assert!(!node.is_generated());
        }
    }
    assert!(s.is_idle());
    assert_eq!(s.registry().len(), 6);
}

#[test]
fn every_save_follows_a_state_change() {
    logging::init_for_tests();
    let store = Arc::new(MemoryStore::new());
    let mut s = Scheduler::new(small_cascade(), Arc::new(NoiseKernel), store.clone()).unwrap();
    s.request(NodeKind::Filament, Position::filament(0, 0)).unwrap();
    s.request(NodeKind::FilamentChunk, Position::filament_chunk(1, 1)).unwrap();
    s.run_until_idle(20).unwrap();

    // Universe plus two nodes, each saved on construction and on generation
    assert_eq!(store.len(), 6);
    assert_eq!(store.saves().iter().filter(|r| r.generated).count(), 3);
}

#[test]
fn region_chunk_with_missing_region_does_not_stall_pass() {
    let mut s = small_scheduler();
    s.request(NodeKind::Filament, Position::filament(0, 0)).unwrap();
    s.request(NodeKind::Sector, Position::sector(0, 0)).unwrap();
    s.request(NodeKind::Region, Position::region(0, 0)).unwrap();
    s.run_until_idle(30).unwrap();
    assert!(s.is_idle());

    // Region chunks are half a region wide: (2, 0) needs region (1, 0), never requested
    let orphan = Position::region_chunk(2, 0);
    let ready = Position::region_chunk(0, 0);
    s.request(NodeKind::RegionChunk, orphan).unwrap();
    s.request(NodeKind::RegionChunk, ready).unwrap();
    assert_eq!(s.pending(NodeKind::RegionChunk), vec![orphan, ready]);

    let report = s.tick().unwrap();
    assert_eq!(report.constructed, vec![NodeKey::new(NodeKind::RegionChunk, ready)]);
    assert_eq!(s.state(NodeKind::RegionChunk, orphan), RequestState::Queued);

    s.run_until_idle(10).unwrap();
    assert_eq!(s.state(NodeKind::RegionChunk, ready), RequestState::Completed);
    assert_eq!(s.pending(NodeKind::RegionChunk), vec![orphan]);
}
