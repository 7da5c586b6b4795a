use boulder_tally::competition::Competition;
use boulder_tally::model::MemberId;
use boulder_tally::scoring::Scorer;
use boulder_tally::store::{self, MemoryStore, ScoreStore};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

#[test]
fn concurrent_toggles_leave_room_consistent() {
    let comp = Arc::new(Competition::new(MemoryStore::new()));
    let room = comp.create_room("Busy Night").unwrap();
    let members: Vec<_> = (0..6)
        .map(|i| comp.add_member(room.id, &format!("Climber {}", i), i == 5).unwrap())
        .collect();
    let routes: Vec<_> = (0..4)
        .map(|i| {
            comp.add_route(room.id, &format!("Problem {}", i), "V3", &BTreeSet::new())
                .unwrap()
        })
        .collect();

    let handles: Vec<_> = members
        .iter()
        .enumerate()
        .map(|(i, member)| {
            let comp = Arc::clone(&comp);
            let member_id = member.id;
            let route_ids: Vec<_> = routes.iter().map(|r| r.id).collect();
            thread::spawn(move || {
                for round in 0..20 {
                    let route_id = route_ids[(i + round) % route_ids.len()];
                    let completed = (i + round) % 3 != 0;
                    comp.set_completion(member_id, route_id, completed).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Whatever interleaving happened, the last pass must already match a
    // from-scratch recompute.
    let outcome = comp.recompute(room.id).unwrap().unwrap();
    assert!(outcome.is_noop(), "stale derived state: {:?}", outcome);
    assert_eq!(outcome.standard_line_score, 60);

    // Normal totals are the sum of each member's completed-row values
    for member in comp.members(room.id).unwrap() {
        let rows = comp.store().list_scores_by_member(member.id).unwrap();
        let sum: Decimal = rows
            .iter()
            .filter(|s| s.is_completed)
            .map(|s| s.score_attained)
            .sum();
        assert_eq!(member.total_score, sum, "{}", member.name);
    }
}

#[test]
fn shared_scorer_serializes_passes_across_threads() {
    let comp = Competition::new(MemoryStore::new());
    let room = comp.create_room("Seed").unwrap();
    let a = comp.add_member(room.id, "A", false).unwrap();
    let b = comp.add_member(room.id, "B", false).unwrap();
    comp.add_route(room.id, "R", "V1", &BTreeSet::from([a.id, b.id]))
        .unwrap();
    let store = Arc::new(comp.into_store());
    let scorer = Arc::new(Scorer::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let scorer = Arc::clone(&scorer);
            thread::spawn(move || scorer.recompute(store.as_ref(), room.id).unwrap().unwrap())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_noop());
    }

    let ids: Vec<MemberId> = store
        .list_members(room.id, None)
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[test]
fn concurrent_file_updates_keep_every_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let comp = Competition::new(MemoryStore::new());
    let room = comp.create_room("Finals").unwrap();
    let members: Vec<MemberId> = (0..12)
        .map(|i| comp.add_member(room.id, &format!("Climber {}", i), false).unwrap().id)
        .collect();
    let route_id = comp.add_route(room.id, "Slab", "V1", &BTreeSet::new()).unwrap().id;
    store::save_state(&path, &comp.into_store().to_state().unwrap()).unwrap();

    // Each thread stands in for one CLI invocation: load, toggle, save.
    let handles: Vec<_> = members
        .iter()
        .map(|&member_id| {
            let path = path.clone();
            thread::spawn(move || {
                store::with_locked_state(&path, |state| {
                    let comp = Competition::new(MemoryStore::from_state(state));
                    comp.set_completion(member_id, route_id, true)?;
                    Ok(Some(comp.into_store().to_state()?))
                })
                .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let comp = Competition::new(MemoryStore::from_state(store::load_state(&path).unwrap()));
    let board = comp.route_board(room.id).unwrap();
    assert_eq!(board.standard_line_score, 1000);
    assert_eq!(board.routes[0].completers, 12);
    assert_eq!(board.routes[0].share.to_string(), "83.33");
    for member in comp.members(room.id).unwrap() {
        assert_eq!(member.total_score.to_string(), "83.33", "{}", member.name);
    }
    assert!(comp.recompute(room.id).unwrap().unwrap().is_noop());
}
