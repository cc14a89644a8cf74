use serde_json::{json, Value};

use roadway::{
    error_kind, FacilitySelection, LinkID, Mode, NodeID, Predicate, Subnet, WranglerError,
};

use crate::fixtures::{assert_connected_path, detour, interstate, islands, main_street};
use crate::runner::TestRunner;

pub fn run(t: &mut TestRunner) {
    t.suite("selection");
    t.run("main_street_in_order", main_street_in_order);
    t.run("unique_ids_skip_search", unique_ids_skip_search);
    t.run("named_path_beats_detour", named_path_beats_detour);
    t.run("cheap_expansions_take_detour", cheap_expansions_take_detour);
    t.run("widening_is_monotonic", widening_is_monotonic);
    t.run("refilter_after_search", refilter_after_search);
    t.run("cache_is_idempotent", cache_is_idempotent);
    t.run("failures_are_remembered", failures_are_remembered);
    t.run("side_st_without_ref", side_st_without_ref);
    t.run("falls_back_to_ref", falls_back_to_ref);
    t.run("no_path_between_islands", no_path_between_islands);
    t.run("malformed_selections", malformed_selections);
}

fn sel(value: Value) -> FacilitySelection {
    FacilitySelection::from_value(value).unwrap()
}

fn kind(err: &anyhow::Error) -> WranglerError {
    error_kind(err)
        .cloned()
        .unwrap_or_else(|| panic!("{} isn't a WranglerError", err))
}

fn main_street_in_order() {
    let mut net = main_street();
    let links = net
        .select_roadway_features(
            &sel(json!({
                "link": [{"name": ["Main St"]}],
                "A": {"model_node_id": 1},
                "B": {"model_node_id": 3},
            })),
            Mode::Drive,
            false,
        )
        .unwrap();
    assert_eq!(links, vec![LinkID(1), LinkID(2)]);
    assert_connected_path(&net, &links, NodeID(1), NodeID(3));

    // And the other way
    let links = net
        .select_roadway_features(
            &sel(json!({
                "link": [{"name": ["Main St"]}],
                "A": {"model_node_id": 3},
                "B": {"model_node_id": 1},
            })),
            Mode::Drive,
            false,
        )
        .unwrap();
    assert_eq!(links, vec![LinkID(4), LinkID(3)]);
}

fn unique_ids_skip_search() {
    let mut net = detour(100.0);
    let selection = sel(json!({"link": [{"model_link_id": [10, 22]}, {"name": "ignored"}]}));
    let links = net
        .select_roadway_features(&selection, Mode::Walk, false)
        .unwrap();
    // Exactly the rows the unique clause matches. Neither the other clause nor the mode apply.
    let direct = net.query_links(&Predicate::for_unique_links(
        &selection,
        &net.config().unique_link_ids,
    ));
    assert_eq!(links, direct);
    assert_eq!(links, vec![LinkID(10), LinkID(22)]);
    assert_eq!(net.selections().stats().path_searches, 0);

    let err = net
        .select_roadway_features(&sel(json!({"link": [{"model_link_id": 99}]})), Mode::Drive, false)
        .unwrap_err();
    assert!(matches!(kind(&err), WranglerError::SelectionFailed(_)));
    assert_eq!(net.selections().stats().path_searches, 0);
}

fn corridor_0_to_5() -> FacilitySelection {
    sel(json!({
        "link": [{"name": ["Main St"]}],
        "A": {"model_node_id": 0},
        "B": {"model_node_id": 5},
    }))
}

fn named_path_beats_detour() {
    // Breakeven is a weight factor of 1
    for factor in [100.0, 10.0, 2.0] {
        let mut net = detour(factor);
        let links = net
            .select_roadway_features(&corridor_0_to_5(), Mode::Drive, false)
            .unwrap();
        assert_eq!(
            links,
            vec![LinkID(20), LinkID(10), LinkID(11), LinkID(12), LinkID(13)],
            "with factor {}",
            factor
        );
        assert_connected_path(&net, &links, NodeID(0), NodeID(5));
        assert_eq!(net.selections().stats().path_searches, 1);
    }
}

fn cheap_expansions_take_detour() {
    for factor in [0.5, 0.0] {
        let mut net = detour(factor);
        let links = net
            .select_roadway_features(&corridor_0_to_5(), Mode::Drive, false)
            .unwrap();
        assert_eq!(
            links,
            vec![LinkID(20), LinkID(21), LinkID(22)],
            "with factor {}",
            factor
        );
        assert_connected_path(&net, &links, NodeID(0), NodeID(5));
    }
}

fn widening_is_monotonic() {
    let net = detour(100.0);
    let mut subnet = Subnet::new(vec![LinkID(11)], &net);
    let mut previous = subnet.links().clone();
    assert_eq!(previous.len(), 1);
    loop {
        let added = subnet.expand(&net);
        let current = subnet.links().clone();
        for (l, iteration) in &previous {
            // Links never leave, and keep the round that first added them
            assert_eq!(current.get(l), Some(iteration));
        }
        assert_eq!(current.len(), previous.len() + added);
        for (l, iteration) in &current {
            if !previous.contains_key(l) {
                assert_eq!(*iteration, subnet.iteration());
            }
        }
        previous = current;
        if added == 0 {
            break;
        }
    }
    assert_eq!(previous.len(), net.all_links().len());
}

fn refilter_after_search() {
    let mut net = detour(100.0);
    let links = net
        .select_roadway_features(
            &sel(json!({
                "link": [{"name": ["Main St"]}, {"lanes": 2}],
                "A": {"model_node_id": 1},
                "B": {"model_node_id": 5},
            })),
            Mode::Drive,
            false,
        )
        .unwrap();
    // The path had to use 11 to get through, but it has 3 lanes
    assert_eq!(links, vec![LinkID(10), LinkID(12), LinkID(13)]);
}

fn cache_is_idempotent() {
    let mut net = main_street();
    let before = net.all_links().clone();
    let selection = sel(json!({
        "link": [{"name": ["Main St"]}],
        "A": {"model_node_id": 1},
        "B": {"model_node_id": 3},
    }));
    let first = net
        .select_roadway_features(&selection, Mode::Drive, false)
        .unwrap();
    let second = net
        .select_roadway_features(&selection, Mode::Drive, false)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(&before, net.all_links());

    let stats = net.selections().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.path_searches, 1);

    let key = net.build_selection_key(&selection, Mode::Drive).unwrap();
    let cached = net.selections().get(&key).unwrap();
    assert!(cached.found());
    assert_eq!(cached.route, vec![NodeID(1), NodeID(2), NodeID(3)]);

    // Same clauses in another order share the entry
    let reordered = sel(json!({
        "A": {"model_node_id": 1},
        "B": {"model_node_id": 3},
        "link": [{"name": ["Main St"]}],
    }));
    assert_eq!(net.build_selection_key(&reordered, Mode::Drive).unwrap(), key);
    // A different mode doesn't
    assert_ne!(net.build_selection_key(&selection, Mode::Bus).unwrap(), key);
}

fn failures_are_remembered() {
    let mut net = interstate();
    let selection = sel(json!({
        "link": [{"name": ["I-94"]}],
        "A": {"model_node_id": 1},
        "B": {"model_node_id": 3},
    }));
    let err = net
        .select_roadway_features(&selection, Mode::Drive, false)
        .unwrap_err();
    assert!(matches!(kind(&err), WranglerError::SelectionFailed(_)));
    let err = net
        .select_roadway_features(&selection, Mode::Drive, false)
        .unwrap_err();
    assert!(matches!(
        kind(&err),
        WranglerError::SelectionPreviouslyFailed(_)
    ));
    // Forcing tries again for real
    let err = net
        .select_roadway_features(&selection, Mode::Drive, true)
        .unwrap_err();
    assert!(matches!(kind(&err), WranglerError::SelectionFailed(_)));
}

fn side_st_without_ref() {
    let mut net = main_street();
    assert!(!net.link_attribute_exists("ref"));
    let err = net
        .select_roadway_features(
            &sel(json!({
                "link": [{"name": ["Side St"]}],
                "A": {"model_node_id": 1},
                "B": {"model_node_id": 3},
            })),
            Mode::Drive,
            false,
        )
        .unwrap_err();
    match kind(&err) {
        WranglerError::SelectionFailed(msg) => assert!(msg.contains("ref"), "{}", msg),
        other => panic!("wrong error {}", other),
    }
}

fn falls_back_to_ref() {
    let mut net = interstate();
    let selection = sel(json!({
        "link": [{"name": ["I-35"]}],
        "A": {"model_node_id": 1},
        "B": {"model_node_id": 3},
    }));
    let links = net
        .select_roadway_features(&selection, Mode::Drive, false)
        .unwrap();
    assert_eq!(links, vec![LinkID(1), LinkID(2)]);

    let key = net.build_selection_key(&selection, Mode::Drive).unwrap();
    let cached = net.selections().get(&key).unwrap();
    assert!(cached.query.fields().contains("ref"));
    assert!(!cached.query.fields().contains("name"));
}

fn no_path_between_islands() {
    let mut net = islands();
    let err = net
        .select_roadway_features(
            &sel(json!({
                "link": [{"name": ["St"]}],
                "A": {"model_node_id": 1},
                "B": {"model_node_id": 4},
            })),
            Mode::Drive,
            false,
        )
        .unwrap_err();
    match kind(&err) {
        WranglerError::NoPathFound { from, to, breadth } => {
            assert_eq!((from, to), (NodeID(1), NodeID(4)));
            // Nothing more to add after the first round, so it gives up early
            assert!(breadth < net.config().max_search_breadth);
        }
        other => panic!("wrong error {}", other),
    }
}

fn malformed_selections() {
    let mut net = main_street();
    for value in [
        json!({"link": []}),
        json!({"link": [{"name": "Main St"}], "A": {"model_node_id": 1}}),
        json!({"link": [{"name": "Main St"}]}),
        json!({"link": [{"color": "red"}], "A": {"model_node_id": 1}, "B": {"model_node_id": 3}}),
        json!({"link": [{"name": "Main St"}], "A": {"model_node_id": 1, "X": 0}, "B": {"model_node_id": 3}}),
        json!({"link": [{"name": "Main St"}], "A": {"drive_node": 1}, "B": {"model_node_id": 3}}),
        json!({"link": [{"name": "Main St"}], "A": {"model_node_id": 99}, "B": {"model_node_id": 3}}),
        json!({"link": [{"name": "Main St"}], "A": {"model_node_id": 2}, "B": {"model_node_id": 2}}),
    ] {
        let err = net
            .select_roadway_features(&sel(value.clone()), Mode::Drive, false)
            .unwrap_err();
        assert!(
            matches!(kind(&err), WranglerError::SelectionFormat(_)),
            "{} gave {}",
            value,
            err
        );
    }
}
