use serde_json::{json, Value};

use roadway::{error_kind, FacilitySelection, LinkID, Mode, NodeID, ProjectCard, WranglerError};

use crate::fixtures::main_street;
use crate::runner::TestRunner;

pub fn run(t: &mut TestRunner) {
    t.suite("project_cards");
    t.run("lane_change_on_corridor", lane_change_on_corridor);
    t.run("managed_lane_card_then_split", managed_lane_card_then_split);
    t.run("add_then_delete", add_then_delete);
    t.run("strict_deletion", strict_deletion);
    t.run("unknown_category", unknown_category);
    t.run("failing_change_stops_the_card", failing_change_stops_the_card);
    t.run("load_from_file", load_from_file);
}

fn card(value: Value) -> ProjectCard {
    ProjectCard::from_value(&value).unwrap()
}

fn main_street_east() -> Value {
    json!({
        "link": [{"name": ["Main St"]}],
        "A": {"model_node_id": 1},
        "B": {"model_node_id": 3},
    })
}

fn lane_change_on_corridor() {
    let net = main_street();
    let widen = card(json!({
        "project": "Widen Main St eastbound",
        "category": "Roadway Property Change",
        "facility": main_street_east(),
        "properties": [
            {"property": "lanes", "existing": 2, "change": 1},
            {"property": "maxspeed", "set": 35},
        ],
    }));
    let after = net.with_project_card(&widen).unwrap();

    for l in [1, 2] {
        let link = after.get_l(LinkID(l));
        assert_eq!(link.get("lanes"), Some(json!(3)));
        assert_eq!(link.get("maxspeed"), Some(json!(35)));
    }
    for l in [3, 4] {
        let link = after.get_l(LinkID(l));
        assert_eq!(link.get("lanes"), Some(json!(2)));
        assert_eq!(link.get("maxspeed"), None);
    }
    // The original is untouched
    for link in net.all_links().values() {
        assert_eq!(link.get("lanes"), Some(json!(2)));
    }

    // Changing an attribute no link has makes no sense
    let bad = card(json!({
        "project": "Bad",
        "category": "Roadway Property Change",
        "facility": main_street_east(),
        "properties": [{"property": "toll", "change": 1}],
    }));
    let err = net.with_project_card(&bad).unwrap_err();
    assert!(matches!(
        error_kind(&err),
        Some(WranglerError::InvalidProperty(_))
    ));
}

fn managed_lane_card_then_split() {
    let mut net = main_street();
    net.apply_project_card(&card(json!({
        "project": "Main St express lanes",
        "category": "Parallel Managed Lanes",
        "facility": main_street_east(),
        "properties": [
            {"property": "ML_lanes", "set": 1},
            {"property": "ML_price", "set": 0, "group": [
                {"category": "sov", "timeofday": [{"time": ["06:00", "09:00"], "set": 1.5}]},
            ]},
            {"property": "ML_ACCESS", "set": "all"},
        ],
    })))
    .unwrap();
    assert!(net.get_l(LinkID(1)).is_managed());
    assert!(net.get_l(LinkID(2)).is_managed());
    assert!(!net.get_l(LinkID(3)).is_managed());

    let price = net
        .get_property_by_time_period_and_group("ML_price", Some(("07:00", "08:00")), &["sov"], None)
        .unwrap();
    assert_eq!(price[&LinkID(1)], json!(1.5));
    assert_eq!(price[&LinkID(3)], Value::Null);

    let after = net.to_managed_lane_network().unwrap();
    assert_eq!(after.all_links().len(), 10);
    // The shadow became the managed lane's own price
    let price = after
        .get_property_by_time_period_and_group("price", Some(("07:00", "08:00")), &["sov"], None)
        .unwrap();
    assert_eq!(price[&LinkID(10_000_001)], json!(1.5));
    assert_eq!(price[&LinkID(1)], Value::Null);
    let price = after
        .get_property_by_time_period_and_group("price", Some(("17:00", "18:00")), &["sov"], None)
        .unwrap();
    assert_eq!(price[&LinkID(10_000_002)], json!(0));
}

fn add_then_delete() {
    let mut net = main_street();
    net.apply_project_card(&card(json!({
        "project": "Spur and closure",
        "changes": [
            {
                "category": "Add New Roadway",
                "nodes": [{"model_node_id": 7, "X": -92.998, "Y": 45.001, "drive_node": 1}],
                "links": [{"model_link_id": 30, "A": 3, "B": 7, "name": "Spur", "drive_access": 1, "lanes": 1}],
            },
            {
                "category": "Roadway Deletion",
                "links": {"model_link_id": [4]},
            },
        ],
    })))
    .unwrap();
    net.validate().unwrap();

    let spur = net.get_l(LinkID(30));
    assert_eq!(spur.endpoints(), (NodeID(3), NodeID(7)));
    assert_eq!(spur.reference_id, "wrangler-30");
    assert!(net.maybe_get_shape(spur.shape_id.as_ref().unwrap()).is_some());
    assert!(net
        .get_n(NodeID(7))
        .inbound_reference_ids
        .contains(&spur.reference_id));
    assert!(net.get_n(NodeID(3)).outbound_reference_ids.contains(&spur.reference_id));

    assert!(net.maybe_get_l(LinkID(4)).is_none());
    assert!(!net
        .get_n(NodeID(3))
        .outbound_reference_ids
        .contains(&"ref4".to_string()));
    assert_eq!(net.find_link(NodeID(3), NodeID(2)), None);

    // The new link can be routed over
    let links = net
        .select_roadway_features(
            &FacilitySelection::from_value(json!({
                "link": [{"name": ["Main St", "Spur"]}],
                "A": {"model_node_id": 1},
                "B": {"model_node_id": 7},
            }))
            .unwrap(),
            Mode::Drive,
            false,
        )
        .unwrap();
    assert_eq!(links, vec![LinkID(1), LinkID(2), LinkID(30)]);
}

fn strict_deletion() {
    let mut net = main_street();
    let err = net
        .apply_project_card(&card(json!({
            "project": "Delete too much",
            "category": "Roadway Deletion",
            "links": {"model_link_id": [1, 99]},
            "ignore_missing": false,
        })))
        .unwrap_err();
    assert!(matches!(
        error_kind(&err),
        Some(WranglerError::InvalidProjectCard(_))
    ));
    // Nothing went, not even the link that did exist
    assert!(net.maybe_get_l(LinkID(1)).is_some());

    // By default, missing values only warn
    net.apply_project_card(&card(json!({
        "project": "Delete what's there",
        "category": "Roadway Deletion",
        "links": {"model_link_id": [1, 99]},
    })))
    .unwrap();
    assert!(net.maybe_get_l(LinkID(1)).is_none());

    // Nodes still in use can't go
    let err = net
        .apply_project_card(&card(json!({
            "project": "Delete a node",
            "category": "Roadway Deletion",
            "nodes": {"model_node_id": [3]},
        })))
        .unwrap_err();
    assert!(matches!(
        error_kind(&err),
        Some(WranglerError::ForeignKeyValue(_))
    ));
}

fn unknown_category() {
    let err = ProjectCard::from_value(&json!({
        "project": "Calculate things",
        "category": "Calculated Roadway",
    }))
    .unwrap_err();
    assert!(matches!(
        error_kind(&err),
        Some(WranglerError::InvalidProjectCard(_))
    ));
}

fn failing_change_stops_the_card() {
    let mut net = main_street();
    let both = card(json!({
        "project": "Half works",
        "changes": [
            {
                "category": "Roadway Property Change",
                "facility": main_street_east(),
                "properties": [{"property": "lanes", "set": 5}],
            },
            {
                "category": "Roadway Property Change",
                "facility": {
                    "link": [{"name": ["Nowhere Rd"]}],
                    "A": {"model_node_id": 1},
                    "B": {"model_node_id": 3},
                },
                "properties": [{"property": "lanes", "set": 1}],
            },
        ],
    }));

    assert!(net.with_project_card(&both).is_err());
    assert_eq!(net.get_l(LinkID(1)).get("lanes"), Some(json!(2)));

    let err = net.apply_project_card(&both).unwrap_err();
    assert!(matches!(
        error_kind(&err),
        Some(WranglerError::SelectionFailed(_))
    ));
    // The first change already happened
    assert_eq!(net.get_l(LinkID(1)).get("lanes"), Some(json!(5)));
    assert_eq!(net.get_l(LinkID(2)).get("lanes"), Some(json!(5)));
}

fn load_from_file() {
    let path = std::env::temp_dir().join(format!("wrangler_card_{}.json", std::process::id()));
    let value = json!({
        "project": "From disk",
        "category": "Roadway Property Change",
        "facility": {"link": [{"model_link_id": [3, 4]}]},
        "properties": [{"property": "lanes", "set": 1}],
    });
    netutil::write_json(&path, &value).unwrap();
    let loaded = ProjectCard::load(&path).unwrap();
    assert_eq!(loaded, card(value));

    let after = main_street().with_project_card(&loaded).unwrap();
    assert_eq!(after.get_l(LinkID(3)).get("lanes"), Some(json!(1)));
    assert_eq!(after.get_l(LinkID(1)).get("lanes"), Some(json!(2)));
}
