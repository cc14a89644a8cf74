use serde_json::json;

use geom::Distance;
use roadway::{
    error_kind, LinkID, ManagedLaneConfig, Network, NodeID, PropertyChange, WranglerConfig,
    WranglerError,
};

use crate::fixtures::{main_street, NetworkBuilder};
use crate::runner::TestRunner;

pub fn run(t: &mut TestRunner) {
    t.suite("managed_lanes");
    t.run("split_main_street", split_main_street);
    t.run("split_consecutive_ids", split_consecutive_ids);
    t.run("ids_are_reversible", ids_are_reversible);
    t.run("managed_lane_attributes", managed_lane_attributes);
    t.run("connectors", connectors);
    t.run("selectable_after_split", selectable_after_split);
    t.run("only_runs_once", only_runs_once);
    t.run("missing_attribute_changes_nothing", missing_attribute_changes_nothing);
    t.run("id_collision_changes_nothing", id_collision_changes_nothing);
}

fn flag_main_street(net: &mut Network) {
    let properties: Vec<PropertyChange> = serde_json::from_value(json!([
        {"property": "ML_lanes", "set": 1},
        {"property": "ML_access", "set": "hov2"},
        {"property": "ML_ACCESS", "set": "all"},
        {"property": "ML_EGRESS", "set": "all"},
    ]))
    .unwrap();
    net.apply_managed_lane_feature_change(&[LinkID(1), LinkID(2)], &properties)
        .unwrap();
}

fn split() -> (Network, Network) {
    let mut before = main_street();
    flag_main_street(&mut before);
    let after = before.to_managed_lane_network().unwrap();
    (before, after)
}

fn split_main_street() {
    let (before, after) = split();
    // The original doesn't change
    assert!(!before.has_managed_lane_connectors());
    assert_eq!(before.all_links().len(), 4);
    assert_eq!(before.all_nodes().len(), 3);

    assert!(after.has_managed_lane_connectors());
    after.validate().unwrap();
    assert!(after.check_consistency().is_ok());

    let roadway = |tag: &str| {
        after
            .all_links()
            .values()
            .filter(|l| l.roadway() == Some(tag))
            .count()
    };
    assert_eq!(roadway("ml_access"), 2);
    assert_eq!(roadway("ml_egress"), 2);
    let managed = after.all_links().values().filter(|l| l.is_managed()).count();
    assert_eq!(managed, 2);
    let general_purpose = after
        .all_links()
        .values()
        .filter(|l| l.get("managed") == Some(json!(0)) && l.roadway().is_none())
        .count();
    // The two split links, plus the untouched ones heading back west
    assert_eq!(general_purpose, 4);
    assert_eq!(after.all_links().len(), 10);

    let ids: Vec<i64> = after.all_links().keys().map(|l| l.0).collect();
    assert_eq!(
        ids,
        vec![1, 2, 3, 4, 10_000_001, 10_000_002, 20_000_001, 20_000_002, 30_000_001, 30_000_002]
    );
    assert_eq!(after.all_nodes().len(), 6);
}

fn split_consecutive_ids() {
    // Neighboring IDs used to land on each other's connectors
    let mut net = NetworkBuilder::new()
        .node(1, 0, 0)
        .node(2, 1, 0)
        .node(3, 2, 0)
        .node(4, 3, 0)
        .link(1, 1, 2, json!({"name": "Main St"}))
        .link(2, 2, 3, json!({"name": "Main St"}))
        .link(3, 3, 4, json!({"name": "Main St"}))
        .build();
    let properties: Vec<PropertyChange> =
        serde_json::from_value(json!([{"property": "ML_lanes", "set": 1}])).unwrap();
    net.apply_managed_lane_feature_change(&[LinkID(1), LinkID(2), LinkID(3)], &properties)
        .unwrap();

    let after = net.to_managed_lane_network().unwrap();
    after.validate().unwrap();
    assert!(after.check_consistency().is_ok());
    assert_eq!(after.all_links().len(), 12);

    let scalar = after.config().managed_lanes.link_id_scalar;
    for gp in 1..=3 {
        let ml = after.get_l(LinkID(gp + scalar));
        let access = after.get_l(LinkID(gp + 2 * scalar));
        let egress = after.get_l(LinkID(gp + 3 * scalar));
        assert!(ml.is_managed());
        assert_eq!(access.roadway(), Some("ml_access"));
        assert_eq!(egress.roadway(), Some("ml_egress"));
        assert_eq!(access.b, ml.a);
        assert_eq!(egress.a, ml.b);
        assert_eq!(access.a, NodeID(gp));
        assert_eq!(egress.b, NodeID(gp + 1));
    }
}

fn ids_are_reversible() {
    let (_, after) = split();
    let ml_nodes = after.managed_lane_node_ids();
    assert_eq!(
        ml_nodes,
        vec![NodeID(4_500_001), NodeID(4_500_002), NodeID(4_500_003)]
    );
    let scalar = after.config().managed_lanes.node_id_scalar;
    for n in ml_nodes {
        assert!(after.maybe_get_n(NodeID(n.0 - scalar)).is_some());
        assert_eq!(after.get_n(n).attributes.get("drive_access"), Some(&json!(1)));
    }

    // Both managed lanes share the node mirroring 2
    let ml1 = after.get_l(LinkID(10_000_001));
    let ml2 = after.get_l(LinkID(10_000_002));
    assert_eq!(ml1.endpoints(), (NodeID(4_500_001), NodeID(4_500_002)));
    assert_eq!(ml2.endpoints(), (NodeID(4_500_002), NodeID(4_500_003)));
}

fn managed_lane_attributes() {
    let (before, after) = split();
    let ml = after.get_l(LinkID(10_000_001));
    assert_eq!(ml.name(), "Managed Lane Main St");
    assert_eq!(ml.get("lanes"), Some(json!(1)));
    assert_eq!(ml.get("access"), Some(json!("hov2")));
    assert_eq!(ml.get("managed"), Some(json!(1)));
    assert!(ml.shape_id.is_some());
    assert!(after.maybe_get_shape(ml.shape_id.as_ref().unwrap()).is_some());

    for l in after.all_links().values() {
        assert!(
            l.attributes.keys().all(|k| !k.starts_with("ML_")),
            "{} still has shadow attributes",
            l.id
        );
    }

    let gp = after.get_l(LinkID(1));
    assert_eq!(gp.name(), "Main St");
    assert_eq!(gp.get("lanes"), Some(json!(2)));
    assert_eq!(gp.geometry().unwrap(), before.get_l(LinkID(1)).geometry().unwrap());

    // Drawn parallel, off to the side
    let gp_pl = gp.geometry().unwrap();
    let ml_pl = ml.geometry().unwrap();
    for (a, b) in [
        (gp_pl.first_pt(), ml_pl.first_pt()),
        (gp_pl.last_pt(), ml_pl.last_pt()),
    ] {
        let offset = a.gps_dist(b).inner_meters();
        assert!((offset - 10.0).abs() < 0.1, "offset is {}", offset);
    }
    assert!(
        (gp_pl.length().inner_meters() - ml_pl.length().inner_meters()).abs() < 0.5
    );
}

fn connectors() {
    let (_, after) = split();
    let access = after.get_l(LinkID(20_000_001));
    assert_eq!(access.endpoints(), (NodeID(1), NodeID(4_500_001)));
    assert_eq!(access.name(), "Access Dummy Main St");
    assert_eq!(access.roadway(), Some("ml_access"));
    assert_eq!(access.get("lanes"), Some(json!(1)));
    assert_eq!(access.get("access"), Some(json!("hov2")));
    assert_eq!(access.get("drive_access"), Some(json!(1)));
    assert_eq!(access.get("ref"), Some(json!("")));

    let egress = after.get_l(LinkID(30_000_001));
    assert_eq!(egress.endpoints(), (NodeID(4_500_002), NodeID(2)));
    assert_eq!(egress.name(), "Egress Dummy Main St");
    assert_eq!(egress.roadway(), Some("ml_egress"));

    // About 10m, in miles
    let miles = access.get("distance").and_then(|x| x.as_f64()).unwrap();
    assert!((miles - Distance::meters(10.0).to_miles()).abs() < 0.0001);

    assert_eq!(
        after.get_l(LinkID(20_000_002)).endpoints(),
        (NodeID(2), NodeID(4_500_002))
    );
    assert_eq!(
        after.get_l(LinkID(30_000_002)).endpoints(),
        (NodeID(4_500_003), NodeID(3))
    );
}

fn selectable_after_split() {
    let mut before = main_street();
    flag_main_street(&mut before);
    let selection = roadway::FacilitySelection::from_value(json!({
        "link": [{"name": ["Main St"]}],
        "A": {"model_node_id": 1},
        "B": {"model_node_id": 3},
    }))
    .unwrap();
    before
        .select_roadway_features(&selection, roadway::Mode::Drive, false)
        .unwrap();
    assert_eq!(before.selections().len(), 1);

    before.create_managed_lane_network().unwrap();
    // The tables were replaced, so cached answers went away
    assert!(before.selections().is_empty());

    let managed = roadway::FacilitySelection::from_value(json!({
        "link": [{"name": ["Managed Lane"]}],
        "A": {"model_node_id": 4_500_001},
        "B": {"model_node_id": 4_500_003},
    }))
    .unwrap();
    let links = before
        .select_roadway_features(&managed, roadway::Mode::Drive, false)
        .unwrap();
    assert_eq!(links, vec![LinkID(10_000_001), LinkID(10_000_002)]);
}

fn only_runs_once() {
    let (_, mut after) = split();
    let links = after.all_links().clone();
    let nodes = after.all_nodes().clone();
    after.create_managed_lane_network().unwrap();
    assert_eq!(&links, after.all_links());
    assert_eq!(&nodes, after.all_nodes());
}

fn missing_attribute_changes_nothing() {
    let mut config = WranglerConfig::default();
    config.managed_lanes = ManagedLaneConfig {
        required_attributes: vec!["model_link_id".to_string(), "toll_rate".to_string()],
        ..Default::default()
    };
    let mut net = NetworkBuilder::new()
        .config(config)
        .node(1, 0, 0)
        .node(2, 1, 0)
        .link(1, 1, 2, json!({"name": "Main St"}))
        .build();
    flag_main_street_link(&mut net);
    let links = net.all_links().clone();

    let err = net.create_managed_lane_network().unwrap_err();
    match error_kind(&err) {
        Some(WranglerError::MissingAttribute { link, attribute }) => {
            assert_eq!(*link, LinkID(1));
            assert_eq!(attribute, "toll_rate");
        }
        _ => panic!("wrong error {}", err),
    }
    assert_eq!(&links, net.all_links());
    assert_eq!(net.all_nodes().len(), 2);
}

fn flag_main_street_link(net: &mut Network) {
    let properties: Vec<PropertyChange> =
        serde_json::from_value(json!([{"property": "ML_lanes", "set": 1}])).unwrap();
    net.apply_managed_lane_feature_change(&[LinkID(1)], &properties)
        .unwrap();
}

fn id_collision_changes_nothing() {
    // Somebody already used the ID the managed lane copy of node 1 would get
    let mut net = NetworkBuilder::new()
        .node(1, 0, 0)
        .node(2, 1, 0)
        .node(4_500_001, 0, 3)
        .link(1, 1, 2, json!({"name": "Main St"}))
        .build();
    flag_main_street_link(&mut net);
    let links = net.all_links().clone();

    let err = net.create_managed_lane_network().unwrap_err();
    assert!(matches!(error_kind(&err), Some(WranglerError::IdCollision(_))));
    assert_eq!(&links, net.all_links());
    assert_eq!(net.all_nodes().len(), 3);
    assert!(!net.has_managed_lane_connectors());
}
