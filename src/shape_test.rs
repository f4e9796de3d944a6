use super::*;
use serde_json::json;

fn rect(id: &str, x: f64, y: f64) -> Shape {
    Shape::Rect(BoxShape { id: id.into(), x, y, width: 100.0, height: 50.0, fill: "#333".into(), extra: Map::new() })
}

fn connector(id: &str, from: &str, to: &str) -> ConnectorShape {
    ConnectorShape { id: id.into(), from: from.into(), to: to.into(), stroke: "#000".into(), extra: Map::new() }
}

#[test]
fn decodes_client_rect_payload() {
    let shape: Shape = serde_json::from_value(json!({
        "type": "rect", "id": "r1", "x": 10, "y": 20, "width": 100, "height": 100, "fill": "#333"
    }))
    .expect("rect should decode");
    assert_eq!(shape.id(), "r1");
    assert_eq!(shape.kind(), "rect");
}

#[test]
fn pen_position_defaults_to_origin() {
    let shape: Shape = serde_json::from_value(json!({
        "type": "pen", "id": "p1", "points": [1.0, 2.0, 3.0, 4.0], "stroke": "#f00"
    }))
    .expect("pen without x/y should decode");
    let Shape::Pen(pen) = shape else {
        panic!("expected pen");
    };
    assert_eq!(pen.points.len(), 4);
    assert!(pen.x.abs() < f64::EPSILON);
}

#[test]
fn unknown_type_is_rejected() {
    let result: Result<Shape, _> = serde_json::from_value(json!({"type": "hexagon", "id": "h"}));
    assert!(result.is_err());
}

#[test]
fn serialized_tag_matches_kind() {
    let value = serde_json::to_value(rect("r1", 0.0, 0.0)).expect("serialize");
    assert_eq!(value["type"], "rect");
    assert_eq!(value["id"], "r1");
}

#[test]
fn unmodeled_fields_survive_decode_and_encode() {
    let input = json!({
        "type": "rect", "id": "a", "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0,
        "fill": "#333", "stroke": "#000", "rotation": 45, "meta": {"locked": true}
    });
    let shape: Shape = serde_json::from_value(input.clone()).expect("rect with extras should decode");
    let Shape::Rect(rect) = &shape else {
        panic!("expected rect");
    };
    assert_eq!(rect.extra.get("rotation"), Some(&json!(45)));
    assert!(!rect.extra.contains_key("type"));

    assert_eq!(serde_json::to_value(&shape).expect("serialize"), input);
}

#[test]
fn circle_anchors_sit_on_radius() {
    let circle = Shape::Circle(CircleShape { id: "c".into(), x: 50.0, y: 50.0, radius: 20.0, fill: "#fff".into(), extra: Map::new() });
    let anchors = circle.anchors();
    assert_eq!(anchors.len(), 4);
    assert!(anchors.contains(&Point { x: 50.0, y: 30.0 }));
    assert!(anchors.contains(&Point { x: 30.0, y: 50.0 }));
}

#[test]
fn connector_resolves_to_nearest_anchor_pair() {
    let shapes = vec![rect("a", 0.0, 0.0), rect("b", 300.0, 0.0)];
    let (from, to) = resolve_connector(&connector("c", "a", "b"), &shapes).expect("both endpoints exist");
    // Right edge of `a` faces left edge of `b`.
    assert_eq!(from, Point { x: 100.0, y: 25.0 });
    assert_eq!(to, Point { x: 300.0, y: 25.0 });
}

#[test]
fn connector_with_deleted_endpoint_is_omitted() {
    let shapes = vec![rect("a", 0.0, 0.0)];
    assert!(resolve_connector(&connector("c", "a", "gone"), &shapes).is_none());
}

#[test]
fn dangling_connectors_lists_only_unresolvable() {
    let shapes = vec![
        rect("a", 0.0, 0.0),
        rect("b", 200.0, 0.0),
        Shape::Connector(connector("ok", "a", "b")),
        Shape::Connector(connector("broken", "a", "missing")),
    ];
    assert_eq!(dangling_connectors(&shapes), vec!["broken"]);
}
