use super::*;
use crate::shape::{BoxShape, ConnectorShape};
use crate::store::memory::MemoryShapeStore;
use serde_json::{Map, json};

fn rect(id: &str, x: f64) -> Shape {
    Shape::Rect(BoxShape { id: id.into(), x, y: 0.0, width: 10.0, height: 10.0, fill: "#333".into(), extra: Map::new() })
}

fn patch(id: &str, fields: Value) -> ShapePatch {
    let Value::Object(fields) = fields else {
        panic!("patch fields must be an object");
    };
    ShapePatch { id: id.into(), fields }
}

#[tokio::test]
async fn add_then_load_round_trips() {
    let store = MemoryShapeStore::new();
    apply_add(&store, "r", &[rect("a", 1.0), rect("b", 2.0)]).await.unwrap();

    let mut loaded = load_room_objects(&store, "r").await.unwrap();
    loaded.sort_by(|x, y| x.id().cmp(y.id()));
    assert_eq!(loaded, vec![rect("a", 1.0), rect("b", 2.0)]);
}

#[tokio::test]
async fn duplicate_ids_in_one_batch_keep_the_last() {
    let store = MemoryShapeStore::new();
    apply_add(&store, "r", &[rect("a", 1.0), rect("a", 9.0)]).await.unwrap();

    assert_eq!(load_room_objects(&store, "r").await.unwrap(), vec![rect("a", 9.0)]);
}

#[tokio::test]
async fn re_adding_an_id_overwrites() {
    let store = MemoryShapeStore::new();
    apply_add(&store, "r", &[rect("a", 1.0)]).await.unwrap();
    apply_add(&store, "r", &[rect("a", 5.0)]).await.unwrap();

    assert_eq!(load_room_objects(&store, "r").await.unwrap(), vec![rect("a", 5.0)]);
}

#[tokio::test]
async fn update_merges_only_given_fields() {
    let store = MemoryShapeStore::new();
    apply_add(&store, "r", &[rect("a", 1.0)]).await.unwrap();
    apply_update(&store, "r", &patch("a", json!({"x": 40.0, "type": "circle"})))
        .await
        .unwrap();

    let loaded = load_room_objects(&store, "r").await.unwrap();
    let Shape::Rect(shape) = &loaded[0] else {
        panic!("type must not change on update");
    };
    assert!((shape.x - 40.0).abs() < f64::EPSILON);
    assert_eq!(shape.fill, "#333");
}

#[tokio::test]
async fn update_of_missing_object_creates_nothing() {
    let store = MemoryShapeStore::new();
    let err = apply_update(&store, "r", &patch("ghost", json!({"x": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::NotFound(ref id) if id == "ghost"));
    assert_eq!(err.error_code(), "E_OBJECT_NOT_FOUND");
    assert!(load_room_objects(&store, "r").await.unwrap().is_empty());
}

#[tokio::test]
async fn update_with_wrongly_typed_field_is_rejected_before_write() {
    let store = MemoryShapeStore::new();
    apply_add(&store, "r", &[rect("a", 1.0)]).await.unwrap();

    let err = apply_update(&store, "r", &patch("a", json!({"x": null, "fill": "#fff"})))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::InvalidPatch { ref id, .. } if id == "a"));
    assert_eq!(err.error_code(), "E_INVALID_PATCH");

    assert_eq!(load_room_objects(&store, "r").await.unwrap(), vec![rect("a", 1.0)]);
}

#[tokio::test]
async fn update_may_add_unmodeled_fields() {
    let store = MemoryShapeStore::new();
    apply_add(&store, "r", &[rect("a", 1.0)]).await.unwrap();
    apply_update(&store, "r", &patch("a", json!({"rotation": 90})))
        .await
        .unwrap();

    let loaded = load_room_objects(&store, "r").await.unwrap();
    let Shape::Rect(shape) = &loaded[0] else {
        panic!("expected rect");
    };
    assert_eq!(shape.extra.get("rotation"), Some(&json!(90)));
}

#[tokio::test]
async fn update_with_no_fields_is_ok() {
    let store = MemoryShapeStore::new();
    let empty = ShapePatch { id: "ghost".into(), fields: Map::new() };
    apply_update(&store, "r", &empty).await.unwrap();
}

#[tokio::test]
async fn delete_ignores_absent_and_duplicate_ids() {
    let store = MemoryShapeStore::new();
    apply_add(&store, "r", &[rect("a", 1.0), rect("b", 2.0)]).await.unwrap();
    apply_delete(&store, "r", &["a".into(), "a".into(), "missing".into()])
        .await
        .unwrap();

    assert_eq!(load_room_objects(&store, "r").await.unwrap(), vec![rect("b", 2.0)]);
}

#[tokio::test]
async fn load_skips_undecodable_documents() {
    let store = MemoryShapeStore::new();
    store
        .upsert_shapes("r", &[
            ("bad".into(), json!({"id": "bad", "type": "hexagon"})),
            ("a".into(), serde_json::to_value(rect("a", 1.0)).unwrap()),
        ])
        .await
        .unwrap();

    assert_eq!(load_room_objects(&store, "r").await.unwrap(), vec![rect("a", 1.0)]);
}

#[tokio::test]
async fn load_keeps_connectors_with_missing_endpoints() {
    let store = MemoryShapeStore::new();
    let connector = Shape::Connector(ConnectorShape {
        id: "c".into(),
        from: "gone".into(),
        to: "also-gone".into(),
        stroke: "#000".into(),
        extra: Map::new(),
    });
    apply_add(&store, "r", std::slice::from_ref(&connector)).await.unwrap();

    assert_eq!(load_room_objects(&store, "r").await.unwrap(), vec![connector]);
}

#[tokio::test]
async fn store_outage_surfaces_as_store_error() {
    let store = MemoryShapeStore::new();
    store.set_unavailable(true);

    let err = apply_add(&store, "r", &[rect("a", 1.0)]).await.unwrap_err();
    assert_eq!(err.error_code(), "E_STORE_UNAVAILABLE");
    assert!(load_room_objects(&store, "r").await.is_err());
}
