//! Canvas objects — the shapes a board is made of.
//!
//! DESIGN
//! ======
//! `Shape` is a tagged union keyed on the `type` field, matching the JSON the
//! canvas client emits. The relay treats shapes as opaque beyond their `id`:
//! it never renders them, but it does decode them so malformed payloads are
//! rejected before they reach peers or the store. Fields a variant does not
//! model (a rect's `rotation`, a note's `fontSize`) are kept in `extra` and
//! written back out unchanged.
//!
//! Connectors reference their endpoints by id only. An endpoint may be
//! deleted at any time, so resolution is by lookup and a missing endpoint
//! means "omit the connector", never an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A point on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned box geometry shared by rectangles and diamonds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleShape {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub fill: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Freehand stroke. `points` is a flat `[x0, y0, x1, y1, ...]` sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenShape {
    pub id: String,
    pub points: Vec<f64>,
    pub stroke: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteShape {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Line between two other shapes, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorShape {
    pub id: String,
    pub from: String,
    pub to: String,
    pub stroke: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One drawable object on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Rect(BoxShape),
    Circle(CircleShape),
    Diamond(BoxShape),
    Pen(PenShape),
    Note(NoteShape),
    Connector(ConnectorShape),
}

impl Shape {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Rect(s) | Self::Diamond(s) => &s.id,
            Self::Circle(s) => &s.id,
            Self::Pen(s) => &s.id,
            Self::Note(s) => &s.id,
            Self::Connector(s) => &s.id,
        }
    }

    /// Wire tag of this variant, e.g. `"rect"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rect(_) => "rect",
            Self::Circle(_) => "circle",
            Self::Diamond(_) => "diamond",
            Self::Pen(_) => "pen",
            Self::Note(_) => "note",
            Self::Connector(_) => "connector",
        }
    }

    /// Points a connector may attach to: the four edge midpoints.
    /// Strokes and connectors have none.
    #[must_use]
    pub fn anchors(&self) -> Vec<Point> {
        match self {
            Self::Rect(b) | Self::Diamond(b) => box_anchors(b.x, b.y, b.width, b.height),
            Self::Note(n) => box_anchors(n.x, n.y, n.width, n.height),
            Self::Circle(c) => vec![
                Point { x: c.x, y: c.y - c.radius },
                Point { x: c.x + c.radius, y: c.y },
                Point { x: c.x, y: c.y + c.radius },
                Point { x: c.x - c.radius, y: c.y },
            ],
            Self::Pen(_) | Self::Connector(_) => Vec::new(),
        }
    }
}

fn box_anchors(x: f64, y: f64, width: f64, height: f64) -> Vec<Point> {
    vec![
        Point { x: x + width / 2.0, y },
        Point { x: x + width, y: y + height / 2.0 },
        Point { x: x + width / 2.0, y: y + height },
        Point { x, y: y + height / 2.0 },
    ]
}

// =============================================================================
// CONNECTOR RESOLUTION
// =============================================================================

/// Resolve a connector against a shape set to the closest pair of anchors.
///
/// Returns `None` when either endpoint is missing or has no anchors; the
/// connector is then simply not drawable right now.
#[must_use]
pub fn resolve_connector(connector: &ConnectorShape, shapes: &[Shape]) -> Option<(Point, Point)> {
    let from = shapes.iter().find(|s| s.id() == connector.from)?;
    let to = shapes.iter().find(|s| s.id() == connector.to)?;

    let mut best: Option<(f64, Point, Point)> = None;
    for a in from.anchors() {
        for b in to.anchors() {
            let dist = (a.x - b.x).powi(2) + (a.y - b.y).powi(2);
            if best.is_none_or(|(d, _, _)| dist < d) {
                best = Some((dist, a, b));
            }
        }
    }
    best.map(|(_, a, b)| (a, b))
}

/// Ids of connectors whose endpoints cannot currently be resolved.
#[must_use]
pub fn dangling_connectors(shapes: &[Shape]) -> Vec<&str> {
    shapes
        .iter()
        .filter_map(|s| match s {
            Shape::Connector(c) if resolve_connector(c, shapes).is_none() => Some(c.id.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
#[path = "shape_test.rs"]
mod tests;
