//! The ephemeral drawing payload.
//!
//! A drawing arrives fresh with each request as an ordered list of
//! geometric objects and is never written into the retrieval index.
//! Deserialization is deliberately tolerant: unknown object kinds,
//! missing layers, and extra properties are preserved or ignored
//! rather than rejected, because the analyzer must skip what it does
//! not understand.
//!
//! Coordinates are treated as millimeters throughout; the schema
//! carries no unit field.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 2-D point, optionally carrying a z coordinate.
///
/// On the wire a point is a bare array: `[x, y]` or `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.z.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.x)?;
        seq.serialize_element(&self.y)?;
        if let Some(z) = self.z {
            seq.serialize_element(&z)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PointVisitor;

        impl<'de> Visitor<'de> for PointVisitor {
            type Value = Point;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a coordinate array [x, y] or [x, y, z]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Point, A::Error> {
                let x: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let y: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let z: Option<f64> = seq.next_element()?;
                // Drain any trailing elements so longer arrays still parse.
                while seq.next_element::<serde_json::Value>()?.is_some() {}
                Ok(Point { x, y, z })
            }
        }

        deserializer.deserialize_seq(PointVisitor)
    }
}

/// The kind of a drawing object. Unknown kinds deserialize as `Other`
/// and are ignored by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectKind {
    Polyline,
    Line,
    #[default]
    #[serde(other)]
    Other,
}

/// One geometric object in a drawing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawingObject {
    #[serde(rename = "type", default)]
    pub kind: ObjectKind,

    /// Free-form layer name, e.g. "Walls", "Plot Boundary", "Highway".
    #[serde(default)]
    pub layer: String,

    #[serde(default)]
    pub points: Vec<Point>,

    /// Whether a polyline closes back to its first point.
    #[serde(default)]
    pub closed: bool,

    /// Open-ended property bag ("height", "floors", ...).
    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl DrawingObject {
    /// Read a numeric property, accepting both numbers and numeric strings.
    pub fn numeric_property(&self, key: &str) -> Option<f64> {
        match self.properties.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// The per-request drawing: an ordered list of objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Drawing {
    pub objects: Vec<DrawingObject>,
}

impl Drawing {
    pub fn new(objects: Vec<DrawingObject>) -> Self {
        Self { objects }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// All closed polylines on the given layer, in drawing order.
    pub fn closed_polylines_on(&self, layer: &str) -> impl Iterator<Item = &DrawingObject> {
        let layer = layer.to_string();
        self.objects
            .iter()
            .filter(move |o| o.kind == ObjectKind::Polyline && o.closed && o.layer == layer)
    }

    /// All polylines on the given layer, closed or not, in drawing order.
    pub fn polylines_on(&self, layer: &str) -> impl Iterator<Item = &DrawingObject> {
        let layer = layer.to_string();
        self.objects
            .iter()
            .filter(move |o| o.kind == ObjectKind::Polyline && o.layer == layer)
    }

    /// Whether any object sits on the given layer.
    pub fn has_layer(&self, layer: &str) -> bool {
        self.objects.iter().any(|o| o.layer == layer)
    }
}
