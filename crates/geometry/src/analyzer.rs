//! The drawing analyzer.
//!
//! Layer conventions: the plot outline lives on "Plot Boundary"; wall
//! footprints live on "Walls", with the second Walls polyline treated
//! as the extension. Unknown layers and object kinds are skipped.

use lintel_core::drawing::{Drawing, DrawingObject, Point};

/// Sentinel reported for measurements that cannot be taken.
pub const NOT_DETERMINABLE: &str = "not determinable";

const PLOT_BOUNDARY_LAYER: &str = "Plot Boundary";
const WALLS_LAYER: &str = "Walls";

/// Millimeters per meter.
const MM: f64 = 1_000.0;

/// Axis-aligned bounding box in drawing units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Bounding box of an object's points, or `None` for a pointless object.
pub fn bounding_box(object: &DrawingObject) -> Option<BoundingBox> {
    let mut points = object.points.iter();
    let first = points.next()?;
    let mut bb = BoundingBox {
        xmin: first.x,
        ymin: first.y,
        xmax: first.x,
        ymax: first.y,
    };
    for p in points {
        bb.xmin = bb.xmin.min(p.x);
        bb.ymin = bb.ymin.min(p.y);
        bb.xmax = bb.xmax.max(p.x);
        bb.ymax = bb.ymax.max(p.y);
    }
    Some(bb)
}

/// Plot area in m²: the closed polyline on "Plot Boundary" with the
/// largest absolute area. `None` when no such polyline exists.
pub fn plot_area(drawing: &Drawing) -> Option<f64> {
    drawing
        .closed_polylines_on(PLOT_BOUNDARY_LAYER)
        .filter_map(|o| shoelace_area_mm2(&o.points))
        .max_by(|a, b| a.total_cmp(b))
        .map(|area_mm2| area_mm2 / (MM * MM))
}

/// Extension depth in meters: the y-extent of the second "Walls"
/// polyline's bounding box. `None` with fewer than two Walls polylines.
pub fn extension_depth(drawing: &Drawing) -> Option<f64> {
    let extension = drawing.polylines_on(WALLS_LAYER).nth(1)?;
    let bb = bounding_box(extension)?;
    Some(bb.height().abs() / MM)
}

/// Building height in meters: a `height` property on any object
/// (already meters), else the maximum z coordinate (drawing units).
pub fn building_height(drawing: &Drawing) -> Option<f64> {
    if let Some(h) = drawing
        .objects
        .iter()
        .find_map(|o| o.numeric_property("height"))
    {
        return Some(h);
    }

    drawing
        .objects
        .iter()
        .flat_map(|o| o.points.iter())
        .filter_map(|p| p.z)
        .max_by(|a, b| a.total_cmp(b))
        .map(|z| z / MM)
}

/// Union of all measurements as a JSON report. Measurements that
/// cannot be taken carry the `"not determinable"` sentinel.
pub fn all_dimensions(drawing: &Drawing) -> serde_json::Value {
    let mut report = serde_json::Map::new();

    report.insert("plot_area_m2".into(), measurement(plot_area(drawing)));

    // Plot extents are cheap and useful alongside the area.
    if let Some(bb) = drawing
        .closed_polylines_on(PLOT_BOUNDARY_LAYER)
        .filter_map(bounding_box)
        .max_by(|a, b| (a.width() * a.height()).total_cmp(&(b.width() * b.height())))
    {
        report.insert("plot_width_m".into(), measurement(Some(bb.width().abs() / MM)));
        report.insert("plot_height_m".into(), measurement(Some(bb.height().abs() / MM)));
    }

    report.insert(
        "extension_depth_m".into(),
        measurement(extension_depth(drawing)),
    );
    report.insert(
        "building_height_m".into(),
        measurement(building_height(drawing)),
    );

    serde_json::Value::Object(report)
}

fn measurement(value: Option<f64>) -> serde_json::Value {
    match value {
        Some(v) => {
            let rounded = (v * 100.0).round() / 100.0;
            serde_json::json!(rounded)
        }
        None => serde_json::json!(NOT_DETERMINABLE),
    }
}

/// Shoelace signed area over the vertices, in mm²; the absolute value
/// is returned so self-intersecting outlines still yield a magnitude.
/// Duplicate consecutive points are collapsed first; fewer than three
/// distinct vertices yield `None`.
fn shoelace_area_mm2(points: &[Point]) -> Option<f64> {
    let vertices = collapse_duplicates(points);
    if vertices.len() < 3 {
        return None;
    }

    let mut doubled = 0.0;
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[(i + 1) % vertices.len()];
        doubled += a.x * b.y - b.x * a.y;
    }
    Some((doubled / 2.0).abs())
}

fn collapse_duplicates(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_some_and(|last| last.x == p.x && last.y == p.y) {
            continue;
        }
        out.push(*p);
    }
    // A trailing vertex that repeats the first is the same duplicate.
    if out.len() > 1 {
        let (first, last) = (out[0], *out.last().unwrap());
        if first.x == last.x && first.y == last.y {
            out.pop();
        }
    }
    out
}
