//! Pure, side-effect-free measurements over the ephemeral drawing.
//!
//! Coordinates are assumed to be millimeters; areas convert to m² and
//! lengths to meters. Nothing here fails: a measurement that cannot be
//! taken reports the `"not determinable"` sentinel in the dimension
//! report instead of raising.

pub mod analyzer;

pub use analyzer::{
    all_dimensions, bounding_box, building_height, extension_depth, plot_area, BoundingBox,
    NOT_DETERMINABLE,
};
