//! Bounding-box aggregation
//!
//! Percent-of-frame coordinates make the arithmetic mean a reasonable resting
//! box for a group; real movement is described by the motion path instead.

use crate::types::BoundingBox;

/// Mean of `x`, `y`, `width` and `height` across `boxes`.
///
/// # Panics
///
/// Panics if `boxes` is empty. Groups always carry at least one member, so an
/// empty slice means an upstream invariant was broken.
#[must_use]
pub fn aggregate(boxes: &[BoundingBox]) -> BoundingBox {
    assert!(
        !boxes.is_empty(),
        "bounding-box aggregation called on an empty group"
    );

    let n = boxes.len() as f64;
    let sum = boxes.iter().fold(BoundingBox::default(), |acc, b| BoundingBox {
        x: acc.x + b.x,
        y: acc.y + b.y,
        width: acc.width + b.width,
        height: acc.height + b.height,
    });

    BoundingBox {
        x: sum.x / n,
        y: sum.y / n,
        width: sum.width / n,
        height: sum.height / n,
    }
}
