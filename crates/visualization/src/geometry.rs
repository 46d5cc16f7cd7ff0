//! Fixed 1920×1080 canvas, laid out as a 3×3 grid of nine named zones with a
//! uniform outer padding and inter-zone gutter. Shapes anchored to a zone are
//! swept into place by [`resolve_placements`]; shapes with an explicit pixel
//! position bypass packing entirely.

use crate::types::{Placement, Point, Shape};

pub const CANVAS_WIDTH: f64 = 1920.0;
pub const CANVAS_HEIGHT: f64 = 1080.0;
pub const PADDING: f64 = 50.0;
pub const GUTTER: f64 = 20.0;
pub const GRID_COLS: u32 = 3;
pub const GRID_ROWS: u32 = 3;

/// Margin kept between swept candidate positions within a zone.
const SWEEP_MARGIN: f64 = 10.0;

pub const ZONE_NAMES: [&str; 9] =
    ["top_left", "top_center", "top_right", "center_left", "center", "center_right", "bottom_left", "bottom_center", "bottom_right"];

/// One cell of the 3×3 grid, in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub name: &'static str,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

fn zone_width() -> f64 {
    (CANVAS_WIDTH - 2.0 * PADDING - (GRID_COLS as f64 - 1.0) * GUTTER) / GRID_COLS as f64
}

fn zone_height() -> f64 {
    (CANVAS_HEIGHT - 2.0 * PADDING - (GRID_ROWS as f64 - 1.0) * GUTTER) / GRID_ROWS as f64
}

/// The nine named zones, row-major: left-to-right, then top-to-bottom.
pub fn zones() -> [Zone; 9] {
    let zw = zone_width();
    let zh = zone_height();
    std::array::from_fn(|i| {
        let row = i as u32 / GRID_COLS;
        let col = i as u32 % GRID_COLS;
        Zone {
            name: ZONE_NAMES[i],
            x: PADDING + col as f64 * (zw + GUTTER),
            y: PADDING + row as f64 * (zh + GUTTER),
            width: zw,
            height: zh,
        }
    })
}

pub fn zone_by_name(name: &str) -> Option<Zone> {
    zones().into_iter().find(|z| z.name == name)
}

fn rects_overlap(ax: f64, ay: f64, aw: f64, ah: f64, bx: f64, by: f64, bw: f64, bh: f64) -> bool {
    ax < bx + bw && bx < ax + aw && ay < by + bh && by < ay + ah
}

/// A shape placed on the canvas, whether by explicit position or by packing.
#[derive(Debug, Clone)]
pub struct Placed {
    pub shape_index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Sweeps right then down inside `zone` on a grid stepped by the shape's own
/// bounding dimension plus [`SWEEP_MARGIN`], returning the first candidate
/// position that does not overlap any shape already placed in the scene.
/// Returns `None` if the shape cannot fit the zone at all, or every swept
/// candidate collides with something already placed.
fn sweep_place(zone: &Zone, width: f64, height: f64, placed: &[Placed]) -> Option<(f64, f64)> {
    if width > zone.width || height > zone.height {
        return None;
    }
    let step_x = width + SWEEP_MARGIN;
    let step_y = height + SWEEP_MARGIN;

    let mut y = zone.y;
    while y + height <= zone.y + zone.height {
        let mut x = zone.x;
        while x + width <= zone.x + zone.width {
            let collides = placed.iter().any(|p| rects_overlap(x, y, width, height, p.x, p.y, p.width, p.height));
            if !collides {
                return Some((x, y));
            }
            x += step_x;
        }
        y += step_y;
    }
    None
}

/// Resolves every shape in a scene to a canvas position. Shapes never fail
/// to place: a zone that cannot fit a shape (exhausted by sweeping, or too
/// small outright) falls back to the zone's center with overlap permitted,
/// and the fallback is recorded as a warning.
pub fn resolve_placements(shapes: &[Shape]) -> (Vec<Placed>, Vec<String>) {
    let mut placed: Vec<Placed> = Vec::with_capacity(shapes.len());
    let mut warnings = Vec::new();

    for (shape_index, shape) in shapes.iter().enumerate() {
        let (width, height) = shape.kind.bounding_size();
        match shape.placement() {
            Some(Placement::Explicit { x, y }) => {
                placed.push(Placed { shape_index, x, y, width, height });
            }
            Some(Placement::Zone(name)) => match zone_by_name(&name) {
                Some(zone) => match sweep_place(&zone, width, height, &placed) {
                    Some((x, y)) => placed.push(Placed { shape_index, x, y, width, height }),
                    None => {
                        warnings.push(format!("shape {shape_index} does not fit in zone '{name}', placed at zone center"));
                        placed.push(Placed {
                            shape_index,
                            x: zone.x + zone.width / 2.0 - width / 2.0,
                            y: zone.y + zone.height / 2.0 - height / 2.0,
                            width,
                            height,
                        });
                    }
                },
                None => {
                    warnings.push(format!("shape {shape_index} references unknown zone '{name}', placed at canvas center"));
                    placed.push(Placed {
                        shape_index,
                        x: CANVAS_WIDTH / 2.0 - width / 2.0,
                        y: CANVAS_HEIGHT / 2.0 - height / 2.0,
                        width,
                        height,
                    });
                }
            },
            None => {
                // Structural validation rejects this before resolution is ever
                // reached; this arm only guards against a future caller that
                // skips validation.
                warnings.push(format!("shape {shape_index} has no placement, defaulted to canvas center"));
                placed.push(Placed {
                    shape_index,
                    x: CANVAS_WIDTH / 2.0 - width / 2.0,
                    y: CANVAS_HEIGHT / 2.0 - height / 2.0,
                    width,
                    height,
                });
            }
        }
    }

    (placed, warnings)
}

pub fn point(x: f64, y: f64) -> Point {
    Point { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShapeKind;

    fn zoned_circle(zone: &str, radius: f64) -> Shape {
        Shape { kind: ShapeKind::Circle { radius }, x: None, y: None, zone: Some(zone.to_string()) }
    }

    #[test]
    fn nine_zones_tile_the_canvas_without_overlap() {
        let grid = zones();
        assert_eq!(grid.len(), 9);
        assert_eq!(grid[0].x, PADDING);
        assert_eq!(grid[0].y, PADDING);
        let last = grid[8];
        assert!((last.x + last.width - (CANVAS_WIDTH - PADDING)).abs() < 0.001);
        assert!((last.y + last.height - (CANVAS_HEIGHT - PADDING)).abs() < 0.001);
    }

    #[test]
    fn shapes_in_the_same_zone_do_not_overlap() {
        let shapes: Vec<Shape> = (0..4).map(|_| zoned_circle("center", 40.0)).collect();
        let (placed, warnings) = resolve_placements(&shapes);
        assert!(warnings.is_empty());
        for i in 0..placed.len() {
            for j in (i + 1)..placed.len() {
                let (a, b) = (&placed[i], &placed[j]);
                assert!(!rects_overlap(a.x, a.y, a.width, a.height, b.x, b.y, b.width, b.height));
            }
        }
    }

    #[test]
    fn explicit_position_bypasses_packing() {
        let shape = Shape { kind: ShapeKind::Rectangle { width: 10.0, height: 10.0 }, x: Some(5.0), y: Some(7.0), zone: None };
        let (placed, warnings) = resolve_placements(std::slice::from_ref(&shape));
        assert!(warnings.is_empty());
        assert_eq!((placed[0].x, placed[0].y), (5.0, 7.0));
    }

    #[test]
    fn overflowing_zone_warns_and_falls_back_to_center_instead_of_failing() {
        // Twenty generously-sized circles packed into one zone will exhaust
        // every swept candidate; the packer must still place every shape.
        let shapes: Vec<Shape> = (0..20).map(|_| zoned_circle("center", 100.0)).collect();
        let (placed, warnings) = resolve_placements(&shapes);
        assert_eq!(placed.len(), 20);
        assert!(!warnings.is_empty());
        let zone = zone_by_name("center").unwrap();
        for p in &placed {
            let cx = p.x + p.width / 2.0;
            let cy = p.y + p.height / 2.0;
            assert!(cx >= 0.0 && cx <= CANVAS_WIDTH);
            assert!(cy >= 0.0 && cy <= CANVAS_HEIGHT);
            // Fallback centers stay anchored within the requested zone's span.
            assert!(p.x <= zone.x + zone.width);
            assert!(p.y <= zone.y + zone.height);
        }
    }

    #[test]
    fn unknown_zone_falls_back_to_canvas_center_with_a_warning() {
        let shape = zoned_circle("nowhere", 20.0);
        let (placed, warnings) = resolve_placements(std::slice::from_ref(&shape));
        assert_eq!(warnings.len(), 1);
        assert_eq!(placed.len(), 1);
    }
}
