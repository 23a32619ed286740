//! Bubble silhouettes in element-local space (`0..width`, `0..height`).

use std::f64::consts::{PI, TAU};

use kurbo::{Circle, Ellipse, Shape};

use crate::foundation::core::{BezPath, Point, Vec2};
use crate::scene::model::{BubbleType, DialogueStyle};

const ELLIPSE_SEGMENTS: usize = 72;
const SHOUT_SPIKES: usize = 16;
const SHOUT_INNER_RATIO: f64 = 0.78;
const PATH_TOLERANCE: f64 = 0.1;

/// Outline of a bubble: the main body plus detached decorations (thought circles).
#[derive(Clone, Debug, Default)]
pub struct BubbleGeometry {
    /// Closed body outline, tail included for speech bubbles.
    pub body: BezPath,
    /// Extra closed shapes drawn with the same fill and stroke.
    pub extras: Vec<BezPath>,
}

/// Build the silhouette for `kind` sized to `width x height`.
pub fn bubble_geometry(
    kind: BubbleType,
    width: f64,
    height: f64,
    style: &DialogueStyle,
) -> BubbleGeometry {
    match kind {
        BubbleType::Speech => BubbleGeometry {
            body: speech_path(
                width,
                height,
                style.tail_angle,
                style.tail_length,
                style.tail_thickness,
            ),
            extras: Vec::new(),
        },
        BubbleType::Thought => {
            let (body, extras) = thought_paths(
                width,
                height,
                style.tail_angle,
                style.tail_length,
                style.tail_thickness,
            );
            BubbleGeometry { body, extras }
        }
        BubbleType::Shout => BubbleGeometry {
            body: shout_path(width, height),
            extras: Vec::new(),
        },
    }
}

/// Unit direction of a tail. 0° points down; positive angles turn clockwise on screen.
pub fn tail_direction(angle_deg: f64) -> Vec2 {
    let a = angle_deg.to_radians();
    Vec2::new(-a.sin(), a.cos())
}

/// Point where the ray from the ellipse centre along `dir` leaves the ellipse.
pub fn ellipse_edge(center: Point, rx: f64, ry: f64, dir: Vec2) -> Point {
    let denom = ((dir.x / rx).powi(2) + (dir.y / ry).powi(2)).sqrt();
    if !denom.is_finite() || denom <= 0.0 {
        return center;
    }
    center + dir * (1.0 / denom)
}

/// Ellipse inscribed in the box with a triangular tail merged into a single outline.
pub fn speech_path(
    width: f64,
    height: f64,
    tail_angle: f64,
    tail_length: f64,
    tail_thickness: f64,
) -> BezPath {
    let (rx, ry) = (width.max(0.0) / 2.0, height.max(0.0) / 2.0);
    let c = Point::new(rx, ry);
    if rx <= 0.0 || ry <= 0.0 {
        return BezPath::new();
    }
    if tail_length <= 0.0 || tail_thickness <= 0.0 {
        return Ellipse::new(c, (rx, ry), 0.0).to_path(PATH_TOLERANCE);
    }

    let dir = tail_direction(tail_angle);
    let alpha = (dir.y / ry).atan2(dir.x / rx);
    // Half the base width expressed as an angle on the ellipse parametrisation.
    let speed = ((rx * alpha.sin()).powi(2) + (ry * alpha.cos()).powi(2)).sqrt();
    let delta = (tail_thickness / 2.0 / speed.max(1e-6)).min(PI / 4.0);

    let on_ellipse = |t: f64| Point::new(c.x + rx * t.cos(), c.y + ry * t.sin());
    let tip = ellipse_edge(c, rx, ry, dir) + dir * tail_length;

    let mut path = BezPath::new();
    let start = alpha + delta;
    let sweep = TAU - 2.0 * delta;
    path.move_to(on_ellipse(start));
    for i in 1..=ELLIPSE_SEGMENTS {
        let t = start + sweep * (i as f64 / ELLIPSE_SEGMENTS as f64);
        path.line_to(on_ellipse(t));
    }
    path.line_to(tip);
    path.close_path();
    path
}

/// Ellipse plus two shrinking circles trailing along the tail direction.
pub fn thought_paths(
    width: f64,
    height: f64,
    tail_angle: f64,
    tail_length: f64,
    tail_thickness: f64,
) -> (BezPath, Vec<BezPath>) {
    let (rx, ry) = (width.max(0.0) / 2.0, height.max(0.0) / 2.0);
    let c = Point::new(rx, ry);
    if rx <= 0.0 || ry <= 0.0 {
        return (BezPath::new(), Vec::new());
    }
    let body = Ellipse::new(c, (rx, ry), 0.0).to_path(PATH_TOLERANCE);
    if tail_length <= 0.0 || tail_thickness <= 0.0 {
        return (body, Vec::new());
    }

    let dir = tail_direction(tail_angle);
    let edge = ellipse_edge(c, rx, ry, dir);
    let near = Circle::new(edge + dir * (tail_length * 0.4), tail_thickness * 0.35);
    let far = Circle::new(edge + dir * (tail_length * 0.85), tail_thickness * 0.2);
    (
        body,
        vec![near.to_path(PATH_TOLERANCE), far.to_path(PATH_TOLERANCE)],
    )
}

/// Sixteen-point star whose spikes touch the box edges.
pub fn shout_path(width: f64, height: f64) -> BezPath {
    let (rx, ry) = (width.max(0.0) / 2.0, height.max(0.0) / 2.0);
    let mut path = BezPath::new();
    if rx <= 0.0 || ry <= 0.0 {
        return path;
    }
    let vertices = SHOUT_SPIKES * 2;
    for i in 0..vertices {
        let t = -PI / 2.0 + TAU * (i as f64) / (vertices as f64);
        let k = if i % 2 == 0 { 1.0 } else { SHOUT_INNER_RATIO };
        let p = Point::new(rx + rx * k * t.cos(), ry + ry * k * t.sin());
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path.close_path();
    path
}

#[cfg(test)]
#[path = "../../tests/unit/render/bubble.rs"]
mod tests;
