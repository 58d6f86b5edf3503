use std::f32::consts::PI;

use super::types::{BodyKind, Rect, Size, Vec2};

/// Vertical speeds below this are treated as resting after a bounce.
const REST_SPEED: f32 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub kind: BodyKind,
    /// Unscaled collision size; `None` means the current texture size.
    pub size: Option<Size>,
    pub velocity: Vec2,
    pub bounce: f32,
    pub gravity_enabled: bool,
    pub immovable: bool,
    pub collide_world_bounds: bool,
    pub enabled: bool,
    pub touching_down: bool,
}

impl Body {
    pub(crate) fn new(kind: BodyKind) -> Self {
        Self {
            kind,
            size: None,
            velocity: Vec2::ZERO,
            bounce: 0.0,
            gravity_enabled: kind == BodyKind::Dynamic,
            immovable: false,
            collide_world_bounds: false,
            enabled: true,
            touching_down: false,
        }
    }

    pub fn is_movable(&self) -> bool {
        self.enabled && self.kind == BodyKind::Dynamic && !self.immovable
    }
}

pub(crate) fn integrate(body: &mut Body, position: &mut Vec2, gravity_y: f32, dt: f32) {
    if !body.enabled || body.kind != BodyKind::Dynamic {
        return;
    }
    body.touching_down = false;
    if body.gravity_enabled && !body.immovable {
        body.velocity.y += gravity_y * dt;
    }
    position.x += body.velocity.x * dt;
    position.y += body.velocity.y * dt;
}

pub(crate) fn clamp_to_world(body: &mut Body, position: &mut Vec2, extent: Size, world: Size) {
    if !body.enabled || !body.collide_world_bounds {
        return;
    }
    let half_w = extent.width * 0.5;
    let half_h = extent.height * 0.5;

    if position.x - half_w < 0.0 {
        position.x = half_w;
        body.velocity.x = body.velocity.x.abs() * body.bounce;
    } else if position.x + half_w > world.width {
        position.x = world.width - half_w;
        body.velocity.x = -body.velocity.x.abs() * body.bounce;
    }

    if position.y - half_h < 0.0 {
        position.y = half_h;
        body.velocity.y = body.velocity.y.abs() * body.bounce;
    } else if position.y + half_h >= world.height {
        position.y = world.height - half_h;
        body.velocity.y = rebound(body.velocity.y, body.bounce);
        body.touching_down = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Separation {
    pub axis: Axis,
    pub first_delta: Vec2,
    pub second_delta: Vec2,
    pub first_landed: bool,
    pub second_landed: bool,
}

/// Pushes overlapping rectangles apart along the axis of least penetration.
/// Returns `None` when they do not overlap or neither side may move.
pub(crate) fn separate(
    first: &Rect,
    first_movable: bool,
    second: &Rect,
    second_movable: bool,
) -> Option<Separation> {
    let overlap_x = first.max_x.min(second.max_x) - first.min_x.max(second.min_x);
    let overlap_y = first.max_y.min(second.max_y) - first.min_y.max(second.min_y);
    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return None;
    }
    let (first_share, second_share) = match (first_movable, second_movable) {
        (true, true) => (0.5, 0.5),
        (true, false) => (1.0, 0.0),
        (false, true) => (0.0, 1.0),
        (false, false) => return None,
    };

    let first_center = first.center();
    let second_center = second.center();
    if overlap_y <= overlap_x {
        let first_above = first_center.y <= second_center.y;
        let direction = if first_above { -1.0 } else { 1.0 };
        Some(Separation {
            axis: Axis::Vertical,
            first_delta: Vec2::new(0.0, direction * overlap_y * first_share),
            second_delta: Vec2::new(0.0, -direction * overlap_y * second_share),
            first_landed: first_above && first_share > 0.0,
            second_landed: !first_above && second_share > 0.0,
        })
    } else {
        let direction = if first_center.x <= second_center.x {
            -1.0
        } else {
            1.0
        };
        Some(Separation {
            axis: Axis::Horizontal,
            first_delta: Vec2::new(direction * overlap_x * first_share, 0.0),
            second_delta: Vec2::new(-direction * overlap_x * second_share, 0.0),
            first_landed: false,
            second_landed: false,
        })
    }
}

pub(crate) fn respond(body: &mut Body, axis: Axis, delta: Vec2, landed: bool) {
    if delta == Vec2::ZERO {
        return;
    }
    match axis {
        Axis::Vertical => {
            let moving_into = (delta.y < 0.0 && body.velocity.y > 0.0)
                || (delta.y > 0.0 && body.velocity.y < 0.0);
            if moving_into {
                body.velocity.y = rebound(body.velocity.y, body.bounce);
            }
            if landed {
                body.touching_down = true;
            }
        }
        Axis::Horizontal => {
            let moving_into = (delta.x < 0.0 && body.velocity.x > 0.0)
                || (delta.x > 0.0 && body.velocity.x < 0.0);
            if moving_into {
                body.velocity.x = -body.velocity.x * body.bounce;
            }
        }
    }
}

fn rebound(velocity: f32, bounce: f32) -> f32 {
    let next = -velocity * bounce;
    if next.abs() < REST_SPEED {
        0.0
    } else {
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct YoyoTween {
    from_y: f32,
    to_y: f32,
    duration: f32,
    elapsed: f32,
    forward: bool,
}

impl YoyoTween {
    pub(crate) fn new(from_y: f32, to_y: f32, duration_ms: u32) -> Self {
        Self {
            from_y,
            to_y,
            duration: (duration_ms as f32 / 1000.0).max(f32::EPSILON),
            elapsed: 0.0,
            forward: true,
        }
    }

    pub(crate) fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt.max(0.0);
        while self.elapsed >= self.duration {
            self.elapsed -= self.duration;
            self.forward = !self.forward;
        }
        let t = self.elapsed / self.duration;
        let eased = 0.5 - 0.5 * (PI * t).cos();
        let (start, end) = if self.forward {
            (self.from_y, self.to_y)
        } else {
            (self.to_y, self.from_y)
        };
        start + (end - start) * eased
    }
}
