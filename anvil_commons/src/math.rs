// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use glam::{Vec2, Vec3};

/// Default tolerance used when comparing positions that went through a
/// text serialization round trip.
pub const EPSILON: f32 = 1e-4;

/// The editor canvas has its Y axis pointing down, while graph space (the
/// space of the persisted file and of the generation service) has it
/// pointing up. Graph space is also relative to an origin, typically the
/// canvas position of the first island.
pub trait CanvasSpace {
    fn to_graph_space(self, origin: Vec2) -> Vec2;
    fn to_canvas_space(self, origin: Vec2) -> Vec2;
}

impl CanvasSpace for Vec2 {
    fn to_graph_space(self, origin: Vec2) -> Vec2 {
        Vec2::new(self.x - origin.x, -(self.y - origin.y))
    }

    fn to_canvas_space(self, origin: Vec2) -> Vec2 {
        Vec2::new(self.x + origin.x, origin.y - self.y)
    }
}

pub fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
    (a + b) * 0.5
}

/// An axis-aligned rectangle in canvas space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Rect {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        midpoint(self.min, self.max)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

pub trait ApproxEq {
    fn approx_eq(&self, other: &Self, eps: f32) -> bool;
}

impl ApproxEq for f32 {
    fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        (self - other).abs() <= eps
    }
}

impl ApproxEq for Vec2 {
    fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.abs_diff_eq(*other, eps)
    }
}

impl ApproxEq for Vec3 {
    fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.abs_diff_eq(*other, eps)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn y_axis_is_inverted_once_each_way() {
        let origin = Vec2::new(0.0, 10.0);
        let canvas = Vec2::new(0.0, 50.0);
        let graph = canvas.to_graph_space(origin);
        assert_eq!(graph, Vec2::new(0.0, -40.0));
        assert_eq!(graph.to_canvas_space(origin), canvas);
    }

    #[test]
    fn rect_contains() {
        let r = Rect::from_center_size(Vec2::new(10.0, 10.0), Vec2::new(4.0, 2.0));
        assert!(r.contains(Vec2::new(12.0, 11.0)));
        assert!(!r.contains(Vec2::new(12.5, 10.0)));
        assert_eq!(r.center(), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn approx() {
        assert!(1.0f32.approx_eq(&1.00001, EPSILON));
        assert!(!Vec2::ZERO.approx_eq(&Vec2::new(0.0, 0.1), EPSILON));
    }
}
