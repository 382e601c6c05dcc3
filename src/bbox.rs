use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_1: f64,
    pub y_1: f64,
    pub x_2: f64,
    pub y_2: f64,
}

impl BBox {
    pub fn new(x_1: f64, y_1: f64, x_2: f64, y_2: f64) -> Self {
        BBox { x_1, y_1, x_2, y_2 }
    }

    /// Finite coordinates with `x_2 >= x_1` and `y_2 >= y_1`.
    ///
    /// Boxes failing this check are skipped by every consumer for the frame they appear in.
    pub fn is_valid(&self) -> bool {
        [self.x_1, self.y_1, self.x_2, self.y_2]
            .iter()
            .all(|v| v.is_finite())
            && self.x_2 >= self.x_1
            && self.y_2 >= self.y_1
    }

    pub fn width(&self) -> f64 {
        (self.x_2 - self.x_1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y_2 - self.y_1).max(0.0)
    }

    pub fn center(&self) -> Vector2<f64> {
        Vector2::new((self.x_1 + self.x_2) / 2.0, (self.y_1 + self.y_2) / 2.0)
    }

    /// Bottom-left and bottom-right corners, i.e. where a player's feet are.
    pub fn bottom_corners(&self) -> [Vector2<f64>; 2] {
        [
            Vector2::new(self.x_1, self.y_2),
            Vector2::new(self.x_2, self.y_2),
        ]
    }

    /// Smallest distance from either bottom corner of `self` to `point`.
    pub fn foot_distance(&self, point: &Vector2<f64>) -> f64 {
        self.bottom_corners()
            .iter()
            .map(|corner| (corner - point).norm())
            .fold(f64::INFINITY, f64::min)
    }

    pub fn iou(&self, other: &Self) -> f64 {
        let iwidth = (self.x_2.min(other.x_2) - self.x_1.max(other.x_1)).max(0.0);
        let iheight = (self.y_2.min(other.y_2) - self.y_1.max(other.y_1)).max(0.0);
        let iarea = iwidth * iheight;

        let union = self.area() + other.area() - iarea;

        if union == 0.0 {
            return 0.0;
        }

        iarea / union
    }

    pub fn area(&self) -> f64 {
        ((self.x_2 - self.x_1) * (self.y_2 - self.y_1)).max(0.0)
    }

    /// Coordinate-wise linear blend, `t = 0` gives `self`, `t = 1` gives `other`.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        BBox::new(
            mix(self.x_1, other.x_1),
            mix(self.y_1, other.y_1),
            mix(self.x_2, other.x_2),
            mix(self.y_2, other.y_2),
        )
    }
}
