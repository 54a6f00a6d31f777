//! Small vector and bounding-box helpers shared by the spatial indices.
//!
//! Positions stay as plain `[f32; 3]` arrays so they can be read straight out
//! of the particle arrays without conversion.

use serde::{Deserialize, Serialize};

pub type Vec3 = [f32; 3];

#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn scale(a: Vec3, s: f32) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn length_sq(a: Vec3) -> f32 {
    a[0] * a[0] + a[1] * a[1] + a[2] * a[2]
}

#[inline]
pub fn length(a: Vec3) -> f32 {
    length_sq(a).sqrt()
}

#[inline]
pub fn distance_sq(a: Vec3, b: Vec3) -> f32 {
    length_sq(sub(a, b))
}

#[inline]
pub fn is_finite(a: Vec3) -> bool {
    a[0].is_finite() && a[1].is_finite() && a[2].is_finite()
}

/// One of the eight children of a subdivided box.
///
/// The discriminant is the 3-bit code used for child slots:
/// bit 0 = x above center, bit 1 = y above center, bit 2 = z above center.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Octant {
    LowLowLow = 0,
    HighLowLow = 1,
    LowHighLow = 2,
    HighHighLow = 3,
    LowLowHigh = 4,
    HighLowHigh = 5,
    LowHighHigh = 6,
    HighHighHigh = 7,
}

impl Octant {
    pub const ALL: [Octant; 8] = [
        Octant::LowLowLow,
        Octant::HighLowLow,
        Octant::LowHighLow,
        Octant::HighHighLow,
        Octant::LowLowHigh,
        Octant::HighLowHigh,
        Octant::LowHighHigh,
        Octant::HighHighHigh,
    ];

    /// Octant of `point` relative to `center`. Points on a splitting plane go
    /// to the low side.
    #[inline]
    pub fn of(point: Vec3, center: Vec3) -> Self {
        let code = (point[0] > center[0]) as usize
            | ((point[1] > center[1]) as usize) << 1
            | ((point[2] > center[2]) as usize) << 2;
        Self::ALL[code]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn high_x(self) -> bool {
        self.index() & 1 != 0
    }

    #[inline]
    pub fn high_y(self) -> bool {
        self.index() & 2 != 0
    }

    #[inline]
    pub fn high_z(self) -> bool {
        self.index() & 4 != 0
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of all finite points. Returns `None` when no point is finite.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for p in points.into_iter().filter(|p| is_finite(*p)) {
            let b = bounds.get_or_insert(Self::new(p, p));
            for axis in 0..3 {
                b.min[axis] = b.min[axis].min(p[axis]);
                b.max[axis] = b.max[axis].max(p[axis]);
            }
        }
        bounds
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    #[inline]
    pub fn extent(&self) -> Vec3 {
        sub(self.max, self.min)
    }

    #[inline]
    pub fn max_extent(&self) -> f32 {
        let e = self.extent();
        e[0].max(e[1]).max(e[2])
    }

    /// Grow every side by `fraction` of the largest extent, plus `minimum` so
    /// a single point still gets a non-degenerate box.
    pub fn padded(&self, fraction: f32, minimum: f32) -> Self {
        let pad = self.max_extent() * fraction + minimum;
        Self::new(
            [self.min[0] - pad, self.min[1] - pad, self.min[2] - pad],
            [self.max[0] + pad, self.max[1] + pad, self.max[2] + pad],
        )
    }

    /// Smallest cube sharing this box's center that contains it
    pub fn cubed(&self) -> Self {
        let c = self.center();
        let h = self.max_extent() * 0.5;
        Self::new([c[0] - h, c[1] - h, c[2] - h], [c[0] + h, c[1] + h, c[2] + h])
    }

    pub fn contains(&self, p: Vec3) -> bool {
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }

    /// Child box for `octant`, split at the geometric center
    pub fn octant_bounds(&self, octant: Octant) -> Self {
        let c = self.center();
        let pick = |high: bool, axis: usize| {
            if high {
                (c[axis], self.max[axis])
            } else {
                (self.min[axis], c[axis])
            }
        };
        let (x0, x1) = pick(octant.high_x(), 0);
        let (y0, y1) = pick(octant.high_y(), 1);
        let (z0, z1) = pick(octant.high_z(), 2);
        Self::new([x0, y0, z0], [x1, y1, z1])
    }
}
