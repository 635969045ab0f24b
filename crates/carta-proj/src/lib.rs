//! Projection geometry: integer points, quarter-turn rotations, and the
//! four map projections.
#![forbid(unsafe_code)]

/// Voxels per chunk along the x axis.
pub const MAP_X: i64 = 16;
/// Voxels per chunk along the y axis.
pub const MAP_Y: i64 = 128;
/// Voxels per chunk along the z axis.
pub const MAP_Z: i64 = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point3 {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Point3 {
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// Ordered lexicographically on x then y so it can key a `BTreeMap`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point2 {
    pub x: i64,
    pub y: i64,
}

impl Point2 {
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Top,
    Oblique,
    ObliqueAngle,
    Isometric,
}

/// Clockwise quarter-turn rotation of the world around the vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Parse a degree count. Accepts any multiple of 90, normalized mod 360.
    pub fn from_degrees(deg: i32) -> Option<Rotation> {
        let d = deg.rem_euclid(360);
        match d {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }

    /// Rotate a block-space (x, z) pair. The `MAP_X - 1` offsets keep chunk
    /// cells aligned on chunk cells, so four applications are the identity.
    #[inline]
    pub fn apply_block(self, x: i64, z: i64) -> (i64, i64) {
        match self {
            Rotation::R0 => (x, z),
            Rotation::R90 => (z, MAP_X - 1 - x),
            Rotation::R180 => (MAP_X - 1 - x, MAP_Z - 1 - z),
            Rotation::R270 => (MAP_Z - 1 - z, x),
        }
    }

    /// Rotate a chunk-space (cx, cz) pair; the chunk-cell image of
    /// [`Rotation::apply_block`].
    #[inline]
    pub fn apply_chunk(self, cx: i64, cz: i64) -> (i64, i64) {
        match self {
            Rotation::R0 => (cx, cz),
            Rotation::R90 => (cz, -cx),
            Rotation::R180 => (-cx, -cz),
            Rotation::R270 => (-cz, cx),
        }
    }

    /// Rotate coordinates local to one chunk, in `[0, MAP_X) x [0, MAP_Z)`.
    #[inline]
    pub fn apply_local(self, x: i64, z: i64) -> (i64, i64) {
        let (rx, rz) = self.apply_block(x, z);
        (rx.rem_euclid(MAP_X), rz.rem_euclid(MAP_Z))
    }
}

/// A voxel box. Projects 3D positions inside the box to 2D image
/// coordinates and answers the canvas size for each [`Mode`].
#[derive(Clone, Copy, Debug)]
pub struct Cube {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Cube {
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Canvas (width, height) for the given projection mode.
    pub fn dimensions(&self, mode: Mode) -> (i64, i64) {
        match mode {
            Mode::Top => (self.x, self.z),
            Mode::Oblique => (self.x, self.y + self.z),
            Mode::ObliqueAngle => (self.x + self.z, self.x + self.y + self.z),
            Mode::Isometric => (2 * (self.x + self.z), self.x + self.z + 2 * self.y),
        }
    }

    /// Project a position to image coordinates. Returns `None` when a
    /// projected component is negative; callers skip the operation.
    pub fn project(&self, mode: Mode, p: Point3) -> Option<Point2> {
        let (x, y) = match mode {
            Mode::Top => (p.x, p.z),
            Mode::Oblique => (p.x, (self.y - p.y) + p.z),
            Mode::ObliqueAngle => (p.x + p.z, (self.x - p.x) + (self.y - p.y) + p.z),
            Mode::Isometric => (
                2 * (p.x + p.z),
                (self.x - p.x) + (self.z - p.z) + 2 * (self.y - p.y),
            ),
        };
        if x < 0 || y < 0 {
            return None;
        }
        Some(Point2::new(x, y))
    }
}
