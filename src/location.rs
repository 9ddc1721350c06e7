use serde::*;

/// A point on the horizontal plane. `z` grows towards north, `x` towards east.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct WorldPos {
    pub x: f32,
    pub z: f32,
}

impl WorldPos {
    pub const ORIGIN: WorldPos = WorldPos { x: 0.0, z: 0.0 };

    pub fn new(x: f32, z: f32) -> Self {
        WorldPos { x, z }
    }

    /// Rotate around the origin by a compass yaw (clockwise, degrees).
    pub fn rotated(self, yaw: f32) -> Self {
        let (sin, cos) = yaw.to_radians().sin_cos();
        WorldPos {
            x: self.x * cos + self.z * sin,
            z: -self.x * sin + self.z * cos,
        }
    }

    pub fn distance_to(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn approx_eq(self, other: Self, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.z - other.z).abs() <= tolerance
    }
}

impl std::ops::Add for WorldPos {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        WorldPos {
            x: self.x + other.x,
            z: self.z + other.z,
        }
    }
}

impl std::ops::Sub for WorldPos {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        WorldPos {
            x: self.x - other.x,
            z: self.z - other.z,
        }
    }
}

impl Serialize for WorldPos {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [self.x, self.z].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WorldPos {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        <[f32; 2]>::deserialize(deserializer).map(|[x, z]| WorldPos { x, z })
    }
}

/// World transform of a placed room: translation plus a compass yaw in degrees.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: WorldPos,
    pub yaw: f32,
}

impl Pose {
    pub fn new(position: WorldPos, yaw: f32) -> Self {
        Pose {
            position,
            yaw: normalize_yaw(yaw),
        }
    }

    pub fn identity() -> Self {
        Pose::default()
    }

    pub fn transform_point(&self, local: WorldPos) -> WorldPos {
        self.position + local.rotated(self.yaw)
    }

    pub fn transform_yaw(&self, local_yaw: f32) -> f32 {
        normalize_yaw(self.yaw + local_yaw)
    }

    pub fn rotated_by(&self, delta: f32) -> Pose {
        Pose::new(self.position, self.yaw + delta)
    }

    pub fn translated_by(&self, offset: WorldPos) -> Pose {
        Pose {
            position: self.position + offset,
            yaw: self.yaw,
        }
    }
}

/// Wrap a yaw into `[0, 360)`.
pub fn normalize_yaw(yaw: f32) -> f32 {
    let wrapped = yaw.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed difference `to - from`, wrapped into `(-180, 180]`.
pub fn normalized_delta(from: f32, to: f32) -> f32 {
    let mut delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}
