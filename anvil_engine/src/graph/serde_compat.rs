use glam::{Vec2, Vec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// The graph file and the generation service spell vectors out as objects
// with named components, unlike glam's own serde impls (plain arrays).
// The derived `Deserialize` impls still accept the array form.

#[derive(Serialize, Deserialize)]
struct Xy {
    x: f32,
    y: f32,
}

#[derive(Serialize, Deserialize)]
struct Xyz {
    x: f32,
    y: f32,
    z: f32,
}

impl From<Vec3> for Xyz {
    fn from(v: Vec3) -> Self {
        Xyz {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Xyz> for Vec3 {
    fn from(Xyz { x, y, z }: Xyz) -> Self {
        Vec3::new(x, y, z)
    }
}

/// `#[serde(with = "vec2_xy")]` for `Vec2` fields
pub mod vec2_xy {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Vec2, ser: S) -> Result<S::Ok, S::Error> {
        Xy { x: v.x, y: v.y }.serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec2, D::Error> {
        let Xy { x, y } = Xy::deserialize(de)?;
        Ok(Vec2::new(x, y))
    }
}

/// `#[serde(with = "vec3_xyz")]` for `Vec3` fields
pub mod vec3_xyz {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Vec3, ser: S) -> Result<S::Ok, S::Error> {
        Xyz::from(*v).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec3, D::Error> {
        Xyz::deserialize(de).map(Vec3::from)
    }
}

/// `#[serde(with = "vec3_xyz_seq")]` for `Vec<Vec3>` fields
pub mod vec3_xyz_seq {
    use super::*;

    pub fn serialize<S: Serializer>(v: &[Vec3], ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_seq(v.iter().map(|v| Xyz::from(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Vec3>, D::Error> {
        let points = Vec::<Xyz>::deserialize(de)?;
        Ok(points.into_iter().map(Vec3::from).collect())
    }
}
