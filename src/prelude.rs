pub use anyhow::{anyhow, bail, Context, Result};

pub use glam::{Vec2, Vec3};
pub use itertools::Itertools;

pub use anvil_commons::math::*;
pub use anvil_commons::utils::*;
