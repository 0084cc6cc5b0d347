//! Common ECS components

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Transform component for position and orientation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
}

impl Transform {
    /// Create a new transform at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Create a transform at `position` whose nose points along `heading`
    pub fn facing(position: Vec3, heading: Vec3) -> Self {
        Self {
            position,
            rotation: look_rotation(heading, Vec3::Y),
        }
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Get the right direction (positive X in local space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y in local space)
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Rotation whose forward (-Z) axis points along `forward`, keeping local up
/// as close to `up_hint` as possible.
pub fn look_rotation(forward: Vec3, up_hint: Vec3) -> Quat {
    let forward = forward.normalize_or(Vec3::NEG_Z);
    let right = forward.cross(up_hint);
    let right = if right.length_squared() < 1e-8 {
        forward.any_orthonormal_vector()
    } else {
        right.normalize()
    };
    let up = right.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize()
}

/// Velocity component. Entities without one have no simulated body.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    pub fn linear(linear: Vec3) -> Self {
        Self {
            linear,
            angular: Vec3::ZERO,
        }
    }
}

/// Name component for debugging
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Side an entity fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Blue,
    Red,
    Neutral,
}

impl Faction {
    /// Whether `self` treats `other` as an enemy.
    ///
    /// Blue and Red are mutually hostile. Neutral is hostile to nobody and
    /// nobody is hostile to Neutral.
    #[must_use]
    pub fn is_hostile_to(self, other: Faction) -> bool {
        matches!(
            (self, other),
            (Faction::Blue, Faction::Red) | (Faction::Red, Faction::Blue)
        )
    }
}

/// Broad category of a simulated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Aircraft,
    GroundUnit,
    Projectile,
}

/// Faction and kind, replacing string tags for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allegiance {
    pub faction: Faction,
    pub kind: EntityKind,
}

impl Allegiance {
    #[must_use]
    pub fn aircraft(faction: Faction) -> Self {
        Self {
            faction,
            kind: EntityKind::Aircraft,
        }
    }

    /// Whether an entity with this allegiance may be engaged by `observer`.
    #[must_use]
    pub fn is_target_for(&self, observer: Faction) -> bool {
        self.kind != EntityKind::Projectile && observer.is_hostile_to(self.faction)
    }
}
