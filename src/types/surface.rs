//! Collision surface flags.

use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// Bitmask describing how a geometry entry behaves in the level.
///
/// Only [`SurfaceFlags::VISIBLE`] is interpreted by the converter; every other
/// bit marks the entry as collision geometry and is carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceFlags(pub u32);

impl SurfaceFlags {
    pub const NONE: SurfaceFlags = SurfaceFlags(0);
    pub const SOLID: SurfaceFlags = SurfaceFlags(0x1);
    pub const WATER: SurfaceFlags = SurfaceFlags(0x2);
    pub const NO_FRICTION: SurfaceFlags = SurfaceFlags(0x4);
    pub const NO_ACCELERATION: SurfaceFlags = SurfaceFlags(0x8);
    pub const CANNOT_LAND: SurfaceFlags = SurfaceFlags(0x40);
    pub const INCREASED_ACCELERATION: SurfaceFlags = SurfaceFlags(0x80);
    pub const DIGGABLE: SurfaceFlags = SurfaceFlags(0x100);
    pub const UNCLIMBABLE: SurfaceFlags = SurfaceFlags(0x1000);
    pub const HURT: SurfaceFlags = SurfaceFlags(0x10000);
    pub const FOOTPRINTS: SurfaceFlags = SurfaceFlags(0x100000);
    pub const VISIBLE: SurfaceFlags = SurfaceFlags(0x8000_0000);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: SurfaceFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Copy of these flags with `other` cleared.
    pub fn without(self, other: SurfaceFlags) -> SurfaceFlags {
        SurfaceFlags(self.0 & !other.0)
    }

    pub fn is_visible(self) -> bool {
        self.contains(SurfaceFlags::VISIBLE)
    }

    /// True if any bit besides [`SurfaceFlags::VISIBLE`] is set.
    pub fn has_collision(self) -> bool {
        !self.without(SurfaceFlags::VISIBLE).is_empty()
    }
}

impl BitOr for SurfaceFlags {
    type Output = SurfaceFlags;

    fn bitor(self, rhs: SurfaceFlags) -> SurfaceFlags {
        SurfaceFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for SurfaceFlags {
    fn bitor_assign(&mut self, rhs: SurfaceFlags) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_and_collision_bits() {
        let visible = SurfaceFlags::VISIBLE;
        assert!(visible.is_visible());
        assert!(!visible.has_collision());

        let both = SurfaceFlags::VISIBLE | SurfaceFlags::SOLID;
        assert!(both.is_visible());
        assert!(both.has_collision());
        assert_eq!(both.without(SurfaceFlags::VISIBLE), SurfaceFlags::SOLID);

        assert!(!SurfaceFlags::NONE.has_collision());
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&(SurfaceFlags::VISIBLE | SurfaceFlags::WATER)).unwrap();
        assert_eq!(json, "2147483650");
    }
}
