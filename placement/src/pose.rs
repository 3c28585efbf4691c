use std::fmt::{Display, Formatter};

use math_util::{Rect, Unit};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::board::Axis;

/// Footprint dimensions at rotation zero.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: Unit,
    pub height: Unit,
}

impl Footprint {
    pub fn new<T: Into<Unit>>(width: T, height: T) -> Self {
        Footprint {
            width: width.into(),
            height: height.into(),
        }
    }

    /// Width and height once rotated.
    pub fn oriented(&self, rotation: Rotation) -> (Unit, Unit) {
        match rotation {
            Rotation::R0 => (self.width, self.height),
            Rotation::R90 => (self.height, self.width),
        }
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

/// Quarter turns are all a placement ever needs; 180 and 270 give the same rectangles as 0 and 90.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rotation {
    R0,
    R90,
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::R0
    }
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
        }
    }

    pub fn from_degrees(degrees: u16) -> Option<Rotation> {
        match degrees {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Rotation {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R0,
        }
    }
}

impl Display for Rotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

impl Serialize for Rotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.degrees())
    }
}

impl<'de> Deserialize<'de> for Rotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let degrees = u16::deserialize(deserializer)?;
        Rotation::from_degrees(degrees)
            .ok_or_else(|| serde::de::Error::custom(format!("rotation must be 0 or 90, got {}", degrees)))
    }
}

/// Lower-left corner plus rotation. Combined with a footprint this fixes the occupied rectangle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pose {
    pub x: Unit,
    pub y: Unit,
    pub rotation: Rotation,
}

impl Pose {
    pub fn new<T: Into<Unit>>(x: T, y: T, rotation: Rotation) -> Self {
        Pose {
            x: x.into(),
            y: y.into(),
            rotation,
        }
    }

    pub fn rect(&self, footprint: &Footprint) -> Rect {
        let (width, height) = footprint.oriented(self.rotation);
        Rect::from_origin_size(self.x, self.y, width, height)
    }
}

/// Axis the longer side of a rectangle runs along. None for squares, which have no long axis.
pub fn long_axis(rect: &Rect) -> Option<Axis> {
    if rect.height() > rect.width() {
        Some(Axis::Vertical)
    } else if rect.width() > rect.height() {
        Some(Axis::Horizontal)
    } else {
        None
    }
}

#[cfg(test)]
mod pose_tests {
    use super::*;

    #[test]
    fn rotation_swaps_dimensions() {
        let footprint = Footprint::new(5, 15);
        assert_eq!(footprint.oriented(Rotation::R0), (Unit::from(5), Unit::from(15)));
        assert_eq!(footprint.oriented(Rotation::R90), (Unit::from(15), Unit::from(5)));
    }

    #[test]
    fn pose_rect_uses_rotation() {
        let footprint = Footprint::new(5, 15);
        let rect = Pose::new(0, 10, Rotation::R90).rect(&footprint);
        assert_eq!(rect, Rect::from_origin_size(0.into(), 10.into(), 15.into(), 5.into()));
        assert_eq!(long_axis(&rect), Some(Axis::Horizontal));
        assert_eq!(long_axis(&Pose::new(0, 10, Rotation::R0).rect(&footprint)), Some(Axis::Vertical));
        assert_eq!(long_axis(&Pose::new(0, 0, Rotation::R0).rect(&Footprint::new(5, 5))), None);
    }

    #[test]
    fn rotation_serializes_as_degrees() {
        assert_eq!(serde_json::to_string(&Rotation::R90).unwrap(), "90");
        assert_eq!(serde_json::from_str::<Rotation>("0").unwrap(), Rotation::R0);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }
}
