use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type FixedType = fixed::types::I32F32;

/// Unit is a board coordinate or length. Fixed point rather than floating point so that "flush with an edge" is an
/// exact equality and sums of half-unit centers never drift.
#[derive(Copy, Clone, Default)]
#[repr(transparent)]
pub struct Unit(pub FixedType);

impl Unit {
    pub fn from_f64(v: f64) -> Option<Unit> {
        FixedType::checked_from_num(v).map(Unit)
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_num::<f64>()
    }

    pub fn abs(self) -> Unit {
        Unit(self.0.abs())
    }

    pub fn half(self) -> Unit {
        Unit(self.0 / 2)
    }

    /// Saturates at the largest representable value instead of overflowing, so comparisons against a squared limit stay correct.
    pub fn squared(self) -> Unit {
        Unit(self.0.saturating_mul(self.0))
    }

    pub fn saturating_add(self, other: Unit) -> Unit {
        Unit(self.0.saturating_add(other.0))
    }

    /// Rounds to the nearest multiple of `step`. A non-positive step leaves the value alone.
    pub fn snap_to(self, step: Unit) -> Unit {
        if step <= Unit::zero() {
            return self;
        }
        let steps = (self.0 / step.0).round();
        Unit(steps * step.0)
    }

    pub fn is_positive(self) -> bool {
        self.0 > FixedType::ZERO
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Eq for Unit {}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits().eq(&other.0.to_bits())
    }
}

impl Ord for Unit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Unit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i32> for Unit {
    fn from(v: i32) -> Unit {
        Unit(FixedType::from_num(v))
    }
}

impl From<u16> for Unit {
    fn from(v: u16) -> Unit {
        Unit(FixedType::from_num(v))
    }
}

impl Neg for Unit {
    type Output = Unit;

    fn neg(self) -> Self::Output {
        Unit(-self.0)
    }
}

impl Zero for Unit {
    fn zero() -> Self {
        Unit(FixedType::ZERO)
    }

    fn is_zero(&self) -> bool {
        self.0 == FixedType::ZERO
    }
}

impl One for Unit {
    fn one() -> Self {
        Unit(FixedType::ONE)
    }
}

impl Add for Unit {
    type Output = Unit;

    fn add(self, rhs: Unit) -> Unit {
        Unit(self.0 + rhs.0)
    }
}

impl AddAssign for Unit {
    fn add_assign(&mut self, rhs: Unit) {
        self.0 += rhs.0;
    }
}

impl Sub for Unit {
    type Output = Unit;

    fn sub(self, rhs: Unit) -> Unit {
        Unit(self.0 - rhs.0)
    }
}

impl SubAssign for Unit {
    fn sub_assign(&mut self, rhs: Unit) {
        self.0 -= rhs.0;
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        Unit(self.0 * rhs.0)
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        Unit(self.0 / rhs.0)
    }
}

impl Sum for Unit {
    fn sum<I: Iterator<Item = Unit>>(iter: I) -> Unit {
        iter.fold(Unit::zero(), |acc, v| acc + v)
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Unit::from_f64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{} does not fit a board coordinate", value)))
    }
}
