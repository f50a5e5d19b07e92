//! Simulated time values.
//!
//! [`Instant`] and [`Duration`] are measured in unit-less simulation time units
//! (the model decides whether a unit is an hour, a day or a year). Both wrap an
//! `f64` and are totally ordered through [`f64::total_cmp`], so they can key
//! ordered maps directly.
//!
//! ```
//! use episim_kernel::util::time::{Duration, Instant};
//!
//! let t = Instant::of(5.0) + Duration::of(2.5);
//! assert_eq!(t, Instant::of(7.5));
//! assert_eq!(t - Instant::of(5.0), Duration::of(2.5));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Maps `-0.0` onto `0.0` so equal points in time compare and hash equal.
fn normalize(units: f64) -> f64 {
    if units == 0.0 {
        0.0
    } else {
        units
    }
}

/// A point in simulated time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Instant(f64);

impl Instant {
    /// The origin of simulated time.
    pub const ZERO: Self = Self(0.0);

    /// Create an instant at `units` time units after the origin.
    #[must_use]
    pub fn of(units: f64) -> Self {
        Self(normalize(units))
    }

    /// Time units since the origin.
    #[must_use]
    pub const fn units(self) -> f64 {
        self.0
    }

    /// Span from `earlier` up to this instant.
    #[must_use]
    pub fn since(self, earlier: Self) -> Duration {
        self - earlier
    }
}

/// A span of simulated time. May be negative when produced by subtraction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Duration(f64);

impl Duration {
    /// The empty span.
    pub const ZERO: Self = Self(0.0);

    /// Create a span of `units` time units.
    #[must_use]
    pub fn of(units: f64) -> Self {
        Self(normalize(units))
    }

    /// Length in time units.
    #[must_use]
    pub const fn units(self) -> f64 {
        self.0
    }

    /// True for spans strictly shorter than zero.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }

    /// True when the span is a finite number of units.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

macro_rules! total_order {
    ($ty:ident) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.cmp(other) == Ordering::Equal
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.to_bits().hash(state);
            }
        }

        impl From<f64> for $ty {
            fn from(units: f64) -> Self {
                Self::of(units)
            }
        }

        impl From<$ty> for f64 {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

total_order!(Instant);
total_order!(Duration);

impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self::of(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<Duration> for Instant {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self {
        Self::of(self.0 - rhs.0)
    }
}

impl Sub for Instant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::of(self.0 - rhs.0)
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::of(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::of(self.0 - rhs.0)
    }
}

impl Neg for Duration {
    type Output = Self;

    fn neg(self) -> Self {
        Self::of(-self.0)
    }
}

impl Mul<f64> for Duration {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::of(self.0 * rhs)
    }
}

impl Div<f64> for Duration {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::of(self.0 / rhs)
    }
}
