use std::ops::Deref;
use std::sync::Arc;

use num_complex::Complex64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field configuration on the spacetime lattice.
///
/// Values are indexed by `(time slice, site)` through
/// [`crate::Lattice::index`]. A configuration is immutable once produced;
/// clones share storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    data: Arc<[Complex64]>,
}

impl Configuration {
    /// Wraps the given values.
    pub fn from_vec(values: Vec<Complex64>) -> Self {
        Self {
            data: values.into(),
        }
    }

    /// Builds a configuration with vanishing imaginary parts.
    pub fn from_real(values: &[f64]) -> Self {
        Self::from_vec(values.iter().map(|&re| Complex64::new(re, 0.0)).collect())
    }

    /// Builds a configuration of `len` zeros.
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![Complex64::new(0.0, 0.0); len])
    }

    /// Returns the values as a slice.
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Copies the values into a new vector.
    pub fn to_vec(&self) -> Vec<Complex64> {
        self.data.to_vec()
    }

    /// Returns true if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }
}

impl Deref for Configuration {
    type Target = [Complex64];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl From<Vec<Complex64>> for Configuration {
    fn from(values: Vec<Complex64>) -> Self {
        Self::from_vec(values)
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Configuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Complex64>::deserialize(deserializer).map(Self::from_vec)
    }
}

/// Endpoint of one trajectory as produced by an evolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    /// Configuration after the accept/reject step.
    pub phi: Configuration,
    /// Action evaluated at `phi`.
    pub action: Complex64,
    /// `0` if the start point was kept, otherwise the signed number of MD steps
    /// between the start and the accepted point.
    #[serde(rename = "trajPoint")]
    pub traj_point: i64,
}

impl TrajectoryRecord {
    /// Creates a record.
    pub fn new(phi: Configuration, action: Complex64, traj_point: i64) -> Self {
        Self {
            phi,
            action,
            traj_point,
        }
    }

    /// Returns a copy of this record marking the start point as kept.
    pub fn rejected(&self) -> Self {
        Self {
            phi: self.phi.clone(),
            action: self.action,
            traj_point: 0,
        }
    }

    /// Returns true if the trajectory moved away from its start point.
    pub fn accepted(&self) -> bool {
        self.traj_point != 0
    }
}
