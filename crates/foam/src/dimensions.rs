//! Physical dimensions of field values

use std::fmt;

/// Exponents of the seven base dimensions:
/// mass, length, time, temperature, moles, current, luminous intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DimensionSet([i8; 7]);

impl DimensionSet {
    /// Build from explicit exponents
    pub const fn new(exponents: [i8; 7]) -> Self {
        Self(exponents)
    }

    /// Exponents in base-dimension order
    pub fn exponents(&self) -> [i8; 7] {
        self.0
    }

    /// Whether all exponents are zero
    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|e| *e == 0)
    }
}

impl fmt::Display for DimensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(i8::to_string).collect();
        write!(f, "[{}]", parts.join(" "))
    }
}

/// No dimensions
pub const DIM_LESS: DimensionSet = DimensionSet::new([0, 0, 0, 0, 0, 0, 0]);
/// Length
pub const DIM_LENGTH: DimensionSet = DimensionSet::new([0, 1, 0, 0, 0, 0, 0]);
/// Length cubed
pub const DIM_VOLUME: DimensionSet = DimensionSet::new([0, 3, 0, 0, 0, 0, 0]);
/// Time
pub const DIM_TIME: DimensionSet = DimensionSet::new([0, 0, 1, 0, 0, 0, 0]);
/// Pressure divided by density, as used by incompressible solvers
pub const DIM_KINEMATIC_PRESSURE: DimensionSet = DimensionSet::new([0, 2, -2, 0, 0, 0, 0]);

/// A named scalar with dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionedScalar {
    /// Name of the value
    pub name: String,
    /// Dimensions of the value
    pub dimensions: DimensionSet,
    /// The value
    pub value: f64,
}

impl DimensionedScalar {
    /// Create a named dimensioned scalar
    pub fn new(name: impl Into<String>, dimensions: DimensionSet, value: f64) -> Self {
        Self {
            name: name.into(),
            dimensions,
            value,
        }
    }
}

impl fmt::Display for DimensionedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.dimensions, self.value)
    }
}
