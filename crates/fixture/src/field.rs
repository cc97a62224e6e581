//! Uniform volume fields on a loaded mesh

use crate::error::Result;
use serpar_foam::{
    DimensionSet, DimensionedScalar, IoObject, Mesh, ReadOption, Time, VolScalarField,
    WriteOption,
};

/// Create field `name` at the current time of `time`, holding `value` in
/// every cell and on every patch. Patches get `boundary` as their type.
///
/// # Errors
///
/// Fails if `boundary` is not a known patch field type.
pub fn create_field(
    name: &str,
    time: &Time,
    mesh: &Mesh,
    dimensions: DimensionSet,
    value: f64,
    boundary: &str,
) -> Result<VolScalarField> {
    let io = IoObject {
        write: WriteOption::AutoWrite,
        ..IoObject::new(name, time.time_name(), ReadOption::NoRead)
    };
    let init = DimensionedScalar::new(name, dimensions, value);
    Ok(VolScalarField::uniform(&io, mesh, &init, boundary)?)
}
