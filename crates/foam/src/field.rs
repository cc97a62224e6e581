//! Cell-centred scalar fields
//!
//! Only uniform construction is supported: every cell and every boundary
//! patch starts at the same value, and each patch carries one of the known
//! boundary condition types.

use crate::dimensions::{DimensionSet, DimensionedScalar};
use crate::error::{fatal, FoamError, Result};
use crate::mesh::{IoObject, Mesh, ReadOption};
use crate::reduce::{g_max, g_min};
use serpar_comm::Communicator;
use std::fmt;
use std::str::FromStr;

/// Boundary condition type of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchType {
    /// Value computed from the interior
    Calculated,
    /// Value copied from the adjacent cell
    ZeroGradient,
    /// Value fixed on the patch
    FixedValue,
}

impl PatchType {
    /// Dictionary name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchType::Calculated => "calculated",
            PatchType::ZeroGradient => "zeroGradient",
            PatchType::FixedValue => "fixedValue",
        }
    }
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchType {
    type Err = FoamError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "calculated" => Ok(PatchType::Calculated),
            "zeroGradient" => Ok(PatchType::ZeroGradient),
            "fixedValue" => Ok(PatchType::FixedValue),
            other => Err(FoamError::UnknownPatchType(other.to_string())),
        }
    }
}

/// One boundary patch of a field
#[derive(Debug, Clone, PartialEq)]
pub struct PatchField {
    /// Patch name
    pub name: String,
    /// Boundary condition type
    pub kind: PatchType,
    /// Patch value
    pub value: f64,
}

/// Scalar field over the cells of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct VolScalarField {
    name: String,
    instance: String,
    dimensions: DimensionSet,
    internal: Vec<f64>,
    boundary: Vec<PatchField>,
}

impl VolScalarField {
    /// Field with `init` in every cell and on every patch, all patches of
    /// type `boundary_type`.
    ///
    /// # Errors
    ///
    /// Fatal error if `boundary_type` is unknown, or `io` asks for the field
    /// to be read (uniform fields are never read from disk).
    pub fn uniform(
        io: &IoObject,
        mesh: &Mesh,
        init: &DimensionedScalar,
        boundary_type: &str,
    ) -> Result<Self> {
        if io.read == ReadOption::MustRead {
            return Err(fatal(FoamError::InvalidArgument(format!(
                "uniform field {:?} cannot be read from disk",
                io.name
            ))));
        }
        let kind: PatchType = boundary_type.parse().map_err(fatal)?;
        let n_cells = usize::try_from(mesh.n_cells()).map_err(|_| {
            fatal(FoamError::InvalidArgument(format!(
                "mesh of {} cells does not fit in memory",
                mesh.n_cells()
            )))
        })?;
        let boundary = mesh
            .patches()
            .iter()
            .map(|name| PatchField {
                name: name.clone(),
                kind,
                value: init.value,
            })
            .collect();
        Ok(Self {
            name: io.name.clone(),
            instance: io.instance.clone(),
            dimensions: init.dimensions,
            internal: vec![init.value; n_cells],
            boundary,
        })
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time name the field belongs to
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Dimensions of the values
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// Cell values
    pub fn internal_field(&self) -> &[f64] {
        &self.internal
    }

    /// Cell values, mutable
    pub fn internal_field_mut(&mut self) -> &mut [f64] {
        &mut self.internal
    }

    /// Boundary patches
    pub fn boundary_field(&self) -> &[PatchField] {
        &self.boundary
    }

    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.internal
            .iter()
            .copied()
            .chain(self.boundary.iter().map(|p| p.value))
    }

    /// Largest local value; `-inf` for an empty field
    pub fn local_max(&self) -> f64 {
        self.values().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest local value; `+inf` for an empty field
    pub fn local_min(&self) -> f64 {
        self.values().fold(f64::INFINITY, f64::min)
    }

    /// Largest value across the process group. Collective.
    pub fn g_max(&self, comm: &dyn Communicator) -> Result<f64> {
        g_max(comm, self.local_max())
    }

    /// Smallest value across the process group. Collective.
    pub fn g_min(&self, comm: &dyn Communicator) -> Result<f64> {
        g_min(comm, self.local_min())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::DIM_VOLUME;
    use crate::error::{set_fatal_policy, FatalErrorPolicy};
    use crate::mesh::DEFAULT_REGION;
    use crate::time::{Time, TimeConfig};
    use serpar_comm::SerialComm;
    use std::fs;
    use tempfile::TempDir;

    fn mesh_of(content: &str) -> (TempDir, Mesh) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("system")).unwrap();
        fs::write(dir.path().join("system/controlDict"), "").unwrap();
        fs::create_dir_all(dir.path().join("constant/polyMesh")).unwrap();
        fs::write(dir.path().join("constant/polyMesh/cells"), content).unwrap();
        let time = Time::new(TimeConfig::new(dir.path(), "")).unwrap();
        let mesh = Mesh::read(&IoObject::mesh(DEFAULT_REGION, &time), &time).unwrap();
        (dir, mesh)
    }

    fn field_io() -> IoObject {
        IoObject::new("vf", "0", ReadOption::NoRead)
    }

    #[test]
    fn test_uniform_field() {
        let (_dir, mesh) = mesh_of("nCells = 4\npatches = [\"inlet\", \"outlet\"]\n");
        let init = DimensionedScalar::new("vf", DIM_VOLUME, 2.0);
        let field = VolScalarField::uniform(&field_io(), &mesh, &init, "zeroGradient").unwrap();

        assert_eq!(field.name(), "vf");
        assert_eq!(field.instance(), "0");
        assert_eq!(field.dimensions(), DIM_VOLUME);
        assert_eq!(field.internal_field(), &[2.0; 4]);
        assert_eq!(field.boundary_field().len(), 2);
        assert!(field
            .boundary_field()
            .iter()
            .all(|p| p.kind == PatchType::ZeroGradient));
        assert_eq!(field.g_max(&SerialComm).unwrap(), 2.0);
        assert_eq!(field.g_min(&SerialComm).unwrap(), 2.0);
    }

    #[test]
    fn test_local_extremes_follow_edits() {
        let (_dir, mesh) = mesh_of("nCells = 3\n");
        let init = DimensionedScalar::new("vf", DIM_VOLUME, 1.0);
        let mut field = VolScalarField::uniform(&field_io(), &mesh, &init, "calculated").unwrap();
        field.internal_field_mut()[1] = 5.0;
        field.internal_field_mut()[2] = -1.0;
        assert_eq!(field.local_max(), 5.0);
        assert_eq!(field.local_min(), -1.0);
    }

    #[test]
    fn test_empty_field_extremes() {
        let (_dir, mesh) = mesh_of("nCells = 0\n");
        let init = DimensionedScalar::new("vf", DIM_VOLUME, 1.0);
        let field = VolScalarField::uniform(&field_io(), &mesh, &init, "fixedValue").unwrap();
        assert_eq!(field.local_max(), f64::NEG_INFINITY);
        assert_eq!(field.local_min(), f64::INFINITY);
    }

    #[test]
    fn test_unknown_boundary_type_is_fatal() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        let (_dir, mesh) = mesh_of("nCells = 1\n");
        let init = DimensionedScalar::new("vf", DIM_VOLUME, 1.0);
        let err = VolScalarField::uniform(&field_io(), &mesh, &init, "slip").unwrap_err();
        assert!(matches!(err, FoamError::UnknownPatchType(ref t) if t == "slip"));
    }

    #[test]
    fn test_must_read_is_rejected() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        let (_dir, mesh) = mesh_of("nCells = 1\n");
        let init = DimensionedScalar::new("vf", DIM_VOLUME, 1.0);
        let io = IoObject::new("vf", "0", ReadOption::MustRead);
        assert!(VolScalarField::uniform(&io, &mesh, &init, "calculated").is_err());
    }

    #[test]
    fn test_patch_type_names() {
        for kind in [PatchType::Calculated, PatchType::ZeroGradient, PatchType::FixedValue] {
            assert_eq!(kind.to_string().parse::<PatchType>().unwrap(), kind);
        }
    }
}
