//! Finite-volume mesh, read from a case's constant directory
//!
//! The mesh file is `constant[/<region>]/polyMesh/cells` below the case path
//! of the owning [`Time`]. In a decomposed case every processor directory has
//! its own, holding that processor's share of the cells:
//!
//! ```toml
//! nCells = 200
//! patches = ["movingWall", "fixedWalls", "frontAndBack"]
//! ```

use crate::error::{fatal, FoamError, Result};
use crate::time::Time;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the default mesh region. Its files live directly below
/// `constant/` rather than in a region subdirectory.
pub const DEFAULT_REGION: &str = "region0";

/// Directory holding the mesh description
pub const MESH_SUBDIR: &str = "polyMesh";

/// Name of the mesh description file
pub const CELLS_FILE: &str = "cells";

/// Whether an object is read from disk on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadOption {
    /// The file must exist; a missing file is fatal
    #[default]
    MustRead,
    /// Read the file if it exists, else start empty
    ReadIfPresent,
    /// Never read
    NoRead,
}

/// Whether an object is written back to disk. Nothing in this crate writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteOption {
    /// Write when the time object writes
    AutoWrite,
    /// Never write
    #[default]
    NoWrite,
}

/// Name, instance and I/O behavior of a framework object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoObject {
    /// Object name; for a mesh, the region name
    pub name: String,
    /// Directory below the case the object lives in, e.g. `constant` or a
    /// time name
    pub instance: String,
    /// Read behavior
    pub read: ReadOption,
    /// Write behavior
    pub write: WriteOption,
}

impl IoObject {
    /// Describe an object
    pub fn new(name: impl Into<String>, instance: impl Into<String>, read: ReadOption) -> Self {
        Self {
            name: name.into(),
            instance: instance.into(),
            read,
            write: WriteOption::NoWrite,
        }
    }

    /// Mesh region `region` of `time`'s case, which must exist on disk.
    pub fn mesh(region: impl Into<String>, time: &Time) -> Self {
        Self::new(region, time.constant(), ReadOption::MustRead)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellsDict {
    n_cells: u64,
    #[serde(default)]
    patches: Vec<String>,
}

/// A mesh: the local cell count and boundary patches of one case (or one
/// processor's share of a decomposed case).
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    region: String,
    case_path: PathBuf,
    n_cells: u64,
    patches: Vec<String>,
}

impl Mesh {
    /// Read a mesh region of `time`'s current case.
    ///
    /// The case is resolved from `time` at call time, so a time object whose
    /// case name was redirected to a processor directory reads that
    /// processor's share.
    ///
    /// # Errors
    ///
    /// Fatal error if the mesh must be read and its file is missing or
    /// malformed.
    pub fn read(io: &IoObject, time: &Time) -> Result<Self> {
        let path = cells_path(io, time);
        let case_path = time.path();
        let dict = match io.read {
            ReadOption::NoRead => {
                return Err(fatal(FoamError::InvalidArgument(format!(
                    "mesh region {:?} cannot be constructed without reading",
                    io.name
                ))))
            }
            ReadOption::ReadIfPresent if !path.exists() => CellsDict {
                n_cells: 0,
                patches: Vec::new(),
            },
            ReadOption::MustRead | ReadOption::ReadIfPresent => read_cells(&path)?,
        };
        debug!(
            target: "serpar::foam",
            region = %io.name,
            case = %case_path.display(),
            n_cells = dict.n_cells,
            "Mesh read"
        );
        Ok(Self {
            region: io.name.clone(),
            case_path,
            n_cells: dict.n_cells,
            patches: dict.patches,
        })
    }

    /// Number of cells local to this process
    pub fn n_cells(&self) -> u64 {
        self.n_cells
    }

    /// Region name
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Boundary patch names
    pub fn patches(&self) -> &[String] {
        &self.patches
    }

    /// Case the mesh was read from
    pub fn case_path(&self) -> &Path {
        &self.case_path
    }
}

fn cells_path(io: &IoObject, time: &Time) -> PathBuf {
    let mut dir = time.path().join(&io.instance);
    if io.name != DEFAULT_REGION {
        dir.push(&io.name);
    }
    dir.join(MESH_SUBDIR).join(CELLS_FILE)
}

fn read_cells(path: &Path) -> Result<CellsDict> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            fatal(FoamError::FileNotFound(path.to_path_buf()))
        } else {
            fatal(FoamError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    })?;
    toml::from_str(&content).map_err(|e| {
        fatal(FoamError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })
}
