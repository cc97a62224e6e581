//! Write access to the case paths of a [`Time`]
//!
//! `Time` fixes its case name and processor-case flag at construction. A
//! parallel test run constructs one time object for the undecomposed case
//! and then points it at the rank's `processor<N>` directory, which needs
//! write access to those two private fields.

use serpar_core::{steal_member, MemberAccessor, ResourcePathOverride};
use serpar_foam::Time;
use std::path::PathBuf;
use tracing::debug;

/// Leading fields of `Time`, in declaration order.
#[repr(C)]
#[allow(dead_code)]
struct TimeLayout {
    root_path: PathBuf,
    case_name: PathBuf,
    processor_case: bool,
}

steal_member! {
    /// Accessor for the case name of a [`Time`].
    pub unsafe TimeCaseName for Time as TimeLayout => case_name: PathBuf
}

steal_member! {
    /// Accessor for the processor-case flag of a [`Time`].
    pub unsafe TimeProcessorCase for Time as TimeLayout => processor_case: bool
}

/// Point `time` at the case selected by `path_override`.
///
/// Must run before any mesh or field is read through `time`. Applying the
/// same override again changes nothing.
pub fn modify_time_paths(time: &mut Time, path_override: &ResourcePathOverride) {
    *TimeProcessorCase::get_mut(time) = path_override.is_processor_local;
    *TimeCaseName::get_mut(time) = path_override.case_name();
    debug!(
        target: "serpar::fixture",
        case = %time.case_name().display(),
        processor_case = time.processor_case(),
        "Time paths modified"
    );
}
