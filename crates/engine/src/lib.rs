//! Test registration, selection and execution for the serpar harness
//!
//! This crate is a small section-based test engine:
//! - TestRegistry: named, tagged test bodies
//! - TestSpec: command-line selection by name pattern and tag
//! - TestContext: sections, generated values, captures and assertions
//! - Session: runs each selected body pass by pass until every section and
//!   generated value has been visited, and reports the results
//!
//! A body is re-entered from the top for every pass, so everything it
//! creates outside of a section is created again on each pass.
//!
//! ```ignore
//! fn mesh_sizes(ctx: &mut TestContext) -> anyhow::Result<()> {
//!     let n = ctx.generate(serpar_core::range(1, 4)?)?;
//!     capture!(ctx, n);
//!     ctx.section("positive", |ctx| {
//!         require!(ctx, n > 0);
//!         Ok(())
//!     })
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

#[macro_use]
mod macros;

pub mod args;
pub mod context;
pub mod error;
pub mod filter;
pub mod registry;
pub mod reporter;
pub mod session;
pub mod tracker;

pub use args::EngineArgs;
pub use context::{AssertionResult, Capture, TestContext};
pub use error::{AssertionFailed, EngineError, Result};
pub use filter::TestSpec;
pub use registry::{TestCase, TestFn, TestRegistry};
pub use reporter::{rank_report_path, CaseReport, Counts, RunReport, RunSummary};
pub use session::{FailurePolicy, Session, SessionConfig};
