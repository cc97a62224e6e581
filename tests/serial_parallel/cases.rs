//! Test cases run by every member process.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serpar::foam::DIM_VOLUME;
use serpar::prelude::*;

static TIME: SharedTime = SharedTime::new();
static MESH: FixtureSlot<Mesh> = FixtureSlot::new("mesh");

/// Values the group test's generator handed out, one per pass
static ENUMERATED: Lazy<Mutex<SequenceDigest>> = Lazy::new(|| Mutex::new(SequenceDigest::new()));

/// Name of the test that reads the mesh
pub const MESH_TEST: &str = "Support for serial and parallel runs";
/// Name of the test that only uses collectives
pub const GROUP_TEST: &str = "Group-wide reductions";
/// Name of the test that cross-checks what [`GROUP_TEST`] enumerated
pub const AGREEMENT_TEST: &str = "Generated values agree across ranks";

pub fn registry() -> TestRegistry {
    let mut registry = TestRegistry::new();
    registry
        .register(MESH_TEST, "[Serial][Parallel][Case_cavity]", serial_and_parallel)
        .and_then(|r| r.register(GROUP_TEST, "[Serial][Parallel][nProcs_2]", group_reductions))
        .and_then(|r| {
            r.register(AGREEMENT_TEST, "[Serial][Parallel][nProcs_2]", generated_values_agree)
        })
        .expect("fixed test names and tags");
    registry
}

// One body for both modes. Every rank runs the same passes in the same
// order, so the reductions below line up across the group.
fn serial_and_parallel(ctx: &mut TestContext) -> anyhow::Result<()> {
    let comm = world();
    let guard = CaseGuard::begin(&TIME, &MESH, comm.topology())?;

    ctx.section("Decomposed mesh in parallel runs", |ctx| {
        if comm.is_parallel() {
            let mesh = guard.mesh()?;
            let g_n_cells = return_reduce_sum(&*comm, mesh.n_cells())?;
            capture!(
                ctx,
                mesh.n_cells(),
                g_n_cells,
                comm.is_parallel(),
                guard.time().case_name()
            );
            require!(ctx, mesh.n_cells() < g_n_cells);
        }
        Ok(())
    })?;

    let param = ctx.generate(range(1, 4)?)?;
    capture!(ctx, param);

    ctx.section("Volume field creation", |ctx| {
        let mesh = guard.mesh()?;
        let vf = create_field(
            "vf",
            guard.time(),
            &mesh,
            DIM_VOLUME,
            param as f64,
            "calculated",
        )?;
        require_eq!(ctx, vf.g_max(&*comm)?, param as f64);
        require_eq!(ctx, vf.g_min(&*comm)?, param as f64);
        Ok(())
    })?;

    guard.finish();
    Ok(())
}

fn group_reductions(ctx: &mut TestContext) -> anyhow::Result<()> {
    let comm = world();
    let fit = ensure_group_size(ctx.tags(), &comm.topology());
    if fit != GroupFit::Run {
        capture!(ctx, fit);
        check!(ctx, fit == GroupFit::Run);
        return Ok(());
    }

    let steps = range(0, 5)?;
    let digest = verify_uniform_sequence(&*comm, &steps)?;
    capture!(ctx, digest);

    let size = return_reduce_sum(&*comm, 1)?;
    require_eq!(ctx, size, comm.size() as u64);

    let step = ctx.generate(steps)?;
    ENUMERATED.lock().record(&step);
    let lowest = g_min(&*comm, (step + comm.rank() as i64) as f64)?;
    check_eq!(ctx, lowest, step as f64);
    Ok(())
}

// Runs after GROUP_TEST, so every pass of it has recorded its value.
fn generated_values_agree(ctx: &mut TestContext) -> anyhow::Result<()> {
    let comm = world();
    if ensure_group_size(ctx.tags(), &comm.topology()) != GroupFit::Run {
        return Ok(());
    }
    let digest = ENUMERATED.lock().clone();
    capture!(ctx, digest);
    require_eq!(ctx, digest.count(), 5);
    let shared = verify_uniform_digest(&*comm, &digest)?;
    require_eq!(ctx, shared, range(0, 5)?.digest());
    Ok(())
}
