//! Assertion macros
//!
//! All macros take the [`TestContext`](crate::TestContext) first. `require!`
//! and `require_eq!` use `?` and must be called inside a function returning
//! `anyhow::Result`.

/// Assert a condition; a failure ends the current pass of the test body.
///
/// ```ignore
/// require!(ctx, mesh.n_cells() < g_n_cells);
/// ```
#[macro_export]
macro_rules! require {
    ($ctx:expr, $cond:expr $(,)?) => {{
        let passed: bool = $cond;
        $ctx.require(stringify!($cond), passed)?
    }};
}

/// Assert two values are equal, reporting both on failure.
#[macro_export]
macro_rules! require_eq {
    ($ctx:expr, $left:expr, $right:expr $(,)?) => {{
        let (left, right) = (&$left, &$right);
        $ctx.require_eq(
            concat!(stringify!($left), " == ", stringify!($right)),
            left,
            right,
        )?
    }};
}

/// Check a condition; a failure is reported and the body continues.
/// Evaluates to whether the condition held.
#[macro_export]
macro_rules! check {
    ($ctx:expr, $cond:expr $(,)?) => {{
        let passed: bool = $cond;
        $ctx.check(stringify!($cond), passed)
    }};
}

/// Check two values are equal; a failure is reported and the body
/// continues.
#[macro_export]
macro_rules! check_eq {
    ($ctx:expr, $left:expr, $right:expr $(,)?) => {{
        let (left, right) = (&$left, &$right);
        $ctx.check_eq(
            concat!(stringify!($left), " == ", stringify!($right)),
            left,
            right,
        )
    }};
}

/// Capture values to show with every later assertion result in the
/// enclosing section.
///
/// ```ignore
/// capture!(ctx, mesh.n_cells(), g_n_cells, is_parallel());
/// ```
#[macro_export]
macro_rules! capture {
    ($ctx:expr, $($value:expr),+ $(,)?) => {{
        $(
            let rendered = format!("{:?}", $value);
            $ctx.capture_rendered(stringify!($value), rendered);
        )+
    }};
}

#[cfg(test)]
mod tests {
    use crate::context::TestContext;
    use serpar_core::TagSet;

    fn body(ctx: &mut TestContext) -> anyhow::Result<()> {
        let n = 3;
        capture!(ctx, n, ctx.test_name());
        check!(ctx, n > 1);
        check_eq!(ctx, n, 3);
        require_eq!(ctx, n * 2, 6);
        require!(ctx, n < 2);
        check!(ctx, unreachable_after_require());
        Ok(())
    }

    fn unreachable_after_require() -> bool {
        panic!("require! did not stop the body")
    }

    #[test]
    fn test_macros_record_and_stop() {
        let mut ctx = TestContext::new("macros", TagSet::new());
        ctx.start_pass();
        let outcome = body(&mut ctx);
        assert!(outcome.is_err());
        ctx.finish_pass(outcome);

        let results = ctx.take_results();
        let names: Vec<_> = results.iter().map(|r| r.macro_name).collect();
        assert_eq!(names, vec!["CHECK", "CHECK_EQ", "REQUIRE_EQ", "REQUIRE"]);
        assert_eq!(results[0].expression, "n > 1");
        assert_eq!(results[2].expression, "n * 2 == 6");
        assert!(!results[3].passed);
        assert_eq!(results[3].captures[0].name, "n");
        assert_eq!(results[3].captures[0].value, "3");
        assert_eq!(results[3].captures[1].value, "\"macros\"");
    }
}
