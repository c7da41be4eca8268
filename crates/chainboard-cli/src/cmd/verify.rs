use super::Context;
use crate::output::{CliError, render_mode};
use anyhow::Result;
use chainboard_core::ErrorCode;
use chainboard_core::verify::ChainCheck;
use std::io::{self, Write};

fn write_check(w: &mut dyn Write, check: &ChainCheck) -> io::Result<()> {
    let status = if check.violations.is_empty() { "OK  " } else { "FAIL" };
    writeln!(
        w,
        "{status} {}s in {} {} ({} nodes)",
        check.kind,
        check.kind.container_label(),
        check.container,
        check.length
    )?;
    for violation in &check.violations {
        writeln!(w, "     {violation}")?;
    }
    Ok(())
}

/// Check every chain on the board without repairing anything.
///
/// # Errors
///
/// Returns an `integrity_violation` error when any chain fails.
pub fn run_verify(ctx: &Context) -> Result<()> {
    let board = ctx.open_board()?;
    let report = board.verify()?;

    render_mode(
        ctx.output,
        &report.to_json(),
        |_, w| {
            for check in report.failures() {
                write_check(w, check)?;
            }
            writeln!(w, "verify: {}", if report.is_ok() { "success" } else { "failed" })
        },
        |_, w| {
            for check in &report.chains {
                write_check(w, check)?;
            }
            writeln!(w, "verify: {}", if report.is_ok() { "success" } else { "failed" })
        },
    )?;

    if report.is_ok() {
        Ok(())
    } else {
        let code = ErrorCode::IntegrityViolation;
        Err(CliError::with_details(
            format!("{} chain(s) failed verification", report.failures().count()),
            code.hint().unwrap_or("Inspect the listed chains."),
            code.code(),
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainboard_core::verify::ChainViolation;
    use chainboard_core::{ChainKind, ContainerId};

    #[test]
    fn failing_check_lists_violations() {
        let check = ChainCheck {
            kind: ChainKind::Task,
            container: ContainerId(2),
            length: 3,
            violations: vec![ChainViolation::MissingHead],
        };
        let mut buf = Vec::new();
        write_check(&mut buf, &check).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("FAIL tasks in task state 2 (3 nodes)\n"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn passing_check_is_one_line() {
        let check = ChainCheck {
            kind: ChainKind::TaskState,
            container: ContainerId(1),
            length: 0,
            violations: vec![],
        };
        let mut buf = Vec::new();
        write_check(&mut buf, &check).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "OK   task states in project 1 (0 nodes)\n"
        );
    }
}
