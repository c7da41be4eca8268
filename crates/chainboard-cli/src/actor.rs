//! Actor identity resolution for CLI commands.
//!
//! The resolution chain: `--actor` flag > `CHAINBOARD_ACTOR` env > user
//! config `actor` > `USER` env (TTY only). Mutating commands require an
//! actor; read-only commands work without one.

use crate::output::CliError;
use chainboard_core::Actor;
use std::env;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_actor_with(
    cli_flag: Option<&str>,
    configured: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(actor) = cli_flag.filter(|a| !a.trim().is_empty()) {
        return Some(actor.to_string());
    }

    if let Some(val) = env.get("CHAINBOARD_ACTOR") {
        return Some(val);
    }

    if let Some(actor) = configured.filter(|a| !a.trim().is_empty()) {
        return Some(actor.to_string());
    }

    // USER only counts for an interactive session.
    if env.is_tty() {
        return env.get("USER");
    }

    None
}

/// Resolve the actor for a mutating command, or explain how to set one.
///
/// # Errors
///
/// Returns a [`CliError`] with code `missing_actor` when no source yields a
/// name.
pub fn require_actor(cli_flag: Option<&str>, configured: Option<&str>) -> Result<Actor, CliError> {
    let name = resolve_actor_with(cli_flag, configured, &RealEnv).ok_or_else(|| {
        CliError::with_details(
            "actor identity required for this command",
            "Pass --actor, set CHAINBOARD_ACTOR, or add `actor = \"name\"` to the user config.",
            "missing_actor",
        )
    })?;
    Actor::new(name).map_err(|e| CliError::from(&e))
}
