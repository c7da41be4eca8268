//! Command handlers and the context they share.

pub mod chain;
pub mod completions;
pub mod history;
pub mod init;
pub mod project;
pub mod show;
pub mod state;
pub mod task;
pub mod verify;

use crate::actor;
use crate::output::{CliError, OutputMode, render};
use anyhow::Result;
use chainboard_core::config::{self, UserConfig};
use chainboard_core::{Actor, Board};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a handler needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub output: OutputMode,
    pub quiet: bool,
    pub actor_flag: Option<String>,
    pub user: UserConfig,
    pub cwd: PathBuf,
}

impl Context {
    /// Directory of the nearest board at or above the working directory.
    ///
    /// # Errors
    ///
    /// Returns a `no_board` error when no `.chainboard/` directory exists.
    pub fn board_root(&self) -> Result<PathBuf> {
        config::find_board_root(&self.cwd).ok_or_else(|| {
            CliError::with_details(
                format!("no board found in {} or any parent", self.cwd.display()),
                "Run `cb init` to create one here.",
                "no_board",
            )
            .into()
        })
    }

    /// Open the board the working directory belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no board, its config is malformed, or
    /// the database cannot be opened.
    pub fn open_board(&self) -> Result<Board> {
        let root = self.board_root()?;
        open_at(&root)
    }

    /// Resolve the actor recorded on history rows.
    ///
    /// # Errors
    ///
    /// Returns a `missing_actor` error when no identity is configured.
    pub fn actor(&self) -> Result<Actor> {
        Ok(actor::require_actor(
            self.actor_flag.as_deref(),
            self.user.actor.as_deref(),
        )?)
    }

    /// Print the result of a mutation. `--quiet` silences it except in JSON
    /// mode, where the value is the command's contract.
    pub fn report<T: Serialize>(
        &self,
        value: &T,
        human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    ) -> Result<()> {
        if self.quiet && !self.output.is_json() {
            return Ok(());
        }
        render(self.output, value, human_fn)
    }
}

/// Open the board rooted at `root` using its project config.
///
/// # Errors
///
/// Returns an error if the config is malformed or the database cannot be
/// opened.
pub fn open_at(root: &Path) -> Result<Board> {
    let cfg = config::load_project_config(root)?;
    let db_path = cfg.store.db_path(root);
    debug!(path = %db_path.display(), "opening board");
    Board::open(&db_path, cfg.store.busy_timeout())
}
