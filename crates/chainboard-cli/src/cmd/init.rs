use super::{Context, open_at};
use crate::output::CliError;
use anyhow::{Context as _, Result};
use chainboard_core::config::{self, BOARD_DIR, ProjectConfig, StoreConfig};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.chainboard/config.toml`.
    #[arg(long)]
    pub force: bool,

    /// Database file, relative to the board root unless absolute.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// How long a writer waits for the database lock, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub busy_timeout_ms: Option<u64>,
}

const GITIGNORE: &str = "*.db\n*.db-wal\n*.db-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    ok: bool,
    root: PathBuf,
    config: PathBuf,
    database: PathBuf,
}

/// Execute `cb init`. Creates the board skeleton in the working directory:
///
/// ```text
/// .chainboard/
///   config.toml   ([store] path and busy timeout)
///   .gitignore    (database files)
///   board.db      (created and migrated)
/// ```
///
/// # Errors
///
/// Returns an error if a board already exists and `--force` is not set, or
/// if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, ctx: &Context) -> Result<()> {
    let root = ctx.cwd.clone();
    let config_path = config::project_config_path(&root);

    if config_path.exists() && !args.force {
        return Err(CliError::with_details(
            format!("{BOARD_DIR}/ already exists in {}", root.display()),
            "Use `cb init --force` to rewrite the config; the database is kept.",
            "already_initialized",
        )
        .into());
    }

    let defaults = StoreConfig::default();
    let cfg = ProjectConfig {
        store: StoreConfig {
            path: args.db.clone().unwrap_or(defaults.path),
            busy_timeout_ms: args.busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
        },
    };
    let config_path = config::write_project_config(&root, &cfg)?;

    let gitignore_path = root.join(BOARD_DIR).join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write {}", gitignore_path.display()))?;

    // Opening runs the migrations, so the database exists after init.
    open_at(&root)?;
    let database = cfg.store.db_path(&root);
    info!(root = %root.display(), database = %database.display(), "initialized board");

    let report = InitReport {
        ok: true,
        root,
        config: config_path,
        database,
    };
    ctx.report(&report, |r, w| {
        writeln!(w, "✓ Initialized {BOARD_DIR}/ in {}", r.root.display())?;
        writeln!(w)?;
        writeln!(w, "  Config:   {}", r.config.display())?;
        writeln!(w, "  Database: {}", r.database.display())?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  export CHAINBOARD_ACTOR=your-name")?;
        writeln!(w, "  cb project add \"My project\"")
    })
}
