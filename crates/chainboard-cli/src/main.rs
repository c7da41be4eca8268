#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use chainboard_core::config::{self, UserConfig};
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "chainboard: project boards with ordered columns and cards",
    long_about = None
)]
struct Cli {
    /// Log debug events to stderr (ignored when `CHAINBOARD_LOG` is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Name recorded on history rows (skips env and config resolution).
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Suppress confirmation output of mutations.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from the flag, `FORMAT`, and the user config.
    fn output_mode(&self, user: &UserConfig) -> OutputMode {
        let env_format = env::var("FORMAT").ok();
        OutputMode::from_resolved(&config::resolve_output(
            self.json,
            user.output.as_deref(),
            env_format.as_deref(),
        ))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Create a board in the current directory",
        long_about = "Create .chainboard/ with a config file and an empty database.",
        after_help = "EXAMPLES:\n    # Initialize a board here\n    cb init\n\n    # Keep the database elsewhere\n    cb init --db /var/lib/chainboard/board.db"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Boards",
        about = "Manage projects",
        after_help = "EXAMPLES:\n    # Create a project\n    cb project add \"Website\"\n\n    # List projects\n    cb project list --json"
    )]
    Project {
        #[command(subcommand)]
        command: cmd::project::ProjectCommand,
    },

    #[command(
        next_help_heading = "Boards",
        about = "Manage the ordered task states (columns) of a project",
        after_help = "EXAMPLES:\n    # Add a column at the end\n    cb state add --project 1 \"Review\"\n\n    # Put column 3 first\n    cb state move 3 --front\n\n    # Put column 3 after column 1\n    cb state move 3 --after 1"
    )]
    State {
        #[command(subcommand)]
        command: cmd::state::StateCommand,
    },

    #[command(
        next_help_heading = "Boards",
        about = "Manage the ordered tasks (cards) of a task state",
        after_help = "EXAMPLES:\n    # Add a card at the bottom of column 1\n    cb task add --state 1 \"Write copy\"\n\n    # Reorder within the column\n    cb task move 4 --after 2\n\n    # Move to another column\n    cb task transfer 4 --to 2\n\n    # Assign and list by assignee\n    cb task assign 4 --to ada\n    cb task list --assignee ada"
    )]
    Task {
        #[command(subcommand)]
        command: cmd::task::TaskCommand,
    },

    #[command(
        next_help_heading = "Read",
        about = "Show a project's board",
        long_about = "Show every task state of a project in column order, each with its tasks in order.",
        after_help = "EXAMPLES:\n    # Show project 1\n    cb show 1\n\n    # Emit machine-readable output\n    cb show 1 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the audit trail of a task state or task",
        after_help = "EXAMPLES:\n    # History of task 4\n    cb history task 4\n\n    # History of a removed column\n    cb history state 2 --json"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Check every chain for broken links",
        long_about = "Check every chain for broken links. Nothing is repaired; the exit status is non-zero when any chain fails.",
        after_help = "EXAMPLES:\n    # Verify the board\n    cb verify\n\n    # Emit machine-readable output\n    cb verify --json"
    )]
    Verify,

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    cb completions bash > ~/.local/share/bash-completion/completions/cb"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CHAINBOARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "chainboard=debug,cb=debug,info"
        } else {
            "chainboard=info,warn"
        })
    });

    let format = env::var("CHAINBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli, ctx: &cmd::Context) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, ctx),
        Commands::Project { command } => cmd::project::run_project(&command, ctx),
        Commands::State { command } => cmd::state::run_state(&command, ctx),
        Commands::Task { command } => cmd::task::run_task(&command, ctx),
        Commands::Show(args) => cmd::show::run_show(&args, ctx),
        Commands::History(args) => cmd::history::run_history(&args, ctx),
        Commands::Verify => cmd::verify::run_verify(ctx),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(command = ?cli.command, "parsed command line");

    let user = config::load_user_config().unwrap_or_else(|err| {
        warn!(error = %format!("{err:#}"), "ignoring unreadable user config");
        UserConfig::default()
    });
    let output = cli.output_mode(&user);

    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("error: cannot read the working directory: {err}");
            return ExitCode::FAILURE;
        }
    };

    let ctx = cmd::Context {
        output,
        quiet: cli.quiet,
        actor_flag: cli.actor.clone(),
        user,
        cwd,
    };

    match run(cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error = CliError::from_anyhow(&err);
            if let Err(render_err) = render_error(output, &error) {
                eprintln!("error: {} ({render_err})", error.message);
            }
            ExitCode::FAILURE
        }
    }
}
