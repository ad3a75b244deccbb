use caf::commands::{
    self, CommitArgs, CreateTagArgs, DeleteTagArgs, InitArgs, ResolveArgs, EXIT_SUCCESS,
};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run as if caf was started in <path>
    #[arg(short = 'C', global = true, value_name = "path", default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty caf repository
    Init(InitArgs),
    /// Record a new commit on the current branch
    Commit(CommitArgs),
    /// Create a tag pointing at the commit a ref resolves to
    CreateTag(CreateTagArgs),
    /// Delete a tag
    DeleteTag(DeleteTagArgs),
    /// List tags
    Tags,
    /// Print the commit id a ref resolves to
    Resolve(ResolveArgs),
    /// List refs together with the commits they point at
    ShowRef,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CAF_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = cli.dir;

    let (mut out, mut err) = (io::stdout().lock(), io::stderr().lock());

    let code = match cli.command {
        Commands::Init(args) => commands::init(&dir, args, &mut out, &mut err)?,
        Commands::Commit(args) => commands::commit(&dir, args, &mut out, &mut err)?,
        Commands::CreateTag(args) => commands::create_tag(&dir, args, &mut out, &mut err)?,
        Commands::DeleteTag(args) => commands::delete_tag(&dir, args, &mut out, &mut err)?,
        Commands::Tags => commands::tags(&dir, &mut out, &mut err)?,
        Commands::Resolve(args) => commands::resolve(&dir, args, &mut out, &mut err)?,
        Commands::ShowRef => commands::show_ref(&dir, &mut out, &mut err)?,
    };

    if code != EXIT_SUCCESS {
        drop((out, err));
        std::process::exit(code);
    }

    Ok(())
}
