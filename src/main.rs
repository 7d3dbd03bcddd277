use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use whisper_dist::commands;
use whisper_dist::release::{BumpRequest, StageFilter};

/// whisper-dist - distribution tooling for the whisper.cpp Node addon
///
/// Detects the target triple, resolves and loads the platform package, and
/// drives releases: version bumps, artifact staging and publishing.
///
/// Examples:
///   whisper-dist detect              # Print the triple of this machine
///   whisper-dist version bump patch  # 1.2.3 -> 1.2.4 in every manifest
///   whisper-dist stage js            # Stage only the main package
///   whisper-dist publish --dry-run   # Show what would be published
#[derive(Parser, Debug)]
#[command(author, version = env!("WHISPER_DIST_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository root (defaults to the current directory; also via WHISPER_DIST_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "WHISPER_DIST_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the target triple of this machine
    Detect,

    /// Show which platform package directory this machine resolves to
    Resolve(ResolveArgs),

    /// Read or bump the release version
    #[command(subcommand)]
    Version(VersionCommands),

    /// Copy this version's packed artifacts into the staging directory
    Stage(StageArgs),

    /// Publish staged artifacts, platform packages first
    Publish(PublishArgs),

    /// Remove build outputs, caches and staged artifacts
    Clean,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Also load the native binary
    #[arg(long)]
    pub load: bool,
}

#[derive(clap::Subcommand, Debug)]
enum VersionCommands {
    /// Print the version of the main manifest
    Current,

    /// Bump the version and stamp it into every manifest
    Bump(BumpArgs),
}

#[derive(clap::Args, Debug)]
pub struct BumpArgs {
    /// major, minor, patch or an explicit semantic version
    #[arg(value_name = "KIND|VERSION")]
    pub request: BumpRequest,
}

#[derive(clap::Args, Debug)]
pub struct StageArgs {
    /// Stage only the main (js) or only the platform (addon) artifacts
    #[arg(value_enum, value_name = "FILTER")]
    pub filter: Option<StageFilter>,
}

#[derive(clap::Args, Debug)]
pub struct PublishArgs {
    /// Pass --dry-run to the registry client
    #[arg(long)]
    pub dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = whisper_dist::runtime::RealRuntime;

    match cli.command {
        Commands::Detect => commands::detect(runtime)?,
        Commands::Resolve(args) => commands::resolve(runtime, cli.root, args.load)?,
        Commands::Version(VersionCommands::Current) => commands::current(runtime, cli.root)?,
        Commands::Version(VersionCommands::Bump(args)) => {
            commands::bump(runtime, cli.root, &args.request)?
        }
        Commands::Stage(args) => commands::stage(runtime, cli.root, args.filter)?,
        Commands::Publish(args) => commands::publish(runtime, cli.root, args.dry_run).await?,
        Commands::Clean => commands::clean(runtime, cli.root)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use whisper_dist::release::BumpKind;

    #[test]
    fn test_cli_detect_parsing() {
        let cli = Cli::try_parse_from(["whisper-dist", "detect"]).unwrap();
        assert!(matches!(cli.command, Commands::Detect));
    }

    #[test]
    fn test_cli_bump_kind_parsing() {
        let cli = Cli::try_parse_from(["whisper-dist", "version", "bump", "minor"]).unwrap();
        match cli.command {
            Commands::Version(VersionCommands::Bump(args)) => {
                assert_eq!(args.request, BumpRequest::Kind(BumpKind::Minor));
            }
            _ => panic!("Expected version bump command"),
        }
    }

    #[test]
    fn test_cli_bump_explicit_parsing() {
        let cli =
            Cli::try_parse_from(["whisper-dist", "version", "bump", "2.0.0-rc.1"]).unwrap();
        match cli.command {
            Commands::Version(VersionCommands::Bump(args)) => {
                assert_eq!(args.request.to_string(), "2.0.0-rc.1");
            }
            _ => panic!("Expected version bump command"),
        }
    }

    #[test]
    fn test_cli_bump_rejects_garbage() {
        assert!(Cli::try_parse_from(["whisper-dist", "version", "bump", "next"]).is_err());
    }

    #[test]
    fn test_cli_stage_aliases() {
        for (arg, expected) in [
            ("js", StageFilter::Main),
            ("main", StageFilter::Main),
            ("addon", StageFilter::Platform),
            ("platform", StageFilter::Platform),
        ] {
            let cli = Cli::try_parse_from(["whisper-dist", "stage", arg]).unwrap();
            match cli.command {
                Commands::Stage(args) => assert_eq!(args.filter, Some(expected)),
                _ => panic!("Expected stage command"),
            }
        }
    }

    #[test]
    fn test_cli_stage_without_filter() {
        let cli = Cli::try_parse_from(["whisper-dist", "stage"]).unwrap();
        match cli.command {
            Commands::Stage(args) => assert_eq!(args.filter, None),
            _ => panic!("Expected stage command"),
        }
    }

    #[test]
    fn test_cli_global_root_parsing() {
        let cli = Cli::try_parse_from(["whisper-dist", "--root", "/tmp", "clean"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp")));

        let cli =
            Cli::try_parse_from(["whisper-dist", "publish", "--dry-run", "-r", "/tmp"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp")));
        match cli.command {
            Commands::Publish(args) => assert!(args.dry_run),
            _ => panic!("Expected publish command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["whisper-dist"]).is_err());
    }
}
