use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "strata",
    about = "Strata: content-addressed filesystem trees, pulled atomically",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository to operate on
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new repository
    Init(InitArgs),
    /// Manage remote repositories
    Remote(RemoteArgs),
    /// Import a directory as a new commit on a branch
    Commit(CommitArgs),
    /// Pull refs and their objects from a remote
    Pull(PullArgs),
    /// List refs
    Refs,
    /// Serve the repository over HTTP
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to --repo)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub action: Option<RemoteAction>,
}

#[derive(Subcommand)]
pub enum RemoteAction {
    /// Add a remote
    Add { name: String, url: String },
    /// Remove a remote and its tracking refs
    Remove { name: String },
    /// List remotes
    List,
}

#[derive(Args)]
pub struct CommitArgs {
    /// Branch to commit to
    #[arg(short, long)]
    pub branch: String,
    /// One-line summary
    #[arg(short, long)]
    pub subject: Option<String>,
    /// Directory to import
    pub dir: PathBuf,
}

#[derive(Args)]
pub struct PullArgs {
    /// Configured remote name
    pub remote: String,
    /// Refs to pull; with --mirror and none given, pulls all
    pub refs: Vec<String>,
    /// Write local branches and default to all refs
    #[arg(long)]
    pub mirror: bool,
    /// Fetch commit objects only
    #[arg(long)]
    pub commit_only: bool,
    /// Reject files with permissions outside 0775
    #[arg(long)]
    pub bare_user_only_files: bool,
    /// Skip checksum verification for HTTP remotes
    #[arg(long)]
    pub trusted_http: bool,
    /// Verify checksums even for local remotes
    #[arg(long)]
    pub untrusted: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:9418")]
    pub bind: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["strata", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init(InitArgs { path: None })));
        assert_eq!(cli.repo, PathBuf::from("."));
    }

    #[test]
    fn parse_global_repo_after_subcommand() {
        let cli = Cli::try_parse_from(["strata", "refs", "--repo", "/srv/repo", "-v"]).unwrap();
        assert!(matches!(cli.command, Command::Refs));
        assert_eq!(cli.repo, PathBuf::from("/srv/repo"));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_pull_flags() {
        let cli = Cli::try_parse_from([
            "strata",
            "pull",
            "origin",
            "os/stable",
            "os/testing",
            "--mirror",
            "--untrusted",
            "--bare-user-only-files",
        ])
        .unwrap();
        let Command::Pull(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.remote, "origin");
        assert_eq!(args.refs, ["os/stable", "os/testing"]);
        assert!(args.mirror && args.untrusted && args.bare_user_only_files);
        assert!(!args.commit_only && !args.trusted_http);
    }

    #[test]
    fn parse_commit() {
        let cli = Cli::try_parse_from(["strata", "commit", "-b", "main", "-s", "hello", "./rootfs"])
            .unwrap();
        let Command::Commit(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.branch, "main");
        assert_eq!(args.subject.as_deref(), Some("hello"));
        assert_eq!(args.dir, PathBuf::from("./rootfs"));
    }

    #[test]
    fn parse_remote_add() {
        let cli = Cli::try_parse_from(["strata", "remote", "add", "origin", "http://h:9418"]).unwrap();
        let Command::Remote(RemoteArgs { action: Some(RemoteAction::Add { name, url }) }) = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(name, "origin");
        assert_eq!(url, "http://h:9418");
    }

    #[test]
    fn parse_serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["strata", "serve", "--bind", "nowhere"]).is_err());
        let cli = Cli::try_parse_from(["strata", "serve", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
