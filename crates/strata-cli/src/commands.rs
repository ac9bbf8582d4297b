use anyhow::Context;
use colored::Colorize;
use strata_sdk::{PullOptions, PullReport, Ref, Repo};
use strata_server::{ServerConfig, StrataServer};
use tokio_util::sync::CancellationToken;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        repo,
        format,
        ..
    } = cli;
    match command {
        Command::Init(args) => cmd_init(args.path.unwrap_or(repo)),
        Command::Remote(args) => cmd_remote(&repo, args),
        Command::Commit(args) => cmd_commit(&repo, args),
        Command::Pull(args) => cmd_pull(&repo, args, &format),
        Command::Refs => cmd_refs(&repo, &format),
        Command::Serve(args) => cmd_serve(repo, args),
    }
}

fn open(path: &std::path::Path) -> anyhow::Result<Repo> {
    Repo::open(path).with_context(|| format!("opening repository at {}", path.display()))
}

fn cmd_init(path: std::path::PathBuf) -> anyhow::Result<()> {
    let repo = Repo::init(&path)?;
    println!(
        "{} Initialized Strata repository in {}",
        "✓".green().bold(),
        repo.root().display().to_string().bold()
    );
    Ok(())
}

fn cmd_remote(path: &std::path::Path, args: RemoteArgs) -> anyhow::Result<()> {
    let mut repo = open(path)?;
    match args.action {
        Some(RemoteAction::Add { name, url }) => {
            repo.add_remote(&name, &url)?;
            println!("Added remote {} → {}", name.bold(), url.blue());
        }
        Some(RemoteAction::Remove { name }) => {
            repo.remove_remote(&name)?;
            println!("Removed remote {}", name.bold());
        }
        Some(RemoteAction::List) | None => {
            let remotes = repo.remotes();
            if remotes.is_empty() {
                println!("No remotes configured.");
            }
            for (name, url) in remotes {
                println!("{}\t{}", name.bold(), url);
            }
        }
    }
    Ok(())
}

fn cmd_commit(path: &std::path::Path, args: CommitArgs) -> anyhow::Result<()> {
    let repo = open(path)?;
    let subject = args
        .subject
        .unwrap_or_else(|| format!("Import {}", args.dir.display()));
    let id = repo
        .commit_directory(&args.branch, &args.dir, &subject)
        .with_context(|| format!("importing {}", args.dir.display()))?;
    println!("{} {} {}", "✓".green().bold(), args.branch.yellow(), id.to_string().dimmed());
    Ok(())
}

fn cmd_pull(path: &std::path::Path, args: PullArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let repo = open(path)?;
    let options = PullOptions {
        bare_user_only_files: args.bare_user_only_files,
        commit_only: args.commit_only,
        mirror: args.mirror,
        trusted_http: args.trusted_http,
        untrusted: args.untrusted,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        repo.pull_with_cancel(&args.remote, &args.refs, options, &cancel)
            .await
    });
    let report = report.with_context(|| format!("pulling from {}", args.remote))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &PullReport) {
    if report.is_up_to_date() {
        println!("{} {} is up to date", "✓".green().bold(), report.remote.bold());
        return;
    }
    for change in &report.refs_updated {
        let old = change
            .old
            .map(|id| id.short_hex())
            .unwrap_or_else(|| "(new)".to_string());
        println!(
            "  {} {} → {}",
            change.name.yellow(),
            old.dimmed(),
            change.new.short_hex().green()
        );
    }
    println!(
        "{} {} objects fetched ({} bytes), {} already present, {} written",
        "✓".green().bold(),
        report.stats.objects_fetched,
        report.stats.bytes_fetched,
        report.stats.objects_skipped,
        report.objects_written
    );
}

fn cmd_refs(path: &std::path::Path, format: &OutputFormat) -> anyhow::Result<()> {
    let repo = open(path)?;
    let refs = repo.list_refs()?;
    if *format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&refs)?);
        return Ok(());
    }
    if refs.is_empty() {
        println!("No refs.");
    }
    for r in refs {
        let name = match &r {
            Ref::Branch { .. } => r.canonical_name().green(),
            Ref::Remote { .. } => r.canonical_name().red(),
        };
        println!("{}  {}", r.target().to_string().dimmed(), name);
    }
    Ok(())
}

fn cmd_serve(repo: std::path::PathBuf, args: ServeArgs) -> anyhow::Result<()> {
    let config = ServerConfig::new(repo).with_bind_addr(args.bind);
    let server = StrataServer::new(config)?;
    println!(
        "Strata server on {} (repo: {})",
        args.bind.to_string().bold(),
        server.config().repo_path.display()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}
