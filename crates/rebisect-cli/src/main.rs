use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rebisect::config::Config;
use rebisect::disposition::{PlanReport, PlanSummary};
use rebisect::session::{Refs, Session};
use rebisect::walk::{CommandVerifier, WalkReport};
use rebisect_git::GitCli;

mod prompt;
mod telemetry;

/// Default config file name, looked up in the repository root.
const CONFIG_FILE: &str = ".rebisect.toml";

/// Build a bisectable branch between two rebased versions of a patch set
///
/// Given an old and a new version, rebisect compares the downstream patch
/// set carried on each version's branch, reverts what went away, picks the
/// upstream commits in between, replaces what changed and picks what was
/// added. Each commit on the resulting branch is a bisection point; the
/// last one has exactly the tree of the new downstream branch.
///
/// WORKFLOW:
///
///   rebisect plan 5.19-rc7 5.19          # inspect what would happen
///   rebisect create 5.19-rc7 5.19        # build the branch
///   rebisect verify 5.19-rc7 5.19 \
///       --build-command 'make -j$(nproc)' # build-check along the branch
///
/// Set REBISECT_LOG=json for machine-readable logs, RUST_LOG for filtering.
#[derive(Parser)]
#[command(name = "rebisect")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Repository to operate on
    #[arg(long, global = true, default_value = ".", env = "REBISECT_REPO")]
    repo: PathBuf,

    /// Config file (default: <repo>/.rebisect.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Versions {
    /// Version the bisection starts from (e.g. 5.19-rc7)
    old: String,
    /// Version the bisection ends at (e.g. 5.19)
    new: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the bisection branch
    ///
    /// Fails if the branch already exists or the worktree is dirty. On a
    /// conflicting cherry-pick or revert you are asked to continue, stop,
    /// or drop the patch.
    Create {
        #[command(flatten)]
        versions: Versions,

        /// Fetch the configured remotes first
        #[arg(long)]
        fetch: bool,

        /// Compute and report the plan without creating the branch
        #[arg(long)]
        plan_only: bool,

        /// Write the plan as JSON to this file
        #[arg(long, value_name = "FILE")]
        plan_out: Option<PathBuf>,
    },

    /// Build-check the bisection branch at evenly spaced commits
    Verify {
        #[command(flatten)]
        versions: Versions,

        /// Number of build stops (default from config)
        #[arg(long, short = 's')]
        steps: Option<usize>,

        /// Shell command that builds the tree (default from config)
        #[arg(long)]
        build_command: Option<String>,
    },

    /// Print the plan without touching any branch
    Plan {
        #[command(flatten)]
        versions: Versions,

        /// Print the full plan as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    telemetry::init(telemetry::LogFormat::from_env());
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.repo.join(CONFIG_FILE));
    let config = Config::load(&config_path).context("loading configuration")?;
    let repo = GitCli::open(&cli.repo)
        .with_context(|| format!("opening repository at {}", cli.repo.display()))?;
    let session = Session::new(&repo, &config);

    match cli.command {
        Commands::Create {
            versions,
            fetch,
            plan_only,
            plan_out,
        } => create(
            &session,
            &config,
            &versions,
            fetch,
            plan_only,
            plan_out.as_deref(),
        ),
        Commands::Verify {
            versions,
            steps,
            build_command,
        } => verify(&session, &config, &versions, steps, build_command),
        Commands::Plan { versions, json } => {
            let refs = Refs::for_versions(&config, &versions.old, &versions.new);
            let plan = session.plan(&refs).context("planning")?;
            if json {
                println!("{}", plan.to_json()?);
            } else {
                print_plan(&plan);
            }
            Ok(())
        }
    }
}

fn create(
    session: &Session<'_>,
    config: &Config,
    versions: &Versions,
    fetch: bool,
    plan_only: bool,
    plan_out: Option<&Path>,
) -> Result<()> {
    if fetch {
        session.fetch().context("fetching remotes")?;
    }
    let refs = Refs::for_versions(config, &versions.old, &versions.new);
    let plan = session.plan(&refs).context("planning")?;
    if let Some(path) = plan_out {
        std::fs::write(path, plan.to_json()?)
            .with_context(|| format!("writing plan to {}", path.display()))?;
        println!("Plan written to {}", path.display());
    }
    print_summary(&plan.summary);
    if plan_only {
        return Ok(());
    }

    let mut resolver = prompt::TerminalResolver::stdio();
    let report = session
        .create(&plan, &mut resolver)
        .with_context(|| format!("creating {}", plan.branch))?;

    println!();
    println!("Created {} with {} commit(s).", plan.branch, report.commits);
    if report.closure {
        println!("A closure commit was needed to match {}.", plan.new);
    }
    for title in &report.skipped {
        println!("  kept (skip list): {title}");
    }
    for title in &report.dropped {
        println!("  dropped: {title}");
    }
    Ok(())
}

fn verify(
    session: &Session<'_>,
    config: &Config,
    versions: &Versions,
    steps: Option<usize>,
    build_command: Option<String>,
) -> Result<()> {
    let Some(command) = build_command.or_else(|| config.verify.build_command.clone()) else {
        bail!("no build command: pass --build-command or set verify.build_command in {CONFIG_FILE}");
    };
    let steps = steps.unwrap_or(config.verify.steps);
    let refs = Refs::for_versions(config, &versions.old, &versions.new);

    let mut verifier = CommandVerifier::new(command);
    let report = session
        .verify(&refs, steps, &mut verifier)
        .with_context(|| format!("verifying {}", refs.branch))?;
    print_walk(&report);

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{failed} of {} build stop(s) failed", report.stops.len());
    }
    Ok(())
}

fn print_summary(s: &PlanSummary) {
    println!(
        "{} revert(s), {} upstream pick(s), {} replace(s), {} fixup replace(s), {} pick(s); {} no-op replacement(s) dropped",
        s.reverts, s.upstream, s.replaces, s.replace_fixups, s.picks, s.noops_dropped
    );
}

fn print_plan(plan: &PlanReport) {
    println!("{} -> {} on {}", plan.old, plan.new, plan.branch);
    for d in &plan.dispositions {
        let oids: Vec<String> = d.oids().iter().map(rebisect_git::GitOid::short).collect();
        println!("  {:<13} {} [{}]", format!("{:?}", d.kind()), d.title(), oids.join(" "));
    }
    print_summary(&plan.summary);
}

fn print_walk(report: &WalkReport) {
    println!("{} commit(s), {} build stop(s)", report.commits, report.stops.len());
    for stop in &report.stops {
        let status = if stop.succeeded() { "ok" } else { "FAILED" };
        println!(
            "{status:<6} {} {} ({:.1?})",
            stop.oid.short(),
            stop.title,
            stop.elapsed
        );
        if let Some(excerpt) = &stop.excerpt {
            for line in excerpt.lines() {
                println!("    {line}");
            }
        }
    }
    println!("Total verification time {:.1?}", report.total);
}
