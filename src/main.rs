use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloud_pages::cli::orchestration::{
    run_deploy_workflow, run_list_workflow, DeployWorkflowArgs,
};
use cloud_pages::config;
use cloud_pages::ui;

#[derive(clap::Parser)]
#[command(
    name = "cloudpages",
    version,
    about = "Deploy a versioned static site to a bucket and prune old versions"
)]
struct Args {
    #[arg(
        short = 'z',
        long = "current-version",
        help = "Version being deployed, used as key prefix"
    )]
    current_version: Option<String>,

    #[arg(short, long, help = "Directory holding the built site")]
    dir: Option<PathBuf>,

    #[arg(short, long, help = "Target bucket (defaults to AWS_S3_BUCKET)")]
    bucket: Option<String>,

    #[arg(short, long, help = "Repository to read version tags from (defaults to --dir)")]
    repository: Option<PathBuf>,

    #[arg(long, help = "Remove old versions after deploying")]
    remove: bool,

    #[arg(short, long, help = "Create the bucket before deploying")]
    create: bool,

    #[arg(
        short = 'D',
        long,
        value_parser = humantime::parse_duration,
        help = "Minimum age of removed versions, e.g. 30days"
    )]
    delay: Option<Duration>,

    #[arg(short, long, help = "Number of recent versions always kept")]
    last: Option<usize>,

    #[arg(long, help = "Glob of files to deploy, relative to --dir")]
    files: Option<String>,

    #[arg(long, help = "Glob of files to skip, relative to --dir")]
    ignore: Option<String>,

    #[arg(long, help = "Listing page size used while removing versions")]
    page_size: Option<usize>,

    #[arg(long, help = "Directory holding the local buckets")]
    store: Option<PathBuf>,

    #[arg(long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Show tagged versions and which would be removed, then exit")]
    list: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[arg(short, long, help = "Silence logs")]
    quiet: bool,
}

impl Args {
    fn workflow_args(&self) -> DeployWorkflowArgs {
        DeployWorkflowArgs {
            version: self.current_version.clone(),
            dir: self.dir.clone(),
            bucket: self.bucket.clone(),
            repository: self.repository.clone(),
            files: self.files.clone(),
            ignore: self.ignore.clone(),
            remove: self.remove,
            create_bucket: self.create,
            keep_delay: self.delay,
            keep_count: self.last,
            page_size: self.page_size,
            store_root: self.store.clone(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = config::load_config(args.config.as_deref()).context("Error loading config")?;
    let workflow_args = args.workflow_args();

    if args.list {
        let plan = run_list_workflow(&workflow_args, &config)?;
        ui::display_retention_plan(&plan);
        return Ok(());
    }

    let report = run_deploy_workflow(&workflow_args, &config)?;
    ui::display_deploy_report(&report);
    Ok(())
}

fn init_tracing(args: &Args) {
    if args.quiet {
        return;
    }

    let filter = match args.verbose {
        0 => "warn,cloud_pages=info",
        1 => "info,cloud_pages=debug",
        _ => "debug,cloud_pages=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
