mod cli;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use cli::Cli;
use lectio_author::{render_summary, write_manifest, ManifestDraft};
use lectio_delta::Allowlist;
use std::process::ExitCode;
use tracing::{info, warn};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let allowlist = Allowlist::new(
        Allowlist::bundled()
            .tables()
            .map(str::to_string)
            .chain(cli.allow_tables.iter().cloned()),
    )
    .context("invalid --allow-table")?;

    let draft = ManifestDraft {
        version: cli.version,
        description: cli.description.clone(),
        created_by: cli.created_by.clone(),
        changes: cli.change_specs()?,
    };
    let manifest = draft.build(&allowlist, Utc::now())?;

    print!("{}", render_summary(&manifest));

    if cli.dry_run {
        info!(version = manifest.version, "Dry run, manifest not written");
        return Ok(());
    }

    let outcome = write_manifest(&manifest, &cli.out_dir)
        .with_context(|| format!("writing manifest to {}", cli.out_dir.display()))?;
    if outcome.overwrote {
        warn!(
            path = %outcome.path.display(),
            "Overwrote existing manifest for version {}",
            manifest.version
        );
    }
    println!("Wrote {}", outcome.path.display());
    Ok(())
}
