use std::io::Write;

use anyhow::{Context, bail};
use serde::Serialize;
use tracing::info;

use designdiff_core::ProjectId;
use designdiff_infra::{AppConfig, build_services};

use crate::cli::CompareArgs;

pub async fn compare(args: CompareArgs, mut config: AppConfig) -> anyhow::Result<()> {
    for path in [&args.design, &args.website] {
        if !path.is_file() {
            bail!("image not found: {}", path.display());
        }
    }

    if let Some(provider) = args.provider {
        config.provider_preference = provider;
    }

    let services = build_services(&config)
        .await
        .context("failed to initialize services")?;

    let project_id = args.project.unwrap_or_else(|| {
        let id = ProjectId::new();
        info!(project_id = %id, "no project given, using a fresh one");
        id
    });

    let outcome = services
        .orchestrator
        .run_comparison(&args.design, &args.website, project_id, args.comparison)
        .await
        .context("comparison failed")?;

    if args.discrepancies_only {
        print_json(&outcome.discrepancies)
    } else {
        print_json(&outcome)
    }
}

pub fn fallback(config: &AppConfig) -> anyhow::Result<()> {
    let library = config
        .fallback_library()
        .context("failed to load fallback library")?;
    print_json(&library)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("failed to serialize output")?;
    writeln!(stdout)?;
    Ok(())
}
