//! `post-exporter` entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use exporter_core::Msg;
use exporter_engine::{ExportError, Exporter, ReqwestPostSource};
use exporter_logging::{export_debug, export_info, LogDestination};

mod cli;
mod config;
mod runner;

use cli::Args;
use config::{load_config, RunSettings};
use runner::ConsoleProgress;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so --help and --version work without a logger.
    let args = Args::parse();

    let destination = if args.log_file {
        LogDestination::Both(exporter_logging::DEFAULT_LOG_FILE.into())
    } else {
        LogDestination::Terminal
    };
    exporter_logging::initialize(destination, args.log_level());
    export_debug!("{:?}", args);

    let config = load_config(args.config.as_deref());
    let settings = RunSettings::resolve(&args, &config)?;
    export_info!(
        "Exporting {} (offset {}, limit {}) into {:?}",
        settings.site,
        settings.pipeline.offset(),
        settings.pipeline.limit(),
        settings.output_dir
    );

    let source = ReqwestPostSource::new(settings.pipeline.base_url().clone(), settings.fetch)
        .context("failed to set up http client")?;
    let progress = Arc::new(ConsoleProgress::stdout(args.quiet));
    progress.dispatch(Msg::ExportStarted {
        site: settings.site.to_string(),
        offset: settings.pipeline.offset(),
        limit: settings.pipeline.limit(),
    });

    let exporter = Exporter::new(Arc::new(source), settings.pipeline, settings.options);
    match exporter
        .zip_posts_to_dir(&settings.output_dir, progress.clone())
        .await
    {
        Ok((path, summary)) => {
            export_info!("Wrote {} bytes to {:?}", summary.bytes_written, path);
            if !args.quiet {
                println!("saved {}", path.display());
            }
            Ok(())
        }
        Err(ExportError::NothingToExport) => {
            progress.dispatch(Msg::NothingToExport);
            Ok(())
        }
        Err(err) => Err(err).context(format!("export of {} failed", settings.site)),
    }?;

    export_debug!("Final state: {}", progress.view().summary_line());
    Ok(())
}
