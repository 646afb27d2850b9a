//! repcast - turns an exercise list into spoken workout tracks

use anyhow::{bail, Context, Result};
use clap::Parser;
use repcast_core::{
    load_exercises, AudioFormat, AudioResources, AudioWriter, CsvSource, ExerciseRecord,
    LineSource, Merger, RepcastConfig, Renderer, TrackExporter, XlsxSource,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{Cli, Input};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .init();

    info!("Starting repcast v{}", repcast_core::VERSION);
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RepcastConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => RepcastConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    let output = cli.output_path();
    let format = AudioFormat::from_path(&output)?;

    // Everything is loaded before the first file is written.
    let exercises: Vec<ExerciseRecord> = load(&cli.input())?
        .into_iter()
        .map(|e| {
            e.with_language(config.synthesis.language.clone())
                .with_slow(config.synthesis.slow)
        })
        .collect();
    if exercises.is_empty() {
        bail!("No exercises to render");
    }

    let resources = AudioResources::load(
        &config.resources.dir,
        config.audio.sample_rate,
        config.audio.channels,
    )?;
    let exporter =
        TrackExporter::new(AudioWriter::with_settings(config.encoding_settings()), format);

    let mut renderer = Renderer::new(
        Arc::new(config.synthesizer()?),
        config.timeline(resources.markers.clone()),
        exporter.clone(),
        cli.output_dir(),
    )
    .with_policy(config.synthesis.policy);
    if cli.merge {
        if let Some(stem) = output.file_stem() {
            renderer = renderer.with_reserved_stem(stem.to_string_lossy());
        }
    }

    let tag_options = cli.tag_options();
    let segments = renderer.render_all(&exercises, &tag_options).await?;

    if cli.merge {
        let merged = Merger::new(exporter, resources.finish)
            .with_lead_in(config.lead_in())
            .merge(&segments, &output, &tag_options.for_merged(&output))
            .await?;
        info!("Workout saved to {}", merged.display());
    } else {
        info!(
            "Wrote {} exercise file(s) to {}",
            segments.len(),
            cli.output_dir().display()
        );
    }

    Ok(())
}

fn load(input: &Input) -> Result<Vec<ExerciseRecord>> {
    let exercises = match input {
        Input::Xlsx(path) => load_exercises(&mut XlsxSource::new(path))?,
        Input::Csv(path) => load_exercises(&mut CsvSource::new(path))?,
        Input::Stdin => {
            let stdin = std::io::stdin();
            load_exercises(&mut LineSource::new(stdin.lock(), "standard input"))?
        }
    };
    Ok(exercises)
}
