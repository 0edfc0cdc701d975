use crate::cli::FitArgs;
use crate::config::PartialAnalysisConfig;
use crate::error::{CliError, Result};
use crate::utils::loader;
use crate::utils::progress::CliProgressHandler;
use dynomsm::core::io::csv::{write_matrix, write_state_sequence};
use dynomsm::engine::config::ModelKind;
use dynomsm::engine::progress::ProgressReporter;
use dynomsm::workflows::extract;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct ObservationSummary {
    mean: Vec<f64>,
    variance: Vec<f64>,
}

/// The JSON model summary written alongside the tabular artifacts.
#[derive(Serialize)]
struct ModelSummary<'a> {
    name: Option<&'a str>,
    frames: usize,
    features: usize,
    n_states: usize,
    lag_time: usize,
    model: &'static str,
    reversible: bool,
    stationary_distribution: Vec<f64>,
    implied_timescales: Vec<f64>,
    state_populations: Vec<usize>,
    observation_models: Option<Vec<ObservationSummary>>,
}

pub fn run(args: FitArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialAnalysisConfig::from_file(path)?,
        None => PartialAnalysisConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    info!("Loading input trajectory from {:?}", &args.input);
    let loaded = loader::load_trajectory(&args.input)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting Markov-model extraction...");
    info!("Invoking the core extraction workflow...");
    let extraction = extract::run(&loaded.trajectory, &config, &reporter)?;

    std::fs::create_dir_all(&args.output)?;

    let states_path = args.output.join("state_sequence.csv");
    write_artifact(&states_path, |writer| {
        write_state_sequence(&extraction.states, writer)
    })?;

    let transition_path = args.output.join("transition_matrix.csv");
    write_artifact(&transition_path, |writer| {
        write_matrix(extraction.model.transition_matrix(), writer)
    })?;

    let counts_path = args.output.join("count_matrix.csv");
    write_artifact(&counts_path, |writer| {
        write_matrix(extraction.model.count_matrix(), writer)
    })?;

    let summary = ModelSummary {
        name: loaded.name.as_deref(),
        frames: extraction.states.len(),
        features: loaded.trajectory.dim(),
        n_states: extraction.model.n_states(),
        lag_time: extraction.model.lag(),
        model: match config.estimation.model {
            ModelKind::MarkovChain => "markov-chain",
            ModelKind::HiddenMarkov => "hidden-markov",
        },
        reversible: extraction.model.is_reversible(),
        stationary_distribution: extraction
            .model
            .stationary_distribution()
            .iter()
            .copied()
            .collect(),
        implied_timescales: extraction.model.timescales(),
        state_populations: extraction.states.state_populations(),
        observation_models: extraction.model.observation_models().map(|states| {
            states
                .iter()
                .map(|state| ObservationSummary {
                    mean: state.mean.iter().copied().collect(),
                    variance: state.variance.iter().copied().collect(),
                })
                .collect()
        }),
    };
    let summary_path = args.output.join("model.json");
    let summary_file = BufWriter::new(File::create(&summary_path)?);
    serde_json::to_writer_pretty(summary_file, &summary)
        .map_err(|e| CliError::Other(e.into()))?;

    println!(
        "✓ Extracted {} states over {} frames.",
        extraction.model.n_states(),
        extraction.states.len()
    );
    println!("✓ Artifacts written to: {}", args.output.display());
    Ok(())
}

fn write_artifact<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(
        &mut BufWriter<File>,
    ) -> std::result::Result<(), dynomsm::core::io::csv::CsvTrajectoryError>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    info!("Wrote artifact {:?}", path);
    Ok(())
}
