use crate::core::models::{StateSequence, Trajectory};
use crate::engine::config::{AnalysisConfig, ModelKind};
use crate::engine::discretize::kmeans::KMeans;
use crate::engine::discretize::projection::Projection;
use crate::engine::error::EngineError;
use crate::engine::markov::{GaussianHmm, MarkovModel, TransitionCounts};
use crate::engine::postprocess;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

/// The two artifacts produced by the extraction workflow.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// One discrete state label per input frame.
    pub states: StateSequence,
    /// The fitted Markov model over those states.
    pub model: MarkovModel,
}

/// Runs the complete trajectory-to-Markov-model extraction.
///
/// The input trajectory is never mutated; the only outputs are the returned
/// state sequence (always exactly one label per frame) and fitted model.
///
/// # Errors
///
/// - [`EngineError::InvalidTrajectory`] for an empty trajectory, featureless
///   frames, or fewer frames than requested states.
/// - [`EngineError::FitConvergence`] when k-means, the reversible
///   maximum-likelihood iteration, or Baum-Welch exhausts its iteration
///   budget.
#[instrument(skip_all, name = "extraction_workflow")]
pub fn run(
    trajectory: &Trajectory,
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Result<Extraction, EngineError> {
    // === Phase 0: Validation ===
    reporter.report(Progress::PhaseStart { name: "Validation" });
    if trajectory.is_empty() {
        return Err(EngineError::invalid_trajectory(
            "trajectory contains no frames",
        ));
    }
    if trajectory.dim() == 0 {
        return Err(EngineError::invalid_trajectory(
            "frames carry no features",
        ));
    }
    info!(
        frames = trajectory.len(),
        features = trajectory.dim(),
        "Trajectory validated."
    );
    let mut data = trajectory.to_matrix();
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Projection (optional) ===
    if let Some(dims) = config.discretization.projection_dims {
        reporter.report(Progress::PhaseStart { name: "Projection" });
        let projection = Projection::fit(&data, dims)?;
        data = projection.transform(&data);
        info!(
            output_dims = projection.output_dims(),
            "Projected trajectory onto leading principal components."
        );
        reporter.report(Progress::PhaseFinish);
    }

    // === Phase 2: Discretization ===
    reporter.report(Progress::PhaseStart {
        name: "Discretization",
    });
    let kmeans = KMeans::new(
        config.discretization.num_states,
        config.discretization.max_iterations,
        config.discretization.tolerance,
        config.discretization.seed,
    );
    let clustering = kmeans.fit(&data)?;
    reporter.report(Progress::StatusUpdate {
        text: format!(
            "k-means converged after {} iterations (inertia {:.4})",
            clustering.iterations, clustering.inertia
        ),
    });
    let mut states = StateSequence::new(clustering.labels, config.discretization.num_states);
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Model estimation ===
    reporter.report(Progress::PhaseStart { name: "Estimation" });
    let mut model = match config.estimation.model {
        ModelKind::MarkovChain => {
            let counts = TransitionCounts::estimate(
                &states,
                config.estimation.lag_time,
                config.estimation.count_mode,
            )?;
            MarkovModel::fit(
                &counts,
                config.estimation.reversible,
                config.estimation.tolerance,
                config.estimation.max_iterations,
            )?
        }
        ModelKind::HiddenMarkov => {
            let hmm = GaussianHmm::fit(
                &data,
                &states,
                config.estimation.max_iterations,
                config.estimation.tolerance,
            )?;
            info!(
                iterations = hmm.iterations(),
                log_likelihood = hmm.log_likelihood(),
                "Baum-Welch refinement finished."
            );
            let decoded = hmm.decode(&data);
            let counts = TransitionCounts::estimate(
                &decoded,
                config.estimation.lag_time,
                config.estimation.count_mode,
            )?;
            let model = MarkovModel::from_parts(
                hmm.transition_matrix().clone(),
                counts.matrix().clone(),
                config.estimation.lag_time,
                Some(hmm.states().to_vec()),
                config.estimation.tolerance,
                config.estimation.max_iterations,
            )?;
            states = decoded;
            model
        }
    };
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Postprocessing ===
    if config.sort_states {
        reporter.report(Progress::PhaseStart {
            name: "Postprocessing",
        });
        let (sorted_model, sorted_states) = postprocess::sort_by_metastability(&model, &states);
        model = sorted_model;
        states = sorted_states;
        reporter.report(Progress::PhaseFinish);
    }

    info!(
        frames = states.len(),
        n_states = model.n_states(),
        "Extraction complete."
    );
    Ok(Extraction { states, model })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::AnalysisConfigBuilder;
    use crate::engine::markov::chain::ROW_SUM_TOLERANCE;

    /// Ten frames of 2-D features dwelling in three well-separated regions.
    fn three_region_trajectory() -> Trajectory {
        Trajectory::from_rows(vec![
            vec![0.0, 0.0],
            vec![0.1, -0.1],
            vec![-0.1, 0.1],
            vec![0.05, 0.0],
            vec![5.0, 5.0],
            vec![5.1, 4.9],
            vec![4.9, 5.1],
            vec![0.0, 5.0],
            vec![0.1, 5.1],
            vec![-0.1, 4.9],
        ])
        .unwrap()
    }

    #[test]
    fn state_sequence_length_equals_trajectory_length() {
        let trajectory = three_region_trajectory();
        let config = AnalysisConfigBuilder::new()
            .num_states(3)
            .seed(1)
            .build()
            .unwrap();
        let extraction = run(&trajectory, &config, &ProgressReporter::new()).unwrap();

        assert_eq!(extraction.states.len(), 10);
        assert!(extraction.states.labels().iter().all(|&label| label < 3));
    }

    #[test]
    fn transition_matrix_rows_sum_to_one() {
        let trajectory = three_region_trajectory();
        let config = AnalysisConfigBuilder::new()
            .num_states(3)
            .seed(1)
            .build()
            .unwrap();
        let extraction = run(&trajectory, &config, &ProgressReporter::new()).unwrap();

        for row in extraction.model.transition_matrix().row_iter() {
            assert!((row.sum() - 1.0).abs() < ROW_SUM_TOLERANCE);
        }
    }

    #[test]
    fn empty_trajectory_is_rejected() {
        let trajectory = Trajectory::from_rows(vec![]).unwrap();
        let config = AnalysisConfigBuilder::new().num_states(2).build().unwrap();
        let err = run(&trajectory, &config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTrajectory { .. }));
    }

    #[test]
    fn sorted_model_puts_the_most_metastable_state_first() {
        let trajectory = three_region_trajectory();
        let config = AnalysisConfigBuilder::new()
            .num_states(3)
            .seed(1)
            .sort_states(true)
            .build()
            .unwrap();
        let extraction = run(&trajectory, &config, &ProgressReporter::new()).unwrap();

        let t = extraction.model.transition_matrix();
        for state in 1..3 {
            assert!(t[(0, 0)] >= t[(state, state)] - 1e-12);
        }
    }

    #[test]
    fn hidden_markov_path_produces_observation_models() {
        let trajectory = three_region_trajectory();
        let config = AnalysisConfigBuilder::new()
            .num_states(3)
            .seed(1)
            .model(ModelKind::HiddenMarkov)
            .estimation_max_iterations(500)
            .estimation_tolerance(1e-6)
            .build()
            .unwrap();
        let extraction = run(&trajectory, &config, &ProgressReporter::new()).unwrap();

        assert_eq!(extraction.states.len(), 10);
        let observations = extraction.model.observation_models().unwrap();
        assert_eq!(observations.len(), 3);
        assert!((extraction.model.stationary_distribution().sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn projection_path_still_discretizes_every_frame() {
        let trajectory = three_region_trajectory();
        let config = AnalysisConfigBuilder::new()
            .num_states(3)
            .seed(1)
            .projection_dims(1)
            .build()
            .unwrap();
        let extraction = run(&trajectory, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(extraction.states.len(), trajectory.len());
    }

    #[test]
    fn progress_reports_cover_every_phase() {
        use std::sync::Mutex;

        let trajectory = three_region_trajectory();
        let config = AnalysisConfigBuilder::new()
            .num_states(3)
            .seed(1)
            .build()
            .unwrap();

        let phases: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        run(&trajectory, &config, &reporter).unwrap();
        drop(reporter);

        let seen = phases.into_inner().unwrap();
        assert_eq!(seen, vec![
            "Validation",
            "Discretization",
            "Estimation",
            "Postprocessing"
        ]);
    }
}
