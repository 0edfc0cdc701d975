use crate::cli::{CountModeArg, FitArgs, ModelArg};
use crate::error::{CliError, Result};
use dynomsm::engine::config::{AnalysisConfig, AnalysisConfigBuilder, CountMode, ModelKind};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Analysis settings as read from a TOML configuration file.
///
/// Every field is optional; CLI arguments override file values, and the
/// core builder fills in the remaining defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialAnalysisConfig {
    pub discretization: PartialDiscretization,
    pub estimation: PartialEstimation,
    pub sort_states: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialDiscretization {
    pub num_states: Option<usize>,
    pub projection_dims: Option<usize>,
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialEstimation {
    pub model: Option<String>,
    pub lag_time: Option<usize>,
    pub count_mode: Option<String>,
    pub reversible: Option<bool>,
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
}

impl PartialAnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration file {:?}", path);
        Ok(config)
    }

    /// Produces the final engine configuration, with CLI arguments taking
    /// precedence over file values.
    pub fn merge_with_cli(&self, args: &FitArgs) -> Result<AnalysisConfig> {
        let mut builder = AnalysisConfigBuilder::new();

        if let Some(n) = args.num_states.or(self.discretization.num_states) {
            builder = builder.num_states(n);
        }
        if let Some(dims) = args.projection_dims.or(self.discretization.projection_dims) {
            builder = builder.projection_dims(dims);
        }
        if let Some(iterations) = self.discretization.max_iterations {
            builder = builder.discretization_max_iterations(iterations);
        }
        if let Some(tolerance) = self.discretization.tolerance {
            builder = builder.discretization_tolerance(tolerance);
        }
        if let Some(seed) = args.seed.or(self.discretization.seed) {
            builder = builder.seed(seed);
        }

        let file_model = self.estimation.model.as_deref().map(parse_model).transpose()?;
        if let Some(model) = args.model.map(ModelArg::into_kind).or(file_model) {
            builder = builder.model(model);
        }
        if let Some(lag) = args.lag_time.or(self.estimation.lag_time) {
            builder = builder.lag_time(lag);
        }
        let file_mode = self
            .estimation
            .count_mode
            .as_deref()
            .map(parse_count_mode)
            .transpose()?;
        if let Some(mode) = args.count_mode.map(CountModeArg::into_mode).or(file_mode) {
            builder = builder.count_mode(mode);
        }
        if args.non_reversible {
            builder = builder.reversible(false);
        } else if let Some(reversible) = self.estimation.reversible {
            builder = builder.reversible(reversible);
        }
        if let Some(iterations) = self.estimation.max_iterations {
            builder = builder.estimation_max_iterations(iterations);
        }
        if let Some(tolerance) = self.estimation.tolerance {
            builder = builder.estimation_tolerance(tolerance);
        }
        if args.no_sort {
            builder = builder.sort_states(false);
        } else if let Some(sort) = self.sort_states {
            builder = builder.sort_states(sort);
        }

        Ok(builder
            .build()
            .map_err(dynomsm::engine::error::EngineError::from)?)
    }
}

impl ModelArg {
    fn into_kind(self) -> ModelKind {
        match self {
            ModelArg::MarkovChain => ModelKind::MarkovChain,
            ModelArg::HiddenMarkov => ModelKind::HiddenMarkov,
        }
    }
}

impl CountModeArg {
    fn into_mode(self) -> CountMode {
        match self {
            CountModeArg::Sliding => CountMode::Sliding,
            CountModeArg::Strided => CountMode::Strided,
        }
    }
}

fn parse_model(value: &str) -> Result<ModelKind> {
    match value {
        "markov-chain" => Ok(ModelKind::MarkovChain),
        "hidden-markov" => Ok(ModelKind::HiddenMarkov),
        other => Err(CliError::Config(format!(
            "unknown model kind '{other}' (expected 'markov-chain' or 'hidden-markov')"
        ))),
    }
}

fn parse_count_mode(value: &str) -> Result<CountMode> {
    match value {
        "sliding" => Ok(CountMode::Sliding),
        "strided" => Ok(CountMode::Strided),
        other => Err(CliError::Config(format!(
            "unknown count mode '{other}' (expected 'sliding' or 'strided')"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn bare_fit_args() -> FitArgs {
        FitArgs {
            input: PathBuf::from("traj.json"),
            output: PathBuf::from("out"),
            config: None,
            num_states: None,
            projection_dims: None,
            seed: None,
            model: None,
            lag_time: None,
            count_mode: None,
            non_reversible: false,
            no_sort: false,
        }
    }

    #[test]
    fn parses_a_full_config_file() {
        let partial: PartialAnalysisConfig = toml::from_str(
            r#"
            sort-states = false

            [discretization]
            num-states = 4
            projection-dims = 2
            seed = 17

            [estimation]
            model = "hidden-markov"
            lag-time = 2
            count-mode = "strided"
            reversible = false
            "#,
        )
        .unwrap();

        let config = partial.merge_with_cli(&bare_fit_args()).unwrap();
        assert_eq!(config.discretization.num_states, 4);
        assert_eq!(config.discretization.projection_dims, Some(2));
        assert_eq!(config.discretization.seed, 17);
        assert_eq!(config.estimation.model, ModelKind::HiddenMarkov);
        assert_eq!(config.estimation.lag_time, 2);
        assert_eq!(config.estimation.count_mode, CountMode::Strided);
        assert!(!config.estimation.reversible);
        assert!(!config.sort_states);
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let partial: PartialAnalysisConfig = toml::from_str(
            r#"
            [discretization]
            num-states = 4

            [estimation]
            lag-time = 2
            "#,
        )
        .unwrap();

        let mut args = bare_fit_args();
        args.num_states = Some(6);
        args.lag_time = Some(5);
        args.non_reversible = true;

        let config = partial.merge_with_cli(&args).unwrap();
        assert_eq!(config.discretization.num_states, 6);
        assert_eq!(config.estimation.lag_time, 5);
        assert!(!config.estimation.reversible);
    }

    #[test]
    fn missing_num_states_is_a_config_error() {
        let partial = PartialAnalysisConfig::default();
        let err = partial.merge_with_cli(&bare_fit_args()).unwrap_err();
        assert!(matches!(err, CliError::Engine(_)));
    }

    #[test]
    fn unknown_model_kind_is_rejected() {
        let partial: PartialAnalysisConfig = toml::from_str(
            r#"
            [discretization]
            num-states = 3

            [estimation]
            model = "neural"
            "#,
        )
        .unwrap();
        let err = partial.merge_with_cli(&bare_fit_args()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
