//! `bat`: inspect a dataset, train a model once and ask it for a forecast.

mod commands;

use anyhow::Result;
use bat_forecast::{ExperimentOptions, ProblemType, SortMetric};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::path::PathBuf;

/// CLI-compatible problem type enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProblemType {
    /// Predict a continuous value
    Regression,
    /// Predict a class label
    Classification,
}

impl From<CliProblemType> for ProblemType {
    fn from(cli: CliProblemType) -> Self {
        match cli {
            CliProblemType::Regression => ProblemType::Regression,
            CliProblemType::Classification => ProblemType::Classification,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Automated model search and single-row forecasts",
    long_about = "Load a CSV file, pick a numeric target column, let PyCaret compare \
                  candidate models and predict the target for one row of inputs.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  BAT_PYTHONPATH    Extra directories for Python's sys.path\n  \
                  RUST_LOG          Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Column types, missing values, memory use\n  \
                  bat describe sales.csv\n\n  \
                  # Features the model would see\n  \
                  bat schema sales.csv --target revenue\n\n  \
                  # Train and predict, overriding two inputs\n  \
                  bat forecast sales.csv --target revenue --value age=40 --value city=NY"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings, errors and the final result
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a dataset: shape, column types, missing values
    Describe {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// Resolve the feature schema for a target column
    Schema {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Train a model and predict the target for one row
    Forecast {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        experiment: ExperimentArgs,

        /// Feature value as name=value; unset features use the column mean
        /// or the first observed category
        #[arg(long = "value", value_name = "NAME=VALUE")]
        values: Vec<String>,

        /// Print the session status and prediction as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Path to the CSV file
    file: PathBuf,

    /// Numeric column to predict
    #[arg(short, long)]
    target: String,

    /// Columns to leave out of modelling (comma-separated or repeated)
    #[arg(short, long, value_delimiter = ',')]
    exclude: Vec<String>,
}

#[derive(Args, Debug)]
struct ExperimentArgs {
    /// Kind of model to search for
    #[arg(long, value_enum, default_value = "regression")]
    problem_type: CliProblemType,

    /// Metric to rank models by (e.g. rmse, mae, r2, accuracy)
    #[arg(long)]
    sort_metric: Option<SortMetric>,

    /// Do not scale numeric features
    #[arg(long)]
    no_normalize: bool,

    /// Do not apply a power transformation
    #[arg(long)]
    no_transformation: bool,

    /// Keep highly correlated features
    #[arg(long)]
    keep_multicollinear: bool,

    /// Correlation above which features count as collinear (0.0 - 1.0)
    #[arg(long, default_value = "0.95")]
    multicollinearity_threshold: f64,

    /// Cross-validation folds
    #[arg(long)]
    fold: Option<u32>,

    /// Only compare these model ids (e.g. lr,ridge,rf)
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

impl ExperimentArgs {
    fn to_options(&self) -> Result<ExperimentOptions> {
        let mut builder = ExperimentOptions::builder()
            .problem_type(self.problem_type.into())
            .normalize(!self.no_normalize)
            .transformation(!self.no_transformation)
            .remove_multicollinearity(!self.keep_multicollinear)
            .multicollinearity_threshold(self.multicollinearity_threshold)
            .session_id(self.seed)
            .include_models(self.include.iter().cloned());

        if let Some(metric) = self.sort_metric {
            builder = builder.sort_metric(metric);
        }
        if let Some(fold) = self.fold {
            builder = builder.fold(fold);
        }

        Ok(builder.build()?)
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, only warnings and errors are logged (to
/// stderr) so stdout carries nothing but the JSON document.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet || json_output { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let json = matches!(cli.command, Command::Forecast { json: true, .. });
    init_logging(&cli.log_level, cli.quiet, json);

    // Load environment variables (BAT_PYTHONPATH) from .env file
    dotenv().ok();

    match cli.command {
        Command::Describe { file } => commands::describe(&file),
        Command::Schema { data } => commands::schema(&data.file, &data.target, &data.exclude),
        Command::Forecast {
            data,
            experiment,
            values,
            json,
        } => {
            let options = experiment.to_options()?;
            let request = commands::ForecastRequest {
                file: data.file,
                target: data.target,
                exclude: data.exclude,
                options,
                values,
                json,
            };
            commands::forecast(request).await
        }
    }
}
