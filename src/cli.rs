use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capacity_pipeline::{
    FEATURES, PipelineCell, PipelineConfig, PredictionPipeline, PredictionRecord, Session,
    feature_symbols, fit_scaler,
};
use clap::{Args, Parser, Subcommand};
use log::info;

use crate::interactive;

static PIPELINE: PipelineCell = PipelineCell::new();

/// Predicts the ultimate flexural capacity (Mtest) of reinforced-concrete beams.
#[derive(Parser, Debug)]
#[command(name = "mtest", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict Mtest for a single beam
    Predict(PredictCommand),
    /// Fit scaling bounds on a reference dataset and persist them
    FitScaler(FitScalerCommand),
    /// Read beams from stdin, one per line, keeping a history
    Interactive(InteractiveCommand),
    /// Describe the six input features
    Features,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Pipeline config file, defaults to model.json and scaler.json in the working directory
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PredictCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Append the prediction to this CSV file
    #[arg(long, short = 's')]
    pub save: Option<PathBuf>,

    /// As, σ0.2, n, fc, b and d in this order
    #[arg(num_args = 6, value_name = "VALUE", allow_negative_numbers = true, required = true)]
    pub values: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FitScalerCommand {
    /// Reference dataset: a header row then six feature columns and the Mtest column
    #[arg(long, short = 'd')]
    pub dataset: PathBuf,

    /// Where to write the scaler artifact
    #[arg(long, short = 'o', default_value = "scaler.json")]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct InteractiveCommand {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Predict(cmd) => cmd.run(),
            Commands::FitScaler(cmd) => cmd.run(),
            Commands::Interactive(cmd) => cmd.run(),
            Commands::Features => {
                print!("{}", features_help());
                Ok(())
            }
        }
    }
}

impl ConfigArgs {
    /// Loads the config file if any, then applies the environment overrides.
    pub fn load(&self) -> Result<PipelineConfig> {
        let config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        Ok(config.with_env_overrides())
    }

    fn pipeline(&self) -> Result<&'static PredictionPipeline> {
        let config = self.load()?;
        Ok(PIPELINE.get_or_initialize(&config)?)
    }
}

impl PredictCommand {
    fn run(self) -> Result<()> {
        let pipeline = self.config.pipeline()?;
        let mut session = Session::new(pipeline);
        let record = session.predict(self.values.as_slice())?;

        println!("{}", format_prediction(&record));

        if let Some(path) = &self.save {
            session
                .save_last(path)
                .with_context(|| format!("saving to {}", path.display()))?;
        }

        Ok(())
    }
}

impl FitScalerCommand {
    fn run(self) -> Result<()> {
        write_scaler(&self.dataset, &self.out)?;
        println!("scaler written to {}", self.out.display());
        Ok(())
    }
}

impl InteractiveCommand {
    fn run(self) -> Result<()> {
        let pipeline = self.config.pipeline()?;
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        interactive::run(pipeline, stdin.lock(), stdout.lock())
    }
}

/// Fits the scaling bounds on `dataset` and writes them as a versioned artifact to `out`.
pub fn write_scaler(dataset: &Path, out: &Path) -> Result<()> {
    let scaler = fit_scaler(dataset)?;
    scaler
        .to_artifact(&feature_symbols())
        .save(out)
        .with_context(|| format!("writing {}", out.display()))?;

    info!(
        "persisted bounds of {} samples to {}",
        scaler.n_samples_seen(),
        out.display()
    );
    Ok(())
}

pub fn format_prediction(record: &PredictionRecord) -> String {
    format!("Mtest (kN·m): {:.2}", record.prediction)
}

/// The feature help text, one block per feature in input order.
pub fn features_help() -> String {
    FEATURES
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}\n   {}\n", i + 1, f.label(), f.description))
        .collect()
}
