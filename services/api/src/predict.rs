use crate::infra::build_matching_service;
use admission_match::config::AppConfig;
use admission_match::error::AppError;
use admission_match::matching::{MatchingService, RawApplicantProfile};
use admission_match::telemetry;
use clap::{Args, ValueEnum};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum PipelineArg {
    Priority,
    Ranking,
}

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// Which pipeline to run
    #[arg(long, value_enum)]
    pub(crate) pipeline: PipelineArg,
    /// JSON file holding one profile object or an array of profiles
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Ranking threshold override in [0, 1]
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
    /// Concurrency limit when the input is an array
    #[arg(long)]
    pub(crate) concurrency: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PredictInput {
    Batch(Vec<RawApplicantProfile>),
    Single(Box<RawApplicantProfile>),
}

pub(crate) async fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let service = build_matching_service(&config)?;
    let raw = std::fs::read(&args.input)?;
    let input: PredictInput = serde_json::from_slice(&raw)?;

    let output = predict(&service, &args, input).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub(crate) async fn predict(
    service: &MatchingService,
    args: &PredictArgs,
    input: PredictInput,
) -> Result<Value, AppError> {
    let output = match (args.pipeline, input) {
        (PipelineArg::Priority, PredictInput::Single(profile)) => {
            serde_json::to_value(service.priority(&profile)?)?
        }
        (PipelineArg::Ranking, PredictInput::Single(profile)) => {
            serde_json::to_value(service.ranking(&profile, args.threshold)?)?
        }
        (PipelineArg::Priority, PredictInput::Batch(profiles)) => serde_json::to_value(
            service.priority_batch(profiles, args.concurrency).await?,
        )?,
        (PipelineArg::Ranking, PredictInput::Batch(profiles)) => serde_json::to_value(
            service
                .ranking_batch(profiles, args.concurrency, args.threshold)
                .await?,
        )?,
    };
    Ok(output)
}
