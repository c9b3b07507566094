use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use veritor::config::EngineConfig;
use veritor::error::Result;
use veritor::pipeline::{ControlLoop, PipelineStage, SessionContext, StageOutput};
use veritor::scoring::ScoringService;
use veritor::solution::{DomainKnowledge, QueryIntent, SolutionCandidate};
use veritor::verification::{VerificationOutcome, VerificationService};

#[derive(Parser)]
#[command(name = "veritor", about = "Quality evaluation and refinement control loop")]
struct Cli {
    /// Directory containing veritor.toml (defaults pick up when absent).
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a candidate once and print the assessment.
    Score {
        /// Candidate solution JSON.
        candidate: PathBuf,
        #[arg(long)]
        knowledge: Option<PathBuf>,
        #[arg(long)]
        intent: Option<PathBuf>,
    },
    /// Run the full control loop (with a file-backed generation stand-in)
    /// through verification and finalization.
    Run {
        candidate: PathBuf,
        #[arg(long)]
        knowledge: Option<PathBuf>,
        #[arg(long)]
        intent: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("veritor=debug")
    } else {
        EnvFilter::new("veritor=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

/// Stand-in for the external generation stage: serves a candidate read from
/// disk and returns it unchanged on refine.
struct FileGenerationStage {
    candidate: SolutionCandidate,
}

#[async_trait]
impl PipelineStage for FileGenerationStage {
    fn stage_id(&self) -> &'static str {
        "solution_generation"
    }

    async fn process(&self, _prompt: &str, _ctx: &mut SessionContext) -> Result<StageOutput> {
        Ok(StageOutput::Candidate(self.candidate.clone()))
    }

    async fn refine(
        &self,
        _prompt: &str,
        _ctx: &mut SessionContext,
        _previous: &StageOutput,
    ) -> Result<StageOutput> {
        Ok(StageOutput::Candidate(self.candidate.clone()))
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Arc::new(EngineConfig::load(&cli.config_dir).await?);

    match cli.command {
        Commands::Score {
            candidate,
            knowledge,
            intent,
        } => {
            let candidate: SolutionCandidate = read_json(&candidate).await?;
            let knowledge = read_optional::<DomainKnowledge>(knowledge).await?;
            let intent = read_optional::<QueryIntent>(intent).await?;

            let scoring = ScoringService::new(&config);
            let assessment = scoring.evaluate(&candidate, &knowledge, &intent);

            println!("{}", style("Quality assessment").bold());
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }
        Commands::Run {
            candidate,
            knowledge,
            intent,
        } => {
            let candidate: SolutionCandidate = read_json(&candidate).await?;
            let knowledge = read_optional::<DomainKnowledge>(knowledge).await?;
            let intent = read_optional::<QueryIntent>(intent).await?;

            let generation = Box::new(FileGenerationStage { candidate });
            let control = ControlLoop::new(
                generation,
                ScoringService::new(&config),
                VerificationService::new(&config),
                config.pipeline.max_refinement_iterations,
            );

            let mut ctx = SessionContext::new(config.clone());
            ctx.insert_output("domain_knowledge", StageOutput::Knowledge(knowledge));
            ctx.insert_output("query_processing", StageOutput::Intent(intent));

            let result = control.run("evaluate candidate", &mut ctx).await?;

            let headline = match &result.outcome {
                VerificationOutcome::Finalized(response) => format!(
                    "{} final quality {:.2}",
                    style("finalized").green().bold(),
                    response.final_quality_score
                ),
                VerificationOutcome::Failed(failure) => format!(
                    "{} {}",
                    style("verification failed").red().bold(),
                    failure.report.summary()
                ),
            };
            println!("{headline}");
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

async fn read_optional<T: serde::de::DeserializeOwned + Default>(
    path: Option<PathBuf>,
) -> Result<T> {
    match path {
        Some(path) => read_json(&path).await,
        None => Ok(T::default()),
    }
}
