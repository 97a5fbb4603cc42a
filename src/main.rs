use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, LevelFilter};
use tokio::sync::mpsc;

use fnol_triage::{
    format_run_report, read_fnol_text, FnolPipeline, PipelineConfig, PipelineEvent, Result,
    DEFAULT_INPUT_PATH,
};

#[derive(Parser, Debug)]
#[command(name = "fnol-triage")]
#[command(author, version, about = "Extract, assess and route FNOL claims with Gemini", long_about = None)]
struct Cli {
    /// Path to the FNOL narrative text file
    #[arg(short, long, default_value = DEFAULT_INPUT_PATH)]
    input: PathBuf,

    /// Let the model critique and refine its own extraction
    #[arg(short, long)]
    feedback: bool,

    /// Write the full run as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); falls back to RUST_LOG
    #[arg(short, long)]
    log_level: Option<LevelFilter>,
}

fn setup_logging(level: Option<LevelFilter>) {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        builder.filter_level(level);
    } else if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(LevelFilter::Info);
    }
    builder.init();
}

fn describe(event: &PipelineEvent) -> Option<String> {
    let line = match event {
        PipelineEvent::Extracting => "[STAGE I] Extracting claim information...".to_string(),
        PipelineEvent::Extracted { claims } => format!("[STAGE I] {} claim(s) found", claims),
        PipelineEvent::CritiqueReceived {
            round,
            score,
            json_valid,
            issues,
        } => format!(
            "[REVIEW] Round {}: score {}/10, json_valid {}, {} issue(s)",
            round, score, json_valid, issues
        ),
        PipelineEvent::Refined { round, claims } => {
            format!("[REVIEW] Round {}: refined to {} claim(s)", round, claims)
        }
        PipelineEvent::RefinementRejected { round, reason } => {
            format!("[REVIEW] Round {}: refinement rejected ({})", round, reason)
        }
        PipelineEvent::Converged { round } => format!("[REVIEW] Converged after round {}", round),
        PipelineEvent::Exhausted { rounds } => {
            format!("[REVIEW] Stopped after {} round(s) without converging", rounds)
        }
        PipelineEvent::AssessingSeverity => {
            "[STAGE II] Assessing claim severity and estimating costs...".to_string()
        }
        PipelineEvent::Routing => "[STAGE III] Routing claims to queues...".to_string(),
        _ => return None,
    };
    Some(line)
}

async fn run(cli: Cli) -> Result<()> {
    let text = read_fnol_text(&cli.input)?;
    info!("Read {} bytes from {}", text.len(), cli.input.display());

    let config = PipelineConfig::from_env()?.with_feedback(cli.feedback);

    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = describe(&event) {
                println!("{}", line);
            }
        }
    });

    let pipeline = FnolPipeline::from_config(&config)?.with_progress(tx);
    let result = pipeline.run(&text).await;
    drop(pipeline);
    let _ = printer.await;
    let run = result?;

    println!("{}", format_run_report(&text, &run));

    if let Some(path) = &cli.output {
        write_run(path, &run)?;
        println!("Run written to {}", path.display());
    }
    Ok(())
}

fn write_run(path: &Path, run: &fnol_triage::PipelineRun) -> Result<()> {
    let json = serde_json::to_string_pretty(run)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    setup_logging(cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
