use clap::Parser;
use std::fs;
use std::time::Instant;
use tenkan::prelude::*;
use tracing_subscriber::EnvFilter;

/// Migrates an orchestration process flow into a workflow action graph
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the orchestration source file. Omit to synthesize workflows
    /// from the bindings file alone.
    source: Option<String>,

    /// Path to the binding metadata JSON file
    #[arg(short, long)]
    bindings: Option<String>,

    /// Force a generic inbound trigger, for flows invoked by other flows
    #[arg(short, long)]
    callable: bool,

    /// Path to a TOML file with transform options
    #[arg(long)]
    config: Option<String>,

    /// Write the action graph here instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Enable debug diagnostics
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let start = Instant::now();
    let bindings = match &cli.bindings {
        Some(path) => BindingSet::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load bindings '{}': {}", path, e))
        }),
        None => BindingSet::default(),
    };
    let mut options = match &cli.config {
        Some(path) => TransformOptions::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load config '{}': {}", path, e))
        }),
        None => TransformOptions::default(),
    };
    options.callable |= cli.callable;

    let json = match &cli.source {
        Some(path) => {
            let workflow = run_source(path, bindings, options);
            report(&workflow);
            serde_json::to_string_pretty(&workflow)
        }
        None => {
            if bindings.is_empty() {
                exit_with_error("Either a source file or a non-empty bindings file is required.");
            }
            let workflows = synthesize_workflows(&bindings);
            for workflow in &workflows {
                report(workflow);
            }
            serde_json::to_string_pretty(&workflows)
        }
    }
    .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize output: {}", e)));

    match &cli.output {
        Some(path) => {
            fs::write(path, json).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to write output '{}': {}", path, e))
            });
            tracing::info!(path = %path, "Wrote action graph");
        }
        None => println!("{}", json),
    }
    tracing::info!(elapsed = ?start.elapsed(), "Done");
}

fn run_source(path: &str, bindings: BindingSet, options: TransformOptions) -> Workflow {
    let source = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read source '{}': {}", path, e)));
    let flow = parse_orchestration(&source)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse '{}': {}", path, e)));

    Transformer::builder(flow)
        .with_bindings(bindings)
        .with_options(options)
        .build()
        .transform()
}

/// Logs each finding at a level matching its severity.
fn report(workflow: &Workflow) {
    for finding in &workflow.findings {
        match finding.severity {
            Severity::Blocking | Severity::Warning => tracing::warn!(
                workflow = %workflow.name,
                subject = %finding.subject,
                severity = ?finding.severity,
                "{}",
                finding.message
            ),
            Severity::Info => tracing::info!(
                workflow = %workflow.name,
                subject = %finding.subject,
                "{}",
                finding.message
            ),
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
