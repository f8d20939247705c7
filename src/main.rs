//! Post-deploy health validation CLI.
//!
//! One-shot command: survey cluster resources, probe the deployed MFE
//! endpoints, and exit 0 (healthy), 1 (unhealthy), or 2 (cluster
//! unreachable).

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use checkup::cluster::KubeClusterClient;
use checkup::engine::{ValidationEngine, EXIT_FATAL};
use checkup::report::{CheckCategory, CheckOutcome, ConsoleReporter, JsonReporter, Reporter};
use checkup::HealthVerdict;

#[derive(Parser)]
#[command(name = "checkup")]
#[command(about = "Validate cluster resources and live MFE endpoints after a deploy")]
#[command(version)]
struct Cli {
    /// Kubernetes namespace to inspect (defaults to the kubeconfig context namespace)
    #[arg(short, long, env = "CHECKUP_NAMESPACE")]
    namespace: Option<String>,

    /// Output format
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Colorized console output
    Text,
    /// One JSON record per check
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("checkup=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("checkup=info,warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut reporter: Box<dyn Reporter> = match cli.format {
        OutputFormat::Text => Box::new(ConsoleReporter),
        OutputFormat::Json => Box::new(JsonReporter),
    };

    // No usable kubeconfig is the same fatal condition as an unreachable
    // API server: report it through the same boundary and abort.
    let cluster = match KubeClusterClient::try_default(cli.namespace).await {
        Ok(cluster) => cluster,
        Err(e) => {
            reporter.section(CheckCategory::Connectivity.title());
            let outcome =
                CheckOutcome::fail(CheckCategory::Connectivity, "control plane", e.to_string());
            reporter.outcome(&outcome);
            reporter.verdict(&HealthVerdict::aborted(vec![outcome.id()]));
            std::process::exit(EXIT_FATAL);
        }
    };

    let http = reqwest::Client::builder()
        .user_agent(concat!("checkup/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let engine = ValidationEngine::new(&cluster, http);
    let report = engine.run(reporter.as_mut()).await;

    std::process::exit(report.verdict.exit_code());
}
