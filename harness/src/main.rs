//! Acceptance harness runner
//!
//! Brings the rig up over the in-memory broker model, attaches the
//! credit-offer double as the reacting service, and runs scenarios by
//! name. Each scenario resets its own isolation before running, so a
//! failure never stops the rest of the catalog from being attempted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::time::timeout;

use harness::scenario::catalog;
use harness::{
    CreditOfferDouble, HarnessConfig, MemoryTransport, PromotionsStore, Rig, ScenarioOutcome,
    Transport,
};
use stubs::{AuthServiceStub, CreditServiceStub};

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Acceptance harness for the promotion-credit service")]
struct Args {
    /// Scenario to run ("all" runs the whole catalog)
    #[arg(long, default_value = "all")]
    scenario: String,

    /// Overall run timeout in seconds
    #[arg(long, default_value = "120")]
    timeout_secs: u64,

    /// Enable verbose tracing output
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    shared::logging::init(args.verbose);

    tracing::info!("starting acceptance harness");
    tracing::info!("scenario selection: {}", args.scenario);

    let result = timeout(
        Duration::from_secs(args.timeout_secs),
        run(&args.scenario),
    )
    .await;

    match result {
        Ok(Ok(())) => {
            tracing::info!("scenario run '{}' passed", args.scenario);
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("scenario run '{}' failed: {}", args.scenario, e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("run timed out after {}s", args.timeout_secs);
            Err("run timeout".into())
        }
    }
}

async fn run(selection: &str) -> Result<(), Box<dyn std::error::Error>> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let config = HarnessConfig::default();
    let store = PromotionsStore::open_in_memory()?;

    let credit_stub = CreditServiceStub::start(config.credit_stub_port).await?;
    let auth_stub = AuthServiceStub::start(config.auth_stub_port).await?;

    // The double owns the registration queue and its DLQ; it must declare
    // them before the rig's passive declarations run.
    let double = CreditOfferDouble::start(
        transport.clone(),
        store.clone(),
        credit_stub.base_url(),
        auth_stub.base_url(),
    )
    .await?;

    let rig = Rig::start(transport, store, credit_stub, auth_stub, config).await?;
    let mut orchestrator = rig.orchestrator();

    let names: Vec<&str> = if selection == "all" {
        catalog::available_scenarios()
    } else {
        vec![selection]
    };

    let mut failures = Vec::new();
    for name in names {
        let Some(scenario) = catalog::scenario(name) else {
            double.shutdown();
            rig.shutdown();
            return Err(format!(
                "unknown scenario '{}'. Available: {}",
                name,
                catalog::available_scenarios().join(", ")
            )
            .into());
        };

        match orchestrator.run(&scenario).await {
            Ok(ScenarioOutcome::Verified) => {
                tracing::info!("scenario '{}': VERIFIED", name);
            }
            Ok(ScenarioOutcome::Failed { step, error }) => {
                tracing::error!("scenario '{}': FAILED at {:?}: {}", name, step, error);
                failures.push(name.to_string());
            }
            Err(error) => {
                tracing::error!("scenario '{}': isolation reset failed: {}", name, error);
                failures.push(name.to_string());
            }
        }
    }

    double.shutdown();
    rig.shutdown();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("{} scenario(s) failed: {}", failures.len(), failures.join(", ")).into())
    }
}
