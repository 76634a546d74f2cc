//! Fluxfolio server entry point
//!
//! Loads configuration, wires the NEAR, relay and job clients into the
//! orchestrator and serves the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fluxfolio_api::{build_router, AppState, InMemorySessionStore};
use fluxfolio_config::{AppConfig, ConfigLoader};
use fluxfolio_intents::{IntentBuilder, IntentsContract, NonceService, TokenRegistry};
use fluxfolio_jobs::{JobTracker, SqliteJobStore};
use fluxfolio_metrics::{init_tracing_with_metrics, MetricsCollector, MetricsServer};
use fluxfolio_mpc::ThresholdSigner;
use fluxfolio_orchestrator::{
    InMemoryUserStore, JobRunner, NearAccountProvider, Orchestrator, OrchestratorConfig,
    Services, SettlementConfig, UserStore,
};
use fluxfolio_polling::PollConfig;
use fluxfolio_relay::RelayClient;
use fluxfolio_rpc::{InMemorySigner, NearAccount, NearRpcClient};
use fluxfolio_types::UserAccount;
use tracing::{error, info, warn};

/// Fluxfolio API server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML, YAML or JSON); FLUXFOLIO_* variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<String>,

    /// Register an empty user and print a session token for it (local testing)
    #[arg(long)]
    seed_user: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::load(args.config.as_deref()).context("loading configuration")?;

    let metrics = Arc::new(MetricsCollector::new());
    init_tracing_with_metrics(
        &config.network.log_level,
        config.network.json_logs,
        metrics.clone(),
    )?;

    info!(
        environment = ?config.network.environment,
        rpc_url = %config.near.rpc_url,
        relay_url = %config.relay.solver_relay_url,
        "starting Fluxfolio"
    );

    let runner = build_runner(&config, metrics.clone()).await?;
    let sessions = Arc::new(InMemorySessionStore::new());

    if let Some(user_id) = &args.seed_user {
        runner
            .orchestrator()
            .users()
            .save_user(&UserAccount::new(user_id.as_str()))
            .await?;
        let session = sessions
            .issue(user_id, chrono::Duration::seconds(config.api.session_ttl_secs))
            .await?;
        info!(user_id = %user_id, token = %session.token, "seeded user session");
    }

    if config.network.metrics_enabled {
        let addr = format!("0.0.0.0:{}", config.network.metrics_port);
        let server = MetricsServer::new(metrics.clone(), addr);
        tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                error!(error = %e, "metrics server stopped");
            }
        });
    }

    let app = build_router(AppState::new(runner.clone(), sessions));

    let addr = args.listen.unwrap_or_else(|| config.api.listen_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "Fluxfolio API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let aborted = runner.running();
    if aborted > 0 {
        warn!(jobs = aborted, "aborting unfinished workflows");
    }
    runner.shutdown();

    Ok(())
}

async fn build_runner(
    config: &AppConfig,
    metrics: Arc<MetricsCollector>,
) -> anyhow::Result<JobRunner> {
    let rpc = Arc::new(NearRpcClient::new(
        config.near.rpc_url.clone(),
        config.near.request_timeout(),
    ));

    let agent_key = config
        .near
        .agent_secret_key
        .as_deref()
        .context("near.agent_secret_key is required to run workflows")?;
    let agent_signer = InMemorySigner::from_secret_key(config.near.agent_account_id.clone(), agent_key)?;
    let agent = Arc::new(
        NearAccount::new(rpc.clone(), agent_signer).with_commit_timeout(config.near.commit_timeout()),
    );

    let relay = Arc::new(
        RelayClient::new(
            config.relay.solver_relay_url.clone(),
            config.relay.bridge_url.clone(),
            metrics.clone(),
        )
        .with_timeout(config.relay.timeout()),
    );

    let store = SqliteJobStore::connect(&config.jobs.database_url).await?;
    let tracker = JobTracker::new(Arc::new(store), metrics.clone());

    let tokens: Arc<TokenRegistry> = Arc::new(config.tokens.iter().collect());
    let nonces = NonceService::new(Arc::new(IntentsContract::new(
        rpc.clone(),
        config.near.intents_contract.clone(),
    )))
    .with_max_attempts(config.nonce.max_attempts);
    let intents = IntentBuilder::new(nonces, tokens.clone())
        .with_verifying_contract(config.near.intents_contract.clone())
        .with_ttl(chrono::Duration::seconds(config.intents.ttl_secs));

    let signer = ThresholdSigner::new(metrics.clone())
        .with_poll_config(PollConfig::from_timeout(
            config.signature.timeout(),
            config.signature.poll_interval(),
        ))
        .with_gas(config.signature.gas)
        .with_deposit(u128::from(config.signature.deposit));

    let services = Services {
        intents,
        assets: tokens,
        signer: Arc::new(signer),
        agent,
        viewer: rpc.clone(),
        relay: relay.clone(),
        bridge: relay,
        users: Arc::new(InMemoryUserStore::new()),
        accounts: Arc::new(NearAccountProvider::new(rpc, config.near.commit_timeout())),
        tracker,
        metrics,
    };

    let orchestrator_config = OrchestratorConfig {
        proxy_contract: config.near.proxy_contract.clone(),
        mpc_signer_contract: config.near.mpc_signer_contract.clone(),
        registrar: config.near.registrar.clone(),
        initial_balance: config.account.initial_balance_yocto()?,
        portfolio_deposit: u128::from(config.account.portfolio_deposit),
        settlement: SettlementConfig {
            interval: config.settlement.interval(),
            max_attempts: config.settlement.max_attempts,
            not_found_grace: config.settlement.not_found_grace,
        },
    };

    Ok(JobRunner::new(Arc::new(Orchestrator::new(
        orchestrator_config,
        services,
    ))))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
