// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use gatewaydns::{
    constants::{
        DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_REQUEUE_INTERVAL_SECS,
        ERROR_REQUEUE_DURATION_SECS, KIND_DNS_POLICY, METRICS_SERVER_BIND_ADDRESS,
        METRICS_SERVER_PATH, TOKIO_WORKER_THREADS,
    },
    context::{Context, ControllerSettings, Stores},
    crd::{DNSPolicy, Gateway},
    dns::factory::ProviderCache,
    dns_errors::DnsError,
    metrics,
    reconcilers::reconcile_dnspolicy,
    selector::find_policies_for_gateway,
    status_reasons::reason_for_error,
};
use kube::{
    runtime::{controller::Action, reflector, watcher, Controller, WatchStreamExt},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Multi-cluster Gateway DNS controller
#[derive(Parser, Debug)]
#[command(name = "gatewaydns", version, about)]
struct Args {
    /// Address the Prometheus metrics endpoint listens on
    #[arg(long, env = "GATEWAYDNS_METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    metrics_bind_address: String,

    /// Periodic resync of every DNSPolicy, in seconds
    #[arg(long, env = "GATEWAYDNS_REQUEUE_INTERVAL_SECS", default_value_t = DEFAULT_REQUEUE_INTERVAL_SECS)]
    requeue_interval_secs: u64,

    /// Requeue delay after a failed reconciliation, in seconds
    #[arg(long, env = "GATEWAYDNS_ERROR_REQUEUE_SECS", default_value_t = ERROR_REQUEUE_DURATION_SECS)]
    error_requeue_secs: u64,

    /// Upper bound for one reconciliation pass, in seconds
    #[arg(long, env = "GATEWAYDNS_RECONCILE_TIMEOUT_SECS", default_value_t = DEFAULT_RECONCILE_TIMEOUT_SECS)]
    reconcile_timeout_secs: u64,

    /// Only watch DNSPolicies and Gateways in this namespace
    #[arg(long, env = "GATEWAYDNS_WATCH_NAMESPACE")]
    watch_namespace: Option<String>,
}

impl Args {
    fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            requeue_interval: Duration::from_secs(self.requeue_interval_secs),
            error_requeue: Duration::from_secs(self.error_requeue_secs),
            reconcile_timeout: Duration::from_secs(self.reconcile_timeout_secs),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("gatewaydns-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn init_tracing() {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing();

    info!("Starting gatewaydns controller");
    debug!(?args, "Parsed controller arguments");

    let client = Client::try_default().await?;

    let (policies, gateways): (Api<DNSPolicy>, Api<Gateway>) = match &args.watch_namespace {
        Some(namespace) => {
            info!(namespace = %namespace, "Watching a single namespace");
            (
                Api::namespaced(client.clone(), namespace),
                Api::namespaced(client.clone(), namespace),
            )
        }
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    tokio::select! {
        result = run_dnspolicy_controller(
            client.clone(),
            policies,
            gateways,
            args.watch_namespace.clone(),
            args.settings(),
        ) => {
            error!("CRITICAL: DNSPolicy controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DNSPolicy controller exited unexpectedly without error")
        }
        result = run_metrics_server(args.metrics_bind_address.clone()) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Graceful shutdown completed successfully");
            Ok(())
        }
    }
}

/// Resolve when SIGTERM (pod termination) or SIGINT arrives.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, initiating graceful shutdown...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT, initiating graceful shutdown...");
    }
    Ok(())
}

/// Run the `DNSPolicy` controller, re-reconciling policies whenever a gateway they
/// target, or used to target, changes.
async fn run_dnspolicy_controller(
    client: Client,
    policies: Api<DNSPolicy>,
    gateways: Api<Gateway>,
    namespace: Option<String>,
    settings: ControllerSettings,
) -> Result<()> {
    info!("Starting DNSPolicy controller");

    let (gateway_store, gateway_writer) = reflector::store::<Gateway>();
    let gateway_reflector = reflector(
        gateway_writer,
        watcher(gateways.clone(), watcher::Config::default()),
    )
    .default_backoff()
    .applied_objects()
    .for_each(|event| {
        if let Err(e) = event {
            warn!(error = %e, "Gateway watch error");
        }
        futures::future::ready(())
    });

    let controller = Controller::new(policies, watcher::Config::default());
    let policy_store = controller.store();
    let ctx = Arc::new(Context {
        client,
        stores: Stores {
            dns_policies: policy_store.clone(),
            gateways: gateway_store,
            namespace,
        },
        providers: Arc::new(ProviderCache::new()),
        settings,
    });

    let controller = controller
        .watches(gateways, watcher::Config::default(), move |gateway| {
            find_policies_for_gateway(&policy_store, &gateway)
        })
        .run(reconcile_dnspolicy_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()));

    tokio::join!(gateway_reflector, controller);
    Ok(())
}

/// Reconcile wrapper for `DNSPolicy`
async fn reconcile_dnspolicy_wrapper(
    policy: Arc<DNSPolicy>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let requeue = ctx.settings.requeue_interval;

    match reconcile_dnspolicy(ctx, (*policy).clone()).await {
        Ok(()) => {
            metrics::record_reconciliation_success(KIND_DNS_POLICY, start.elapsed());
            info!(
                "Successfully reconciled DNSPolicy: {}/{}",
                policy.namespace().unwrap_or_default(),
                policy.name_any()
            );
            Ok(Action::requeue(requeue))
        }
        Err(e) => {
            metrics::record_reconciliation_error(KIND_DNS_POLICY, start.elapsed());
            metrics::record_error(KIND_DNS_POLICY, reason_for_error(&e));
            error!("Failed to reconcile DNSPolicy {}: {:#}", policy.name_any(), e);
            Err(e.into())
        }
    }
}

/// Error policy for the `DNSPolicy` controller.
///
/// Configuration errors only clear when a user edits a resource, so they wait for the
/// periodic resync instead of the short error requeue.
fn error_policy(_policy: Arc<DNSPolicy>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let permanent = err
        .0
        .chain()
        .find_map(|cause| cause.downcast_ref::<DnsError>())
        .is_some_and(|e| !e.is_transient());

    if permanent {
        metrics::record_reconciliation_requeue(KIND_DNS_POLICY, "permanent_error");
        Action::requeue(ctx.settings.requeue_interval)
    } else {
        metrics::record_reconciliation_requeue(KIND_DNS_POLICY, "error");
        Action::requeue(ctx.settings.error_requeue)
    }
}

/// Serve the Prometheus registry over HTTP.
async fn run_metrics_server(bind_address: String) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, path = METRICS_SERVER_PATH, "Serving metrics");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        ),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
