//! kneeload CLI entry point

use anyhow::{Context, Result};
use kneeload::analyzer::KneeAnalyzer;
use kneeload::calibration::BaselineCalibrator;
use kneeload::config::cli::{Cli, Mode};
use kneeload::config::{convert, toml_config, validator, RunConfig, TransportKind};
use kneeload::controller::StepController;
use kneeload::output;
use kneeload::summary::{Summary, SummaryInputs};
use kneeload::telemetry::rest_counters::RestCountersAdapter;
use kneeload::telemetry::snmp::{Profile as SnmpWireProfile, SnmpAdapter};
use kneeload::transport::client::ClientTransport;
use kneeload::transport::negotiator;
use kneeload::transport::raw::RawTransport;
use kneeload::transport::Transport;
use kneeload::workload::{KeyCounter, WorkloadContext};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("kneeload=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kneeload=info,warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_config() -> Result<RunConfig> {
    let mut cli = Cli::parse_args();

    let common = match &mut cli.mode {
        Mode::Closed(args) | Mode::Rate(args) => args,
    };
    if let Some(path) = common.config.clone() {
        let file = toml_config::load(Path::new(&path)).with_context(|| format!("loading config file {path}"))?;
        toml_config::apply(&file, common);
    }

    let cfg = convert::from_cli(cli.mode).context("converting CLI arguments")?;
    validator::validate(&cfg).context("validating configuration")?;
    Ok(cfg)
}

async fn build_transport(cfg: &RunConfig, client: reqwest::Client) -> Arc<dyn Transport> {
    match cfg.transport {
        TransportKind::Raw => Arc::new(RawTransport::new(client, cfg.url.clone(), cfg.database.clone(), cfg.compression)),
        TransportKind::Client => Arc::new(ClientTransport::new(client, cfg.url.clone(), cfg.database.clone())),
    }
}

async fn preload_keyspace(cfg: &RunConfig, transport: &Arc<dyn Transport>) -> Result<()> {
    if cfg.preload == 0 {
        return Ok(());
    }
    tracing::info!(count = cfg.preload, "preloading keyspace");
    let mut payloads = kneeload::payload::PayloadGenerator::new(cfg.seed);
    const CONCURRENCY: usize = 32;
    let mut in_flight = Vec::with_capacity(CONCURRENCY);
    for id in 1..=cfg.preload {
        let payload = payloads.get(cfg.doc_size_bytes, id);
        let transport = Arc::clone(transport);
        in_flight.push(tokio::spawn(async move { transport.put_document(id, &payload).await }));
        if in_flight.len() >= CONCURRENCY {
            for handle in in_flight.drain(..) {
                handle.await.context("preload task panicked")??;
            }
        }
    }
    for handle in in_flight {
        handle.await.context("preload task panicked")??;
    }
    Ok(())
}

fn snmp_wire_profile(profile: kneeload::config::SnmpProfile) -> SnmpWireProfile {
    match profile {
        kneeload::config::SnmpProfile::Minimal => SnmpWireProfile::Minimal,
        kneeload::config::SnmpProfile::Extended => SnmpWireProfile::Extended,
    }
}

async fn connect_snmp(cfg: &RunConfig) -> Option<SnmpAdapter> {
    if !cfg.telemetry.snmp_enabled {
        return None;
    }
    let url = reqwest::Url::parse(&cfg.url).ok()?;
    let host = url.host_str()?;
    let lookup = format!("{host}:{}", cfg.telemetry.snmp_port);
    let addr = tokio::net::lookup_host(lookup).await.ok()?.next()?;
    match SnmpAdapter::connect(addr, kneeload::telemetry::snmp::DEFAULT_COMMUNITY, cfg.telemetry.snmp_timeout, snmp_wire_profile(cfg.telemetry.snmp_profile)).await {
        Ok(adapter) => Some(adapter),
        Err(err) => {
            tracing::warn!(%err, "SNMP telemetry disabled: connection failed");
            None
        }
    }
}

fn build_rest_adapter(cfg: &RunConfig, client: reqwest::Client) -> Option<RestCountersAdapter> {
    if !cfg.telemetry.rest_counters_enabled {
        return None;
    }
    let endpoint = format!("{}/admin/debug/server-info", cfg.url.trim_end_matches('/'));
    Some(RestCountersAdapter::new(client, endpoint))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = build_config()?;
    init_tracing(cfg.output.verbose);

    tracing::info!(url = %cfg.url, database = %cfg.database, "starting run");

    let (effective_http_version, negotiated_client) = negotiator::negotiate(&cfg.url, cfg.http_version, cfg.strict_http_version)
        .await
        .context("negotiating HTTP version")?;
    tracing::info!(?effective_http_version, "negotiated transport protocol");

    let cfg = Arc::new(cfg);
    let transport = build_transport(&cfg, negotiated_client.clone()).await;
    transport.validate().await.context("target reachability check failed")?;

    preload_keyspace(&cfg, &transport).await?;

    let calibrator = BaselineCalibrator::new(transport.as_ref());
    let calibration = calibrator.run().await;
    tracing::info!(floor_us = ?calibration.run_wide_floor_us(), "baseline calibration complete");

    let ctx = Arc::new(WorkloadContext {
        keys: Arc::new(KeyCounter::new(cfg.preload)),
        doc_size_bytes: cfg.doc_size_bytes,
        distribution: cfg.distribution,
        mix: cfg.mix,
        seed: cfg.seed,
    });

    let rest_adapter = build_rest_adapter(&cfg, negotiated_client.clone());
    let snmp_adapter = connect_snmp(&cfg).await;

    let mut controller = StepController::new(Arc::clone(&cfg), Arc::clone(&transport), ctx, &calibration, rest_adapter, snmp_adapter);
    let steps = controller.run().await;

    let analyzer = KneeAnalyzer::new(cfg.knee);
    let analysis = analyzer.analyze(&steps);

    let summary = Summary::assemble(SummaryInputs {
        cfg: &cfg,
        steps,
        knee: analysis.knee,
        verdict: analysis.verdict,
        negotiated_http_version: effective_http_version,
        calibration: &calibration,
    });

    output::text::print_summary(&summary);

    if let Some(path) = &cfg.output.json_path {
        output::json::write(&summary, Path::new(path)).with_context(|| format!("writing JSON output to {path}"))?;
        tracing::info!(%path, "wrote JSON summary");
    }
    if let Some(path) = &cfg.output.csv_path {
        output::csv::write(&summary, Path::new(path), cfg.telemetry.snmp_enabled).with_context(|| format!("writing CSV output to {path}"))?;
        tracing::info!(%path, "wrote CSV summary");
    }

    Ok(())
}
