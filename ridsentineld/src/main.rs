//! Main driver for the multi-transport drone Remote ID orchestrator.
//!
//! Usage:
//!
//! ```text
//! SDR-based drone Remote ID detection orchestrator.
//
// Usage: ridsentineld [OPTIONS]
//
// Options:
//   -c, --config <CONFIG>              configuration file
//   -f, --center-freq-hz <HZ>          center frequency, in Hz
//   -g, --gain-db <DB>                 receiver gain, in dB
//   -r, --sample-rate-hz <HZ>          sample rate, in Hz
//   -S, --scan-channels <EXPR>         channel-plan mini-language expression
//       --hop-interval-s <S>          seconds to dwell on each channel
//       --include-5ghz                 include 5 GHz UNII channels
//   -d, --device-args <ARGS>           Sample Source device-selector string
//       --no-ble                       disable the BLE ingestor
//   -v, --verbose...                   verbose mode
//       --generate-completion <SHELL>  print a shell completion script and exit
//   -h, --help                         print help
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use eyre::Result;
use ractor::Actor;
use ridsentinel_common::{close_logging, init_logging, ConfigEngine, Versioned};
use ridsentinel_engine::actors::{init_engine_runtime, StatsMsg};
use ridsentinel_engine::ble::{BleWorker, BleWorkerMsg, BleWorkerState};
use ridsentinel_engine::orchestrator::pubsub::{emit_best_effort, AmqpSink, PubSubSink};
use ridsentinel_engine::orchestrator::{enrich, heartbeat, DetectionIdAllocator, Hopper};
use ridsentinel_types::ChannelPlan;
use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use tracing::{error, info, trace, warn};

use ridsentineld::cli::Opts;
use ridsentineld::config::RidsentinelConfig;
use ridsentineld::error::Status;
use ridsentineld::sources::{NullBleSource, NullSampleSource};
use ridsentineld::{version, NAME};

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();

    if let Some(shell) = opts.generate_completion {
        generate(shell, &mut Opts::command(), NAME, &mut std::io::stdout());
        return ExitCode::from(0);
    }

    match run(opts).await {
        Ok(()) => ExitCode::from(0),
        Err(e) if e.downcast_ref::<Interrupted>().is_some() => ExitCode::from(130),
        Err(e) => {
            eprintln!("{NAME}: {e}");
            ExitCode::from(1)
        }
    }
}

/// Marker error: the term signal fired and we unwound cooperatively rather than
/// hitting a real fault.
#[derive(Debug, thiserror::Error)]
#[error("interrupted")]
struct Interrupted;

async fn run(opts: Opts) -> Result<()> {
    init_logging(NAME, false, opts.use_tree, opts.use_file.clone())?;
    trace!("{} starting.", version());

    let cfn = opts.config.as_ref().map(|p| p.to_string_lossy().to_string());
    let mut cfg = match ConfigEngine::<RidsentinelConfig>::load(cfn.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("no usable config file ({e}), falling back to defaults");
            RidsentinelConfig::new()
        }
    };

    if cfg.version() != ridsentineld::config::CVERSION {
        return Err(Status::BadFileVersion(cfg.version(), ridsentineld::config::CVERSION).into());
    }
    apply_overrides(&mut cfg, &opts);

    let scan_channels = cfg.remote_id.wifi.scan_channels.clone();
    let plan = ChannelPlan::parse(&scan_channels).map_err(|e| Status::BadChannelPlan(scan_channels.clone(), e.to_string()))?;
    let mut hopper = Hopper::new(plan);
    hopper.dwell = Duration::from_secs(cfg.system.hop_interval_s);
    info!("channel plan {scan_channels:?}: {} channel(s), dwell {:?}", hopper.plan.len(), hopper.dwell);

    let zones = cfg.data_fusion.zones();
    let operator_location = cfg.data_fusion.operator_location();
    let limits = cfg.data_fusion.threat_limits();

    let ctx = init_engine_runtime().await?;

    let mut sample_source = NullSampleSource::default();
    let wifi_ready = {
        use ridsentinel_engine::orchestrator::SampleSource;
        sample_source
            .initialize(
                &cfg.acquisition.device_args,
                cfg.acquisition.sample_rate_hz,
                cfg.acquisition.center_freq_hz,
                cfg.acquisition.gain_db,
                &cfg.acquisition.antenna,
            )
            .await
    };
    let ble_enabled = !opts.no_ble;

    if let Err(e) = wifi_ready {
        warn!("Sample Source unavailable ({e}), falling back to BLE-only mode");
        if !ble_enabled {
            return Err(Status::NoSourceConfigured.into());
        }
    }

    let sink: Option<AmqpSink> = match AmqpSink::connect(&cfg.mqtt.amqp_url, &cfg.mqtt.exchange).await {
        Ok(sink) => Some(sink),
        Err(e) => {
            warn!("pub/sub sink unavailable ({e}), detections will only be logged");
            None
        }
    };

    let (detections_tx, detections_rx) = sync_channel(cfg.acquisition.queue_depth);

    let ble_worker = if ble_enabled {
        let state = BleWorkerState {
            scan_window: Duration::from_secs(cfg.remote_id.ble.scan_window_s),
            backoff: ridsentinel_engine::ble::BackoffPolicy {
                min_delay_s: cfg.remote_id.ble.min_backoff_s,
                max_delay_s: cfg.remote_id.ble.max_backoff_s,
            },
            ..BleWorkerState::new(detections_tx.clone(), ctx.stats.clone(), Box::new(NullBleSource))
        };
        let (worker, _handle) = Actor::spawn_linked(Some("ble:worker".into()), BleWorker, state, ctx.supervisor.get_cell()).await?;
        worker.cast(BleWorkerMsg::Start)?;
        Some(worker)
    } else {
        None
    };
    drop(detections_tx);

    let term = Arc::new(AtomicBool::new(false));
    for sig in TERM_SIGNALS {
        flag::register_conditional_shutdown(*sig, 1, Arc::clone(&term))?;
        flag::register(*sig, Arc::clone(&term))?;
    }

    let mut allocator = DetectionIdAllocator::default();
    let heartbeat_interval = Duration::from_secs(cfg.system.heartbeat_interval_s);
    let mut last_heartbeat = tokio::time::Instant::now();

    info!("{} running (ble={ble_enabled})", version());
    while !term.load(Ordering::Relaxed) {
        match detections_rx.try_recv() {
            Ok(record) => {
                let id = allocator.allocate();
                let event = enrich(record, id, &zones, limits, operator_location);
                ctx.stats.cast(StatsMsg::Detection)?;
                info!(detection_id = id, "detection: {:?}", event.threat.as_ref().map(|t| t.level));
                if let Some(sink) = &sink {
                    emit_best_effort(sink, &event).await;
                }
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        if last_heartbeat.elapsed() >= heartbeat_interval {
            ctx.stats.cast(StatsMsg::Print)?;
            let health = heartbeat(NAME, Default::default(), 0, 0);
            if let Some(sink) = &sink {
                if let Err(e) = sink.publish_health(&health).await {
                    error!("heartbeat publish failed: {e}");
                }
            }
            last_heartbeat = tokio::time::Instant::now();
        }
    }

    info!("shutdown requested, draining…");
    if let Some(worker) = ble_worker {
        worker.stop(None);
    }
    ctx.stats.cast(StatsMsg::Exit)?;
    close_logging();
    Err(Interrupted.into())
}

fn apply_overrides(cfg: &mut RidsentinelConfig, opts: &Opts) {
    if let Some(v) = opts.center_freq_hz {
        cfg.acquisition.center_freq_hz = v;
    }
    if let Some(v) = opts.gain_db {
        cfg.acquisition.gain_db = v;
    }
    if let Some(v) = opts.sample_rate_hz {
        cfg.acquisition.sample_rate_hz = v;
    }
    if let Some(v) = &opts.scan_channels {
        cfg.remote_id.wifi.scan_channels = v.clone();
    }
    if let Some(v) = opts.hop_interval_s {
        cfg.system.hop_interval_s = v;
    }
    if opts.include_5ghz {
        cfg.remote_id.wifi.include_5ghz = true;
    }
    if let Some(v) = &opts.device_args {
        cfg.acquisition.device_args = v.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridsentineld::cli::Opts;
    use rstest::rstest;

    fn bare_opts() -> Opts {
        Opts::parse_from(["ridsentineld"])
    }

    #[rstest]
    #[case::center_freq(vec!["--center-freq-hz", "5740000000"], |cfg: &RidsentinelConfig| cfg.acquisition.center_freq_hz == 5_740_000_000)]
    #[case::gain(vec!["--gain-db", "12.5"], |cfg: &RidsentinelConfig| cfg.acquisition.gain_db == 12.5)]
    #[case::scan_channels(vec!["--scan-channels", "all"], |cfg: &RidsentinelConfig| cfg.remote_id.wifi.scan_channels == "all")]
    #[case::include_5ghz(vec!["--include-5ghz"], |cfg: &RidsentinelConfig| cfg.remote_id.wifi.include_5ghz)]
    fn overrides_apply_only_the_named_field(#[case] args: Vec<&str>, #[case] check: fn(&RidsentinelConfig) -> bool) {
        let mut argv = vec!["ridsentineld"];
        argv.extend(args);
        let opts = Opts::parse_from(argv);
        let mut cfg = RidsentinelConfig::new();
        apply_overrides(&mut cfg, &opts);
        assert!(check(&cfg));
    }

    #[test]
    fn no_flags_leaves_defaults_untouched() {
        let opts = bare_opts();
        let mut cfg = RidsentinelConfig::new();
        let before = cfg.clone();
        apply_overrides(&mut cfg, &opts);
        assert_eq!(before.acquisition.center_freq_hz, cfg.acquisition.center_freq_hz);
        assert_eq!(before.remote_id.wifi.scan_channels, cfg.remote_id.wifi.scan_channels);
    }
}
