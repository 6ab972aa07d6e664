// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;

use fabricsim::config::RootConfig;
use fabricsim::error::{ConfigError, SimError};
use fabricsim::result::ResultSummary;
use fabricsim::scenario::dp_heavy::DpHeavyParams;
use fabricsim::scenario::mixed::MixedParams;
use fabricsim::{result, topology_su};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Path to the YAML run configuration.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
    /// Directory logs and result summaries are written under.
    #[arg(short, long, default_value = "results")]
    results_dir: PathBuf,
}

/// Console logger at `info` plus a rolling file appender under `results_dir`, named by
/// topology+scenario. `file_debug` drops the file appender's threshold to `debug` so
/// per-event detail lands on disk without flooding the console.
fn init_logging(results_dir: &std::path::Path, run_name: &str, file_debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(results_dir)?;
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{h({l})} {t} - {m}{n}")))
        .build();

    let log_path = results_dir.join(format!("{run_name}.log"));
    let roller = FixedWindowRoller::builder().build(&format!("{}.{{}}.gz", log_path.display()), 5)?;
    let trigger = SizeTrigger::new(10 * 1024 * 1024);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));
    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%dT%H:%M:%S%.3f)} {l} {t} - {m}{n}")))
        .build(&log_path, Box::new(policy))?;

    let file_level = if file_debug { LevelFilter::Debug } else { LevelFilter::Info };
    let config = LogConfig::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Info)))
                .build("console", Box::new(console)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(file_level)))
                .build("file", Box::new(file)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(LevelFilter::Debug),
        )?;
    log4rs::init_config(config)?;
    Ok(())
}

fn run_name(config: &RootConfig) -> String {
    format!("{}-{}", config.topology.kind, config.scenario.name)
}

fn build_and_run(config: &RootConfig) -> Result<ResultSummary, SimError> {
    let mut net = fabricsim::network::Network::new();
    net.message_verbose = config.run.message_verbose;
    net.full_trace = config.run.visualize;

    let built_topology = topology_su::build(&mut net, 0, &config.topology, config.topology.seed);
    if config.run.verbose_route {
        for node in &mut net.nodes {
            node.verbose_route = true;
        }
    }
    log::info!(
        "topology built: {} hosts, {} switches, {} links ({} failed)",
        built_topology.hosts.len(),
        built_topology.switches.len(),
        built_topology.link_ids.len(),
        built_topology.failed_link_count,
    );

    let mut hosts = built_topology.hosts.clone();
    hosts.sort_by_key(|&h| net.nodes[h].name.clone());

    match config.scenario.name.as_str() {
        "ai-factory-su-workload1-dp-heavy" => {
            let params: DpHeavyParams = serde_yaml::from_value(config.scenario.params.clone()).map_err(|source| {
                SimError::Config(ConfigError::Yaml {
                    path: "scenario.params".to_string(),
                    source,
                })
            })?;
            fabricsim::scenario::dp_heavy::build(&mut net, hosts, &params).map_err(SimError::Config)?;
        }
        "ai-factory-su-mixed_scenario" => {
            let params: MixedParams = serde_yaml::from_value(config.scenario.params.clone()).map_err(|source| {
                SimError::Config(ConfigError::Yaml {
                    path: "scenario.params".to_string(),
                    source,
                })
            })?;
            fabricsim::scenario::mixed::build(&mut net, hosts, &params).map_err(SimError::Config)?;
        }
        other => return Err(SimError::Config(ConfigError::UnsupportedScenario(other.to_string()))),
    }
    log::info!("scenario {} installed, running", config.scenario.name);

    net.run();
    log::info!("run finished at t={:.6}s", net.scheduler.end_time().unwrap_or(0.0));

    Ok(result::build(
        &net,
        built_topology.hosts.len(),
        built_topology.switches.len(),
        built_topology.failed_link_count,
        &config.topology,
        &config.scenario.name,
    ))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match RootConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let name = run_name(&config);
    if let Err(err) = init_logging(&args.results_dir, &name, config.run.file_debug) {
        eprintln!("warning: failed to initialize logging: {err}");
    }

    let summary = match build_and_run(&config) {
        Ok(summary) => summary,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let summary_path = args.results_dir.join(format!("{name}.json"));
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            if let Err(err) = std::fs::write(&summary_path, json) {
                log::error!("failed to write result summary to {}: {err}", summary_path.display());
                return ExitCode::FAILURE;
            }
            log::info!("result summary written to {}", summary_path.display());
        }
        Err(err) => {
            log::error!("failed to serialize result summary: {err}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
