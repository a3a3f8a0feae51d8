use std::env;
use std::process::ExitCode;

use anyhow::{Result, bail};

use sigmon::config::MonitorConfig;
use sigmon::fit::{CurveFamily, HistNorm};
use sigmon::report::{
    ChannelDistribution, DiffMode, ScanDiff, ScanSummary, TrackChannels, WeatherFilters,
};
use sigmon::store::Store;

const CONFIG_PATH: &str = "sigmon.toml";

const HELP: &str = "\
sigmon - signal monitor report tool

Usage:
  sigmon scan-summary [--antenna N] [--time EPOCH]
  sigmon scan-diff MEASUREMENT SCAN_A SCAN_B [--compare]
  sigmon track-channel [--antenna N]
  sigmon channel-dist [--channel N] [--antenna N] [--normal] [--histnorm MODE]

Options:
  --antenna N      antenna instance (default: configured antenna)
  --time EPOCH     pick the scan nearest this time (default: now)
  --compare        side-by-side bars instead of a difference chart
  --channel N      channel to fit (default: first watchable channel)
  --normal         fit a normal curve instead of a KDE
  --histnorm MODE  count | probability | density (default: count)

Prints the figure's trace list as JSON on stdout.
";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print!("{HELP}");
        return Ok(());
    };
    if command == "--help" || command == "-h" {
        print!("{HELP}");
        return Ok(());
    }

    let config = if std::path::Path::new(CONFIG_PATH).exists() {
        MonitorConfig::from_file(CONFIG_PATH)?
    } else {
        MonitorConfig::default()
    };
    let _guard = sigmon::logging::init_logging("logs", "sigmon", &config.log_level)?;
    tracing::info!(db = %config.db_path, "opening monitor database");

    let store = Store::new(&config.db_path, config.utc_offset_secs());
    let rest = &args[1..];

    let figure = match command.as_str() {
        "scan-summary" => {
            let antenna = flag_value(rest, "--antenna")?;
            let time = flag_value(rest, "--time")?;
            ScanSummary::new(&store).figure(antenna, time)?
        }
        "scan-diff" => {
            let positional = positionals(rest);
            let [measurement, a, b] = positional.as_slice() else {
                bail!("scan-diff needs MEASUREMENT SCAN_A SCAN_B");
            };
            let mode = if has_flag(rest, "--compare") {
                DiffMode::Compare
            } else {
                DiffMode::Diff
            };
            ScanDiff::new(&store).figure(measurement.as_str(), [a.parse()?, b.parse()?], mode)?
        }
        "track-channel" => {
            let antenna = flag_value(rest, "--antenna")?;
            TrackChannels::new(&store).figure(antenna)?
        }
        "channel-dist" => {
            let channel = flag_value(rest, "--channel")?;
            let antenna = flag_value(rest, "--antenna")?;
            let family = if has_flag(rest, "--normal") {
                CurveFamily::Normal
            } else {
                CurveFamily::Kde
            };
            let histnorm = match flag_str(rest, "--histnorm") {
                None | Some("count") => HistNorm::Count,
                Some("probability") => HistNorm::Probability,
                Some("density") => HistNorm::ProbabilityDensity,
                Some(other) => bail!("unknown histnorm mode '{other}'"),
            };
            let report = ChannelDistribution::new(&store).report(
                channel,
                antenna,
                family,
                histnorm,
                &WeatherFilters::default(),
            )?;
            tracing::info!(
                channel = report.channel,
                label = %report.channel_label,
                samples = report.effective_samples,
                "fitted channel distribution"
            );
            report.figure
        }
        other => bail!("unknown command '{other}' (try --help)"),
    };

    println!("{}", figure.to_json()?);
    Ok(())
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn flag_str<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn flag_value(args: &[String], name: &str) -> Result<Option<i64>> {
    match flag_str(args, name) {
        Some(raw) => {
            let value = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("{name} needs an integer, got '{raw}'"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Arguments that are not flags or flag values.
fn positionals(args: &[String]) -> Vec<&String> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if let Some(flag) = arg.strip_prefix("--") {
            skip = matches!(flag, "antenna" | "time" | "channel" | "histnorm");
            continue;
        }
        out.push(arg);
    }
    out
}
