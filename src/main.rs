use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use inertial_trajectory::config::{CalibrationPolicy, PipelineConfig, RowSlice};
use inertial_trajectory::export::TrajectoryExport;
use inertial_trajectory::pipeline::{get_trajectory_with, parse_method};
use inertial_trajectory::units::MeasurementUnits;

#[derive(Parser, Debug)]
#[command(name = "inertial_trajectory")]
#[command(about = "Reconstruct a vehicle trajectory from an IMU + GNSS recorder log", long_about = None)]
struct Args {
    /// Recorder log (.tsv, optionally .gz)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Moving-average window in samples
    #[arg(long, default_value = "20")]
    window_size: usize,

    /// First data row to process
    #[arg(long, allow_negative_numbers = true)]
    slice_start: Option<i64>,

    /// Data row to stop before
    #[arg(long, allow_negative_numbers = true)]
    slice_end: Option<i64>,

    /// Integration rule (simpson, trapezoid, quadrature)
    #[arg(long, default_value = "simpson")]
    method: String,

    /// Snap integrated velocity to GNSS velocity every N samples (0 = never)
    #[arg(long, default_value = "100")]
    velocity_adjust: usize,

    /// Snap integrated position to GNSS position every N samples (0 = never)
    #[arg(long, default_value = "100")]
    position_adjust: usize,

    /// Stationary data used for calibration (first, all)
    #[arg(long, default_value = "first")]
    policy: String,

    /// Log is already in m/s², rad/s, m/s and radians
    #[arg(long, default_value_t = false)]
    si_units: bool,

    /// Write the trajectory here (.json or .csv)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn nonzero(frequency: usize) -> Option<usize> {
    (frequency > 0).then_some(frequency)
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let Some(integration_method) = parse_method(&args.method) else {
        bail!("unknown integration method '{}'", args.method);
    };
    let calibration_policy = match args.policy.to_ascii_lowercase().as_str() {
        "first" => CalibrationPolicy::FirstInterval,
        "all" => CalibrationPolicy::AllIntervals,
        other => bail!("unknown calibration policy '{}'", other),
    };

    Ok(PipelineConfig {
        slice: RowSlice {
            start: args.slice_start,
            end: args.slice_end,
        },
        units: if args.si_units {
            MeasurementUnits::si()
        } else {
            MeasurementUnits::default()
        },
        window_size: args.window_size,
        integration_method,
        calibration_policy,
        velocity_adjust_frequency: nonzero(args.velocity_adjust),
        position_adjust_frequency: nonzero(args.position_adjust),
        ..PipelineConfig::default()
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = build_config(&args)?;

    let trajectory = get_trajectory_with(&args.input, &config)
        .with_context(|| format!("processing {}", args.input.display()))?;
    let export = TrajectoryExport::new(&trajectory, &config);

    println!("Input:        {}", args.input.display());
    println!("Format:       {:?}", export.input_type);
    println!("Samples:      {}", export.summary.sample_count);
    println!("Duration:     {:.1} s", export.summary.duration);
    println!("Path length:  {:.1} m", export.summary.path_length);
    if let Some(last) = export.samples.last() {
        println!("Final offset: ({:.1}, {:.1}, {:.1}) m", last.x, last.y, last.z);
    }

    if let Some(output) = &args.output {
        export
            .save(output)
            .with_context(|| format!("writing {}", output.display()))?;
        println!("Saved:        {}", output.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inertial_trajectory::integrate::IntegrationMethod;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "inertial_trajectory",
            "run-fullinertial.tsv",
            "--window-size",
            "10",
            "--slice-start",
            "5",
            "--method",
            "trapezoid",
            "--velocity-adjust",
            "0",
            "--policy",
            "all",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.window_size, 10);
        assert_eq!(config.slice, RowSlice { start: Some(5), end: None });
        assert_eq!(config.integration_method, IntegrationMethod::Trapezoid);
        assert_eq!(config.velocity_adjust_frequency, None);
        assert_eq!(config.position_adjust_frequency, Some(100));
        assert_eq!(config.calibration_policy, CalibrationPolicy::AllIntervals);
        assert_eq!(config.units, MeasurementUnits::default());
    }

    #[test]
    fn test_si_units_flag() {
        let args = Args::parse_from(["inertial_trajectory", "log.tsv", "--si-units"]);
        assert_eq!(build_config(&args).unwrap().units, MeasurementUnits::si());
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let args = Args::parse_from(["inertial_trajectory", "log.tsv", "--method", "euler"]);
        assert!(build_config(&args).is_err());
    }
}
