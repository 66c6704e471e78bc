use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::types::{InputType, Trajectory};

/// One reconstructed sample
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrajectorySample {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub heading: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrajectorySummary {
    pub sample_count: usize,
    pub duration: f64,
    pub path_length: f64,
}

/// Complete run output, ready for an animation front end
#[derive(Clone, Debug, Serialize)]
pub struct TrajectoryExport {
    pub input_type: InputType,
    pub config: PipelineConfig,
    pub summary: TrajectorySummary,
    pub samples: Vec<TrajectorySample>,
}

impl TrajectoryExport {
    pub fn new(trajectory: &Trajectory, config: &PipelineConfig) -> Self {
        let samples = (0..trajectory.len())
            .map(|k| TrajectorySample {
                time: trajectory.times[k],
                x: trajectory.positions[[0, k]],
                y: trajectory.positions[[1, k]],
                z: trajectory.positions[[2, k]],
                heading: trajectory.headings[k],
            })
            .collect();

        TrajectoryExport {
            input_type: trajectory.input_type,
            config: config.clone(),
            summary: TrajectorySummary {
                sample_count: trajectory.len(),
                duration: trajectory.duration(),
                path_length: trajectory.path_length(),
            },
            samples,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One header line then one row per sample
    pub fn write_csv<W: Write>(&self, writer: W) -> PipelineResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for sample in &self.samples {
            csv_writer.serialize(sample)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write as CSV when `path` ends in `.csv`, otherwise as pretty JSON.
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        let is_csv = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        let mut file = BufWriter::new(File::create(path)?);
        if is_csv {
            self.write_csv(file)?;
        } else {
            file.write_all(self.to_json()?.as_bytes())?;
            file.flush()?;
        }
        Ok(())
    }
}
