//! Recorder log adapter.
//!
//! Logs are tab-separated text whose header line may start with `#\t`. The
//! schema is decided by [`classify`], a pure function of the file name and the
//! column layout; only the inertial schemas can be turned into an
//! [`InertialLog`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::Range;
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::{Array1, Array2};

use crate::config::RowSlice;
use crate::error::{PipelineResult, TrajectoryError};
use crate::gnss::GnssTrack;
use crate::types::{InertialLog, InputType, COORD_AXES};

const TIME_COLUMN: &str = "timestamp";
const SPEED_COLUMN: &str = "speed";
const ACCEL_COLUMNS: [&str; 3] = ["ax", "ay", "az"];
const GYRO_COLUMNS: [&str; 3] = ["gx", "gy", "gz"];
const COORD_COLUMNS: [&str; 3] = ["lon", "lat", "alt"];

/// Shape facts the classifier falls back on when the file name says nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    pub column_count: usize,
    pub has_missing: bool,
}

/// Decide the schema of a log from its file name, then its column layout.
pub fn classify(file_name: &str, layout: &ColumnLayout) -> InputType {
    const NAME_PATTERNS: [(&str, InputType); 7] = [
        ("acc", InputType::Acceleration),
        ("gnss", InputType::Gnss),
        ("gyr", InputType::Gyroscope),
        ("unmodified-fullinertial", InputType::UnmodFullInertial),
        ("unmodified-inertial", InputType::UnmodInertial),
        ("fullinertial", InputType::FullInertial),
        ("inertial", InputType::Inertial),
    ];

    if let Some((_, input_type)) = NAME_PATTERNS.iter().find(|(pattern, _)| file_name.contains(pattern)) {
        return *input_type;
    }

    match (layout.column_count, layout.has_missing) {
        // Accelerometer and gyroscope exports share this layout
        (4, _) => InputType::Acceleration,
        (10, true) => InputType::UnmodInertial,
        (10, false) => InputType::Inertial,
        (14, true) => InputType::UnmodFullInertial,
        (14, false) => InputType::FullInertial,
        _ => InputType::Unrecognized,
    }
}

/// Parsed tab-separated table; `None` marks an empty or NaN cell
#[derive(Clone, Debug)]
pub struct Table {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Option<f64>>>,
}

impl Table {
    pub fn parse(content: &str) -> PipelineResult<Self> {
        let content = content.trim_matches(|c| c == '#' || c == '\t');
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let row = headers
                .iter()
                .enumerate()
                .map(|(i, header)| parse_cell(record.get(i), line + 1, header))
                .collect::<PipelineResult<Vec<_>>>()?;
            rows.push(row);
        }

        Ok(Table { headers, index, rows })
    }

    pub fn layout(&self) -> ColumnLayout {
        ColumnLayout {
            column_count: self.headers.len(),
            has_missing: self.rows.iter().flatten().any(|cell| cell.is_none()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> PipelineResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TrajectoryError::Format(format!("missing column '{}'", name)))
    }

    /// Keep only the data rows in `range`
    fn slice_rows(&mut self, range: Range<usize>) {
        self.rows = self.rows.drain(range).collect();
    }
}

fn parse_cell(cell: Option<&str>, line: usize, header: &str) -> PipelineResult<Option<f64>> {
    let text = match cell.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(text) if text.eq_ignore_ascii_case("nan") => return Ok(None),
        Some(text) => text,
    };
    text.parse::<f64>().map(Some).map_err(|_| {
        TrajectoryError::InvalidData(format!(
            "data row {}, column '{}': cannot parse '{}'",
            line, header, text
        ))
    })
}

/// Resolve an optional row slice against `rows` data rows.
pub fn validate_slice(slice: &RowSlice, rows: usize) -> PipelineResult<Range<usize>> {
    let start = match slice.start {
        Some(start) if start < 0 => {
            return Err(TrajectoryError::Slice(format!(
                "slice start must be non-negative, got {}",
                start
            )))
        }
        Some(start) => start as usize,
        None => 0,
    };
    let end = match slice.end {
        Some(end) if end < 0 => {
            return Err(TrajectoryError::Slice(format!(
                "slice end must be non-negative, got {}",
                end
            )))
        }
        Some(end) if end as usize > rows => {
            return Err(TrajectoryError::Slice(format!(
                "slice end {} exceeds the {} data rows",
                end, rows
            )))
        }
        Some(end) => end as usize,
        None => rows,
    };
    if start > end {
        return Err(TrajectoryError::Slice(format!(
            "slice start {} is after slice end {}",
            start, end
        )));
    }
    Ok(start..end)
}

/// Read a log file, decompressing `.gz` files transparently.
pub fn read_log_text(path: &Path) -> PipelineResult<String> {
    let file = File::open(path)?;
    let mut content = String::new();
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        BufReader::new(GzDecoder::new(file)).read_to_string(&mut content)?;
    } else {
        BufReader::new(file).read_to_string(&mut content)?;
    }
    Ok(content)
}

/// Parse the log at `path` into aligned arrays.
///
/// Fails with `Format` when the schema is unrecognized or not in `accepted`,
/// and with `Slice` when `slice` falls outside the recording.
pub fn parse_input(path: &Path, accepted: &[InputType], slice: &RowSlice) -> PipelineResult<InertialLog> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content = read_log_text(path)?;
    parse_log(&file_name, &content, accepted, slice)
}

/// [`parse_input`] over text already in memory.
pub fn parse_log(
    file_name: &str,
    content: &str,
    accepted: &[InputType],
    slice: &RowSlice,
) -> PipelineResult<InertialLog> {
    let mut table = Table::parse(content)?;
    let input_type = classify(file_name, &table.layout());
    if input_type == InputType::Unrecognized {
        return Err(TrajectoryError::Format(format!(
            "unrecognized input format ({} columns)",
            table.layout().column_count
        )));
    }

    let range = validate_slice(slice, table.len())?;
    table.slice_rows(range);

    if !accepted.contains(&input_type) {
        return Err(TrajectoryError::Format(format!(
            "{:?} input is not an accepted format",
            input_type
        )));
    }

    log::info!("Parsed {} data rows as {:?}", table.len(), input_type);
    get_vectors(&table, input_type)
}

/// Extract aligned arrays from a classified table.
pub fn get_vectors(table: &Table, input_type: InputType) -> PipelineResult<InertialLog> {
    match input_type {
        interleaved if interleaved.is_interleaved() => interleaved_rows(table, interleaved),
        InputType::Inertial | InputType::FullInertial => complete_rows(table, input_type),
        other => Err(TrajectoryError::Format(format!(
            "{:?} logs carry no combined inertial record",
            other
        ))),
    }
}

struct InertialColumns {
    time: usize,
    speed: usize,
    accel: [usize; 3],
    gyro: [usize; 3],
}

impl InertialColumns {
    fn locate(table: &Table) -> PipelineResult<Self> {
        Ok(InertialColumns {
            time: table.column_index(TIME_COLUMN)?,
            speed: table.column_index(SPEED_COLUMN)?,
            accel: [
                table.column_index(ACCEL_COLUMNS[0])?,
                table.column_index(ACCEL_COLUMNS[1])?,
                table.column_index(ACCEL_COLUMNS[2])?,
            ],
            gyro: [
                table.column_index(GYRO_COLUMNS[0])?,
                table.column_index(GYRO_COLUMNS[1])?,
                table.column_index(GYRO_COLUMNS[2])?,
            ],
        })
    }
}

fn coord_columns(table: &Table) -> PipelineResult<[usize; 3]> {
    Ok([
        table.column_index(COORD_COLUMNS[0])?,
        table.column_index(COORD_COLUMNS[1])?,
        table.column_index(COORD_COLUMNS[2])?,
    ])
}

fn required(row: &[Option<f64>], column: usize, line: usize) -> PipelineResult<f64> {
    row[column].ok_or_else(|| {
        TrajectoryError::InvalidData(format!("data row {} is missing column {}", line + 1, column))
    })
}

/// Accumulates inertial samples column by column
#[derive(Default)]
struct InertialBuilder {
    times: Vec<f64>,
    speed: Vec<f64>,
    accel: [Vec<f64>; 3],
    gyro: [Vec<f64>; 3],
}

impl InertialBuilder {
    fn push(&mut self, row: &[Option<f64>], columns: &InertialColumns, speed: f64, line: usize) -> PipelineResult<()> {
        self.times.push(required(row, columns.time, line)?);
        self.speed.push(speed);
        for axis in 0..3 {
            self.accel[axis].push(required(row, columns.accel[axis], line)?);
            self.gyro[axis].push(required(row, columns.gyro[axis], line)?);
        }
        Ok(())
    }

    fn series(columns: &[Vec<f64>; 3]) -> Array2<f64> {
        Array2::from_shape_fn((3, columns[0].len()), |(axis, k)| columns[axis][k])
    }

    fn build(self, input_type: InputType, coordinates: Option<Array2<f64>>, altitudes: Option<Array1<f64>>) -> PipelineResult<InertialLog> {
        if self.times.is_empty() {
            return Err(TrajectoryError::InvalidData("log contains no inertial records".to_string()));
        }
        Ok(InertialLog {
            input_type,
            accelerations: Self::series(&self.accel),
            angular_velocities: Self::series(&self.gyro),
            times: Array1::from(self.times),
            gps_speed: Array1::from(self.speed),
            coordinates,
            altitudes,
        })
    }
}

/// Every row holds a full inertial (and, for full layouts, GNSS) record.
fn complete_rows(table: &Table, input_type: InputType) -> PipelineResult<InertialLog> {
    let columns = InertialColumns::locate(table)?;
    let coords = if input_type.has_coordinates() { Some(coord_columns(table)?) } else { None };

    let mut builder = InertialBuilder::default();
    let mut geodetic: [Vec<f64>; 3] = Default::default();
    for (line, row) in table.rows.iter().enumerate() {
        let speed = required(row, columns.speed, line)?;
        builder.push(row, &columns, speed, line)?;
        if let Some(coords) = &coords {
            for (values, &column) in geodetic.iter_mut().zip(coords.iter()) {
                values.push(required(row, column, line)?);
            }
        }
    }

    let (coordinates, altitudes) = match coords {
        Some(_) => {
            let n = geodetic[0].len();
            let coordinates = Array2::from_shape_fn((COORD_AXES, n), |(row, k)| geodetic[row][k]);
            (Some(coordinates), Some(Array1::from(geodetic[2].clone())))
        }
        None => (None, None),
    };
    builder.build(input_type, coordinates, altitudes)
}

/// GNSS and inertial records on separate rows.
///
/// Inertial rows are those with accelerations; GNSS rows are those with a
/// latitude and are resampled onto the inertial timestamps. Speed is carried
/// forward from the most recent row that reports one.
fn interleaved_rows(table: &Table, input_type: InputType) -> PipelineResult<InertialLog> {
    let columns = InertialColumns::locate(table)?;
    let coords = if input_type.has_coordinates() { Some(coord_columns(table)?) } else { None };

    let mut speed = table
        .rows
        .iter()
        .find_map(|row| row[columns.speed])
        .unwrap_or(0.0);
    let mut builder = InertialBuilder::default();
    let mut gnss: [Vec<f64>; 4] = Default::default();

    for (line, row) in table.rows.iter().enumerate() {
        if let Some(s) = row[columns.speed] {
            speed = s;
        }
        if let Some([lon, lat, alt]) = coords {
            if row[lat].is_some() {
                gnss[0].push(required(row, columns.time, line)?);
                gnss[1].push(required(row, lon, line)?);
                gnss[2].push(required(row, lat, line)?);
                gnss[3].push(required(row, alt, line)?);
            }
        }
        if row[columns.accel[0]].is_some() {
            builder.push(row, &columns, speed, line)?;
        }
    }

    let (coordinates, altitudes) = if coords.is_some() {
        let [times, lon, lat, alt] = gnss;
        let fixes = times.len();
        let track = GnssTrack::new(times, lon, lat, alt)?;
        let resampled = track.resample(&builder.times);
        log::debug!("Resampled {} GNSS fixes onto {} inertial samples", fixes, builder.times.len());
        let n = resampled.ncols();
        let coordinates = Array2::from_shape_fn((COORD_AXES, n), |(row, k)| resampled[[row, k]]);
        (Some(coordinates), Some(resampled.row(2).to_owned()))
    } else {
        (None, None)
    };
    builder.build(input_type, coordinates, altitudes)
}
