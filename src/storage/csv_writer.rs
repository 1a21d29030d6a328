/// Append-mode CSV writing for spotter sub-series and smart mooring groups
use log::info;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::aggregate::GroupedCollection;
use crate::error::StorageError;
use crate::models::{DecodedRecord, GroupKey, WaveData};

/// Output directory tree for one spotter: `<output_dir>/<spotter_id>/...`
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(output_dir: &Path, spotter_id: &str) -> Self {
        OutputLayout {
            root: output_dir.join(file_safe(spotter_id)),
        }
    }

    pub fn spotter_data_dir(&self) -> PathBuf {
        self.root.join("spotter_data")
    }

    pub fn smart_mooring_dir(&self) -> PathBuf {
        self.root.join("smart_mooring_data")
    }

    pub fn group_path(&self, key: &GroupKey) -> PathBuf {
        let file_name = match key {
            GroupKey::Position(position) => format!("position_{}.csv", file_safe(position)),
            GroupKey::Node(node_id) => format!("{}_smart_mooring.csv", file_safe(node_id)),
        };
        self.smart_mooring_dir().join(file_name)
    }
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// Double every backslash so the escape character survives a read back.
pub fn escape_backslashes(text: &str) -> Cow<'_, str> {
    if text.contains('\\') {
        Cow::Owned(text.replace('\\', "\\\\"))
    } else {
        Cow::Borrowed(text)
    }
}

/// `serialize_with` helper for text columns.
pub fn escaped<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<str>,
    S: Serializer,
{
    serializer.serialize_str(&escape_backslashes(value.as_ref()))
}

/// `serialize_with` helper for optional text columns.
pub fn escaped_opt<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<str>,
    S: Serializer,
{
    match value {
        Some(text) => serializer.serialize_some(&*escape_backslashes(text.as_ref())),
        None => serializer.serialize_none(),
    }
}

/// Append `rows` to `path`. The header is written only when the file does
/// not exist yet; quotes inside fields are escaped with a backslash.
/// Text columns must go through [`escaped`] / [`escaped_opt`] so that
/// literal backslashes are doubled.
pub fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize, StorageError> {
    if rows.is_empty() {
        return Ok(0);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let write_header = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .double_quote(false)
        .escape(b'\\')
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(rows.len())
}

/// Flat CSV row for a decoded smart mooring record.
#[derive(Debug, Serialize)]
pub struct SmartMooringRow<'a> {
    #[serde(serialize_with = "escaped_opt")]
    pub timestamp: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(serialize_with = "escaped_opt")]
    pub sensor_position: Option<&'a str>,
    #[serde(serialize_with = "escaped_opt")]
    pub bristlemouth_node_id: Option<&'a str>,
    #[serde(serialize_with = "escaped")]
    pub data_type_name: &'a str,
    pub category: &'a str,
    #[serde(serialize_with = "escaped_opt")]
    pub unit_type: Option<&'a str>,
    #[serde(serialize_with = "escaped")]
    pub units: &'a str,
    pub value: Option<f64>,
    #[serde(serialize_with = "escaped_opt")]
    pub decoded_value: Option<&'a str>,
    pub min_force: Option<f64>,
    pub max_force: Option<f64>,
    pub mean_force: Option<f64>,
}

impl<'a> From<&'a DecodedRecord> for SmartMooringRow<'a> {
    fn from(record: &'a DecodedRecord) -> Self {
        let (sensor_position, bristlemouth_node_id) = match &record.group {
            GroupKey::Position(p) => (Some(p.as_str()), None),
            GroupKey::Node(n) => (None, Some(n.as_str())),
        };
        let forces = record.forces();

        SmartMooringRow {
            timestamp: record.timestamp.as_deref(),
            latitude: record.latitude,
            longitude: record.longitude,
            sensor_position,
            bristlemouth_node_id,
            data_type_name: &record.data_type_name,
            category: record.category(),
            unit_type: record.unit_type.as_deref(),
            units: &record.units,
            value: record.value(),
            decoded_value: record.decoded_text(),
            min_force: forces.min.as_option(),
            max_force: forces.max.as_option(),
            mean_force: forces.mean.as_option(),
        }
    }
}

/// Write each non-empty wave sub-series to its own file. Returns the
/// number of rows written.
pub fn write_wave_data(layout: &OutputLayout, data: &WaveData) -> Result<usize, StorageError> {
    let dir = layout.spotter_data_dir();
    let mut written = 0;

    written += save_series(&dir.join("waves.csv"), &data.waves)?;
    written += save_series(&dir.join("wind.csv"), &data.wind)?;
    written += save_series(&dir.join("surface_temp.csv"), &data.surface_temp)?;
    written += save_series(&dir.join("barometer.csv"), &data.barometer)?;

    Ok(written)
}

fn save_series<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize, StorageError> {
    let count = append_rows(path, rows)?;
    if count > 0 {
        info!("Saved {} rows to {}", count, path.display());
    }
    Ok(count)
}

/// Write every group to its per-position or per-node file.
pub fn write_groups(
    layout: &OutputLayout,
    groups: &GroupedCollection,
) -> Result<usize, StorageError> {
    let mut written = 0;
    for (key, records) in groups.iter() {
        let rows: Vec<SmartMooringRow> = records.iter().map(SmartMooringRow::from).collect();
        written += save_series(&layout.group_path(key), &rows)?;
    }
    Ok(written)
}
