/// Chunked fetch loops: chunker -> API -> decode/classify -> aggregate
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::aggregate::GroupedCollection;
use crate::api::{ChunkFetcher, Endpoint};
use crate::decoding::{classify, ClassifierOptions};
use crate::error::{ApiError, SkipReason};
use crate::models::{Chunk, RawSensorReading, TimeRange, WaveData};
use crate::utils::format_api_datetime;

/// Parse a JSON array into typed entries, dropping the ones that do not fit.
fn parse_entries<T: DeserializeOwned>(value: Option<Value>, label: &str) -> Vec<T> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("Expected a list of {} entries, got: {}", label, other);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed {} entry: {}", label, e);
                None
            }
        })
        .collect()
}

/// Split one wave endpoint `data` object into its sub-series.
pub fn parse_wave_data(data: Value) -> WaveData {
    let mut map = match data {
        Value::Object(map) => map,
        other => {
            warn!("Malformed wave data payload, expected an object: {}", other);
            return WaveData::default();
        }
    };

    WaveData {
        waves: parse_entries(map.remove("waves"), "waves"),
        wind: parse_entries(map.remove("wind"), "wind"),
        surface_temp: parse_entries(map.remove("surfaceTemp"), "surfaceTemp"),
        barometer: parse_entries(map.remove("barometerData"), "barometerData"),
    }
}

pub fn parse_sensor_data(data: Value) -> Vec<RawSensorReading> {
    parse_entries(Some(data), "sensor")
}

fn describe(chunk: &Chunk) -> String {
    format!(
        "{} to {}",
        format_api_datetime(&chunk.start),
        format_api_datetime(&chunk.end)
    )
}

/// Fetch wave, wind, surface temperature and barometer data for `range`,
/// concatenating each sub-series across chunks.
///
/// The first failing chunk aborts the whole fetch.
pub async fn fetch_wave_data<F: ChunkFetcher>(
    fetcher: &F,
    spotter_id: &str,
    range: &TimeRange,
    chunk_size_days: u32,
) -> Result<WaveData, ApiError> {
    let mut series = WaveData::default();

    for chunk in range.chunks(chunk_size_days) {
        info!("Fetching wave data for {}...", describe(&chunk));

        match fetcher.fetch(Endpoint::Wave, spotter_id, &chunk).await? {
            Some(data) => {
                let batch = parse_wave_data(data);
                debug!(
                    "Chunk {}: {} waves, {} wind, {} surface temp, {} barometer",
                    describe(&chunk),
                    batch.waves.len(),
                    batch.wind.len(),
                    batch.surface_temp.len(),
                    batch.barometer.len()
                );
                series.append(batch);
            }
            None => warn!("No wave data returned for {}.", describe(&chunk)),
        }
    }

    Ok(series)
}

/// Fetch smart mooring readings for `range`, classify each one and group
/// the decoded records. Records that cannot be classified are logged and
/// dropped; a failing chunk aborts the whole fetch.
pub async fn fetch_sensor_data<F: ChunkFetcher>(
    fetcher: &F,
    spotter_id: &str,
    range: &TimeRange,
    chunk_size_days: u32,
    options: &ClassifierOptions,
) -> Result<GroupedCollection, ApiError> {
    let mut groups = GroupedCollection::default();

    for chunk in range.chunks(chunk_size_days) {
        info!("Fetching sensor data for {}...", describe(&chunk));

        let readings = match fetcher.fetch(Endpoint::Sensor, spotter_id, &chunk).await? {
            Some(data) => parse_sensor_data(data),
            None => {
                warn!("No sensor data returned for {}.", describe(&chunk));
                continue;
            }
        };

        let total = readings.len();
        let mut skipped = 0;
        let mut batch = GroupedCollection::default();
        batch.extend(readings.iter().filter_map(|raw| match classify(raw, options) {
            Ok(record) => Some(record),
            Err(reason) => {
                skipped += 1;
                match &reason {
                    SkipReason::UnrecognizedDataType(_) => debug!("Skipping entry: {}", reason),
                    _ => warn!("Skipping entry: {}", reason),
                }
                None
            }
        }));

        info!(
            "Chunk {}: {} readings, {} decoded, {} skipped",
            describe(&chunk),
            total,
            total - skipped,
            skipped
        );
        groups.merge(batch);
    }

    Ok(groups)
}
