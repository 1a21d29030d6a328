/// Utility functions for timestamps, unit conversion and run summaries
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::aggregate::GroupedCollection;
use crate::models::{GroupKey, WaveData};

pub const METER_TO_FEET: f64 = 3.28084;
pub const M_PER_S_TO_KNOTS: f64 = 1.94384;
pub const NEWTON_TO_LBF: f64 = 0.224809;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Format a timestamp the way the Sofar API expects: `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_api_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    let utc = dt.to_offset(time::UtcOffset::UTC);
    utc.format(format).unwrap_or_else(|_| utc.to_string())
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(dt) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(dt);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Force statistics for one Bristlemouth node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeForceSummary {
    pub node_id: String,
    pub samples: usize,
    pub mean_force: Option<f64>,
    pub max_force: Option<f64>,
}

/// Totals reported at the end of each spotter run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub waves: usize,
    pub wind: usize,
    pub surface_temp: usize,
    pub barometer: usize,
    pub mean_wave_height: Option<f64>,
    pub mean_wind_speed: Option<f64>,
    pub positions: Vec<(String, usize)>,
    pub nodes: Vec<NodeForceSummary>,
}

/// Calculate summary values from the collected wave and sensor data
///
/// Node force means are taken over the records that reported a mean
/// force; the node maximum is the largest reported max force.
pub fn calculate_summary(waves: &WaveData, groups: &GroupedCollection) -> RunSummary {
    let mut summary = RunSummary {
        waves: waves.waves.len(),
        wind: waves.wind.len(),
        surface_temp: waves.surface_temp.len(),
        barometer: waves.barometer.len(),
        mean_wave_height: mean(waves.waves.iter().filter_map(|w| w.significant_wave_height)),
        mean_wind_speed: mean(waves.wind.iter().filter_map(|w| w.speed)),
        ..Default::default()
    };

    for (key, records) in groups.iter() {
        match key {
            GroupKey::Position(position) => {
                summary.positions.push((position.clone(), records.len()));
            }
            GroupKey::Node(node_id) => {
                let forces: Vec<_> = records.iter().map(|r| r.forces()).collect();
                summary.nodes.push(NodeForceSummary {
                    node_id: node_id.clone(),
                    samples: records.len(),
                    mean_force: mean(forces.iter().filter_map(|f| f.mean.as_option())),
                    max_force: forces
                        .iter()
                        .filter_map(|f| f.max.as_option())
                        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v)))),
                });
            }
        }
    }

    summary
}
