use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::ConfigError;
use crate::storage::csv_writer::escaped_opt;

/// Requested fetch interval, `start < end` by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeRange {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, ConfigError> {
        if start >= end {
            return Err(ConfigError::EmptyRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(TimeRange { start, end })
    }
}

/// One bounded API window inside a `TimeRange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

/// The four homogeneous sub-series of the wave endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveData {
    pub waves: Vec<WaveSample>,
    pub wind: Vec<WindSample>,
    pub surface_temp: Vec<SurfaceTempSample>,
    pub barometer: Vec<BarometerSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveSample {
    #[serde(serialize_with = "escaped_opt")]
    pub timestamp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub significant_wave_height: Option<f64>,
    pub peak_period: Option<f64>,
    pub mean_period: Option<f64>,
    pub peak_direction: Option<f64>,
    pub peak_directional_spread: Option<f64>,
    pub mean_direction: Option<f64>,
    pub mean_directional_spread: Option<f64>,
    #[serde(rename = "processing_source", serialize_with = "escaped_opt")]
    pub processing_source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindSample {
    #[serde(serialize_with = "escaped_opt")]
    pub timestamp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub direction: Option<f64>,
    pub seasurface_id: Option<f64>,
    #[serde(rename = "processing_source", serialize_with = "escaped_opt")]
    pub processing_source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceTempSample {
    #[serde(serialize_with = "escaped_opt")]
    pub timestamp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub degrees: Option<f64>,
    #[serde(serialize_with = "escaped_opt")]
    pub processing_source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarometerSample {
    #[serde(serialize_with = "escaped_opt")]
    pub timestamp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub value: Option<f64>,
    #[serde(serialize_with = "escaped_opt")]
    pub units: Option<String>,
    #[serde(serialize_with = "escaped_opt")]
    pub unit_type: Option<String>,
    #[serde(serialize_with = "escaped_opt")]
    pub data_type_name: Option<String>,
    #[serde(serialize_with = "escaped_opt")]
    pub processing_source: Option<String>,
}

/// One entry of the sensor endpoint, as delivered.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSensorReading {
    pub timestamp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "sensorPosition", default, deserialize_with = "string_or_number")]
    pub sensor_position: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub bristlemouth_node_id: Option<String>,
    pub data_type_name: Option<String>,
    pub unit_type: Option<String>,
    pub value: Option<Value>,
    pub units: Option<String>,
}

impl RawSensorReading {
    /// The `value` field as text; numbers are rendered, null is `None`.
    pub fn value_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The `value` field as a float, accepting numeric strings.
    pub fn value_f64(&self) -> Option<f64> {
        match self.value.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// Positions and node ids arrive as either strings or integers
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Closed set of managed smart mooring data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    PressureMean,
    PressureStdev,
    SpeedMean,
    SpeedStdev,
    TiltMean,
    TiltStdev,
    DirectionMean,
    DirectionStdev,
    ReadingCount,
    TemperatureMean,
}

impl SensorType {
    pub const ALL: [SensorType; 10] = [
        SensorType::PressureMean,
        SensorType::PressureStdev,
        SensorType::SpeedMean,
        SensorType::SpeedStdev,
        SensorType::TiltMean,
        SensorType::TiltStdev,
        SensorType::DirectionMean,
        SensorType::DirectionStdev,
        SensorType::ReadingCount,
        SensorType::TemperatureMean,
    ];

    /// Identifier used by the API in `data_type_name`.
    pub fn data_type_name(self) -> &'static str {
        match self {
            SensorType::PressureMean => "bm_rbr_coda_pressure_mean_21bits",
            SensorType::PressureStdev => "bm_rbr_coda_pressure_stdev_15bits",
            SensorType::SpeedMean => "aanderaa_abs_speed_mean_15bits",
            SensorType::SpeedStdev => "aanderaa_abs_speed_std_15bits",
            SensorType::TiltMean => "aanderaa_abs_tilt_mean_8bits",
            SensorType::TiltStdev => "aanderaa_std_tilt_mean_8bits",
            SensorType::DirectionMean => "aanderaa_direction_circ_mean_13bits",
            SensorType::DirectionStdev => "aanderaa_direction_circ_std_13bits",
            SensorType::ReadingCount => "aanderaa_reading_count_10bits",
            SensorType::TemperatureMean => "aanderaa_temperature_mean_13bits",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            SensorType::PressureMean => "pressure_mean",
            SensorType::PressureStdev => "pressure_stdev",
            SensorType::SpeedMean => "speed_mean",
            SensorType::SpeedStdev => "speed_stdev",
            SensorType::TiltMean => "tilt_mean",
            SensorType::TiltStdev => "tilt_stdev",
            SensorType::DirectionMean => "direction_mean",
            SensorType::DirectionStdev => "direction_stdev",
            SensorType::ReadingCount => "reading_count",
            SensorType::TemperatureMean => "temperature_mean",
        }
    }

    pub fn from_data_type_name(name: &str) -> Option<SensorType> {
        SensorType::ALL
            .into_iter()
            .find(|t| t.data_type_name() == name)
    }
}

/// A numeric field that may be missing. Keeps "not reported" distinct
/// from a reported zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Measure {
    Present(f64),
    #[default]
    Absent,
}

impl Measure {
    pub fn as_option(self) -> Option<f64> {
        match self {
            Measure::Present(v) => Some(v),
            Measure::Absent => None,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, Measure::Present(_))
    }
}

impl From<Option<f64>> for Measure {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Measure::Absent, Measure::Present)
    }
}

/// Load cell values parsed out of a decoded force message.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ForceValues {
    pub min: Measure,
    pub max: Measure,
    pub mean: Measure,
}

impl ForceValues {
    pub fn is_empty(&self) -> bool {
        !(self.min.is_present() || self.max.is_present() || self.mean.is_present())
    }
}

/// Grouping key for smart mooring output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Managed readings, by sensor position.
    Position(String),
    /// Unmanaged readings, by Bristlemouth node id.
    Node(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Managed {
        sensor_type: SensorType,
        value: Measure,
    },
    Unmanaged {
        decoded_text: String,
        forces: ForceValues,
    },
}

/// A sensor reading after classification and decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub timestamp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub group: GroupKey,
    pub data_type_name: String,
    pub unit_type: Option<String>,
    pub units: String,
    pub payload: Payload,
}

/// Category reported for load cell force messages.
pub const LOAD_CELL_CATEGORY: &str = "load_cell";

impl DecodedRecord {
    pub fn category(&self) -> &'static str {
        match &self.payload {
            Payload::Managed { sensor_type, .. } => sensor_type.short_name(),
            Payload::Unmanaged { .. } => LOAD_CELL_CATEGORY,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match &self.payload {
            Payload::Managed { value, .. } => value.as_option(),
            Payload::Unmanaged { .. } => None,
        }
    }

    pub fn decoded_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Managed { .. } => None,
            Payload::Unmanaged { decoded_text, .. } => Some(decoded_text),
        }
    }

    pub fn forces(&self) -> ForceValues {
        match &self.payload {
            Payload::Managed { .. } => ForceValues::default(),
            Payload::Unmanaged { forces, .. } => *forces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sensor_type_lookup() {
        assert_eq!(
            SensorType::from_data_type_name("aanderaa_abs_tilt_mean_8bits"),
            Some(SensorType::TiltMean)
        );
        assert_eq!(SensorType::TiltMean.short_name(), "tilt_mean");
        assert_eq!(SensorType::from_data_type_name("binary_hex_encoded"), None);
        for t in SensorType::ALL {
            assert_eq!(SensorType::from_data_type_name(t.data_type_name()), Some(t));
        }
    }

    #[test]
    fn test_raw_reading_accepts_numeric_ids() {
        let raw: RawSensorReading = serde_json::from_value(json!({
            "timestamp": "2024-11-24T00:10:00.000Z",
            "sensorPosition": 2,
            "bristlemouth_node_id": "0xc2a3",
            "data_type_name": "aanderaa_abs_tilt_mean_8bits",
            "unit_type": "angle",
            "value": 0.42
        }))
        .unwrap();

        assert_eq!(raw.sensor_position.as_deref(), Some("2"));
        assert_eq!(raw.bristlemouth_node_id.as_deref(), Some("0xc2a3"));
        assert_eq!(raw.value_f64(), Some(0.42));
        assert_eq!(raw.latitude, None);
    }

    #[test]
    fn test_value_text_and_float() {
        let raw = RawSensorReading {
            value: Some(json!(" 12.5 ")),
            ..Default::default()
        };
        assert_eq!(raw.value_f64(), Some(12.5));
        assert_eq!(raw.value_text().as_deref(), Some(" 12.5 "));

        let null = RawSensorReading {
            value: Some(Value::Null),
            ..Default::default()
        };
        assert_eq!(null.value_text(), None);
        assert_eq!(null.value_f64(), None);
    }

    #[test]
    fn test_time_range_rejects_inverted_bounds() {
        let t = OffsetDateTime::UNIX_EPOCH;
        assert!(TimeRange::new(t, t).is_err());
        assert!(TimeRange::new(t, t + time::Duration::days(1)).is_ok());
    }

    #[test]
    fn test_measure_from_option() {
        assert_eq!(Measure::from(Some(0.0)), Measure::Present(0.0));
        assert_eq!(Measure::from(None), Measure::Absent);
        assert!(ForceValues::default().is_empty());
    }
}
