/// Routing of smart mooring readings to the managed or unmanaged path
use log::debug;

use crate::decoding::force::extract_force_values;
use crate::decoding::payload::{decode_hex, printable_prefix};
use crate::error::SkipReason;
use crate::models::{DecodedRecord, GroupKey, Measure, Payload, RawSensorReading, SensorType};

pub const BINARY_HEX_ENCODED: &str = "binary_hex_encoded";
pub const BINARY_UNIT_TYPE: &str = "binary";
pub const UNKNOWN_POSITION: &str = "unknown";
pub const UNKNOWN_NODE: &str = "unknown_node";
const DEFAULT_FORCE_UNITS: &str = "newtons";

/// How decoded unmanaged text is cut down before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Lossy UTF-8, whitespace trimmed.
    #[default]
    Lossy,
    /// Only the leading run of printable ASCII; records without one are skipped.
    PrintablePrefix,
}

/// What a managed reading with no usable numeric value becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingValue {
    #[default]
    Absent,
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassifierOptions {
    pub decode_mode: DecodeMode,
    pub missing_value: MissingValue,
    /// Also treat any `unit_type == "binary"` reading as unmanaged.
    pub binary_unit_unmanaged: bool,
}

/// Classify and decode one sensor reading.
///
/// Returns the reason as `Err` when the reading carries nothing this
/// pipeline understands; callers log it and move on.
pub fn classify(
    raw: &RawSensorReading,
    options: &ClassifierOptions,
) -> Result<DecodedRecord, SkipReason> {
    let data_type = raw.data_type_name.as_deref().unwrap_or("unknown");

    if let Some(sensor_type) = SensorType::from_data_type_name(data_type) {
        return Ok(managed_record(raw, sensor_type, options.missing_value));
    }

    let binary_unit = raw.unit_type.as_deref() == Some(BINARY_UNIT_TYPE);
    if data_type == BINARY_HEX_ENCODED || (options.binary_unit_unmanaged && binary_unit) {
        return unmanaged_record(raw, data_type, options.decode_mode);
    }

    Err(SkipReason::UnrecognizedDataType(data_type.to_string()))
}

fn managed_record(
    raw: &RawSensorReading,
    sensor_type: SensorType,
    missing_value: MissingValue,
) -> DecodedRecord {
    let value = match (Measure::from(raw.value_f64()), missing_value) {
        (Measure::Absent, MissingValue::Zero) => Measure::Present(0.0),
        (value, _) => value,
    };

    DecodedRecord {
        timestamp: raw.timestamp.clone(),
        latitude: raw.latitude,
        longitude: raw.longitude,
        group: GroupKey::Position(
            raw.sensor_position
                .clone()
                .unwrap_or_else(|| UNKNOWN_POSITION.to_string()),
        ),
        data_type_name: sensor_type.data_type_name().to_string(),
        unit_type: raw.unit_type.clone(),
        units: raw.units.clone().unwrap_or_default(),
        payload: Payload::Managed { sensor_type, value },
    }
}

fn unmanaged_record(
    raw: &RawSensorReading,
    data_type: &str,
    decode_mode: DecodeMode,
) -> Result<DecodedRecord, SkipReason> {
    let node_id = raw
        .bristlemouth_node_id
        .clone()
        .unwrap_or_else(|| UNKNOWN_NODE.to_string());

    let mut decoded = decode_hex(&raw.value_text().unwrap_or_default());
    if decode_mode == DecodeMode::PrintablePrefix {
        decoded = match printable_prefix(&decoded) {
            Some(prefix) => prefix.to_string(),
            None => return Err(SkipReason::NoPrintablePrefix { node_id, decoded }),
        };
    }

    // Load cell messages are the only unmanaged payloads understood so far
    if !decoded.contains("force") {
        return Err(SkipReason::UnrecognizedPayload(decoded));
    }

    let forces = extract_force_values(&decoded);
    if forces.is_empty() {
        debug!("No force values in message from node {}: {:?}", node_id, decoded);
    } else {
        debug!("Decoded load cell message from node {}: {:?}", node_id, forces);
    }

    Ok(DecodedRecord {
        timestamp: raw.timestamp.clone(),
        latitude: raw.latitude,
        longitude: raw.longitude,
        group: GroupKey::Node(node_id),
        data_type_name: data_type.to_string(),
        unit_type: raw.unit_type.clone(),
        units: raw
            .units
            .clone()
            .unwrap_or_else(|| DEFAULT_FORCE_UNITS.to_string()),
        payload: Payload::Unmanaged {
            decoded_text: decoded,
            forces,
        },
    })
}
