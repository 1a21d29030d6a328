pub mod client;

pub use client::SofarClient;

use serde_json::Value;

use crate::error::ApiError;
use crate::models::Chunk;

/// The two Sofar endpoints this service reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Waves plus wind, surface temperature and barometer sub-series.
    Wave,
    /// Smart mooring (Bristlemouth) sensor readings.
    Sensor,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Wave => "wave-data",
            Endpoint::Sensor => "sensor-data",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Wave => "wave",
            Endpoint::Sensor => "sensor",
        }
    }
}

/// One request per chunk. `Ok(None)` means the response had no usable
/// `data` key, which callers treat as an empty chunk.
pub trait ChunkFetcher {
    async fn fetch(
        &self,
        endpoint: Endpoint,
        spotter_id: &str,
        chunk: &Chunk,
    ) -> Result<Option<Value>, ApiError>;
}
