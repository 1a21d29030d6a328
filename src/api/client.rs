/// HTTP client for the Sofar wave and sensor endpoints
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use crate::api::{ChunkFetcher, Endpoint};
use crate::config::ApiSettings;
use crate::error::ApiError;
use crate::models::Chunk;
use crate::utils::format_api_datetime;

/// Sofar API client. Authentication is the static token in the query
/// string; there are no retries.
pub struct SofarClient {
    client: Client,
    settings: ApiSettings,
}

impl SofarClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        // No timeout unless configured; a stalled endpoint blocks the run
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(SofarClient {
            client: builder.build()?,
            settings: settings.clone(),
        })
    }

    /// Full request URL for one chunk, token included.
    pub fn request_url(
        &self,
        endpoint: Endpoint,
        spotter_id: &str,
        chunk: &Chunk,
    ) -> Result<Url, ApiError> {
        build_request_url(&self.settings, endpoint, spotter_id, chunk)
    }
}

pub fn build_request_url(
    settings: &ApiSettings,
    endpoint: Endpoint,
    spotter_id: &str,
    chunk: &Chunk,
) -> Result<Url, ApiError> {
    let mut url = Url::parse(&format!(
        "{}/{}",
        settings.base_url.trim_end_matches('/'),
        endpoint.path()
    ))?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("spotterId", spotter_id)
            .append_pair("startDate", &format_api_datetime(&chunk.start))
            .append_pair("endDate", &format_api_datetime(&chunk.end))
            .append_pair("token", &settings.token);

        if endpoint == Endpoint::Wave {
            query
                .append_pair("includeWindData", "true")
                .append_pair("includeSurfaceTempData", "true")
                .append_pair("includeBarometerData", "true");
        }

        query.append_pair("limit", &settings.page_limit.to_string());

        if endpoint == Endpoint::Wave {
            query.append_pair("processingSources", &settings.processing_sources);
        }
    }

    Ok(url)
}

/// Pull the `data` member out of a response body. Anything else,
/// including an explicit null, counts as no data.
pub fn take_data(body: Value) -> Option<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Null) | None => None,
            Some(data) => Some(data),
        },
        _ => None,
    }
}

/// Longest error body kept in `ApiError::Status`, in characters.
const MAX_ERROR_BODY_CHARS: usize = 512;

fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let mut kept: String = chars.by_ref().take(MAX_ERROR_BODY_CHARS).collect();
    if chars.next().is_some() {
        kept.push_str("...");
    }
    kept
}

impl ChunkFetcher for SofarClient {
    async fn fetch(
        &self,
        endpoint: Endpoint,
        spotter_id: &str,
        chunk: &Chunk,
    ) -> Result<Option<Value>, ApiError> {
        let url = self.request_url(endpoint, spotter_id, chunk)?;

        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status != StatusCode::OK {
            let body = truncate_body(&resp.text().await.unwrap_or_default());
            error!(
                "Failed to fetch {} data for {}. Status code: {}",
                endpoint.label(),
                spotter_id,
                status.as_u16()
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let body: Value = serde_json::from_str(&text)?;
        debug!(
            "Fetched {} bytes of {} data for {}",
            text.len(),
            endpoint.label(),
            spotter_id
        );

        Ok(take_data(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn settings() -> ApiSettings {
        ApiSettings {
            base_url: "https://api.sofarocean.com/api/".to_string(),
            token: "secret-token".to_string(),
            page_limit: 500,
            processing_sources: "all".to_string(),
            timeout: None,
        }
    }

    fn chunk() -> Chunk {
        Chunk {
            start: datetime!(2024-11-24 00:00 UTC),
            end: datetime!(2024-11-29 00:00 UTC),
        }
    }

    fn query(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_wave_url() {
        let url = build_request_url(&settings(), Endpoint::Wave, "SPOT-31088C", &chunk()).unwrap();
        assert_eq!(url.path(), "/api/wave-data");

        let pairs = query(&url);
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "spotterId",
                "startDate",
                "endDate",
                "token",
                "includeWindData",
                "includeSurfaceTempData",
                "includeBarometerData",
                "limit",
                "processingSources",
            ]
        );
        assert!(pairs.contains(&("startDate".into(), "2024-11-24T00:00:00Z".into())));
        assert!(pairs.contains(&("endDate".into(), "2024-11-29T00:00:00Z".into())));
        assert!(pairs.contains(&("token".into(), "secret-token".into())));
        assert!(pairs.contains(&("processingSources".into(), "all".into())));
    }

    #[test]
    fn test_sensor_url() {
        let url =
            build_request_url(&settings(), Endpoint::Sensor, "SPOT-31088C", &chunk()).unwrap();
        assert_eq!(url.path(), "/api/sensor-data");

        let keys: Vec<String> = query(&url).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["spotterId", "startDate", "endDate", "token", "limit"]
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let mut bad = settings();
        bad.base_url = "not a url".to_string();
        assert!(matches!(
            build_request_url(&bad, Endpoint::Wave, "SPOT-1", &chunk()),
            Err(ApiError::Url(_))
        ));
    }

    #[test]
    fn test_error_body_is_truncated() {
        assert_eq!(truncate_body("Unauthorized"), "Unauthorized");

        let page = "<html>".repeat(1000);
        let kept = truncate_body(&page);
        assert_eq!(kept.chars().count(), MAX_ERROR_BODY_CHARS + 3);
        assert!(kept.ends_with("..."));

        let wide = "é".repeat(MAX_ERROR_BODY_CHARS + 1);
        assert!(truncate_body(&wide).starts_with(&"é".repeat(MAX_ERROR_BODY_CHARS)));
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let mut local = settings();
        local.base_url = "http://127.0.0.1:1/api".to_string();
        local.token = "super-secret-token".to_string();
        local.timeout = Some(std::time::Duration::from_secs(5));
        let client = SofarClient::new(&local).unwrap();

        let err = client
            .fetch(Endpoint::Wave, "SPOT-1", &chunk())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
        assert!(!format!("{:?}", err).contains("super-secret-token"));

        let message = crate::error::EtlError::from(err).to_string();
        assert!(!message.contains("super-secret-token"), "{}", message);
    }

    #[test]
    fn test_take_data() {
        assert_eq!(
            take_data(json!({"data": [1, 2]})),
            Some(json!([1, 2]))
        );
        assert_eq!(take_data(json!({"message": "no data"})), None);
        assert_eq!(take_data(json!({"data": null})), None);
        assert_eq!(take_data(json!([1, 2])), None);
    }
}
