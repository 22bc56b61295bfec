use crate::workout::Coords;
use serde_json::Value;
use std::sync::mpsc::{self, Receiver};

pub const DEFAULT_GEOLOCATION_URL: &str = "http://ip-api.com/json";

/// Determine the position lookup endpoint.
///
/// If the `WORKOUT_MAP_GEOLOCATION_URL` environment variable is set, its value
/// takes precedence over the URL stored in the application settings.
pub fn resolve_url(settings_url: Option<&str>) -> String {
    std::env::var("WORKOUT_MAP_GEOLOCATION_URL")
        .ok()
        .or_else(|| settings_url.map(|s| s.to_string()))
        .unwrap_or_else(|| DEFAULT_GEOLOCATION_URL.to_string())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeolocationError {
    #[error("position request denied: {0}")]
    Denied(String),
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("position service error: {0}")]
    Other(String),
}

fn coordinate(json: &Value, keys: [&str; 2]) -> Option<f64> {
    keys.iter()
        .find_map(|k| json.get(*k).and_then(|v| v.as_f64()))
        .filter(|v| v.is_finite())
}

/// Extract a position from a lookup response. Accepts both `lat`/`lon` and
/// `latitude`/`longitude` field names.
fn parse_position(json: &Value) -> Result<Coords, GeolocationError> {
    if json.get("status").and_then(|v| v.as_str()) == Some("fail") {
        let message = json
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("lookup failed");
        return Err(GeolocationError::Unavailable(message.to_string()));
    }
    let lat = coordinate(json, ["lat", "latitude"]);
    let lng = coordinate(json, ["lon", "longitude"]);
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Coords::new(lat, lng)),
        _ => Err(GeolocationError::Unavailable(
            "response has no coordinates".into(),
        )),
    }
}

/// Look up the current position with a blocking HTTP request.
pub fn locate(url: &str) -> Result<Coords, GeolocationError> {
    let response = ureq::get(url).set("Accept", "application/json").call();
    let body = match response {
        Ok(r) => r
            .into_string()
            .map_err(|e| GeolocationError::Other(e.to_string()))?,
        Err(ureq::Error::Status(code @ (401 | 403), r)) => {
            let body = r.into_string().unwrap_or_default();
            return Err(GeolocationError::Denied(format!("{code} {body}")));
        }
        Err(ureq::Error::Status(code, r)) => {
            let body = r.into_string().unwrap_or_default();
            return Err(GeolocationError::Unavailable(format!("{code} {body}")));
        }
        Err(e) => return Err(GeolocationError::Other(e.to_string())),
    };
    let json: Value =
        serde_json::from_str(&body).map_err(|e| GeolocationError::Other(e.to_string()))?;
    parse_position(&json)
}

/// Start a one-shot position request on a background thread.
///
/// The result arrives on the returned channel; `on_done` runs right after it
/// is sent so the caller can wake its event loop.
pub fn request_position(
    url: String,
    on_done: impl FnOnce() + Send + 'static,
) -> Receiver<Result<Coords, GeolocationError>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        log::info!("Requesting current position from {url}");
        let result = locate(&url);
        if let Err(err) = &result {
            log::warn!("Position request failed: {err}");
        }
        let _ = tx.send(result);
        on_done();
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use std::time::Duration;

    static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn parses_ip_api_response() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(200)
                .body(r#"{"status":"success","lat":51.5,"lon":-0.1}"#);
        });

        let pos = locate(&server.url("/json")).unwrap();
        assert_eq!(pos, Coords::new(51.5, -0.1));
        m.assert();
    }

    #[test]
    fn parses_latitude_longitude_names() {
        let json = serde_json::json!({"latitude": 40.4, "longitude": -3.7});
        assert_eq!(parse_position(&json).unwrap(), Coords::new(40.4, -3.7));
    }

    #[test]
    fn failed_lookup_is_unavailable() {
        let json = serde_json::json!({"status": "fail", "message": "reserved range"});
        assert_eq!(
            parse_position(&json).unwrap_err(),
            GeolocationError::Unavailable("reserved range".into())
        );
        let json = serde_json::json!({"status": "success"});
        assert!(matches!(
            parse_position(&json),
            Err(GeolocationError::Unavailable(_))
        ));
    }

    #[test]
    fn maps_403_to_denied() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(403).body("quota");
        });

        let err = locate(&server.url("/json")).unwrap_err();
        assert_eq!(err, GeolocationError::Denied("403 quota".into()));
        m.assert();
    }

    #[test]
    fn background_request_reports_on_channel() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(200).body(r#"{"lat":1.0,"lon":2.0}"#);
        });

        let (done_tx, done_rx) = mpsc::channel();
        let rx = request_position(server.url("/json"), move || {
            let _ = done_tx.send(());
        });
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.unwrap(), Coords::new(1.0, 2.0));
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn env_var_overrides_settings_url() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            std::env::set_var("WORKOUT_MAP_GEOLOCATION_URL", "http://forced/json");
        }
        assert_eq!(resolve_url(Some("http://settings/json")), "http://forced/json");
        unsafe {
            std::env::remove_var("WORKOUT_MAP_GEOLOCATION_URL");
        }
        assert_eq!(resolve_url(Some("http://settings/json")), "http://settings/json");
        assert_eq!(resolve_url(None), DEFAULT_GEOLOCATION_URL);
    }
}
