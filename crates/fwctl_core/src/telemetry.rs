use serde_json::Value;

/// `/uptime` payload. Newer device firmware answers JSON, older revisions plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTelemetry {
    Network {
        uptime: String,
        mac: String,
        ip: String,
        rssi: Option<i32>,
    },
    Raw(String),
}

impl DeviceTelemetry {
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => DeviceTelemetry::Network {
                uptime: map.get("uptime").map(text).unwrap_or_default(),
                mac: map.get("mac").map(text).unwrap_or_default(),
                ip: map.get("ip").map(text).unwrap_or_default(),
                rssi: map.get("rssi").and_then(rssi),
            },
            _ => DeviceTelemetry::Raw(body.trim().to_string()),
        }
    }

    pub fn rssi_label(&self) -> Option<String> {
        match self {
            DeviceTelemetry::Network { rssi: Some(dbm), .. } => Some(format!("{dbm} dBm")),
            _ => None,
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn rssi(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().trim_end_matches("dBm").trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_payload() {
        let body = r#"{"uptime":"1h 2m 3s","mac":"AA:BB","ip":"10.0.0.2","rssi":-61}"#;
        let telemetry = DeviceTelemetry::parse(body);
        assert_eq!(
            telemetry,
            DeviceTelemetry::Network {
                uptime: "1h 2m 3s".into(),
                mac: "AA:BB".into(),
                ip: "10.0.0.2".into(),
                rssi: Some(-61),
            }
        );
        assert_eq!(telemetry.rssi_label().as_deref(), Some("-61 dBm"));
    }

    #[test]
    fn numeric_uptime_is_rendered_as_text() {
        let telemetry = DeviceTelemetry::parse(r#"{"uptime":3723,"rssi":"-70 dBm"}"#);
        match telemetry {
            DeviceTelemetry::Network { uptime, rssi, mac, .. } => {
                assert_eq!(uptime, "3723");
                assert_eq!(rssi, Some(-70));
                assert!(mac.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_kept_raw() {
        assert_eq!(
            DeviceTelemetry::parse("Uptime: 5m 2s\n"),
            DeviceTelemetry::Raw("Uptime: 5m 2s".into())
        );
    }
}
