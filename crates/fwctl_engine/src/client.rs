use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use fwctl_core::{
    parse_log_entries, CatalogSnapshot, ClearLogRoute, DeviceCommand, DeviceError,
    DeviceTelemetry, LogEntry, PackageInfo, SelectedFile, TransportKind,
};
use fwctl_logging::{fwctl_debug, fwctl_warn};
use reqwest::multipart::{Form, Part};
use url::Url;

/// Multipart field the device reads the firmware image from.
pub const UPLOAD_FIELD: &str = "firmware";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Upper bound for any response body.
    pub max_bytes: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.4.1".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 1024 * 1024,
        }
    }
}

/// Every request the client makes to the device.
#[async_trait::async_trait]
pub trait DeviceClient: Send + Sync {
    async fn fetch_catalog(&self) -> Result<CatalogSnapshot, DeviceError>;
    async fn fetch_package_info(&self, filename: &str) -> Result<PackageInfo, DeviceError>;
    async fn delete_package(&self, filename: &str) -> Result<String, DeviceError>;
    async fn upload_firmware(&self, file: &SelectedFile) -> Result<String, DeviceError>;
    async fn trigger_update(&self) -> Result<String, DeviceError>;
    async fn fetch_log(&self) -> Result<Vec<LogEntry>, DeviceError>;
    async fn clear_log(&self, route: ClearLogRoute) -> Result<String, DeviceError>;
    async fn fetch_telemetry(&self) -> Result<DeviceTelemetry, DeviceError>;
    async fn send_command(&self, command: &DeviceCommand) -> Result<String, DeviceError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDeviceClient {
    settings: EngineSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestDeviceClient {
    pub fn new(settings: EngineSettings) -> Result<Self, DeviceError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| DeviceError::transport(TransportKind::InvalidUrl, err.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| DeviceError::transport(TransportKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, DeviceError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|err| DeviceError::transport(TransportKind::InvalidUrl, err.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, DeviceError> {
        let url = self.endpoint(path, query)?;
        fwctl_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        self.read_text(response).await
    }

    async fn read_text(&self, response: reqwest::Response) -> Result<String, DeviceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::transport(
                TransportKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait::async_trait]
impl DeviceClient for ReqwestDeviceClient {
    async fn fetch_catalog(&self) -> Result<CatalogSnapshot, DeviceError> {
        let body = self.get_text("firmware/all", &[]).await?;
        Ok(CatalogSnapshot::parse(&body, Utc::now()))
    }

    async fn fetch_package_info(&self, filename: &str) -> Result<PackageInfo, DeviceError> {
        let not_found = || DeviceError::PackageNotFound {
            filename: filename.to_string(),
        };
        let body = match self
            .get_text("firmware/package/info", &[("filename", filename)])
            .await
        {
            Ok(body) => body,
            Err(DeviceError::Transport {
                kind: TransportKind::HttpStatus(404),
                ..
            }) => return Err(not_found()),
            Err(err) => return Err(err),
        };
        PackageInfo::parse(filename, &body).ok_or_else(not_found)
    }

    async fn delete_package(&self, filename: &str) -> Result<String, DeviceError> {
        self.get_text("firmware/package/delete", &[("filename", filename)])
            .await
    }

    async fn upload_firmware(&self, file: &SelectedFile) -> Result<String, DeviceError> {
        let url = self.endpoint("firmwareupload", &[])?;
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str("application/octet-stream")
            .map_err(map_reqwest_error)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        fwctl_debug!("POST {} ({} bytes)", url, file.size());
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        self.read_text(response).await
    }

    async fn trigger_update(&self) -> Result<String, DeviceError> {
        self.get_text("firmwareupdate", &[]).await
    }

    async fn fetch_log(&self) -> Result<Vec<LogEntry>, DeviceError> {
        let body = self.get_text("log", &[]).await?;
        Ok(parse_log_entries(&body))
    }

    async fn clear_log(&self, route: ClearLogRoute) -> Result<String, DeviceError> {
        match route {
            ClearLogRoute::Get => self.get_text("clearlog", &[]).await,
            ClearLogRoute::Post => {
                let url = self.endpoint("log/clear", &[])?;
                fwctl_debug!("POST {}", url);
                let response = self.client.post(url).send().await.map_err(map_reqwest_error)?;
                self.read_text(response).await
            }
        }
    }

    async fn fetch_telemetry(&self) -> Result<DeviceTelemetry, DeviceError> {
        let body = self.get_text("uptime", &[]).await?;
        Ok(DeviceTelemetry::parse(&body))
    }

    async fn send_command(&self, command: &DeviceCommand) -> Result<String, DeviceError> {
        match command {
            DeviceCommand::SetLed { colour } => {
                self.get_text("led", &[("colour", colour.as_str())]).await
            }
            DeviceCommand::I2cCommand { cmd } => {
                let cmd = cmd.to_string();
                self.get_text("i2ccmd", &[("cmd", cmd.as_str())]).await
            }
            DeviceCommand::ScanI2c => self.get_text("scani2c", &[]).await,
            DeviceCommand::VersionCheck => self.get_text("versioncheck", &[]).await,
        }
    }
}

fn too_large(max_bytes: u64, actual: u64) -> DeviceError {
    fwctl_warn!("device response of {} bytes exceeds {} byte limit", actual, max_bytes);
    DeviceError::transport(
        TransportKind::TooLarge,
        format!("{actual} bytes exceeds the {max_bytes} byte limit"),
    )
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> DeviceError {
    if err.is_timeout() {
        return DeviceError::transport(TransportKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return DeviceError::transport(TransportKind::InvalidUrl, err.to_string());
    }
    DeviceError::transport(TransportKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ReqwestDeviceClient {
        ReqwestDeviceClient::new(EngineSettings {
            base_url: base.to_string(),
            ..EngineSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_keep_base_path_and_encode_query() {
        let device = client("http://192.168.4.1/device");
        let url = device
            .endpoint("firmware/package/info", &[("filename", "my fw.bin")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://192.168.4.1/device/firmware/package/info?filename=my+fw.bin"
        );
        assert_eq!(
            device.endpoint("log", &[]).unwrap().as_str(),
            "http://192.168.4.1/device/log"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ReqwestDeviceClient::new(EngineSettings {
            base_url: "not a url".to_string(),
            ..EngineSettings::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Transport {
                kind: TransportKind::InvalidUrl,
                ..
            }
        ));
    }
}
