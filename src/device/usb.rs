//! Data channel over the tablet's USB web interface.
//!
//! The interface is a small HTTP server that only listens while the user
//! has enabled it in the tablet settings. Uploads land in whichever folder
//! was last browsed, so an upload into a folder first navigates there.

use std::path::Path;
use std::time::Duration;

use reqwest::{multipart, Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::connection::ConnectionError;
use super::data::DataTransport;
use crate::error::{Error, Result};

/// Default base URL when the tablet is attached over USB.
pub const DEFAULT_WEB_URL: &str = "http://10.11.99.1";

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct UsbWebTransport {
    client: Client,
    base_url: String,
}

impl UsbWebTransport {
    /// Create a transport for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn browse(&self, folder: Option<&str>) -> Result<()> {
        let url = self.url(&format!("documents/{}", folder.unwrap_or_default()));
        let response = self.client.get(&url).send().await.map_err(unreachable)?;
        expect_success(response.status(), &url)
    }
}

fn unreachable(e: reqwest::Error) -> Error {
    ConnectionError::data_channel_disabled(format!("USB web interface unreachable: {e}")).into()
}

fn expect_success(status: StatusCode, url: &str) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(ConnectionError::data_channel_disabled(format!("{url} answered {status}")).into())
    } else {
        Err(Error::Other(format!("{url} answered {status}")))
    }
}

impl DataTransport for UsbWebTransport {
    async fn probe(&self) -> Result<()> {
        let url = self.url("documents/");
        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(unreachable)?;
        expect_success(response.status(), &url)
    }

    async fn download_document(&self, id: &str, dest: &Path) -> Result<u64> {
        let url = self.url(&format!("download/{id}/placeholder"));
        let mut response = self.client.get(&url).send().await.map_err(unreachable)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ItemNotFound { id: id.to_string() });
        }
        expect_success(response.status(), &url)?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| Error::Transfer {
            id: id.to_string(),
            message: e.to_string(),
        })? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        debug!(id, bytes = written, dest = %dest.display(), "Downloaded document");
        Ok(written)
    }

    async fn upload_file(&self, path: &Path, parent_id: Option<&str>) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidArgument(format!("not a file: {}", path.display())))?;
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("epub") => "application/epub+zip",
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "only PDF and EPUB files can be uploaded: {}",
                    path.display()
                )));
            }
        };
        let bytes = tokio::fs::read(path).await?;

        self.browse(parent_id).await?;

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime)
            .map_err(|e| Error::Other(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let url = self.url("upload");
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(unreachable)?;
        expect_success(response.status(), &url)?;

        info!(file = %file_name, parent = parent_id.unwrap_or("(root)"), "Uploaded file");
        Ok(())
    }
}
