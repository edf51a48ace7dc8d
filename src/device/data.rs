//! Data channel: bulk document transfer.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;

/// Bulk transfer backend.
pub trait DataTransport: Send + Sync {
    /// Cheap reachability check.
    fn probe(&self) -> impl Future<Output = Result<()>> + Send;

    /// Stream the rendered document `id` into the file at `dest`,
    /// returning the number of bytes written.
    fn download_document(
        &self,
        id: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Upload a local file into the folder `parent_id` (top level if `None`).
    fn upload_file(
        &self,
        path: &Path,
        parent_id: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Single-flight data channel.
pub struct DataChannel<T> {
    transport: T,
    gate: Arc<Mutex<()>>,
}

impl<T: DataTransport> DataChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// # Errors
    ///
    /// Returns the classified connection error.
    pub async fn probe(&self) -> Result<()> {
        let _guard = self.gate.lock().await;
        self.transport.probe().await
    }

    /// # Errors
    ///
    /// Returns an error if the transfer or the local write fails.
    pub async fn download_document(&self, id: &str, dest: &Path) -> Result<u64> {
        let _guard = self.gate.lock().await;
        self.transport.download_document(id, dest).await
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the device rejects it.
    pub async fn upload_file(&self, path: &Path, parent_id: Option<&str>) -> Result<()> {
        let _guard = self.gate.lock().await;
        self.transport.upload_file(path, parent_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct SlowTransport {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowTransport {
        async fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl DataTransport for SlowTransport {
        async fn probe(&self) -> Result<()> {
            self.enter().await;
            Ok(())
        }

        async fn download_document(&self, _id: &str, _dest: &Path) -> Result<u64> {
            self.enter().await;
            Ok(0)
        }

        async fn upload_file(&self, _path: &Path, _parent_id: Option<&str>) -> Result<()> {
            self.enter().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_serialized() {
        let channel = DataChannel::new(SlowTransport::default());
        let dest = Path::new("/unused");
        let (a, b, c) = tokio::join!(
            channel.probe(),
            channel.download_document("x", dest),
            channel.upload_file(dest, None),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        assert_eq!(channel.transport.peak.load(Ordering::SeqCst), 1);
    }
}
