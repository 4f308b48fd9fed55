use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::ExportResult;
use crate::sink::{ArchiveName, Sink};

/// In-memory sink for testing. Clones share the recorded batches.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    written: Arc<Mutex<Vec<(ArchiveName, RecordBatch)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every written batch in write order.
    pub async fn written(&self) -> Vec<(ArchiveName, RecordBatch)> {
        self.written.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.written.lock().await.clear();
    }
}

impl Sink for MemorySink {
    async fn write(&self, name: &ArchiveName, batch: RecordBatch) -> ExportResult<()> {
        info!(archive = %name, rows = batch.num_rows(), "writing batch to memory");
        self.written.lock().await.push((name.clone(), batch));

        Ok(())
    }
}
