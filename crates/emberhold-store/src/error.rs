/// Errors a [`RecordStore`](crate::RecordStore) can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage engine failed (I/O, network, quota...).
    #[error("storage backend failed: {0}")]
    Backend(String),

    /// The store refuses writes, e.g. after shutdown.
    #[error("store is read-only")]
    ReadOnly,
}
