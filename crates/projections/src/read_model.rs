//! Read model trait for query-side views.

/// A denormalized, query-optimized view kept current by a projection.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries, or 0 while the view is being written to.
    fn count(&self) -> usize;
}
