use thiserror::Error;

/// Failures reported by mutating [`Dict`](crate::Dict) calls.
///
/// Neither kind leaves the table partially modified: the call that returns
/// one of these has not changed any entry.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DictError {
    /// The bucket array or a new entry's key storage could not be allocated.
    #[error("out of memory")]
    OutOfMemory,
    /// A resize was needed but the table already uses its largest size class.
    #[error("capacity exhausted at size class {size_class} ({capacity} buckets)")]
    CapacityExhausted { size_class: usize, capacity: usize },
}
