pub mod lifecycle;

pub use lifecycle::{BulkApproveOutcome, ReconEvent, Reconciler};
