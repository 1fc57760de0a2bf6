pub mod bulk;
pub mod evaluate;
pub mod suggest;
pub mod vendor;

pub use bulk::{bulk_suggest, BulkMatch, BULK_CONFIDENCE_FLOOR};
pub use evaluate::{MatchEvaluation, MatchEvaluator, MatchableTransaction};
pub use suggest::{rank_suggestions, Suggestion, MIN_SUGGESTION_CONFIDENCE};
pub use vendor::VendorAliasTable;
