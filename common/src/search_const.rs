//! Constants shared by the query builders and the scopes.

/// Term value meaning "any": never turned into a term clause.
pub const ANY_TERM_VALUE: &str = "0";

/// Bucket count requested for every terms facet.
pub const FACET_BUCKET_SIZE: u64 = 100;

/// Sort column that switches to a geo-distance sort.
pub const DISTANCE_SORT: &str = "distance";


pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const DEFAULT_MORE_COUNT: u64 = 10;
pub const DEFAULT_PERIOD_FIELD: &str = "date";
pub const DEFAULT_RESULT_TYPE: &str = "unknown";

pub const DEFAULT_SUGGEST_MIN_CHARS: usize = 3;
pub const DEFAULT_SUGGEST_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_SUGGEST_SIZE: u64 = 20;

/// Subtree of the parsed form holding term selections.
pub const TERMS_FORM_KEY: &str = "terms";
/// Subtree of the parsed form holding an explicit date range.
pub const DATE_RANGE_FORM_KEY: &str = "date_range";
