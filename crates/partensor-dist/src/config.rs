//! Tuning knobs for the row exchange protocol
//!
//! ```
//! use partensor_dist::ExchangeConfig;
//!
//! let config = ExchangeConfig::default().with_check_manifests(true);
//! assert!(config.check_manifests);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Exchange configuration
///
/// Every rank of a layer must use the same `check_manifests` setting: the
/// check is a collective.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExchangeConfig {
    /// Verify send/receive counts with the peers before every update and
    /// reduction
    pub check_manifests: bool,
    /// Gather/scatter loops with fewer rows than this run sequentially
    pub parallel_min_rows: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            check_manifests: cfg!(debug_assertions),
            parallel_min_rows: 256,
        }
    }
}

impl ExchangeConfig {
    /// Defaults overridden by `PARTENSOR_CHECK_MANIFESTS` and
    /// `PARTENSOR_PAR_MIN_ROWS`
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("PARTENSOR_CHECK_MANIFESTS") {
            match parse_flag(&raw) {
                Some(flag) => config.check_manifests = flag,
                None => tracing::warn!(value = %raw, "ignoring PARTENSOR_CHECK_MANIFESTS"),
            }
        }
        if let Ok(raw) = std::env::var("PARTENSOR_PAR_MIN_ROWS") {
            match raw.trim().parse() {
                Ok(rows) => config.parallel_min_rows = rows,
                Err(_) => tracing::warn!(value = %raw, "ignoring PARTENSOR_PAR_MIN_ROWS"),
            }
        }

        config
    }

    pub fn with_check_manifests(mut self, check: bool) -> Self {
        self.check_manifests = check;
        self
    }

    pub fn with_parallel_min_rows(mut self, rows: usize) -> Self {
        self.parallel_min_rows = rows;
        self
    }

    /// Whether a loop over `rows` rows should use the thread pool
    pub(crate) fn use_parallel(&self, rows: usize) -> bool {
        rows >= self.parallel_min_rows
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
