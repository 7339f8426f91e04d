// Budget Review - Core Library
// Transaction review engine: ledger I/O, filters, pot reconciliation, summaries.
// Exposes all modules for use in the CLI and tests

pub mod config;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod raw;
pub mod reconciliation; // Pot link pairing
pub mod schema;
pub mod session;
pub mod summary;
pub mod transaction;

use std::sync::Once;

// Re-export commonly used types
pub use config::Config;
pub use error::{LedgerError, Result, ValidationError};
pub use filter::{apply_filters, FilterKey, FilterSet};
pub use ledger::{load_csv, read_ledger, save_csv, write_ledger, Ledger};
pub use raw::{parse_amount, parse_date, RawRecord};
pub use reconciliation::{
    clear_link, clear_row, rank_candidates, set_category, set_link_pair, toggle_manual_link,
    verify_links, Candidate, LinkIssue,
};
pub use schema::{raw_headers, save_headers, validate_columns, ProcessedField, RawField};
pub use session::{Session, SessionStats};
pub use summary::{
    category_totals, income_summary, pot_groups, IncomeLine, IncomeSummary, LinkStatus, PotLine,
    Summary,
};
pub use transaction::{
    parse_bool, Link, Processed, ProcessedUpdate, Transaction, MANUAL_LINK_ID, POT_CATEGORY,
    POT_TRANSFER_TYPE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static TRACING_INIT: Once = Once::new();

/// Log filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "budget_review=info";

/// Install the `fmt` subscriber once. A valid `RUST_LOG` replaces
/// [`DEFAULT_LOG_FILTER`] entirely.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        let filter = log_filter(rust_log.as_deref());

        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}

fn log_filter(rust_log: Option<&str>) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_replaces_default_filter() {
        let filter = log_filter(Some("budget_review=warn")).to_string();
        assert!(filter.contains("budget_review=warn"));
        assert!(!filter.contains("info"));
    }

    #[test]
    fn test_default_filter_without_rust_log() {
        assert_eq!(log_filter(None).to_string(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_unparseable_rust_log_falls_back() {
        assert_eq!(log_filter(Some("budget_review=loud")).to_string(), DEFAULT_LOG_FILTER);
    }
}
