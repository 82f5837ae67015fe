//! Command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use paylio_core::{FixtureSource, PlaidSource, TransactionSource};

mod detect;
mod serve;

pub use detect::{cmd_detect, cmd_spend};
pub use serve::cmd_serve;

#[cfg(test)]
pub(crate) use detect::format_subscription_row;

/// Build the transaction source: a local JSON fixture when `--file` is given,
/// otherwise the Plaid-style proxy at `api_base`.
pub fn make_source(api_base: &str, file: Option<&Path>) -> Result<Arc<dyn TransactionSource>> {
    match file {
        Some(path) => {
            let source = FixtureSource::from_json_file(path)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?;
            Ok(Arc::new(source))
        }
        None => Ok(Arc::new(PlaidSource::new(api_base))),
    }
}

/// Truncate a string for table display
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
