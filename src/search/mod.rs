//! Web search.
//!
//! Provides a web search abstraction backed by Google Custom Search.

mod google;

pub use google::GoogleSearchClient;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub link: String,
    /// Result snippet.
    #[serde(default)]
    pub snippet: String,
}

/// Paging options for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Number of results, 1 to 10.
    pub num: u8,
    /// 1-based index of the first result.
    pub start: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { num: 10, start: 1 }
    }
}

impl SearchOptions {
    /// Largest page size the search API accepts.
    pub const MAX_NUM: u8 = 10;

    /// Sets the number of results.
    #[must_use]
    pub const fn with_num(mut self, num: u8) -> Self {
        self.num = num;
        self
    }

    /// Sets the start index.
    #[must_use]
    pub const fn with_start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    /// Checks that paging values are in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `num` is not in `1..=10` or `start`
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.num == 0 || self.num > Self::MAX_NUM {
            return Err(Error::InvalidInput(format!(
                "num must be between 1 and {}, got {}",
                Self::MAX_NUM,
                self.num
            )));
        }
        if self.start == 0 {
            return Err(Error::InvalidInput("start must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Trait for web search providers.
pub trait WebSearchProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Runs a search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty query or missing
    /// credentials, or [`Error::OperationFailed`] if the request fails.
    fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchResultItem>>;
}
