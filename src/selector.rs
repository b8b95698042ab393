//! Paginated selector: pick the n-th album out of a remote paged listing.
//!
//! Pages are fetched one at a time and appended to a flat list. Fetching
//! stops as soon as the list is long enough, so asking for the k-th result
//! with page size p never costs more than `ceil(k / p)` page requests.
//!
//! Ordinals are 1-based everywhere. The conversion to a 0-based index
//! happens once, in [`Ordinal::index`].

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

use crate::client::{AlbumId, RemoteClient, SearchEntry, SearchOrder, SearchPage};
use crate::error::ServiceError;

/// Default number of keyword search pages fetched before giving up.
pub const DEFAULT_KEYWORD_MAX_PAGES: usize = 3;

/// A validated 1-based position into a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ordinal(NonZeroUsize);

impl Ordinal {
    /// Validates a numeric ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidOrdinal`] for zero and negative values.
    pub fn new(value: i64) -> Result<Self, ServiceError> {
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or_else(|| ServiceError::invalid_ordinal(value))
    }

    /// Parses an ordinal typed by a user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidOrdinal`] if `raw` is not an integer
    /// or is less than 1.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        Self::new(parse_ordinal(raw)?)
    }

    /// Returns the 1-based value.
    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Returns the matching 0-based index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0.get() - 1
    }
}

/// Parses user-typed ordinal text into an integer.
///
/// Only the integer syntax is checked; the `>= 1` rule is enforced by
/// [`PaginatedSelector::select_nth`], so `"0"` and `"-1"` parse here.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidOrdinal`] if `raw` is not an integer.
pub fn parse_ordinal(raw: &str) -> Result<i64, ServiceError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ServiceError::invalid_ordinal(raw))
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of remote listing to select from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectQuery {
    /// Site search requiring every keyword.
    Keyword(Vec<String>),
    /// Works by one author, newest first.
    Author(String),
    /// Uniform random pick from the first page of the monthly ranking.
    /// The ordinal is validated but otherwise unused.
    MonthlyRanking,
}

impl SelectQuery {
    /// Builds a keyword query from loose words.
    #[must_use]
    pub fn keyword<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keyword(keywords.into_iter().map(Into::into).collect())
    }

    /// Builds an author query from the words of the author's name.
    #[must_use]
    pub fn author<I, S>(name_parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name_parts
            .into_iter()
            .map(|part| part.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self::Author(name)
    }

    /// Returns the search text sent to the remote site search.
    ///
    /// Blank keywords are dropped.
    #[must_use]
    pub fn search_text(&self) -> Option<String> {
        match self {
            Self::Keyword(keywords) => Some(
                keywords
                    .iter()
                    .map(|keyword| keyword.trim())
                    .filter(|keyword| !keyword.is_empty())
                    .map(|keyword| format!("+{keyword}"))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Self::Author(name) => Some(format!(":{}", name.trim())),
            Self::MonthlyRanking => None,
        }
    }

    /// True for a keyword query without any non-blank keyword, or an
    /// author query with a blank name.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Keyword(keywords) => keywords.iter().all(|keyword| keyword.trim().is_empty()),
            Self::Author(name) => name.trim().is_empty(),
            Self::MonthlyRanking => false,
        }
    }
}

/// The entry chosen by a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected album id.
    pub album_id: AlbumId,
    /// Title as shown in the listing.
    pub title: String,
    /// Total matches reported by the remote, when the query reports one.
    pub total: Option<usize>,
}

impl Selection {
    fn from_entry(entry: SearchEntry, total: Option<usize>) -> Self {
        Self {
            album_id: entry.album_id,
            title: entry.title,
            total,
        }
    }
}

/// Turns remote paged listings into ordinal-addressable selections.
#[derive(Clone)]
pub struct PaginatedSelector {
    client: Arc<dyn RemoteClient>,
    keyword_max_pages: usize,
}

impl fmt::Debug for PaginatedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedSelector")
            .field("keyword_max_pages", &self.keyword_max_pages)
            .finish_non_exhaustive()
    }
}

impl PaginatedSelector {
    /// Creates a selector with the default keyword page cap.
    #[must_use]
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self::with_keyword_max_pages(client, DEFAULT_KEYWORD_MAX_PAGES)
    }

    /// Creates a selector fetching at most `keyword_max_pages` keyword pages.
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_keyword_max_pages(client: Arc<dyn RemoteClient>, keyword_max_pages: usize) -> Self {
        Self {
            client,
            keyword_max_pages: keyword_max_pages.max(1),
        }
    }

    /// Returns the keyword page cap.
    #[must_use]
    pub fn keyword_max_pages(&self) -> usize {
        self.keyword_max_pages
    }

    /// Selects the `ordinal`-th (1-based) album of `query`.
    ///
    /// The ordinal is validated before any remote call.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidOrdinal`] if `ordinal < 1`
    /// - [`ServiceError::EmptyQuery`] if a keyword or author query is blank
    /// - [`ServiceError::InsufficientResults`] if fewer entries exist
    /// - [`ServiceError::DownloadFailed`] if a page request fails
    #[instrument(skip(self))]
    pub async fn select_nth(
        &self,
        query: &SelectQuery,
        ordinal: i64,
    ) -> Result<Selection, ServiceError> {
        let ordinal = Ordinal::new(ordinal)?;
        match query {
            SelectQuery::Keyword(_) if query.is_blank() => Err(ServiceError::empty_query("keyword")),
            SelectQuery::Author(_) if query.is_blank() => Err(ServiceError::empty_query("author")),
            SelectQuery::Keyword(_) => self.select_keyword(query, ordinal).await,
            SelectQuery::Author(_) => self.select_author(query, ordinal).await,
            SelectQuery::MonthlyRanking => self.select_random().await,
        }
    }

    /// Picks a uniformly random album from the first monthly ranking page.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InsufficientResults`] if the ranking page is empty
    /// - [`ServiceError::DownloadFailed`] if the page request fails
    #[instrument(skip(self))]
    pub async fn select_random(&self) -> Result<Selection, ServiceError> {
        let page = self
            .client
            .month_ranking(1)
            .await
            .map_err(|e| ServiceError::download_failed("monthly ranking page 1", e))?;
        let total = page.total;
        let chosen = {
            let mut rng = rand::thread_rng();
            pick_random(&page.entries, &mut rng).cloned()
        };
        let entry = chosen.ok_or_else(|| ServiceError::insufficient_results(0, None))?;
        debug!(album_id = %entry.album_id, candidates = page.entries.len(), "picked ranking entry");
        Ok(Selection::from_entry(entry, Some(total)))
    }

    async fn select_keyword(
        &self,
        query: &SelectQuery,
        ordinal: Ordinal,
    ) -> Result<Selection, ServiceError> {
        let text = query.search_text().unwrap_or_default();
        let mut results = Vec::new();

        for page in 1..=self.keyword_max_pages {
            let listing = self.fetch_search_page(&text, page, None).await?;
            let exhausted = listing.is_empty();
            results.extend(listing.entries);
            debug!(page, collected = results.len(), "keyword page fetched");
            if results.len() >= ordinal.get() || exhausted {
                break;
            }
        }

        take_nth(results, ordinal, None)
    }

    async fn select_author(
        &self,
        query: &SelectQuery,
        ordinal: Ordinal,
    ) -> Result<Selection, ServiceError> {
        let text = query.search_text().unwrap_or_default();
        let first = self
            .fetch_search_page(&text, 1, Some(SearchOrder::Latest))
            .await?;
        let total_count = first.total;
        let page_size = first.page_size;
        let mut results = first.entries;

        if results.len() < ordinal.get() && total_count > 0 && page_size > 0 {
            let total_pages = total_count.div_ceil(page_size);
            debug!(total_count, page_size, total_pages, "author listing size");
            for page in 2..=total_pages {
                let listing = self
                    .fetch_search_page(&text, page, Some(SearchOrder::Latest))
                    .await?;
                let exhausted = listing.is_empty();
                results.extend(listing.entries);
                debug!(page, collected = results.len(), "author page fetched");
                if results.len() >= ordinal.get() || exhausted {
                    break;
                }
            }
        }

        take_nth(results, ordinal, Some(total_count))
    }

    async fn fetch_search_page(
        &self,
        text: &str,
        page: usize,
        order: Option<SearchOrder>,
    ) -> Result<SearchPage, ServiceError> {
        self.client
            .search_site(text, page, order)
            .await
            .map_err(|e| ServiceError::download_failed(format!("search page {page}"), e))
    }
}

fn take_nth(
    results: Vec<SearchEntry>,
    ordinal: Ordinal,
    total: Option<usize>,
) -> Result<Selection, ServiceError> {
    let found = results.len();
    results
        .into_iter()
        .nth(ordinal.index())
        .map(|entry| Selection::from_entry(entry, total))
        .ok_or_else(|| ServiceError::insufficient_results(found, total))
}

/// Picks one entry uniformly at random. `None` for an empty slice.
pub fn pick_random<'a, R: Rng + ?Sized>(
    entries: &'a [SearchEntry],
    rng: &mut R,
) -> Option<&'a SearchEntry> {
    entries.choose(rng)
}
