//! Sequential, paced fetch of every category for one query.
//!
//! Categories are requested one after another with a fixed delay between
//! them to stay under the upstream rate limit. A failing category contributes
//! nothing and never aborts the rest. A centre off the globe fails every
//! category without contacting the upstream.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::categories::CategoryQuery;
use super::geo::Coordinate;
use super::places::RawElement;
use super::ports::OverpassCategorySource;
use super::runtime::Sleeper;

/// Default delay between two category requests.
pub const DEFAULT_PACING: Duration = Duration::from_millis(1100);

/// Outcome of fetching every category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    /// Elements of every successful category, in category order.
    pub elements: Vec<RawElement>,
    /// Ids of the categories that failed.
    pub failed_categories: Vec<&'static str>,
    /// Number of categories requested.
    pub attempted: usize,
}

impl FetchReport {
    /// Every category succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_categories.is_empty()
    }

    /// Every category failed.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.attempted > 0 && self.failed_categories.len() == self.attempted
    }
}

/// Fetches all configured categories through an [`OverpassCategorySource`].
pub struct CategoryFetcher {
    source: Arc<dyn OverpassCategorySource>,
    categories: Vec<CategoryQuery>,
    pacing: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl CategoryFetcher {
    /// Build a fetcher.
    pub fn new(
        source: Arc<dyn OverpassCategorySource>,
        categories: Vec<CategoryQuery>,
        pacing: Duration,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            source,
            categories,
            pacing,
            sleeper,
        }
    }

    /// Fetch every category around `center`.
    pub async fn fetch_all(&self, center: Coordinate, radius_meters: u32) -> FetchReport {
        let mut report = FetchReport {
            attempted: self.categories.len(),
            ..FetchReport::default()
        };
        if !center.is_on_globe() {
            warn!(
                lat = center.lat,
                lon = center.lon,
                "centre is off the globe; skipping upstream"
            );
            report.failed_categories = self
                .categories
                .iter()
                .map(|category| category.id)
                .collect();
            return report;
        }
        for (index, category) in self.categories.iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep(self.pacing).await;
            }
            match self
                .source
                .fetch_category(category, center, radius_meters)
                .await
            {
                Ok(elements) => {
                    debug!(category = category.id, count = elements.len(), "category fetched");
                    report.elements.extend(elements);
                }
                Err(error) => {
                    warn!(
                        category = category.id,
                        %error,
                        "category fetch failed; continuing without it"
                    );
                    report.failed_categories.push(category.id);
                }
            }
        }
        report
    }
}
