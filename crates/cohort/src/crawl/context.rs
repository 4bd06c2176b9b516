//! Everything a crawl needs, bundled once and shared by reference.
//!
//! ```ignore
//! use cohort::crawl::{CrawlContext, CrawlOptions};
//!
//! let ctx = CrawlContext::builder()
//!     .client(Arc::new(github))
//!     .database(Arc::new(db))
//!     .options(CrawlOptions::default())
//!     .progress(callback)
//!     .build()?;
//!
//! let reports = cohort::crawl::sync_repositories(&ctx, &repos).await;
//! ```

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::enrich::{Enricher, SocialProfileFetcher};
use crate::gateway::Gateway;
use crate::progress::{CrawlProgress, ProgressCallback, emit};
use crate::source::SourceClient;

use super::types::CrawlOptions;

/// Error type for context construction.
#[derive(Debug, thiserror::Error)]
pub enum CrawlContextError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

#[derive(Default)]
pub struct CrawlContextBuilder {
    client: Option<Arc<dyn SourceClient>>,
    database: Option<Arc<DatabaseConnection>>,
    gateway: Option<Gateway>,
    social: Option<SocialProfileFetcher>,
    options: Option<CrawlOptions>,
    progress: Option<Arc<ProgressCallback>>,
}

impl CrawlContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(mut self, client: Arc<dyn SourceClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn database(mut self, db: Arc<DatabaseConnection>) -> Self {
        self.database = Some(db);
        self
    }

    /// Gateway for source calls. Defaults to the standard retry policy.
    pub fn gateway(mut self, gateway: Gateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Enable the secondary social profile lookup.
    pub fn social(mut self, social: SocialProfileFetcher) -> Self {
        self.social = Some(social);
        self
    }

    pub fn options(mut self, options: CrawlOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// # Errors
    ///
    /// Returns `CrawlContextError::MissingField` without a client or database.
    pub fn build(self) -> Result<CrawlContext, CrawlContextError> {
        let client = self
            .client
            .ok_or(CrawlContextError::MissingField { field: "client" })?;
        let db = self
            .database
            .ok_or(CrawlContextError::MissingField { field: "database" })?;
        let options = self.options.unwrap_or_default();

        let mut gateway = self.gateway.unwrap_or_default();
        if let Some(progress) = &self.progress {
            gateway = gateway.with_progress(Arc::clone(progress));
        }
        let gateway = Arc::new(gateway);

        let mut enricher = Enricher::new(Arc::clone(&client), Arc::clone(&gateway))
            .with_event_pages(options.event_pages);
        if let Some(social) = self.social {
            enricher = enricher.with_social(social);
        }

        Ok(CrawlContext {
            client,
            gateway,
            enricher,
            db,
            options,
            progress: self.progress,
        })
    }
}

/// Shared crawl state. Cheap to clone.
#[derive(Clone)]
pub struct CrawlContext {
    pub(crate) client: Arc<dyn SourceClient>,
    pub(crate) gateway: Arc<Gateway>,
    pub(crate) enricher: Enricher,
    pub(crate) db: Arc<DatabaseConnection>,
    pub(crate) options: CrawlOptions,
    pub(crate) progress: Option<Arc<ProgressCallback>>,
}

impl CrawlContext {
    pub fn builder() -> CrawlContextBuilder {
        CrawlContextBuilder::new()
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub(crate) fn emit(&self, event: CrawlProgress) {
        emit(self.progress.as_deref(), event);
    }
}

impl std::fmt::Debug for CrawlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlContext")
            .field("gateway", &self.gateway)
            .field("enricher", &self.enricher)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
