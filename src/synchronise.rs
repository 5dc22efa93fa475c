//! High-level pipeline: extracted document → translator → upsert client, per platform.
//!
//! [`SessionCache`] owns the per-platform sessions. Each one is connected
//! lazily on first use from an explicit [`ResolvedConfig`], reused for the
//! rest of the process, and retried on the next call if connecting failed.
//!
//! # Error Handling
//! Single-platform syncs return the platform's [`SyncError`](crate::error::SyncError). Syncing to both
//! never fails: each platform is attempted in turn and the report carries a
//! tri-state [`SyncOutcome`].

use std::fmt;
use tracing::{error, info};

use crate::confluence::{ConfluenceHttpClient, ConfluenceSession, PageContent};
use crate::config::ResolvedConfig;
use crate::contract::{ConfluenceApi, ConfluencePage, ConfluenceSpace, NotionApi};
use crate::error::Result;
use crate::extract::SourceDocument;
use crate::notion::{NotionHttpClient, NotionSession};

/// Where a document is synced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Notion,
    Confluence,
    Both,
}

/// Per-run overrides for a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub destination: Destination,
    /// Confluence space, overriding the configured one.
    pub space_key: Option<String>,
    /// Confluence parent page, overriding the configured one.
    pub parent_id: Option<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            destination: Destination::Both,
            space_key: None,
            parent_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Both,
    NotionOnly,
    ConfluenceOnly,
    Neither,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncOutcome::Both => "Successfully synced to both Notion and Confluence!",
            SyncOutcome::NotionOnly => "Synced to Notion only. Confluence sync failed.",
            SyncOutcome::ConfluenceOnly => "Synced to Confluence only. Notion sync failed.",
            SyncOutcome::Neither => "Failed to sync to both platforms.",
        })
    }
}

/// What happened to one document. Platforms that were not attempted have
/// neither a URL nor an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub title: String,
    pub notion_url: Option<String>,
    pub notion_error: Option<String>,
    pub confluence_url: Option<String>,
    pub confluence_error: Option<String>,
}

impl SyncReport {
    pub fn outcome(&self) -> SyncOutcome {
        match (self.notion_url.is_some(), self.confluence_url.is_some()) {
            (true, true) => SyncOutcome::Both,
            (true, false) => SyncOutcome::NotionOnly,
            (false, true) => SyncOutcome::ConfluenceOnly,
            (false, false) => SyncOutcome::Neither,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.notion_error.is_some() || self.confluence_error.is_some()
    }
}

/// Connectivity of both platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub notion: bool,
    pub confluence: bool,
}

type Connector<S> = Box<dyn FnMut(&ResolvedConfig) -> Result<S> + Send>;

/// Connect-or-reuse factory for the per-platform sessions.
pub struct SessionCache<N = NotionHttpClient, C = ConfluenceHttpClient> {
    config: ResolvedConfig,
    notion: Option<NotionSession<N>>,
    confluence: Option<ConfluenceSession<C>>,
    connect_notion: Connector<NotionSession<N>>,
    connect_confluence: Connector<ConfluenceSession<C>>,
}

impl SessionCache {
    /// Sessions backed by the HTTP clients.
    pub fn new(config: ResolvedConfig) -> Self {
        Self::with_connectors(
            config,
            |config: &ResolvedConfig| NotionSession::connect(&config.notion),
            |config: &ResolvedConfig| ConfluenceSession::connect(&config.confluence),
        )
    }
}

impl<N: NotionApi, C: ConfluenceApi> SessionCache<N, C> {
    pub fn with_connectors<FN, FC>(config: ResolvedConfig, connect_notion: FN, connect_confluence: FC) -> Self
    where
        FN: FnMut(&ResolvedConfig) -> Result<NotionSession<N>> + Send + 'static,
        FC: FnMut(&ResolvedConfig) -> Result<ConfluenceSession<C>> + Send + 'static,
    {
        SessionCache {
            config,
            notion: None,
            confluence: None,
            connect_notion: Box::new(connect_notion),
            connect_confluence: Box::new(connect_confluence),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// The Notion session, connecting first if there is none yet.
    pub fn notion(&mut self) -> Result<&NotionSession<N>> {
        let session = match self.notion.take() {
            Some(session) => session,
            None => (self.connect_notion)(&self.config)?,
        };
        Ok(&*self.notion.insert(session))
    }

    /// The Confluence session, connecting first if there is none yet.
    pub fn confluence(&mut self) -> Result<&ConfluenceSession<C>> {
        let session = match self.confluence.take() {
            Some(session) => session,
            None => (self.connect_confluence)(&self.config)?,
        };
        Ok(&*self.confluence.insert(session))
    }

    pub async fn sync_to_notion(&mut self, doc: &SourceDocument) -> Result<String> {
        let url = self.notion()?.sync_document(doc).await?;
        info!(title = %doc.title, url = %url, "Synced to Notion");
        Ok(url)
    }

    pub async fn sync_to_confluence(&mut self, page: &PageContent) -> Result<String> {
        let url = self.confluence()?.sync_page(page).await?;
        info!(title = %page.title, url = %url, "Synced to Confluence");
        Ok(url)
    }

    /// Attempts Notion, then Confluence. A failure on one does not stop the other.
    pub async fn sync_to_both(&mut self, doc: &SourceDocument, options: &SyncOptions) -> SyncReport {
        let mut report = SyncReport {
            title: doc.title.clone(),
            ..Default::default()
        };
        self.record_notion(doc, &mut report).await;
        self.record_confluence(doc, options, &mut report).await;
        info!(title = %doc.title, outcome = ?report.outcome(), "Finished syncing to both platforms");
        report
    }

    /// Syncs one document to the destination in `options`.
    pub async fn sync_document(&mut self, doc: &SourceDocument, options: &SyncOptions) -> SyncReport {
        match options.destination {
            Destination::Both => self.sync_to_both(doc, options).await,
            Destination::Notion => {
                let mut report = SyncReport {
                    title: doc.title.clone(),
                    ..Default::default()
                };
                self.record_notion(doc, &mut report).await;
                report
            }
            Destination::Confluence => {
                let mut report = SyncReport {
                    title: doc.title.clone(),
                    ..Default::default()
                };
                self.record_confluence(doc, options, &mut report).await;
                report
            }
        }
    }

    /// Syncs each document in order and collects one report per document.
    pub async fn sync_documents(&mut self, docs: &[SourceDocument], options: &SyncOptions) -> Vec<SyncReport> {
        let mut reports = Vec::with_capacity(docs.len());
        for doc in docs {
            reports.push(self.sync_document(doc, options).await);
        }
        let failed = reports.iter().filter(|r| r.has_errors()).count();
        info!(documents = reports.len(), failed, "Project sync complete");
        reports
    }

    /// Probes both platforms. A platform that cannot connect reports `false`.
    pub async fn probe(&mut self) -> ProbeReport {
        let notion = match self.notion() {
            Ok(session) => session.test_connection().await,
            Err(e) => {
                info!(error = %e, "Notion not configured");
                false
            }
        };
        let confluence = match self.confluence() {
            Ok(session) => session.test_connection().await,
            Err(e) => {
                info!(error = %e, "Confluence not configured");
                false
            }
        };
        ProbeReport { notion, confluence }
    }

    pub async fn list_spaces(&mut self) -> Result<Vec<ConfluenceSpace>> {
        Ok(self.confluence()?.list_spaces().await)
    }

    pub async fn list_pages(&mut self, space_key: &str) -> Result<Vec<ConfluencePage>> {
        Ok(self.confluence()?.list_pages(space_key).await)
    }

    async fn record_notion(&mut self, doc: &SourceDocument, report: &mut SyncReport) {
        match self.sync_to_notion(doc).await {
            Ok(url) => report.notion_url = Some(url),
            Err(e) => {
                error!(title = %doc.title, error = %e, "Notion sync failed");
                report.notion_error = Some(e.to_string());
            }
        }
    }

    async fn record_confluence(&mut self, doc: &SourceDocument, options: &SyncOptions, report: &mut SyncReport) {
        let page = PageContent {
            space_key: options.space_key.clone(),
            parent_id: options.parent_id.clone(),
            ..PageContent::from(doc)
        };
        match self.sync_to_confluence(&page).await {
            Ok(url) => report.confluence_url = Some(url),
            Err(e) => {
                error!(title = %doc.title, error = %e, "Confluence sync failed");
                report.confluence_error = Some(e.to_string());
            }
        }
    }
}
