//! Confluence: the document-oriented target.
//!
//! Pages are upserted by title within a space: search, then either create,
//! or read the current version and write `version + 1`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{mask_secret, ConfluenceConfig};
use crate::contract::{
    ConfluenceApi, ConfluenceLabel, ConfluencePage, ConfluencePageUpdate, ConfluenceSpace,
    GlobalLabel, IdRef, LabelName, NewConfluencePage, PageMetadata, SpaceRef, StorageBody, VersionRef,
};
use crate::error::{Platform, Result, SyncError};
use crate::extract::SourceDocument;
use crate::storage::to_storage;

/// A logical page as handed to [`ConfluenceSession::sync_page`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    /// Lightweight markup; converted to storage format on write.
    pub content: String,
    pub labels: Vec<String>,
    /// Overrides the configured space.
    pub space_key: Option<String>,
    /// Overrides the configured parent page.
    pub parent_id: Option<String>,
}

impl From<&SourceDocument> for PageContent {
    fn from(doc: &SourceDocument) -> Self {
        PageContent {
            title: doc.title.clone(),
            content: doc.content.clone(),
            labels: doc.tags.clone(),
            space_key: None,
            parent_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope<T> {
    #[serde(default)]
    results: Vec<T>,
}

/// reqwest-backed [`ConfluenceApi`] using basic auth.
pub struct ConfluenceHttpClient {
    http: Client,
    api_root: String,
    username: String,
    api_token: String,
}

impl ConfluenceHttpClient {
    pub fn new(config: &ConfluenceConfig) -> Result<Self> {
        let (Some(base_url), Some(username), Some(api_token)) = (
            config.base_url.as_deref(),
            config.username.clone(),
            config.api_token.clone(),
        ) else {
            return Err(SyncError::authentication(
                Platform::Confluence,
                "base URL, username and API token are all required; set CONFLUENCE_BASE_URL, \
                 CONFLUENCE_USERNAME and CONFLUENCE_API_TOKEN",
            ));
        };

        let base = base_url.trim_end_matches('/');
        let api_root = if base.ends_with("/wiki") {
            format!("{base}/rest/api")
        } else {
            format!("{base}/wiki/rest/api")
        };
        info!(
            api_root = %api_root,
            username = %mask_secret(Some(&username)),
            "Initialised Confluence client"
        );
        Ok(ConfluenceHttpClient {
            http: Client::new(),
            api_root,
            username,
            api_token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_root, path))
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
    }

    async fn execute(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::transport(Platform::Confluence, e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(status = %status, call = what, "Confluence API returned error. Response body: {text}");
            return Err(SyncError::remote(
                Platform::Confluence,
                Some(status.as_u16()),
                text,
            ));
        }
        Ok(resp)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        self.execute(req, what)
            .await?
            .json::<T>()
            .await
            .map_err(|e| SyncError::transport(Platform::Confluence, e))
    }
}

#[async_trait]
impl ConfluenceApi for ConfluenceHttpClient {
    async fn search_by_title(&self, space_key: String, title: String) -> Result<Vec<ConfluencePage>> {
        let req = self.request(Method::GET, "/content").query(&[
            ("spaceKey", space_key.as_str()),
            ("title", title.as_str()),
            ("expand", "version"),
        ]);
        let envelope: ResultsEnvelope<ConfluencePage> = self.send(req, "content.search").await?;
        Ok(envelope.results)
    }

    async fn get_page(&self, page_id: String) -> Result<ConfluencePage> {
        let req = self
            .request(Method::GET, &format!("/content/{page_id}"))
            .query(&[("expand", "version")]);
        self.send(req, "content.get").await
    }

    async fn create_page(&self, req: NewConfluencePage) -> Result<ConfluencePage> {
        self.send(
            self.request(Method::POST, "/content").json(&req),
            "content.create",
        )
        .await
    }

    async fn update_page(&self, page_id: String, req: ConfluencePageUpdate) -> Result<ConfluencePage> {
        self.send(
            self.request(Method::PUT, &format!("/content/{page_id}"))
                .json(&req),
            "content.update",
        )
        .await
    }

    async fn add_labels(&self, page_id: String, labels: Vec<GlobalLabel>) -> Result<()> {
        let _: Value = self
            .send(
                self.request(Method::POST, &format!("/content/{page_id}/label"))
                    .json(&labels),
                "content.labels",
            )
            .await?;
        Ok(())
    }

    async fn get_labels(&self, page_id: String) -> Result<Vec<ConfluenceLabel>> {
        let req = self.request(Method::GET, &format!("/content/{page_id}/label"));
        let envelope: ResultsEnvelope<ConfluenceLabel> = self.send(req, "content.labels.get").await?;
        Ok(envelope.results)
    }

    async fn remove_label(&self, page_id: String, name: String) -> Result<()> {
        let req = self
            .request(Method::DELETE, &format!("/content/{page_id}/label"))
            .query(&[("name", name.as_str())]);
        self.execute(req, "content.labels.remove").await?;
        Ok(())
    }

    async fn list_spaces(&self, limit: Option<u32>) -> Result<Vec<ConfluenceSpace>> {
        let mut req = self.request(Method::GET, "/space");
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit)]);
        }
        let envelope: ResultsEnvelope<ConfluenceSpace> = self.send(req, "space.list").await?;
        Ok(envelope.results)
    }

    async fn list_pages(&self, space_key: String) -> Result<Vec<ConfluencePage>> {
        let req = self.request(Method::GET, "/content").query(&[
            ("spaceKey", space_key.as_str()),
            ("type", "page"),
            ("limit", "100"),
        ]);
        let envelope: ResultsEnvelope<ConfluencePage> = self.send(req, "content.list").await?;
        Ok(envelope.results)
    }
}

/// A connected Confluence handle plus the default space and parent page.
pub struct ConfluenceSession<A = ConfluenceHttpClient> {
    api: A,
    space_key: Option<String>,
    parent_page_id: Option<String>,
}

impl ConfluenceSession<ConfluenceHttpClient> {
    /// Fails with an authentication error when credentials are incomplete.
    pub fn connect(config: &ConfluenceConfig) -> Result<Self> {
        Ok(Self::new(ConfluenceHttpClient::new(config)?, config))
    }
}

impl<A: ConfluenceApi> ConfluenceSession<A> {
    pub fn new(api: A, config: &ConfluenceConfig) -> Self {
        ConfluenceSession {
            api,
            space_key: config.space_key.clone(),
            parent_page_id: config.parent_page_id.clone(),
        }
    }

    /// Creates or updates the page titled `page.title` and returns its URL.
    ///
    /// Titles must be unique within a space; when several pages match, the
    /// first search result is updated.
    pub async fn sync_page(&self, page: &PageContent) -> Result<String> {
        let space_key = page
            .space_key
            .clone()
            .or_else(|| self.space_key.clone())
            .ok_or_else(|| {
                SyncError::configuration(
                    Platform::Confluence,
                    "space key not configured; set CONFLUENCE_SPACE_KEY or confluence.space_key",
                )
            })?;

        info!(title = %page.title, space_key = %space_key, "Syncing page to Confluence");
        match self.find_page_by_title(&page.title, &space_key).await? {
            Some(existing) => self.update_page(&existing.id, page).await,
            None => self.create_page(page, &space_key).await,
        }
    }

    /// Remote lookup failures are logged and treated as "not found".
    async fn find_page_by_title(&self, title: &str, space_key: &str) -> Result<Option<ConfluencePage>> {
        match self
            .api
            .search_by_title(space_key.to_string(), title.to_string())
            .await
        {
            Ok(results) => {
                debug!(title, matches = results.len(), "Searched Confluence by title");
                Ok(results.into_iter().next())
            }
            Err(e) if e.is_remote() => {
                warn!(error = %e, title, "Error finding Confluence page, creating instead");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_page(&self, page: &PageContent, space_key: &str) -> Result<String> {
        let parent = page
            .parent_id
            .clone()
            .or_else(|| self.parent_page_id.clone());

        let req = NewConfluencePage {
            kind: "page".to_string(),
            title: page.title.clone(),
            space: SpaceRef {
                key: space_key.to_string(),
            },
            body: StorageBody::new(to_storage(&page.content)),
            ancestors: parent.map(|id| vec![IdRef { id }]),
            metadata: (!page.labels.is_empty()).then(|| PageMetadata {
                labels: page
                    .labels
                    .iter()
                    .map(|name| LabelName { name: name.clone() })
                    .collect(),
            }),
        };

        let created = self.api.create_page(req).await?;
        info!(page_id = %created.id, "Successfully created Confluence page");
        Ok(page_location(&created))
    }

    async fn update_page(&self, page_id: &str, page: &PageContent) -> Result<String> {
        let current = self.api.get_page(page_id.to_string()).await?;
        let version = current.version.as_ref().map(|v| v.number).ok_or_else(|| {
            SyncError::remote(
                Platform::Confluence,
                None,
                format!("page {page_id} was returned without a version"),
            )
        })?;

        let req = ConfluencePageUpdate {
            version: VersionRef {
                number: version + 1,
            },
            title: page.title.clone(),
            kind: "page".to_string(),
            body: StorageBody::new(to_storage(&page.content)),
        };
        let updated = self.api.update_page(page_id.to_string(), req).await?;

        self.replace_labels(page_id, &page.labels).await?;

        info!(page_id, version = version + 1, "Successfully updated Confluence page");
        Ok(page_location(&updated))
    }

    /// Makes the page's global labels equal to `labels`.
    ///
    /// If the current labels cannot be read, nothing is removed and every
    /// label is pushed.
    async fn replace_labels(&self, page_id: &str, labels: &[String]) -> Result<()> {
        let current = match self.api.get_labels(page_id.to_string()).await {
            Ok(current) => current,
            Err(e) if e.is_remote() => {
                warn!(error = %e, page_id, "Could not read current labels, adding only");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        for stale in current
            .iter()
            .filter(|l| l.prefix == "global" && !labels.contains(&l.name))
        {
            self.api
                .remove_label(page_id.to_string(), stale.name.clone())
                .await?;
            debug!(page_id, label = %stale.name, "Removed stale label");
        }

        let missing: Vec<GlobalLabel> = labels
            .iter()
            .filter(|name| !current.iter().any(|l| &l.name == *name))
            .map(|name| GlobalLabel {
                prefix: "global".to_string(),
                name: name.clone(),
            })
            .collect();
        if !missing.is_empty() {
            self.api.add_labels(page_id.to_string(), missing).await?;
        }
        Ok(())
    }

    /// True when the credentials can list spaces.
    pub async fn test_connection(&self) -> bool {
        match self.api.list_spaces(Some(1)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Confluence connection test failed");
                false
            }
        }
    }

    /// Spaces visible to the account; empty on failure.
    pub async fn list_spaces(&self) -> Vec<ConfluenceSpace> {
        self.api.list_spaces(None).await.unwrap_or_else(|e| {
            error!(error = %e, "Error getting Confluence spaces");
            Vec::new()
        })
    }

    /// Up to 100 pages of `space_key`; empty on failure.
    pub async fn list_pages(&self, space_key: &str) -> Vec<ConfluencePage> {
        self.api
            .list_pages(space_key.to_string())
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, space_key, "Error getting Confluence pages");
                Vec::new()
            })
    }
}

fn page_location(page: &ConfluencePage) -> String {
    page.web_url().unwrap_or_else(|| {
        warn!(page_id = %page.id, "Confluence response carried no web link");
        page.id.clone()
    })
}
