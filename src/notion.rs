//! Notion: the block-oriented target.
//!
//! Pages are always created, never looked up. The configured identifier is
//! tried as a database first; when that create fails (usually because the id
//! is really a page) a single child-page create is attempted under it.

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::blocks::{to_blocks, ContentBlock};
use crate::config::{mask_secret, NotionConfig, NOTION_VERSION};
use crate::contract::{NewNotionPage, NotionApi, NotionPage, PageParent};
use crate::error::{Platform, Result, SyncError};
use crate::extract::SourceDocument;

/// Most children Notion accepts in one append call.
pub const MAX_BLOCKS_PER_APPEND: usize = 100;

static HEX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0-9a-f]{32}").expect("hex id pattern"));
static DASHED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("dashed id pattern")
});
static LOOSE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0-9a-f-]{32,36}").expect("loose id pattern"));

/// Pulls a Notion id out of a bare id or a full Notion URL.
///
/// Tries a 32-hex run, then a dashed UUID, then the last path segment of the
/// URL. Ids that parse as UUIDs come back hyphenated.
pub fn extract_database_id(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let found = HEX_ID
        .find(s)
        .or_else(|| DASHED_ID.find(s))
        .map(|m| m.as_str().to_string())
        .or_else(|| last_path_segment_id(s))?;

    Some(match Uuid::parse_str(&found) {
        Ok(id) => id.hyphenated().to_string(),
        Err(_) => found,
    })
}

fn last_path_segment_id(s: &str) -> Option<String> {
    let url = reqwest::Url::parse(s).ok()?;
    let last = url.path_segments()?.filter(|p| !p.is_empty()).last()?;
    LOOSE_ID.find(last).map(|m| m.as_str().to_string())
}

/// reqwest-backed [`NotionApi`].
pub struct NotionHttpClient {
    http: Client,
    api_base: String,
    api_key: String,
}

impl NotionHttpClient {
    pub fn new(config: &NotionConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            SyncError::authentication(
                Platform::Notion,
                "no API key; set NOTION_API_KEY or notion.api_key in the config file",
            )
        })?;
        info!(
            api_key = %mask_secret(Some(&api_key)),
            api_base = %config.api_base,
            "Initialised Notion client"
        );
        Ok(NotionHttpClient {
            http: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::transport(Platform::Notion, e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(status = %status, call = what, "Notion API returned error. Response body: {text}");
            return Err(SyncError::remote(Platform::Notion, Some(status.as_u16()), text));
        }
        resp.json::<T>()
            .await
            .map_err(|e| SyncError::transport(Platform::Notion, e))
    }
}

#[async_trait]
impl NotionApi for NotionHttpClient {
    async fn create_page(&self, req: NewNotionPage) -> Result<NotionPage> {
        let parent = match &req.parent {
            PageParent::Database(id) => json!({ "database_id": id }),
            PageParent::Page(id) => json!({ "page_id": id }),
        };
        let properties = match &req.title {
            Some((property, title)) => {
                let mut props = json!({});
                props[property.as_str()] = json!({ "title": [{ "text": { "content": title } }] });
                props
            }
            None => json!({}),
        };
        let body = json!({ "parent": parent, "properties": properties });
        self.send(
            self.request(reqwest::Method::POST, "/pages").json(&body),
            "pages.create",
        )
        .await
    }

    async fn append_blocks(&self, block_id: String, children: Vec<ContentBlock>) -> Result<()> {
        let children: Vec<Value> = children.iter().map(ContentBlock::to_notion_json).collect();
        let path = format!("/blocks/{block_id}/children");
        let _: Value = self
            .send(
                self.request(reqwest::Method::PATCH, &path)
                    .json(&json!({ "children": children })),
                "blocks.children.append",
            )
            .await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<()> {
        let _: Value = self
            .send(self.request(reqwest::Method::GET, "/users/me"), "users.me")
            .await?;
        Ok(())
    }
}

/// A connected Notion handle plus the configuration it syncs into.
pub struct NotionSession<A = NotionHttpClient> {
    api: A,
    database_id: Option<String>,
    title_property: String,
}

impl NotionSession<NotionHttpClient> {
    /// Fails with an authentication error when no API key is configured.
    pub fn connect(config: &NotionConfig) -> Result<Self> {
        Ok(Self::new(NotionHttpClient::new(config)?, config))
    }
}

impl<A: NotionApi> NotionSession<A> {
    pub fn new(api: A, config: &NotionConfig) -> Self {
        NotionSession {
            api,
            database_id: config.database_id.clone(),
            title_property: config.title_property.clone(),
        }
    }

    /// Creates a page for `doc` and returns its URL.
    pub async fn sync_document(&self, doc: &SourceDocument) -> Result<String> {
        let raw = self.database_id.as_deref().unwrap_or("");
        let database_id = extract_database_id(raw).ok_or_else(|| {
            error!(raw = %mask_secret(Some(raw)), "Failed to parse Notion database id");
            SyncError::configuration(
                Platform::Notion,
                "database id not configured or not parseable; set NOTION_DATABASE_ID (id or full URL)",
            )
        })?;

        info!(title = %doc.title, "Syncing document to Notion");
        let (page, markup) = match self.create_in_database(&database_id, doc).await {
            Ok(page) => (page, doc.content.clone()),
            Err(database_error) => {
                warn!(
                    error = %database_error,
                    "Create under database failed, retrying as child page"
                );
                let page = self
                    .create_as_child_page(&database_id)
                    .await
                    .map_err(|page_error| {
                        error!(error = %page_error, "Notion child page fallback failed");
                        SyncError::FallbackExhausted {
                            database_error: Box::new(database_error),
                            page_error: Box::new(page_error),
                        }
                    })?;
                (page, format!("# {}\n\n{}", doc.title, doc.content))
            }
        };

        self.append(&page, to_blocks(&markup, &doc.language)).await?;
        Ok(page_url(&page))
    }

    /// First attempt: a database row with only the title property set.
    async fn create_in_database(&self, database_id: &str, doc: &SourceDocument) -> Result<NotionPage> {
        let page = self
            .api
            .create_page(NewNotionPage {
                parent: PageParent::Database(database_id.to_string()),
                title: Some((self.title_property.clone(), doc.title.clone())),
            })
            .await?;
        info!(page_id = %page.id, "Created Notion page in database");
        Ok(page)
    }

    /// Second attempt: an untitled child page. Its body carries the title as a heading.
    async fn create_as_child_page(&self, parent_id: &str) -> Result<NotionPage> {
        let page = self
            .api
            .create_page(NewNotionPage {
                parent: PageParent::Page(parent_id.to_string()),
                title: None,
            })
            .await?;
        info!(page_id = %page.id, "Created Notion child page");
        Ok(page)
    }

    async fn append(&self, page: &NotionPage, blocks: Vec<ContentBlock>) -> Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }
        for batch in blocks.chunks(MAX_BLOCKS_PER_APPEND) {
            self.api.append_blocks(page.id.clone(), batch.to_vec()).await?;
            debug!(page_id = %page.id, blocks = batch.len(), "Appended content blocks");
        }
        Ok(())
    }

    /// True when the token is accepted.
    pub async fn test_connection(&self) -> bool {
        match self.api.current_user().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Notion connection test failed");
                false
            }
        }
    }
}

fn page_url(page: &NotionPage) -> String {
    page.url
        .clone()
        .unwrap_or_else(|| format!("https://www.notion.so/{}", page.id.replace('-', "")))
}
