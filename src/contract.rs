#![allow(unused)]

//! # contract: transport seams for both knowledge bases
//!
//! One trait per remote platform, one method per remote call. The upsert
//! logic in [`crate::notion`] and [`crate::confluence`] is written against
//! these traits; the reqwest clients implement them for real use and
//! `mockall` generates `MockNotionApi` / `MockConfluenceApi` for tests.
//!
//! Response structs only carry the fields that are actually consumed, and
//! every one of them is optional on the wire.

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use serde::{Deserialize, Serialize};

use crate::blocks::ContentBlock;
use crate::error::Result;

/// Where a new Notion page is filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageParent {
    Database(String),
    Page(String),
}

/// Request for the Notion page-create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotionPage {
    pub parent: PageParent,
    /// `(property name, title)`. Child pages are created without properties.
    pub title: Option<(String, String)>,
}

/// A Notion page as returned by page creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotionPage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Calls made against the Notion API.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// `POST /pages`
    async fn create_page(&self, req: NewNotionPage) -> Result<NotionPage>;

    /// `PATCH /blocks/{block_id}/children`
    async fn append_blocks(&self, block_id: String, children: Vec<ContentBlock>) -> Result<()>;

    /// `GET /users/me`, used as a connectivity probe.
    async fn current_user(&self) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfluenceVersion {
    #[serde(default)]
    pub number: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfluenceLinks {
    #[serde(default)]
    pub webui: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
}

/// A Confluence content document as returned by search, get, create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfluencePage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: Option<ConfluenceVersion>,
    #[serde(default, rename = "_links")]
    pub links: Option<ConfluenceLinks>,
}

impl ConfluencePage {
    /// Human-facing URL of the page, absolute when the response names its base.
    pub fn web_url(&self) -> Option<String> {
        let links = self.links.as_ref()?;
        let webui = links.webui.as_deref()?;
        match links.base.as_deref() {
            Some(base) if webui.starts_with('/') => {
                Some(format!("{}{}", base.trim_end_matches('/'), webui))
            }
            _ => Some(webui.to_string()),
        }
    }
}

/// A label currently attached to a Confluence page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfluenceLabel {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfluenceSpace {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

/// `POST /content` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewConfluencePage {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub space: SpaceRef,
    pub body: StorageBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancestors: Option<Vec<IdRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
}

/// `PUT /content/{id}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfluencePageUpdate {
    pub version: VersionRef,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub body: StorageBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceRef {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRef {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub labels: Vec<LabelName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelName {
    pub name: String,
}

/// Label as sent to `POST /content/{id}/label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalLabel {
    pub prefix: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageBody {
    pub storage: StorageValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageValue {
    pub value: String,
    pub representation: String,
}

impl StorageBody {
    pub fn new(value: String) -> Self {
        StorageBody {
            storage: StorageValue {
                value,
                representation: "storage".to_string(),
            },
        }
    }
}

/// Calls made against the Confluence REST API (`/wiki/rest/api`).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ConfluenceApi: Send + Sync {
    /// `GET /content?spaceKey&title&expand=version`; returns the results array.
    async fn search_by_title(&self, space_key: String, title: String) -> Result<Vec<ConfluencePage>>;

    /// `GET /content/{id}?expand=version`
    async fn get_page(&self, page_id: String) -> Result<ConfluencePage>;

    /// `POST /content`
    async fn create_page(&self, req: NewConfluencePage) -> Result<ConfluencePage>;

    /// `PUT /content/{id}`
    async fn update_page(&self, page_id: String, req: ConfluencePageUpdate) -> Result<ConfluencePage>;

    /// `GET /content/{id}/label`
    async fn get_labels(&self, page_id: String) -> Result<Vec<ConfluenceLabel>>;

    /// `POST /content/{id}/label`
    async fn add_labels(&self, page_id: String, labels: Vec<GlobalLabel>) -> Result<()>;

    /// `DELETE /content/{id}/label?name=`
    async fn remove_label(&self, page_id: String, name: String) -> Result<()>;

    /// `GET /space?limit`
    async fn list_spaces(&self, limit: Option<u32>) -> Result<Vec<ConfluenceSpace>>;

    /// `GET /content?spaceKey&type=page&limit=100`
    async fn list_pages(&self, space_key: String) -> Result<Vec<ConfluencePage>>;
}
