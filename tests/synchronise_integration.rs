use docsync::config::{ConfluenceConfig, NotionConfig, ResolvedConfig};
use docsync::confluence::ConfluenceSession;
use docsync::contract::{
    ConfluenceLinks, ConfluencePage, MockConfluenceApi, MockNotionApi, NotionPage,
};
use docsync::error::{Platform, SyncError};
use docsync::extract::{parse_document, SourceDocument};
use docsync::notion::NotionSession;
use docsync::synchronise::{Destination, SessionCache, SyncOptions, SyncOutcome};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn resolved() -> ResolvedConfig {
    ResolvedConfig {
        notion: NotionConfig {
            api_key: Some("secret_abcdefghijkl".into()),
            database_id: Some("2ffff72a55d580ffbd06ffcae89c7866".into()),
            ..Default::default()
        },
        confluence: ConfluenceConfig {
            base_url: Some("https://example.atlassian.net".into()),
            username: Some("docs@example.com".into()),
            api_token: Some("token-123456789".into()),
            space_key: Some("DOC".into()),
            parent_page_id: None,
        },
    }
}

fn document() -> SourceDocument {
    parse_document(
        Path::new("src/auth.ts"),
        "/**\n * Auth helpers\n * @tags auth, api\n */\nexport function login() {}\n",
        "typescript",
    )
}

fn working_notion() -> MockNotionApi {
    let mut api = MockNotionApi::new();
    api.expect_create_page().returning(|_| {
        Ok(NotionPage {
            id: "row".into(),
            url: Some("https://www.notion.so/row".into()),
        })
    });
    api.expect_append_blocks().returning(|_, _| Ok(()));
    api
}

fn failing_notion() -> MockNotionApi {
    let mut api = MockNotionApi::new();
    api.expect_create_page()
        .returning(|_| Err(SyncError::remote(Platform::Notion, Some(404), "missing")));
    api
}

fn working_confluence() -> MockConfluenceApi {
    let mut api = MockConfluenceApi::new();
    api.expect_search_by_title().returning(|_, _| Ok(vec![]));
    api.expect_create_page().returning(|req| {
        Ok(ConfluencePage {
            id: "7".into(),
            title: req.title,
            version: None,
            links: Some(ConfluenceLinks {
                webui: Some("https://example.atlassian.net/wiki/x/7".into()),
                base: None,
            }),
        })
    });
    api
}

fn failing_confluence() -> MockConfluenceApi {
    let mut api = MockConfluenceApi::new();
    api.expect_search_by_title().returning(|_, _| Ok(vec![]));
    api.expect_create_page()
        .returning(|_| Err(SyncError::remote(Platform::Confluence, Some(403), "forbidden")));
    api
}

fn cache(
    notion: fn() -> MockNotionApi,
    confluence: fn() -> MockConfluenceApi,
) -> SessionCache<MockNotionApi, MockConfluenceApi> {
    SessionCache::with_connectors(
        resolved(),
        move |config: &ResolvedConfig| Ok(NotionSession::new(notion(), &config.notion)),
        move |config: &ResolvedConfig| Ok(ConfluenceSession::new(confluence(), &config.confluence)),
    )
}

#[tokio::test]
async fn both_platforms_succeed() {
    let mut sessions = cache(working_notion, working_confluence);
    let report = sessions.sync_to_both(&document(), &SyncOptions::default()).await;
    assert_eq!(report.outcome(), SyncOutcome::Both);
    assert_eq!(report.notion_url.as_deref(), Some("https://www.notion.so/row"));
    assert_eq!(
        report.confluence_url.as_deref(),
        Some("https://example.atlassian.net/wiki/x/7")
    );
    assert_eq!(
        report.outcome().to_string(),
        "Successfully synced to both Notion and Confluence!"
    );
}

#[tokio::test]
async fn notion_failure_does_not_stop_confluence() {
    let mut sessions = cache(failing_notion, working_confluence);
    let report = sessions.sync_to_both(&document(), &SyncOptions::default()).await;
    assert_eq!(report.outcome(), SyncOutcome::ConfluenceOnly);
    assert!(report.notion_error.is_some());
}

#[tokio::test]
async fn confluence_failure_is_reported_alongside_notion_success() {
    let mut sessions = cache(working_notion, failing_confluence);
    let report = sessions.sync_to_both(&document(), &SyncOptions::default()).await;
    assert_eq!(report.outcome(), SyncOutcome::NotionOnly);
    assert!(report
        .confluence_error
        .as_deref()
        .is_some_and(|e| e.contains("403")));
}

#[tokio::test]
async fn both_failing_yields_neither() {
    let mut sessions = cache(failing_notion, failing_confluence);
    let report = sessions.sync_to_both(&document(), &SyncOptions::default()).await;
    assert_eq!(report.outcome(), SyncOutcome::Neither);
    assert!(report.has_errors());
}

#[tokio::test]
async fn single_destination_only_touches_that_platform() {
    let mut sessions = cache(working_notion, MockConfluenceApi::new);
    let options = SyncOptions {
        destination: Destination::Notion,
        ..Default::default()
    };
    let report = sessions.sync_document(&document(), &options).await;
    assert!(report.notion_url.is_some());
    assert!(report.confluence_url.is_none() && report.confluence_error.is_none());
}

#[tokio::test]
async fn sessions_are_connected_once_and_retried_after_failure() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let mut sessions = SessionCache::with_connectors(
        resolved(),
        move |config: &ResolvedConfig| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(SyncError::authentication(Platform::Notion, "not yet"));
            }
            Ok(NotionSession::new(working_notion(), &config.notion))
        },
        |config: &ResolvedConfig| Ok(ConfluenceSession::new(working_confluence(), &config.confluence)),
    );

    let doc = document();
    assert!(sessions.sync_to_notion(&doc).await.is_err());
    assert!(sessions.sync_to_notion(&doc).await.is_ok());
    assert!(sessions.sync_to_notion(&doc).await.is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn project_sync_reports_every_document() {
    let mut sessions = cache(working_notion, working_confluence);
    let docs = vec![
        document(),
        parse_document(Path::new("tool.py"), "\"\"\"Tool\"\"\"\n", "python"),
    ];
    let reports = sessions
        .sync_documents(&docs, &SyncOptions::default())
        .await;
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome() == SyncOutcome::Both));
    assert_eq!(reports[1].title, "tool.py");
}
