use docsync::blocks::ContentBlock;
use docsync::config::NotionConfig;
use docsync::contract::{MockNotionApi, NotionPage, PageParent};
use docsync::error::{Platform, SyncError};
use docsync::extract::{parse_document, SourceDocument};
use docsync::notion::NotionSession;
use std::path::Path;

const PAGE_ID: &str = "2ffff72a-55d5-80ff-bd06-ffcae89c7866";

fn config() -> NotionConfig {
    NotionConfig {
        api_key: Some("secret_test_key_123456".into()),
        database_id: Some("https://www.notion.so/team/Docs-2ffff72a55d580ffbd06ffcae89c7866".into()),
        ..Default::default()
    }
}

fn rejected() -> SyncError {
    SyncError::remote(
        Platform::Notion,
        Some(400),
        "Could not find database with ID: 2ffff72a-55d5-80ff-bd06-ffcae89c7866",
    )
}

#[tokio::test]
async fn creates_database_row_then_appends_blocks() {
    let mut api = MockNotionApi::new();
    api.expect_create_page()
        .withf(|req| {
            req.parent == PageParent::Database(PAGE_ID.to_string())
                && req.title == Some(("Name".to_string(), "greet.ts".to_string()))
        })
        .times(1)
        .returning(|_| {
            Ok(NotionPage {
                id: "row-1".into(),
                url: Some("https://www.notion.so/row-1".into()),
            })
        });
    api.expect_append_blocks()
        .withf(|id, blocks| id == "row-1" && !blocks.is_empty())
        .times(1)
        .returning(|_, _| Ok(()));

    let doc = parse_document(
        Path::new("src/greet.ts"),
        "/** Says hello */\nexport const greet = () => 'hi';\n",
        "typescript",
    );
    let session = NotionSession::new(api, &config());
    let url = session.sync_document(&doc).await.expect("sync should succeed");
    assert_eq!(url, "https://www.notion.so/row-1");
}

#[tokio::test]
async fn page_id_falls_back_to_exactly_one_child_page() {
    let mut api = MockNotionApi::new();
    api.expect_create_page()
        .withf(|req| matches!(req.parent, PageParent::Database(_)))
        .times(1)
        .returning(|_| Err(rejected()));
    api.expect_create_page()
        .withf(|req| req.parent == PageParent::Page(PAGE_ID.to_string()) && req.title.is_none())
        .times(1)
        .returning(|_| {
            Ok(NotionPage {
                id: "child-1".into(),
                url: Some("https://www.notion.so/child-1".into()),
            })
        });
    api.expect_append_blocks()
        .withf(|id, blocks| {
            id == "child-1"
                && blocks.first()
                    == Some(&ContentBlock::Heading {
                        level: 1,
                        text: "notes.md".to_string(),
                    })
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let doc = parse_document(Path::new("notes.md"), "plain text", "markdown");
    let session = NotionSession::new(api, &config());
    let url = session.sync_document(&doc).await.expect("fallback should succeed");
    assert_eq!(url, "https://www.notion.so/child-1");
}

#[tokio::test]
async fn failed_fallback_reports_both_attempts() {
    let mut api = MockNotionApi::new();
    api.expect_create_page()
        .times(2)
        .returning(|_| Err(rejected()));
    api.expect_append_blocks().never();

    let doc = parse_document(Path::new("a.py"), "x = 1\n", "python");
    let session = NotionSession::new(api, &config());
    let err = session.sync_document(&doc).await.unwrap_err();
    assert!(matches!(err, SyncError::FallbackExhausted { .. }), "got {err:?}");
}

#[tokio::test]
async fn append_failure_after_database_create_does_not_fall_back() {
    let mut api = MockNotionApi::new();
    api.expect_create_page().times(1).returning(|_| {
        Ok(NotionPage {
            id: "row-2".into(),
            url: None,
        })
    });
    api.expect_append_blocks()
        .times(1)
        .returning(|_, _| Err(SyncError::remote(Platform::Notion, Some(500), "boom")));

    let doc = parse_document(Path::new("a.py"), "x = 1\n", "python");
    let session = NotionSession::new(api, &config());
    let err = session.sync_document(&doc).await.unwrap_err();
    assert!(err.is_remote(), "got {err:?}");
}

#[tokio::test]
async fn unparseable_database_id_is_a_configuration_error() {
    let mut api = MockNotionApi::new();
    api.expect_create_page().never();

    let config = NotionConfig {
        database_id: Some("not-an-id".into()),
        ..config()
    };
    let doc = parse_document(Path::new("a.py"), "x = 1\n", "python");
    let session = NotionSession::new(api, &config);
    let err = session.sync_document(&doc).await.unwrap_err();
    assert!(
        matches!(err, SyncError::Configuration { platform: Platform::Notion, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn connection_probe_reflects_user_lookup() {
    let mut api = MockNotionApi::new();
    api.expect_current_user()
        .times(1)
        .returning(|| Err(SyncError::authentication(Platform::Notion, "invalid token")));
    let session = NotionSession::new(api, &config());
    assert!(!session.test_connection().await);
}

#[tokio::test]
async fn long_pages_are_appended_in_batches() {
    let sizes = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = sizes.clone();

    let mut api = MockNotionApi::new();
    api.expect_create_page().times(1).returning(|_| {
        Ok(NotionPage {
            id: "row-3".into(),
            url: None,
        })
    });
    api.expect_append_blocks()
        .withf(|id, _| id == "row-3")
        .times(3)
        .returning(move |_, blocks| {
            seen.lock().unwrap().push(blocks.len());
            Ok(())
        });

    let content = (0..250)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n");
    let doc = SourceDocument {
        title: "long.md".into(),
        content,
        file_path: "long.md".into(),
        language: "markdown".into(),
        tags: vec![],
    };
    let session = NotionSession::new(api, &config());
    session.sync_document(&doc).await.expect("sync should succeed");
    assert_eq!(*sizes.lock().unwrap(), vec![100, 100, 50]);
}
