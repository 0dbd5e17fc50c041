//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for a Discourse forum and drive the
//! real reqwest client through discovery, assembly and a full run.

use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use thread_harvest::client::{build_http_client, FetchError, ForumClient, ListingSource, TopicSource};
use thread_harvest::config::{load_config_with_hash, UserAgentConfig};
use thread_harvest::crawler::{harvest, FailureReason, StopReason, TopicAssembler, TopicDiscoverer};
use thread_harvest::model::{DateWindow, InclusionPolicy, PostRecord};
use thread_harvest::storage::SqliteStore;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/c/courses/tds-kb/34.json";

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestHarvester".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn forum_client(server: &MockServer, cookie: Option<&str>) -> ForumClient {
    let client = build_http_client(&user_agent(), cookie).unwrap();
    ForumClient::with_client(client, &server.uri(), "courses/tds-kb", 34).unwrap()
}

fn listing(topics: Value, more: bool) -> Value {
    let mut list = json!({ "topics": topics });
    if more {
        list["more_topics_url"] = json!("/c/courses/tds-kb/34?page=next");
    }
    json!({ "users": [], "topic_list": list })
}

fn topic_summary(id: u64, created_at: &str) -> Value {
    json!({ "id": id, "title": format!("Topic {}", id), "created_at": created_at, "last_posted_at": created_at })
}

fn post(id: u64, created_at: &str) -> Value {
    json!({ "id": id, "username": "student", "created_at": created_at, "cooked": format!("<p>post {}</p>", id) })
}

fn topic_document(id: u64, posts: Vec<Value>, stream: Vec<u64>) -> Value {
    json!({
        "id": id,
        "title": format!("Topic {}", id),
        "post_stream": { "posts": posts, "stream": stream },
        "posts_count": 2
    })
}

async fn mount_listing_page(server: &MockServer, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_topic(server: &MockServer, id: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/t/{}.json", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_batch(server: &MockServer, id: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/t/{}/posts.json", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn window() -> DateWindow {
    DateWindow::parse("2024-06-01", "2025-04-15").unwrap()
}

#[tokio::test]
async fn test_listing_pagination_until_last_page() {
    let server = MockServer::start().await;
    mount_listing_page(
        &server,
        0,
        listing(
            json!([topic_summary(1, "2025-01-02T00:00:00Z"), topic_summary(2, "2023-01-01T00:00:00Z")]),
            true,
        ),
    )
    .await;
    mount_listing_page(
        &server,
        1,
        listing(
            json!([topic_summary(1, "2025-01-02T00:00:00Z"), topic_summary(3, "2024-09-09T00:00:00Z")]),
            true,
        ),
    )
    .await;
    mount_listing_page(
        &server,
        2,
        listing(json!([topic_summary(4, "2024-12-24T12:00:00.000Z")]), false),
    )
    .await;

    let client = forum_client(&server, None);
    let discovery = TopicDiscoverer::new(InclusionPolicy::Created, 5)
        .discover(&client, &window())
        .await;

    assert_eq!(
        discovery.topic_ids.into_iter().collect::<Vec<_>>(),
        vec![1, 3, 4]
    );
    assert_eq!(discovery.pages_fetched, 3);
    assert_eq!(discovery.stop_reason, StopReason::LastPage);
}

#[tokio::test]
async fn test_listing_server_error_keeps_partial_results() {
    let server = MockServer::start().await;
    mount_listing_page(
        &server,
        0,
        listing(json!([topic_summary(8, "2025-01-02T00:00:00Z")]), true),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = forum_client(&server, None);
    let discovery = TopicDiscoverer::new(InclusionPolicy::Created, 5)
        .discover(&client, &window())
        .await;

    assert_eq!(discovery.topic_ids.into_iter().collect::<Vec<_>>(), vec![8]);
    assert!(matches!(discovery.stop_reason, StopReason::FetchFailed(_)));
}

#[tokio::test]
async fn test_listing_without_topic_list_is_empty() {
    let server = MockServer::start().await;
    mount_listing_page(&server, 0, json!({ "errors": ["not allowed"] })).await;

    let client = forum_client(&server, None);
    let page = client.listing_page(0).await.unwrap();
    assert!(page.topics.is_empty());
    assert!(page.more_topics_url.is_none());
}

#[tokio::test]
async fn test_cookie_is_sent_with_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t/5.json"))
        .and(header("cookie", "_t=token; _forum_session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_document(
            5,
            vec![post(1, "2025-02-01T00:00:00Z")],
            vec![1],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = forum_client(&server, Some("_t=token; _forum_session=abc"));
    let document = client.topic_document(5).await.unwrap();
    assert_eq!(document["id"], 5);
}

#[tokio::test]
async fn test_status_codes_are_classified() {
    let server = MockServer::start().await;
    for (id, status) in [(1u64, 403u16), (2, 404), (3, 429), (4, 500)] {
        Mock::given(method("GET"))
            .and(path(format!("/t/{}.json", id)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/t/5.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Please log in</html>"))
        .mount(&server)
        .await;

    let client = forum_client(&server, None);
    assert_eq!(client.topic_document(1).await, Err(FetchError::AccessDenied));
    assert_eq!(client.topic_document(2).await, Err(FetchError::NotFound));
    assert_eq!(client.topic_document(3).await, Err(FetchError::RateLimited));
    assert_eq!(client.topic_document(4).await, Err(FetchError::Status(500)));

    let Err(FetchError::Decode(message)) = client.topic_document(5).await else {
        panic!("expected a decode error");
    };
    assert!(message.contains("Please log in"));

    let assembler = TopicAssembler::default();
    let reasons = [
        (1, FailureReason::Forbidden),
        (2, FailureReason::NotFound),
        (3, FailureReason::RateLimited),
        (4, FailureReason::Transport),
        (5, FailureReason::Decode),
    ];
    for (id, expected) in reasons {
        let err = assembler.assemble(&client, id).await.unwrap_err();
        assert_eq!(err.reason(), expected, "topic {}", id);
    }
}

#[tokio::test]
async fn test_batch_response_shapes() {
    let missing = vec![post(3, "2025-02-02T00:00:00Z"), post(2, "2025-02-01T00:00:00Z")];
    let shapes = [
        json!(missing),
        json!({ "post_stream": { "posts": missing } }),
        json!({ "posts": missing }),
    ];

    for shape in shapes {
        let server = MockServer::start().await;
        mount_topic(
            &server,
            10,
            topic_document(10, vec![post(1, "2025-01-31T00:00:00Z")], vec![1, 2, 3]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/t/10/posts.json"))
            .and(query_param("post_ids[]", "2"))
            .and(query_param("post_ids[]", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(shape.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = forum_client(&server, None);
        let topic = TopicAssembler::default().assemble(&client, 10).await.unwrap();

        let ids: Vec<_> = topic.stream.posts.iter().map(PostRecord::id).collect();
        assert_eq!(ids, vec![1, 2, 3], "shape {}", shape);
        assert!(topic.unresolved_posts().is_empty());
    }
}

#[tokio::test]
async fn test_failed_batch_is_absorbed() {
    let server = MockServer::start().await;
    mount_topic(
        &server,
        11,
        topic_document(11, vec![post(1, "2025-01-31T00:00:00Z")], vec![1, 2, 3, 4]),
    )
    .await;
    // First batch (2, 3) fails, second batch (4) succeeds
    Mock::given(method("GET"))
        .and(path("/t/11/posts.json"))
        .and(query_param("post_ids[]", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/t/11/posts.json"))
        .and(query_param("post_ids[]", "4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "post_stream": { "posts": [post(4, "2025-02-04T00:00:00Z")] } })),
        )
        .mount(&server)
        .await;

    let client = forum_client(&server, None);
    let topic = TopicAssembler::new(2).assemble(&client, 11).await.unwrap();

    let ids: Vec<_> = topic.stream.posts.iter().map(PostRecord::id).collect();
    assert_eq!(ids, vec![1, 4]);
    assert_eq!(topic.unresolved_posts(), vec![2, 3]);
}

/// Mounts the forum used by the end-to-end runs: one listing page with
/// topic 100 (created 2024-07-01) whose two posts straddle the filter window
async fn mount_scenario_forum(server: &MockServer) {
    mount_listing_page(
        server,
        0,
        listing(
            json!([
                topic_summary(100, "2024-07-01T09:00:00.000Z"),
                topic_summary(200, "2023-03-01T09:00:00.000Z")
            ]),
            false,
        ),
    )
    .await;
    mount_topic(
        server,
        100,
        topic_document(100, vec![post(1000, "2024-08-01T10:00:00.000Z")], vec![1000, 1001]),
    )
    .await;
    mount_batch(server, 100, json!([post(1001, "2025-02-01T10:00:00.000Z")])).await;
}

fn write_config(dir: &Path, base_url: &str, output: &str) -> std::path::PathBuf {
    let content = format!(
        r#"
[forum]
base-url = "{base_url}"
category-slug = "courses/tds-kb"
category-id = 34

[auth]
cookie = "_t=token"

[windows]
discovery-start = "2024-06-01"
discovery-end = "2025-04-15"
filter-start = "2025-01-01"
filter-end = "2025-04-15"

[crawler]
inclusion = "created"
request-delay-ms = 0

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
{output}
"#
    );
    let path = dir.join("harvest.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_end_to_end_json_output() {
    let server = MockServer::start().await;
    mount_scenario_forum(&server).await;

    let temp = TempDir::new().unwrap();
    let out_dir = temp.path().join("discourse_json");
    let config_path = write_config(
        temp.path(),
        &server.uri(),
        &format!(
            "format = \"json\"\ndirectory = \"{}\"\nsummary-path = \"{}\"",
            out_dir.display(),
            temp.path().join("summary.md").display()
        ),
    );
    let (config, hash) = load_config_with_hash(&config_path).unwrap();

    let summary = harvest(&config, &hash).await.unwrap();

    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.skipped(), 0);
    assert!(summary.failed.is_empty());

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("topic_100.json")).unwrap())
            .unwrap();
    let posts = saved["post_stream"]["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], 1001);
    assert_eq!(posts[0]["created_at"], "2025-02-01T10:00:00.000Z");
    assert_eq!(saved["post_stream"]["stream"], json!([1001]));
    assert_eq!(saved["title"], "Topic 100");
    assert_eq!(saved["posts_count"], 2);
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 1);
}

#[tokio::test]
async fn test_end_to_end_sqlite_output() {
    let server = MockServer::start().await;
    mount_scenario_forum(&server).await;

    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("harvest.db");
    let config_path = write_config(
        temp.path(),
        &server.uri(),
        &format!(
            "format = \"sqlite\"\ndatabase-path = \"{}\"",
            db_path.display()
        ),
    );
    let (config, hash) = load_config_with_hash(&config_path).unwrap();

    let summary = harvest(&config, &hash).await.unwrap();
    assert_eq!(summary.persisted, 1);

    let store = SqliteStore::new(&db_path).unwrap();
    let stored = store.get_topic(100).unwrap().unwrap();
    assert_eq!(stored.post_count, 1);
    assert_eq!(stored.missing_posts, 0);
    assert_eq!(stored.document["post_stream"]["posts"][0]["id"], 1001);

    let runs = store.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].config_hash, hash);
    assert_eq!(runs[0].discovered, 1);
    assert_eq!(runs[0].persisted, 1);
    assert_eq!(stored.run_id, Some(runs[0].id));
}
