//! Harvest pipeline - main run orchestration
//!
//! This module ties the stages together for one run:
//! - Discovering topic ids over the listing
//! - Assembling each topic in ascending id order
//! - Filtering posts to the filter window
//! - Handing relevant topics to the store and tallying outcomes
//!
//! Topics are processed one at a time with a fixed pause before every
//! assembly after the first. Per-topic failures are counted, never raised.

use crate::client::{ListingSource, TopicSource};
use crate::config::Config;
use crate::crawler::assembler::{AssemblyError, FailureReason, TopicAssembler};
use crate::crawler::discoverer::TopicDiscoverer;
use crate::crawler::filter::PostFilter;
use crate::model::{DateWindow, InclusionPolicy, PostId, Topic, TopicId};
use crate::output::RunSummary;
use crate::storage::TopicStore;
use crate::HarvestError;
use std::time::Duration;

/// Result of assembling and filtering one topic without saving it
#[derive(Debug, Clone)]
pub struct TopicInspection {
    /// The topic reduced to its in-window posts
    pub topic: Topic,

    /// Posts present after assembly, before filtering
    pub assembled_posts: usize,

    /// Posts inside the filter window
    pub relevant_posts: usize,

    /// Stream ids whose posts could not be fetched
    pub unresolved: Vec<PostId>,
}

/// Runs discovery, assembly, filtering and persistence against one forum
pub struct Pipeline<S, T> {
    source: S,
    store: T,
    discoverer: TopicDiscoverer,
    assembler: TopicAssembler,
    filter: PostFilter,
    discovery_window: DateWindow,
    request_delay: Duration,
    config_hash: String,
}

impl<S, T> Pipeline<S, T>
where
    S: ListingSource + TopicSource,
    T: TopicStore,
{
    /// Creates a pipeline with default discovery and assembly settings
    ///
    /// # Arguments
    ///
    /// * `source` - The forum endpoints
    /// * `store` - Where relevant topics are written
    /// * `discovery_window` - Window deciding which topics are examined
    /// * `filter_window` - Window deciding which posts are kept
    pub fn new(source: S, store: T, discovery_window: DateWindow, filter_window: DateWindow) -> Self {
        Self {
            source,
            store,
            discoverer: TopicDiscoverer::new(InclusionPolicy::default(), 5),
            assembler: TopicAssembler::default(),
            filter: PostFilter::new(filter_window),
            discovery_window,
            request_delay: Duration::from_secs(1),
            config_hash: String::new(),
        }
    }

    /// Creates a pipeline with every setting taken from `config`
    pub fn from_config(
        config: &Config,
        config_hash: &str,
        source: S,
        store: T,
    ) -> Result<Self, HarvestError> {
        let pipeline = Self::new(
            source,
            store,
            config.discovery_window()?,
            config.filter_window()?,
        )
        .with_discoverer(TopicDiscoverer::new(
            config.crawler.inclusion,
            config.crawler.stale_page_limit,
        ))
        .with_assembler(TopicAssembler::new(config.crawler.batch_size))
        .with_request_delay(Duration::from_millis(config.crawler.request_delay_ms))
        .with_config_hash(config_hash);
        Ok(pipeline)
    }

    pub fn with_discoverer(mut self, discoverer: TopicDiscoverer) -> Self {
        self.discoverer = discoverer;
        self
    }

    pub fn with_assembler(mut self, assembler: TopicAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Pause inserted before every topic assembly after the first
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_config_hash(mut self, config_hash: &str) -> Self {
        self.config_hash = config_hash.to_string();
        self
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    pub fn into_store(self) -> T {
        self.store
    }

    /// Runs a full harvest
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run finished; failed topics are listed in
    ///   the summary
    /// * `Err(HarvestError)` - The store could not begin the run
    pub async fn run(&mut self) -> Result<RunSummary, HarvestError> {
        let mut summary = RunSummary::new(
            &self.config_hash,
            self.discovery_window,
            *self.filter.window(),
        );
        self.store.begin_run(&self.config_hash)?;

        tracing::info!("Topic fetch window: {}", self.discovery_window);
        tracing::info!("Post filter window: {}", self.filter.window());

        let discovery = self
            .discoverer
            .discover(&self.source, &self.discovery_window)
            .await;
        summary.pages_fetched = discovery.pages_fetched;
        summary.discovery_stop = Some(discovery.stop_reason);
        summary.discovered = discovery.topic_ids.len();

        if discovery.topic_ids.is_empty() {
            tracing::info!("No topic ids found for the given criteria");
        } else {
            tracing::info!("Starting download of {} topics", summary.discovered);
        }

        let total = discovery.topic_ids.len();
        for (index, topic_id) in discovery.topic_ids.into_iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            tracing::info!("[{}/{}] Processing topic {}", index + 1, total, topic_id);
            self.process_topic(topic_id, &mut summary).await;
        }

        summary.finish();
        // Topics are already persisted; a ledger failure must not lose the summary
        if let Err(e) = self.store.record_run(&summary) {
            tracing::error!("Failed to record run in the store: {}", e);
        }

        tracing::info!(
            "Harvest completed: {} discovered, {} persisted, {} skipped, {} failed",
            summary.discovered,
            summary.persisted,
            summary.skipped(),
            summary.failed.len()
        );

        Ok(summary)
    }

    /// Assembles, filters and stores a single topic, updating `summary`
    async fn process_topic(&mut self, topic_id: TopicId, summary: &mut RunSummary) {
        let topic = match self.assembler.assemble(&self.source, topic_id).await {
            Ok(topic) => topic,
            Err(e) => {
                tracing::warn!("Failed to get complete data for topic {}: {}", topic_id, e);
                summary.record_failure(topic_id, e.reason());
                return;
            }
        };

        let missing_posts = topic.unresolved_posts().len();
        let (filtered, relevant) = self.filter.apply(topic);
        if relevant == 0 {
            tracing::info!(
                "Topic {} has no posts within the filter window, skipping",
                topic_id
            );
            return;
        }

        match self.store.save_topic(&filtered, missing_posts) {
            Ok(()) => {
                tracing::info!("Topic {} saved with {} relevant posts", topic_id, relevant);
                summary.persisted += 1;
                if missing_posts > 0 {
                    summary.incomplete.push(topic_id);
                }
            }
            Err(e) => {
                tracing::error!("Error saving topic {}: {}", topic_id, e);
                summary.record_failure(topic_id, FailureReason::Persist);
            }
        }
    }
}

/// Assembles and filters one topic without storing it
///
/// Used to check a single topic against the filter window.
pub async fn inspect_topic<S>(
    source: &S,
    assembler: &TopicAssembler,
    filter: &PostFilter,
    topic_id: TopicId,
) -> Result<TopicInspection, AssemblyError>
where
    S: TopicSource + ?Sized,
{
    let topic = assembler.assemble(source, topic_id).await?;
    let assembled_posts = topic.stream.posts.len();
    let unresolved = topic.unresolved_posts();
    let (topic, relevant_posts) = filter.apply(topic);
    Ok(TopicInspection {
        topic,
        assembled_posts,
        relevant_posts,
        unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FetchError, FetchResult};
    use crate::model::{ListingPage, PostBatch, TopicSummary};
    use crate::storage::{StorageError, StorageResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A one-page listing plus topic documents and a batch post table
    #[derive(Default)]
    struct FakeForum {
        listing: Vec<TopicSummary>,
        documents: HashMap<TopicId, FetchResult<Value>>,
        posts: HashMap<PostId, Value>,
        topic_requests: Mutex<Vec<TopicId>>,
    }

    #[async_trait]
    impl ListingSource for FakeForum {
        async fn listing_page(&self, page: u32) -> FetchResult<ListingPage> {
            if page > 0 {
                return Ok(ListingPage::default());
            }
            Ok(ListingPage {
                topics: self.listing.clone(),
                more_topics_url: None,
            })
        }
    }

    #[async_trait]
    impl TopicSource for FakeForum {
        async fn topic_document(&self, topic_id: TopicId) -> FetchResult<Value> {
            self.topic_requests.lock().unwrap().push(topic_id);
            self.documents
                .get(&topic_id)
                .cloned()
                .unwrap_or(Err(FetchError::NotFound))
        }

        async fn post_batch(&self, _topic_id: TopicId, post_ids: &[PostId]) -> FetchResult<PostBatch> {
            let posts = post_ids
                .iter()
                .filter_map(|id| self.posts.get(id).cloned())
                .collect();
            Ok(PostBatch::Bare(posts))
        }
    }

    /// Records saved topics; ids in `reject` fail to save
    #[derive(Default)]
    struct MemoryStore {
        saved: Vec<(Topic, usize)>,
        reject: Vec<TopicId>,
        reject_run: bool,
        runs: Vec<RunSummary>,
        begun: Vec<String>,
    }

    impl TopicStore for MemoryStore {
        fn begin_run(&mut self, config_hash: &str) -> StorageResult<()> {
            self.begun.push(config_hash.to_string());
            Ok(())
        }

        fn save_topic(&mut self, topic: &Topic, missing_posts: usize) -> StorageResult<()> {
            if self.reject.contains(&topic.id()) {
                return Err(StorageError::Database("disk full".to_string()));
            }
            self.saved.push((topic.clone(), missing_posts));
            Ok(())
        }

        fn record_run(&mut self, summary: &RunSummary) -> StorageResult<()> {
            if self.reject_run {
                return Err(StorageError::Database("ledger locked".to_string()));
            }
            self.runs.push(summary.clone());
            Ok(())
        }
    }

    fn summary(id: u64, created: &str) -> TopicSummary {
        TopicSummary {
            id,
            created_at: Some(created.to_string()),
            last_posted_at: None,
        }
    }

    fn post(id: u64, created: &str) -> Value {
        json!({"id": id, "created_at": created, "cooked": format!("<p>{}</p>", id)})
    }

    fn document(id: u64, posts: &[Value], stream: &[u64]) -> FetchResult<Value> {
        Ok(json!({
            "id": id,
            "title": format!("Topic {}", id),
            "post_stream": {"posts": posts, "stream": stream}
        }))
    }

    fn pipeline(forum: FakeForum, store: MemoryStore) -> Pipeline<FakeForum, MemoryStore> {
        Pipeline::new(
            forum,
            store,
            DateWindow::parse("2024-06-01", "2025-04-15").unwrap(),
            DateWindow::parse("2025-01-01", "2025-04-15").unwrap(),
        )
        .with_discoverer(TopicDiscoverer::new(InclusionPolicy::Created, 5))
        .with_request_delay(Duration::ZERO)
        .with_config_hash("test-hash")
    }

    #[tokio::test]
    async fn test_end_to_end_keeps_only_in_window_posts() {
        let mut forum = FakeForum::default();
        forum.listing = vec![summary(100, "2024-07-01T10:00:00Z")];
        forum.documents.insert(
            100,
            document(
                100,
                &[post(1, "2024-08-01T00:00:00Z")],
                &[1, 2],
            ),
        );
        forum.posts.insert(2, post(2, "2025-02-01T00:00:00Z"));

        let mut pipeline = pipeline(forum, MemoryStore::default());
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.discovered, 1);
        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.skipped(), 0);
        assert!(summary.failed.is_empty());

        let store = pipeline.into_store();
        assert_eq!(store.begun, vec!["test-hash"]);
        assert_eq!(store.saved.len(), 1);
        let (topic, missing) = &store.saved[0];
        assert_eq!(*missing, 0);
        assert_eq!(topic.stream.posts.len(), 1);
        assert_eq!(
            topic.stream.posts[0].created_at_raw(),
            Some("2025-02-01T00:00:00Z")
        );
        assert_eq!(topic.stream.order, vec![Some(2)]);
        assert_eq!(store.runs.len(), 1);
    }

    #[tokio::test]
    async fn test_counters_cover_every_outcome() {
        let mut forum = FakeForum::default();
        forum.listing = vec![
            summary(1, "2025-01-10T00:00:00Z"),
            summary(2, "2025-01-10T00:00:00Z"),
            summary(3, "2025-01-10T00:00:00Z"),
            summary(4, "2025-01-10T00:00:00Z"),
            summary(5, "2025-01-10T00:00:00Z"),
        ];
        // relevant
        forum
            .documents
            .insert(1, document(1, &[post(10, "2025-02-01T00:00:00Z")], &[10]));
        // no posts in the filter window
        forum
            .documents
            .insert(2, document(2, &[post(20, "2024-12-31T23:59:59Z")], &[20]));
        // forbidden
        forum.documents.insert(3, Err(FetchError::AccessDenied));
        // 4 is absent: not found
        // relevant but the store rejects it
        forum
            .documents
            .insert(5, document(5, &[post(50, "2025-03-01T00:00:00Z")], &[50]));

        let store = MemoryStore {
            reject: vec![5],
            ..Default::default()
        };
        let mut pipeline = pipeline(forum, store);
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.discovered, 5);
        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed_ids(), vec![3, 4, 5]);
        let reasons: Vec<_> = summary.failed.iter().map(|f| f.reason).collect();
        assert_eq!(
            reasons,
            vec![
                FailureReason::Forbidden,
                FailureReason::NotFound,
                FailureReason::Persist
            ]
        );
    }

    #[tokio::test]
    async fn test_summary_survives_ledger_failure() {
        let mut forum = FakeForum::default();
        forum.listing = vec![summary(1, "2025-01-10T00:00:00Z")];
        forum
            .documents
            .insert(1, document(1, &[post(10, "2025-02-01T00:00:00Z")], &[10]));

        let store = MemoryStore {
            reject_run: true,
            ..Default::default()
        };
        let mut pipeline = pipeline(forum, store);
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.persisted, 1);
        assert!(summary.finished_at.is_some());
        let store = pipeline.into_store();
        assert_eq!(store.saved.len(), 1);
        assert!(store.runs.is_empty());
    }

    #[tokio::test]
    async fn test_topics_processed_in_ascending_order() {
        let mut forum = FakeForum::default();
        forum.listing = vec![
            summary(30, "2025-01-10T00:00:00Z"),
            summary(10, "2025-01-10T00:00:00Z"),
            summary(20, "2025-01-10T00:00:00Z"),
            summary(10, "2025-01-10T00:00:00Z"),
        ];

        let mut pipeline = pipeline(forum, MemoryStore::default());
        pipeline.run().await.unwrap();

        let requested = pipeline.source.topic_requests.lock().unwrap().clone();
        assert_eq!(requested, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_incomplete_topics_are_flagged() {
        let mut forum = FakeForum::default();
        forum.listing = vec![summary(7, "2025-01-10T00:00:00Z")];
        forum.documents.insert(
            7,
            document(7, &[post(1, "2025-02-01T00:00:00Z")], &[1, 2, 3]),
        );
        forum.posts.insert(2, post(2, "2025-02-02T00:00:00Z"));
        // post 3 is never served

        let mut pipeline = pipeline(forum, MemoryStore::default());
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.incomplete, vec![7]);
        let (topic, missing) = &pipeline.store().saved[0];
        assert_eq!(*missing, 1);
        assert_eq!(topic.stream.posts.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_discovery() {
        let mut pipeline = pipeline(FakeForum::default(), MemoryStore::default());
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.discovered, 0);
        assert_eq!(summary.skipped(), 0);
        assert!(summary.finished_at.is_some());
        assert_eq!(pipeline.store().runs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_delay_between_topics() {
        let mut forum = FakeForum::default();
        forum.listing = vec![
            summary(1, "2025-01-10T00:00:00Z"),
            summary(2, "2025-01-10T00:00:00Z"),
            summary(3, "2025-01-10T00:00:00Z"),
        ];

        let mut pipeline =
            pipeline(forum, MemoryStore::default()).with_request_delay(Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        pipeline.run().await.unwrap();

        // Two pauses for three topics
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_inspect_topic() {
        let mut forum = FakeForum::default();
        forum.documents.insert(
            9,
            document(
                9,
                &[post(1, "2024-08-01T00:00:00Z"), post(2, "2025-02-01T00:00:00Z")],
                &[1, 2, 3],
            ),
        );

        let assembler = TopicAssembler::default();
        let filter = PostFilter::new(DateWindow::parse("2025-01-01", "2025-04-15").unwrap());
        let inspection = inspect_topic(&forum, &assembler, &filter, 9).await.unwrap();

        assert_eq!(inspection.assembled_posts, 2);
        assert_eq!(inspection.relevant_posts, 1);
        assert_eq!(inspection.unresolved, vec![3]);
        assert_eq!(inspection.topic.stream.order, vec![Some(2)]);

        let err = inspect_topic(&forum, &assembler, &filter, 404)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), FailureReason::NotFound);
    }
}
