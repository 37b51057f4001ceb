use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use comment_bot::budget::{ErrorBudget, ResetPolicy};
use comment_bot::config::SearchConfig;
use comment_bot::error::{NotifyError, PostError};
use comment_bot::extract::LinkExtractor;
use comment_bot::fetch::PageFetcher;
use comment_bot::notify::AlertSink;
use comment_bot::pipeline::{Pipeline, RunSummary};
use comment_bot::youtube::{CommentApi, CommentThread};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct FakeApi {
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeApi {
    fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentApi for FakeApi {
    async fn insert_comment_thread(
        &self,
        video_id: &str,
        text: &str,
    ) -> Result<CommentThread, PostError> {
        self.calls
            .lock()
            .unwrap()
            .push((video_id.to_string(), text.to_string()));

        if self.failing.contains(video_id) {
            return Err(PostError::Api {
                code: 403,
                message: "forbidden".to_string(),
            });
        }
        Ok(CommentThread {
            id: format!("thread-{video_id}"),
        })
    }
}

#[derive(Default)]
struct FakeSink {
    broken: bool,
    alerts: Mutex<Vec<usize>>,
}

impl FakeSink {
    fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    fn alerts(&self) -> Vec<usize> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for FakeSink {
    async fn send_alert(&self, count: usize) -> Result<(), NotifyError> {
        self.alerts.lock().unwrap().push(count);
        if self.broken {
            return Err(NotifyError::NotConfigured("EMAIL_SENDER"));
        }
        Ok(())
    }
}

fn page(ids: &[&str]) -> String {
    let links: String = ids
        .iter()
        .map(|id| format!(r#"<a class="yt-uix-tile-link" href="/watch?v={id}">{id}</a>"#))
        .collect();
    format!("<html><body>{links}</body></html>")
}

async fn serve_keyword(server: &MockServer, keyword: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path("/results"))
        .and(query_param("q", keyword))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn search(server: &MockServer) -> SearchConfig {
    SearchConfig {
        url: format!("{}/results", server.uri()),
        ..SearchConfig::default()
    }
}

fn pipeline<'a>(
    server: &MockServer,
    api: &'a FakeApi,
    sink: &'a FakeSink,
    threshold: usize,
) -> Pipeline<'a> {
    Pipeline::new(
        PageFetcher::new(None).unwrap(),
        LinkExtractor::new("a.yt-uix-tile-link", "/watch?v=").unwrap(),
        search(server),
        api,
        sink,
        ErrorBudget::new(threshold),
    )
    .with_seed(42)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn comments_on_every_found_video() {
    let server = MockServer::start().await;
    serve_keyword(&server, "catvideo", 200, page(&["abc123", "def456"])).await;

    let api = FakeApi::default();
    let sink = FakeSink::default();
    let comments = strings(&["nice!", "cool"]);

    let summary = pipeline(&server, &api, &sink, 5)
        .run(&strings(&["catvideo"]), &comments)
        .await
        .unwrap();

    let calls = api.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "abc123");
    assert_eq!(calls[1].0, "def456");
    assert!(calls.iter().all(|(_, text)| comments.contains(text)));
    assert!(sink.alerts().is_empty());
    assert_eq!(
        summary,
        RunSummary {
            keywords: 1,
            fetch_failures: 0,
            videos: 2,
            posted: 2,
            post_failures: 0,
            alerts_sent: 0,
        }
    );
}

#[tokio::test]
async fn fetch_and_post_failures_share_one_budget() {
    let server = MockServer::start().await;
    serve_keyword(&server, "broken", 500, String::new()).await;
    serve_keyword(&server, "dogs", 200, page(&["bad1"])).await;

    let api = FakeApi::failing(&["bad1"]);
    let sink = FakeSink::default();

    let mut pipeline = pipeline(&server, &api, &sink, 2);
    let summary = pipeline
        .run(&strings(&["broken", "dogs"]), &strings(&["hello"]))
        .await
        .unwrap();

    assert_eq!(sink.alerts(), vec![2]);
    assert_eq!(pipeline.budget().count(), 0);
    assert_eq!(summary.fetch_failures, 1);
    assert_eq!(summary.post_failures, 1);
    assert_eq!(summary.alerts_sent, 1);
}

#[tokio::test]
async fn one_short_of_threshold_sends_nothing() {
    let server = MockServer::start().await;
    serve_keyword(&server, "cats", 200, page(&["a", "b", "c"])).await;

    let api = FakeApi::failing(&["a", "b"]);
    let sink = FakeSink::default();

    let mut pipeline = pipeline(&server, &api, &sink, 3);
    pipeline
        .run(&strings(&["cats"]), &strings(&["hi"]))
        .await
        .unwrap();

    assert!(sink.alerts().is_empty());
    assert_eq!(pipeline.budget().count(), 2);
    assert_eq!(api.calls().len(), 3);
}

#[tokio::test]
async fn fetch_failures_alone_are_not_checked() {
    let server = MockServer::start().await;
    serve_keyword(&server, "one", 503, String::new()).await;
    serve_keyword(&server, "two", 404, String::new()).await;

    let api = FakeApi::default();
    let sink = FakeSink::default();

    let mut pipeline = pipeline(&server, &api, &sink, 1);
    let summary = pipeline
        .run(&strings(&["one", "two"]), &strings(&["hi"]))
        .await
        .unwrap();

    assert!(sink.alerts().is_empty());
    assert_eq!(pipeline.budget().count(), 2);
    assert_eq!(summary.fetch_failures, 2);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn empty_inputs_do_no_work() {
    let server = MockServer::start().await;
    serve_keyword(&server, "cats", 200, page(&["a"])).await;

    let api = FakeApi::default();
    let sink = FakeSink::default();
    let mut pipeline = pipeline(&server, &api, &sink, 1);

    assert!(pipeline.run(&[], &strings(&["hi"])).await.is_none());
    assert!(pipeline.run(&strings(&["cats"]), &[]).await.is_none());

    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn page_without_links_is_skipped_uncounted() {
    let server = MockServer::start().await;
    serve_keyword(&server, "nothing", 200, "<html><p>no results</p></html>".to_string()).await;
    serve_keyword(&server, "cats", 200, page(&["a"])).await;

    let api = FakeApi::default();
    let sink = FakeSink::default();
    let mut pipeline = pipeline(&server, &api, &sink, 1);

    let summary = pipeline
        .run(&strings(&["nothing", "cats"]), &strings(&["hi"]))
        .await
        .unwrap();

    assert_eq!(pipeline.budget().count(), 0);
    assert_eq!(summary.videos, 1);
    assert_eq!(api.calls(), vec![("a".to_string(), "hi".to_string())]);
}

#[tokio::test]
async fn failed_alert_still_resets_by_default() {
    let server = MockServer::start().await;
    serve_keyword(&server, "cats", 200, page(&["x", "y"])).await;

    let api = FakeApi::failing(&["x", "y"]);
    let sink = FakeSink::broken();

    let mut pipeline = pipeline(&server, &api, &sink, 1);
    let summary = pipeline
        .run(&strings(&["cats"]), &strings(&["hi"]))
        .await
        .unwrap();

    assert_eq!(sink.alerts(), vec![1, 1]);
    assert_eq!(summary.alerts_sent, 0);
    assert_eq!(pipeline.budget().count(), 0);
}

#[tokio::test]
async fn failed_alert_keeps_count_when_reset_needs_delivery() {
    let server = MockServer::start().await;
    serve_keyword(&server, "cats", 200, page(&["x", "y"])).await;

    let api = FakeApi::failing(&["x", "y"]);
    let sink = FakeSink::broken();

    let mut pipeline =
        pipeline(&server, &api, &sink, 1).with_reset_policy(ResetPolicy::OnDelivery);
    pipeline
        .run(&strings(&["cats"]), &strings(&["hi"]))
        .await
        .unwrap();

    assert_eq!(sink.alerts(), vec![1, 2]);
    assert_eq!(pipeline.budget().count(), 2);
}

#[tokio::test]
async fn duplicate_ids_are_each_commented() {
    let server = MockServer::start().await;
    serve_keyword(&server, "a", 200, page(&["same"])).await;
    serve_keyword(&server, "b", 200, page(&["same", "same"])).await;

    let api = FakeApi::default();
    let sink = FakeSink::default();

    let summary = pipeline(&server, &api, &sink, 5)
        .run(&strings(&["a", "b"]), &strings(&["hi", "yo"]))
        .await
        .unwrap();

    assert_eq!(summary.posted, 3);
    assert!(api.calls().iter().all(|(id, _)| id == "same"));
}
