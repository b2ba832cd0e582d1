//! Integration tests for the `FetchTask` lifecycle and the task graph.
//!
//! Uses `wiremock` to stand up a local HTTP server per test so no real
//! network traffic is made. Covers the happy path, the no-data statuses,
//! transport failures, cancellation, and dependency chains.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quakefeed_net::parse;
use quakefeed_net::{ActivityGauge, FetchTask, ParseError, TaskContext, TaskError, TaskGraph, TaskState};

fn test_context() -> TaskContext {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("failed to build test client");
    TaskContext::new(client, ActivityGauge::new())
}

fn url(server: &MockServer, route: &str) -> reqwest::Url {
    format!("{}{route}", server.uri())
        .parse()
        .expect("invalid test URL")
}

/// Decode hook that keeps the raw body, for tests that only care about
/// lifecycle and not parsing.
fn raw_bytes(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    Ok(bytes.to_vec())
}

async fn run_single<O: Clone + Send + Sync + 'static>(task: &Arc<FetchTask<O>>) {
    let mut graph = TaskGraph::concurrent();
    graph.add(Arc::clone(task));
    graph.run(&test_context()).await;
}

#[tokio::test]
async fn successful_fetch_populates_output_and_finishes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 7 })))
        .mount(&server)
        .await;

    let task = Arc::new(FetchTask::get(url(&server, "/count"), parse::parse_count));
    assert_eq!(task.state(), TaskState::Ready);

    run_single(&task).await;

    assert_eq!(task.state(), TaskState::Finished);
    assert_eq!(task.output(), Some(7));
    assert!(task.take_error().is_none());
}

#[tokio::test]
async fn not_found_is_zero_results_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let task = Arc::new(FetchTask::get(url(&server, "/query"), raw_bytes));
    run_single(&task).await;

    assert_eq!(task.state(), TaskState::Finished);
    assert_eq!(task.output(), None);
    assert!(task.take_error().is_none());
}

#[tokio::test]
async fn no_content_is_zero_results_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let task = Arc::new(FetchTask::get(url(&server, "/query"), raw_bytes));
    run_single(&task).await;

    assert_eq!(task.state(), TaskState::Finished);
    assert_eq!(task.output(), None);
    assert!(task.take_error().is_none());
}

#[tokio::test]
async fn transport_failure_records_an_http_error() {
    // Grab a URL from a server that is gone by the time the task runs.
    // Use a non-pooled server: a pooled `MockServer::start()` keeps its
    // listener alive after drop and would answer 404 instead of refusing.
    let server = MockServer::builder().start().await;
    let target = url(&server, "/query");
    drop(server);

    let task = Arc::new(FetchTask::get(target, raw_bytes));
    run_single(&task).await;

    assert_eq!(task.state(), TaskState::Finished);
    assert_eq!(task.output(), None);
    assert!(matches!(task.take_error(), Some(TaskError::Http(_))));
}

#[tokio::test]
async fn unexpected_status_records_a_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let task = Arc::new(FetchTask::get(url(&server, "/query"), raw_bytes));
    run_single(&task).await;

    assert_eq!(task.output(), None);
    assert!(matches!(
        task.take_error(),
        Some(TaskError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn malformed_body_records_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let task = Arc::new(FetchTask::get(url(&server, "/query"), parse::parse_count));
    run_single(&task).await;

    assert_eq!(task.output(), None);
    assert!(matches!(task.take_error(), Some(TaskError::Parse(_))));
}

#[tokio::test]
async fn cancelled_task_never_issues_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let task = Arc::new(FetchTask::get(url(&server, "/query"), raw_bytes));
    task.cancel();
    run_single(&task).await;

    assert_eq!(task.state(), TaskState::Finished);
    assert_eq!(task.output(), None);
    // expect(0) verified when the server drops.
}

#[tokio::test]
async fn post_task_sends_the_json_body() {
    let server = MockServer::start().await;
    let body = json!({ "token": "abc123", "lat": 37.5, "long": -122.1 });
    Mock::given(method("POST"))
        .and(path("/add_user"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let task = Arc::new(FetchTask::post(url(&server, "/add_user"), body, raw_bytes));
    run_single(&task).await;

    assert_eq!(task.state(), TaskState::Finished);
    assert!(task.take_error().is_none());
}

#[tokio::test]
async fn dependent_reads_the_url_a_predecessor_resolved() {
    let server = MockServer::start().await;
    let cities_url = format!("{}/cities.json", server.uri());

    Mock::given(method("GET"))
        .and(path("/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "products": { "nearby-cities": [{
                "contents": { "nearby-cities.json": { "url": cities_url } }
            }]}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cities.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Ridgecrest", "direction": "NNE", "distance": 12.0 }
        ])))
        .mount(&server)
        .await;

    let detail = Arc::new(FetchTask::get(
        url(&server, "/detail"),
        parse::parse_nearby_cities_url,
    ));
    let mut cities = FetchTask::deferred(
        {
            let detail = Arc::clone(&detail);
            move || {
                detail
                    .output()
                    .flatten()
                    .and_then(|raw| reqwest::Url::parse(&raw).ok())
            }
        },
        parse::parse_nearby_cities,
    );
    cities.after(&detail);
    let cities = Arc::new(cities);

    let mut graph = TaskGraph::serial();
    graph.add(Arc::clone(&detail));
    graph.add(Arc::clone(&cities));
    graph.run(&test_context()).await;

    let resolved = cities.output().expect("cities task produced no output");
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].city_name, "Ridgecrest");
}

#[tokio::test]
async fn dependent_of_a_cancelled_predecessor_self_cancels() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let predecessor = Arc::new(FetchTask::get(
        url(&server, "/detail"),
        parse::parse_nearby_cities_url,
    ));
    let mut dependent = FetchTask::deferred(
        {
            let predecessor = Arc::clone(&predecessor);
            move || {
                predecessor
                    .output()
                    .flatten()
                    .and_then(|raw| reqwest::Url::parse(&raw).ok())
            }
        },
        parse::parse_nearby_cities,
    );
    dependent.after(&predecessor);
    let dependent = Arc::new(dependent);

    predecessor.cancel();

    let mut graph = TaskGraph::serial();
    graph.add(Arc::clone(&predecessor));
    graph.add(Arc::clone(&dependent));
    graph.run(&test_context()).await;

    // The dependent observed Finished on its predecessor, found no URL to
    // read, and finished without a request of its own.
    assert_eq!(predecessor.state(), TaskState::Finished);
    assert_eq!(dependent.state(), TaskState::Finished);
    assert_eq!(dependent.output(), None);
    assert!(dependent.take_error().is_none());
}

#[tokio::test]
async fn gauge_is_held_only_while_executing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "count": 1 }))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let gauge = ActivityGauge::new();
    let ctx = TaskContext::new(reqwest::Client::new(), gauge.clone());

    let first = Arc::new(FetchTask::get(url(&server, "/query"), parse::parse_count));
    let second = Arc::new(FetchTask::get(url(&server, "/query"), parse::parse_count));
    let mut graph = TaskGraph::concurrent();
    graph.add(Arc::clone(&first));
    graph.add(Arc::clone(&second));

    assert_eq!(gauge.active(), 0);
    graph.run(&ctx).await;
    assert_eq!(gauge.active(), 0, "increments and decrements must pair up");
    assert_eq!(first.output(), Some(1));
    assert_eq!(second.output(), Some(1));
}
