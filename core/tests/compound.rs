//! Compound operation behaviour over a scripted transport.
//!
//! The transport answers requests from a queue, in order, and records what
//! it was sent, so each test can pin exactly which calls an operation makes
//! and where it stops.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::executor::block_on;
use parking_lot::Mutex;
use tracker_core::{
    blocking, ClientConfig, CreateProject, Credentials, HttpMethod, HttpRequest, HttpResponse,
    Notifier, Resolution, ServiceError, TelegramNotifier, Transport, TransportError,
};

#[derive(Default)]
struct Scripted {
    answers: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl Scripted {
    fn answering(answers: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            seen: Mutex::default(),
        }
    }

    fn seen(&self) -> Vec<(HttpMethod, String)> {
        self.seen
            .lock()
            .iter()
            .map(|request| (request.method, request.path.clone()))
            .collect()
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().push(request);
        self.answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("script exhausted")))
    }
}

fn ok(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(status, body))
}

fn work_item(id: u64, title: &str, kind: &str) -> Result<HttpResponse, TransportError> {
    ok(
        200,
        &format!(
            r#"{{"id":{id},"fields":{{"System.Title":"{title}","System.WorkItemType":"{kind}","System.State":"To Do"}}}}"#
        ),
    )
}

fn client(transport: Scripted) -> blocking::TrackerClient<Scripted> {
    let credentials = Credentials::new("pat", "acme").unwrap();
    let config = ClientConfig::with_base_url("http://tracker.test");
    blocking::TrackerClient::with_transport(credentials, &config, transport)
}

fn async_client(transport: Scripted) -> tracker_core::TrackerClient<Scripted> {
    let credentials = Credentials::new("pat", "acme").unwrap();
    let config = ClientConfig::with_base_url("http://tracker.test");
    tracker_core::TrackerClient::with_transport(credentials, &config, transport)
}

const PROJECT: &str =
    r#"{"id":"6ce954b1-ce1f-45d1-b94d-e6bf2464ba2c","name":"demo","url":"http://tracker.test/p"}"#;

#[test]
fn duplicate_titles_resolve_to_first_listed_id() {
    let client = async_client(Scripted::answering(vec![
        ok(200, r#"{"workItems":[{"id":42,"url":"a"},{"id":7,"url":"b"}]}"#),
        work_item(42, "dup", "Task"),
    ]));

    let item = block_on(client.get_work_item("demo", "dup")).unwrap();
    assert_eq!(item.payload.id, 42);

    let seen = client.transport().seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, HttpMethod::Post);
    assert!(seen[0].1.contains("/demo/_apis/wit/wiql"));
    assert!(seen[1].1.contains("/_apis/wit/workitems/42?"));
}

#[test]
fn title_with_quote_is_escaped_in_query() {
    let client = async_client(Scripted::answering(vec![ok(200, r#"{"workItems":[]}"#)]));
    let resolved = block_on(client.resolve_work_item_id("demo", "it's")).unwrap();
    assert_eq!(resolved, Resolution::NotFound);

    let request = client.transport().seen.lock()[0].clone();
    assert!(request.body.unwrap().contains("'it''s'"));
}

#[test]
fn delete_project_stops_when_lookup_fails() {
    let client = async_client(Scripted::answering(vec![ok(500, "")]));

    let err = block_on(client.delete_project("demo")).unwrap_err();
    assert_eq!(err, ServiceError::Upstream { status: 500 });
    assert_eq!(client.transport().seen().len(), 1);
    assert_eq!(client.transport().seen()[0].0, HttpMethod::Get);
}

#[test]
fn delete_project_deletes_by_looked_up_id() {
    let client = async_client(Scripted::answering(vec![
        ok(200, PROJECT),
        ok(202, r#"{"id":"00000000-0000-0000-0000-000000000001"}"#),
    ]));

    let deleted = block_on(client.delete_project("demo")).unwrap();
    assert_eq!(deleted.payload, "demo");

    let seen = client.transport().seen();
    assert_eq!(seen[1].0, HttpMethod::Delete);
    assert!(seen[1]
        .1
        .contains("/_apis/projects/6ce954b1-ce1f-45d1-b94d-e6bf2464ba2c"));
}

#[test]
fn unauthorized_resolution_stops_before_the_mutation() {
    let client = client(Scripted::answering(vec![ok(203, "<html>sign in</html>")]));

    assert_eq!(
        client.update_work_item("demo", "t", "u"),
        Err(ServiceError::Authorization { status: 401 })
    );
}

#[test]
fn failed_resolution_query_reads_as_missing_work_item() {
    let client = client(Scripted::answering(vec![ok(500, "")]));
    assert_eq!(
        client.delete_work_item("demo", "t"),
        Err(ServiceError::work_item_not_found("t"))
    );
}

#[test]
fn one_failed_detail_fails_the_whole_listing() {
    let client = async_client(Scripted::answering(vec![
        ok(
            200,
            r#"{"workItems":[{"id":1,"url":"http://tracker.test/w/1"},{"id":2,"url":"http://tracker.test/w/2"}]}"#,
        ),
        work_item(1, "a", "Task"),
        ok(500, ""),
    ]));

    let err = block_on(client.list_work_items("demo")).unwrap_err();
    assert_eq!(err, ServiceError::Upstream { status: 500 });
    assert_eq!(client.transport().seen().len(), 3);
}

#[test]
fn detail_transport_failure_fails_the_listing() {
    let client = async_client(Scripted::answering(vec![
        ok(200, r#"{"workItems":[{"id":1,"url":"http://tracker.test/w/1"}]}"#),
        Err(TransportError::new("connection reset")),
    ]));

    assert!(matches!(
        block_on(client.list_work_items("demo")),
        Err(ServiceError::Transport(_))
    ));
}

#[test]
fn listing_merges_details_by_id() {
    let client = async_client(Scripted::answering(vec![
        ok(
            200,
            r#"{"workItems":[{"id":9,"url":"http://tracker.test/w/9"},{"id":3,"url":"http://tracker.test/w/3"}]}"#,
        ),
        work_item(9, "nine", "Epic"),
        work_item(3, "three", "Task"),
    ]));

    let items = block_on(client.list_work_items("demo")).unwrap().payload;
    let ids: Vec<u64> = items.keys().copied().collect();
    assert_eq!(ids, vec![3, 9]);
    assert_eq!(items[&9].kind, "Epic");

    let seen = client.transport().seen();
    assert_eq!(seen[1].1, "http://tracker.test/w/9?api-version=7.0");
}

#[test]
fn empty_query_makes_no_detail_calls() {
    let client = async_client(Scripted::answering(vec![ok(200, r#"{"workItems":[]}"#)]));
    let listed = block_on(client.list_work_items("demo")).unwrap();
    assert!(listed.payload.is_empty());
    assert_eq!(client.transport().seen().len(), 1);
}

#[test]
fn notifier_failure_does_not_change_the_outcome() {
    let client = async_client(Scripted::answering(vec![
        ok(202, r#"{"id":"00000000-0000-0000-0000-000000000002"}"#),
        Err(TransportError::new("telegram down")),
    ]))
    .with_notifier(TelegramNotifier::new("t", "1").with_base_url("http://telegram.test"));

    let created = block_on(client.create_project(&CreateProject::new("demo", ""))).unwrap();
    assert_eq!(created.status_code, 202);

    let seen = client.transport().seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].1, "http://telegram.test/bott/sendMessage");
}

#[test]
fn failed_mutation_is_not_announced() {
    struct Counting(Mutex<usize>);
    impl Notifier for Counting {
        fn announce(&self, _text: &str) -> Option<HttpRequest> {
            *self.0.lock() += 1;
            None
        }
    }

    let client = async_client(Scripted::answering(vec![ok(400, "{}")]))
        .with_notifier(Counting(Mutex::new(0)));
    let err = block_on(client.create_project(&CreateProject::new("demo", ""))).unwrap_err();
    assert_eq!(err, ServiceError::Conflict { name: "demo".into() });
    assert_eq!(client.transport().seen().len(), 1);
}

#[test]
fn default_notifier_sends_nothing() {
    let client = async_client(Scripted::answering(vec![ok(
        202,
        r#"{"id":"00000000-0000-0000-0000-000000000002"}"#,
    )]));
    block_on(client.create_project(&CreateProject::new("demo", ""))).unwrap();
    assert_eq!(client.transport().seen().len(), 1);
}

#[test]
fn both_rejection_codes_read_the_same() {
    let via_401 = client(Scripted::answering(vec![ok(401, "")]))
        .list_projects()
        .unwrap_err();
    let via_203 = client(Scripted::answering(vec![ok(203, "<html/>")]))
        .list_projects()
        .unwrap_err();
    assert_eq!(via_401.message(), via_203.message());
    assert_eq!(via_401.status_code(), Some(401));
    assert_eq!(via_203.status_code(), Some(203));
}

#[test]
fn success_status_with_unexpected_body_is_a_decode_error() {
    let client = client(Scripted::answering(vec![ok(200, "not json")]));
    assert!(matches!(
        client.get_project("demo"),
        Err(ServiceError::Decode { status: 200, .. })
    ));
}

#[test]
fn requests_carry_basic_auth_and_api_version() {
    let client = async_client(Scripted::answering(vec![ok(200, PROJECT)]));
    block_on(client.get_project("demo")).unwrap();

    let request = client.transport().seen.lock()[0].clone();
    assert_eq!(request.path, "http://tracker.test/acme/_apis/projects/demo?api-version=7.0");
    assert_eq!(request.header("Authorization"), Some("Basic OnBhdA=="));
}
