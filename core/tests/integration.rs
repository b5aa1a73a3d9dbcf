//! End-to-end tests against the live mock service.
//!
//! # Design
//! Each test starts the mock service on a random port with its own store,
//! then drives the client over real HTTP. The blocking tests use the ureq
//! transport from a plain test thread; the async tests use reqwest inside a
//! tokio runtime.

use std::net::SocketAddr;

use mock_server::Service;
use tracker_core::{
    blocking, ClientConfig, CreateProject, Credentials, Entity, ServiceError, TelegramNotifier,
    TrackerClient,
};

const TOKEN: &str = "pat";

/// Start a mock service on a random port, in its own thread and runtime.
fn start(service: Service) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, service).await
        })
        .unwrap();
    });
    addr
}

fn config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::with_base_url(format!("http://{addr}"))
}

fn blocking_client(addr: SocketAddr, token: &str) -> blocking::TrackerClient {
    let credentials = Credentials::new(token, "acme").unwrap();
    blocking::TrackerClient::connect(credentials, &config(addr))
}

#[test]
fn blocking_lifecycle() {
    let addr = start(Service::with_token(TOKEN));
    let client = blocking_client(addr, TOKEN);

    // Step 1: empty organization.
    let listed = client.list_projects().unwrap();
    assert_eq!(listed.message, "There is no project in your organization.");
    assert!(listed.payload.is_empty());

    // Step 2: create and fetch a project.
    let created = client
        .create_project(&CreateProject::new("demo", "integration"))
        .unwrap();
    assert_eq!(created.status_code, 202);
    assert_eq!(created.payload.name, "demo");

    let project = client.get_project("demo").unwrap();
    assert_eq!(project.payload.name, "demo");
    assert_eq!(client.list_projects().unwrap().payload.len(), 1);

    // Step 3: create a work item and list it.
    let item = client.create_work_item("demo", "Task", "demo task").unwrap();
    assert_eq!(item.payload.title, "demo task");
    assert_eq!(item.payload.kind, "Task");

    let items = client.list_work_items("demo").unwrap().payload;
    assert_eq!(items.len(), 1);
    let summary = &items[&item.payload.id];
    assert_eq!(summary.title, "demo task");
    assert_eq!(summary.kind, "Task");

    // Step 4: rename, then look it up by the new title.
    client.update_work_item("demo", "demo task", "renamed").unwrap();
    let renamed = client.get_work_item("demo", "renamed").unwrap();
    assert_eq!(renamed.payload.id, item.payload.id);
    assert_eq!(renamed.payload.state.as_deref(), Some("To Do"));
    assert_eq!(
        client.get_work_item("demo", "demo task"),
        Err(ServiceError::work_item_not_found("demo task"))
    );

    // Step 5: delete the work item, then the project.
    let deleted = client.delete_work_item("demo", "renamed").unwrap();
    assert_eq!(deleted.payload, "renamed");
    assert!(client.list_work_items("demo").unwrap().payload.is_empty());
    assert_eq!(
        client.get_work_item("demo", "demo task"),
        Err(ServiceError::work_item_not_found("demo task"))
    );
    assert_eq!(
        client.get_work_item("demo", "renamed"),
        Err(ServiceError::work_item_not_found("renamed"))
    );

    let deleted = client.delete_project("demo").unwrap();
    assert_eq!(deleted.status_code, 202);
    assert!(matches!(
        client.get_project("demo"),
        Err(ServiceError::NotFound { entity: Entity::Project, .. })
    ));

    client.close();
}

#[test]
fn blocking_error_taxonomy() {
    let addr = start(Service::with_token(TOKEN));
    let client = blocking_client(addr, TOKEN);

    let err = client.delete_project("ghost").unwrap_err();
    assert_eq!(err, ServiceError::project_not_found("ghost"));
    assert!(err.message().contains("ghost"));

    let input = CreateProject::new("demo", "");
    client.create_project(&input).unwrap();
    assert_eq!(
        client.create_project(&input),
        Err(ServiceError::Conflict { name: "demo".into() })
    );

    assert_eq!(
        client.create_work_item("demo", "Saga", "x"),
        Err(ServiceError::UnrecognizedType { kind: "Saga".into() })
    );
    assert_eq!(
        client.create_work_item("ghost", "Task", "x"),
        Err(ServiceError::project_not_found("ghost"))
    );
    assert_eq!(
        client.list_work_items("ghost"),
        Err(ServiceError::project_not_found("ghost"))
    );
    assert_eq!(
        client.update_work_item("demo", "missing", "x"),
        Err(ServiceError::work_item_not_found("missing"))
    );
}

#[test]
fn blocking_rejected_tokens_share_one_message() {
    let addr = start(Service::with_token(TOKEN));

    let wrong = blocking_client(addr, "wrong").list_projects().unwrap_err();
    assert_eq!(wrong, ServiceError::Authorization { status: 203 });

    let right = blocking_client(addr, TOKEN);
    right.create_project(&CreateProject::new("demo", "")).unwrap();
    right.create_work_item("demo", "Task", "t").unwrap();

    let resolved = blocking_client(addr, "wrong").delete_work_item("demo", "t");
    assert_eq!(resolved, Err(ServiceError::Authorization { status: 401 }));
    assert_eq!(
        wrong.message(),
        resolved.unwrap_err().message(),
    );
}

#[test]
fn blocking_listing_fans_out_over_many_items() {
    let addr = start(Service::with_token(TOKEN));
    let client = blocking_client(addr, TOKEN);
    client.create_project(&CreateProject::new("demo", "")).unwrap();
    client.create_project(&CreateProject::new("other", "")).unwrap();
    for n in 0..12 {
        client.create_work_item("demo", "Task", &format!("task {n}")).unwrap();
    }
    client.create_work_item("other", "Epic", "elsewhere").unwrap();

    let items = client.list_work_items("demo").unwrap().payload;
    assert_eq!(items.len(), 12);
    let ids: Vec<u64> = items.keys().copied().collect();
    assert_eq!(ids, (1..=12).collect::<Vec<_>>());
    assert_eq!(items[&5].title, "task 4");
}

#[test]
fn notifications_follow_successful_mutations() {
    let service = Service::with_token(TOKEN);
    let addr = start(service.clone());
    let client = blocking_client(addr, TOKEN).with_notifier(
        TelegramNotifier::new("123:abc", "42").with_base_url(format!("http://{addr}/telegram")),
    );

    client.create_project(&CreateProject::new("demo", "")).unwrap();
    client.create_work_item("demo", "Task", "t").unwrap();
    // reads and failures stay silent
    client.list_projects().unwrap();
    client.create_project(&CreateProject::new("demo", "")).unwrap_err();

    let notifications = futures::executor::block_on(service.notifications());
    let texts: Vec<&str> = notifications.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "New project 'demo' created in organization 'acme'.",
            "Work item 't' created in organization 'acme'.",
        ]
    );
    assert!(notifications.iter().all(|n| n.chat_id == "42" && n.bot_token == "123:abc"));
}

#[test]
fn unreachable_notifier_does_not_fail_the_operation() {
    let addr = start(Service::with_token(TOKEN));
    let client = blocking_client(addr, TOKEN)
        .with_notifier(TelegramNotifier::new("t", "1").with_base_url("http://127.0.0.1:9"));

    let created = client.create_project(&CreateProject::new("demo", "")).unwrap();
    assert_eq!(created.status_code, 202);
}

#[test]
fn unreachable_service_is_a_transport_error() {
    let credentials = Credentials::new(TOKEN, "acme").unwrap();
    let client = blocking::TrackerClient::connect(
        credentials,
        &ClientConfig::with_base_url("http://127.0.0.1:9"),
    );
    assert!(matches!(
        client.list_projects(),
        Err(ServiceError::Transport(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn async_lifecycle() {
    let addr = start(Service::with_token(TOKEN));
    let credentials = Credentials::new(TOKEN, "acme").unwrap();
    let client = TrackerClient::connect(credentials, &config(addr)).unwrap();

    client
        .create_project(&CreateProject::new("demo", ""))
        .await
        .unwrap();
    client.create_work_item("demo", "Task", "first").await.unwrap();
    client.create_work_item("demo", "Issue", "second").await.unwrap();

    let listed = client.list_work_items("demo").await.unwrap();
    assert_eq!(listed.message, "Work items listed successfully.");
    let kinds: Vec<&str> = listed.payload.values().map(|s| s.kind.as_str()).collect();
    assert_eq!(kinds, vec!["Task", "Issue"]);

    client.update_work_item("demo", "first", "renamed").await.unwrap();
    assert_eq!(
        client.get_work_item("demo", "renamed").await.unwrap().payload.title,
        "renamed"
    );
    client.delete_work_item("demo", "renamed").await.unwrap();
    assert_eq!(
        client.delete_work_item("demo", "renamed").await,
        Err(ServiceError::work_item_not_found("renamed"))
    );
    client.delete_project("demo").await.unwrap();
    assert!(client.list_projects().await.unwrap().payload.is_empty());

    client.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn async_operations_run_concurrently() {
    let addr = start(Service::with_token(TOKEN));
    let credentials = Credentials::new(TOKEN, "acme").unwrap();
    let client = TrackerClient::connect(credentials, &config(addr)).unwrap();
    client
        .create_project(&CreateProject::new("demo", ""))
        .await
        .unwrap();

    let (a, b, c) = futures::join!(
        client.create_work_item("demo", "Task", "a"),
        client.create_work_item("demo", "Task", "b"),
        client.get_project("demo"),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(client.list_work_items("demo").await.unwrap().payload.len(), 2);
}
