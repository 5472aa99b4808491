//! Integration tests for the remote store client and fetch coordinator.

use std::sync::Arc;
use std::time::Duration;

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crucible_store::{ArchiveStore, FetchCoordinator};
use crucible_types::{FetchError, PkgPath};

fn pkg(p: &str) -> PkgPath {
    PkgPath::new(p).unwrap()
}

async fn store_for(server: &MockServer) -> ArchiveStore {
    let base = Url::parse(&server.uri()).unwrap();
    ArchiveStore::new(base).unwrap()
}

#[tokio::test]
async fn fetch_returns_archive_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pkg/fmt.a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let bytes = store.fetch(&pkg("fmt")).await.unwrap();
    assert_eq!(bytes, b"payload");
}

#[tokio::test]
async fn nested_paths_map_to_nested_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pkg/net/http.a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    store.fetch(&pkg("net/http")).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_a_fetch_error_naming_the_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pkg/gone.a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let err = store.fetch(&pkg("gone")).await.unwrap_err();
    assert_eq!(err.path(), &pkg("gone"));
    assert_eq!(err.to_string(), "cannot load package \"gone\"");
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn batch_settles_once_with_every_payload() {
    let server = MockServer::start().await;
    for (p, body) in [("a", "aa"), ("b", "bb")] {
        Mock::given(method("GET"))
            .and(path(format!("/pkg/{p}.a")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.as_bytes().to_vec()))
            .expect(1)
            .mount(&server)
            .await;
    }

    let coordinator = FetchCoordinator::new(store_for(&server).await);
    let mut received = coordinator.fetch_all(&[pkg("a"), pkg("b")]).await.unwrap();
    received.sort_by(|(x, _), (y, _)| x.cmp(y));
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].0, pkg("a"));
    assert_eq!(*received[0].1, b"aa".to_vec());
    assert_eq!(received[1].0, pkg("b"));
    assert_eq!(*received[1].1, b"bb".to_vec());
}

#[tokio::test]
async fn first_failure_aborts_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pkg/a.a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // The success comes in well after the failure; it must not matter.
    Mock::given(method("GET"))
        .and(path("/pkg/b.a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let coordinator = FetchCoordinator::new(store_for(&server).await);
    let err = coordinator
        .fetch_all(&[pkg("a"), pkg("b")])
        .await
        .unwrap_err();
    assert_eq!(err.path(), &pkg("a"));
}

#[tokio::test]
async fn concurrent_batches_share_one_request_per_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pkg/shared.a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"once".to_vec())
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Arc::new(FetchCoordinator::new(store_for(&server).await));
    let left = Arc::clone(&coordinator);
    let right = Arc::clone(&coordinator);
    let wanted = [pkg("shared")];
    let (a, b) = tokio::join!(left.fetch_all(&wanted), right.fetch_all(&wanted));
    assert_eq!(*a.unwrap()[0].1, b"once".to_vec());
    assert_eq!(*b.unwrap()[0].1, b"once".to_vec());
    server.verify().await;
}

#[tokio::test]
async fn completed_fetches_are_not_pinned_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pkg/again.a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"v".to_vec()))
        .expect(2)
        .mount(&server)
        .await;

    let coordinator = FetchCoordinator::new(store_for(&server).await);
    coordinator.fetch_all(&[pkg("again")]).await.unwrap();
    // Eviction runs on its own task; give it a beat.
    tokio::time::sleep(Duration::from_millis(50)).await;
    // A later batch for the same path issues a fresh request.
    coordinator.fetch_all(&[pkg("again")]).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn aborted_batch_does_not_pin_a_failed_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pkg/bad.a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // The first request for "flaky" fails after the batch has already
    // aborted on "bad"; later requests succeed.
    Mock::given(method("GET"))
        .and(path("/pkg/flaky.a"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(50)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pkg/flaky.a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"recovered".to_vec()))
        .mount(&server)
        .await;

    let coordinator = FetchCoordinator::new(store_for(&server).await);
    let err = coordinator
        .fetch_all(&[pkg("bad"), pkg("flaky")])
        .await
        .unwrap_err();
    assert_eq!(err.path(), &pkg("bad"));

    // Let the abandoned request settle and its entry drop, then retry:
    // the stale failure must not be replayed.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let recovered = coordinator.fetch_all(&[pkg("flaky")]).await.unwrap();
    assert_eq!(recovered[0].0, pkg("flaky"));
    assert_eq!(*recovered[0].1, b"recovered".to_vec());
}
