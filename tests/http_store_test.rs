//! `HttpDocumentStore` against a mocked json-server backend.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use cssd_api::{
    errors::ServiceError,
    models::RequestStatus,
    repositories::{CssdStore, DocumentStore, HttpDocumentStore},
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(server: &MockServer) -> HttpDocumentStore {
    HttpDocumentStore::new(&server.uri(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn lists_a_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cssd_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "REQ001" },
            { "id": "REQ002" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = store_for(&server).list("cssd_requests").await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["id"], "REQ002");
}

#[tokio::test]
async fn missing_record_is_none_on_get_and_not_found_on_patch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/availableItems/REQ009"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/availableItems/REQ009"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(&server)
        .await;

    let store = store_for(&server);

    assert!(store.get("availableItems", "REQ009").await.unwrap().is_none());
    assert_matches!(
        store
            .patch("availableItems", "REQ009", json!({ "status": "Sterilized" }))
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn server_errors_surface_with_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stockItems"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
        .mount(&server)
        .await;

    let err = store_for(&server).list("stockItems").await.unwrap_err();

    assert_matches!(&err, ServiceError::ExternalServiceError(msg) if msg.contains("500") && msg.contains("database locked"));
}

#[tokio::test]
async fn malformed_json_is_a_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issuedItems"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = store_for(&server).list("issuedItems").await.unwrap_err();

    assert_matches!(err, ServiceError::SerializationError(_));
}

#[tokio::test]
async fn patch_sends_only_the_changed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/receive_items/REC001"))
        .and(body_json(json!({ "status": "Approved" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "REC001",
            "status": "Approved"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let updated = store_for(&server)
        .patch("receive_items", "REC001", json!({ "status": "Approved" }))
        .await
        .unwrap();

    assert_eq!(updated["status"], "Approved");
}

#[tokio::test]
async fn typed_collections_read_legacy_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cssd_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "REQ001",
            "department": "Cardiology",
            "items": "Forceps, Scissors",
            "quantity": "8",
            "priority": "High",
            "requestedBy": "",
            "status": "Pending",
            "date": "2024-06-10",
            "time": "09:15"
        }])))
        .mount(&server)
        .await;

    let store = CssdStore::new(Arc::new(store_for(&server)));
    let requests = store.requests.list().await.unwrap();

    assert_eq!(requests[0].quantity, 8);
    assert_eq!(requests[0].status, RequestStatus::Requested);
}

#[tokio::test]
async fn unreachable_backend_is_an_external_error() {
    // Nothing listens on this port once the server is dropped
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let store = HttpDocumentStore::new(&uri, Duration::from_millis(500)).unwrap();

    assert_matches!(
        store.list("cssd_requests").await,
        Err(ServiceError::ExternalServiceError(_))
    );
}
