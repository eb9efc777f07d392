//! End-to-end flows through generated-style bindings and an in-memory transport.

mod common;

use common::models::*;
use common::sites::*;
use common::{adapter, init_tracing, path_parameters, MockResponse, MockTransport};
use odata_http::client::{AdapterConfig, HttpRequestAdapter, RequestAdapterExt};
use odata_http::models::ODataError;
use odata_http::request::{NativeResponseHandler, RequestConfiguration};
use odata_http::{Error, RequestAdapter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn site_parameters() -> odata_http::types::PathParameters {
    path_parameters(&[("baseurl", "https://g.example"), ("site%2Did", "abc")])
}

#[tokio::test]
async fn test_last_seven_days_with_select() {
    init_tracing();
    let transport = MockTransport::new(vec![MockResponse::json(
        200,
        r##"{"value":[{"@odata.type":"#microsoft.graph.itemActivityStat","access":{"actionCount":1}}]}"##,
    )]);
    let builder = LastSevenDaysRequestBuilder::new(adapter(&transport), site_parameters());
    let config = LastSevenDaysRequestBuilderGetRequestConfiguration::new().with_query(ExpandSelectQueryParameters {
        select: Some(vec!["id".into(), "startDateTime".into()]),
        ..Default::default()
    });

    let page = builder.get(Some(&config)).await.unwrap().unwrap();

    let sent = transport.last_request();
    assert_eq!(sent.method, http::Method::GET);
    assert_eq!(
        sent.uri,
        "https://g.example/sites/abc/analytics/lastSevenDays?$select=id,startDateTime"
    );
    assert_eq!(sent.header("accept"), Some("application/json"));

    assert_eq!(page.value.len(), 1);
    let stat = &page.value[0];
    assert_eq!(stat.odata_type.as_deref(), Some("#microsoft.graph.itemActivityStat"));
    assert_eq!(stat.access.as_ref().and_then(|a| a.action_count), Some(1));
    assert!(stat.edit.is_none());
}

#[tokio::test]
async fn test_literal_template_names() {
    let transport = MockTransport::new(vec![MockResponse::json(200, r#"{"value":[]}"#)]);
    let mut info = odata_http::RequestInformation::new(
        http::Method::GET,
        "{+baseurl}/sites/{site-id}/analytics/lastSevenDays{?$expand,$select}",
        path_parameters(&[("baseurl", "https://g.example"), ("site-id", "abc")]),
    );
    info.add_query_parameter("$select", vec!["id", "startDateTime"]);

    adapter(&transport)
        .send(info, create_item_activity_stat_collection_response_from_discriminator_value, None)
        .await
        .unwrap();
    assert_eq!(
        transport.last_request().uri,
        "https://g.example/sites/abc/analytics/lastSevenDays?$select=id,startDateTime"
    );
}

#[tokio::test]
async fn test_term_store_children_count() {
    let transport = MockTransport::new(vec![MockResponse::text(200, "\"42\"")]);
    let builder = ChildrenCountRequestBuilder::new(
        adapter(&transport),
        path_parameters(&[
            ("baseurl", "https://g.example"),
            ("site%2Did", "abc"),
            ("set%2Did", "s1"),
        ]),
    );

    let count = builder.get(None).await.unwrap();
    assert_eq!(count, Some(42));

    let sent = transport.last_request();
    assert_eq!(sent.uri, "https://g.example/sites/abc/termStore/sets/s1/children/$count");
    assert_eq!(sent.header("accept"), Some("text/plain;q=0.9"));
}

#[tokio::test]
async fn test_count_with_filter() {
    let transport = MockTransport::new(vec![MockResponse::text(200, "7")]);
    let builder = ChildrenCountRequestBuilder::new(
        adapter(&transport),
        path_parameters(&[
            ("baseurl", "https://g.example"),
            ("site%2Did", "abc"),
            ("set%2Did", "s1"),
        ]),
    );
    let config = RequestConfiguration::new().with_query(CountQueryParameters {
        filter: Some("name eq 'x'".into()),
        ..Default::default()
    });

    assert_eq!(builder.get(Some(&config)).await.unwrap(), Some(7));
    assert_eq!(
        transport.last_request().uri,
        "https://g.example/sites/abc/termStore/sets/s1/children/$count?$filter=name%20eq%20%27x%27"
    );
}

fn restore_version(transport: &Arc<MockTransport>) -> RestoreVersionRequestBuilder {
    RestoreVersionRequestBuilder::new(
        adapter(transport),
        path_parameters(&[
            ("baseurl", "https://g.example"),
            ("drive%2Did", "d1"),
            ("driveItem%2Did", "i1"),
            ("driveItemVersion%2Did", "3.0"),
        ]),
    )
}

#[tokio::test]
async fn test_restore_version_no_content() {
    let transport = MockTransport::new(vec![MockResponse::empty(204)]);
    restore_version(&transport).post(None).await.unwrap();

    let sent = transport.last_request();
    assert_eq!(sent.method, http::Method::POST);
    assert_eq!(sent.uri, "https://g.example/drives/d1/items/i1/versions/3.0/restoreVersion");
    assert!(sent.body.is_empty());
    assert!(sent.header("content-type").is_none());
}

#[tokio::test]
async fn test_restore_version_not_found() {
    let transport = MockTransport::new(vec![MockResponse::json(
        404,
        r#"{"error":{"code":"itemNotFound","message":"The resource could not be found."}}"#,
    )]);
    let err = restore_version(&transport).post(None).await.unwrap_err();

    let api = err.as_api_error().expect("api error");
    assert_eq!(api.status(), 404);
    let odata = api.payload::<ODataError>().expect("typed payload");
    assert_eq!(odata.code(), Some("itemNotFound"));
    assert_eq!(odata.message(), Some("The resource could not be found."));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_error_without_body_is_plain_api_error() {
    let transport = MockTransport::new(vec![MockResponse::empty(500)]);
    let err = restore_version(&transport).post(None).await.unwrap_err();
    let api = err.as_api_error().unwrap();
    assert_eq!(api.status(), 500);
    assert!(api.payload::<ODataError>().is_none());
}

static PARSED: AtomicUsize = AtomicUsize::new(0);

fn counting_factory(node: &dyn odata_http::serialization::ParseNode) -> odata_http::Result<BaseItem> {
    PARSED.fetch_add(1, Ordering::SeqCst);
    create_base_item_from_discriminator_value(node)
}

#[tokio::test]
async fn test_cancel_in_flight() {
    let transport = MockTransport::new(vec![
        MockResponse::json(200, r#"{"id":"late"}"#).delayed(Duration::from_secs(30)),
    ]);
    let token = CancellationToken::new();
    let mut info = BaseItemItemRequestBuilder::new(
        adapter(&transport),
        path_parameters(&[("baseurl", "https://g.example"), ("site%2Did", "abc"), ("baseItem%2Did", "x")]),
    )
    .to_get_request_information(None)
    .unwrap();
    info.set_cancellation_token(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = adapter(&transport)
        .send(info, counting_factory, None)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(PARSED.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_with_url_skips_expansion() {
    let transport = MockTransport::new(vec![MockResponse::json(
        200,
        r##"{"@odata.type":"#microsoft.graph.listItem","id":"xyz","contentTypeName":"Document"}"##,
    )]);
    let builder = BaseItemItemRequestBuilder::new(adapter(&transport), site_parameters())
        .with_url("https://g.example/sites/abc/items/xyz?$expand=fields");

    let item = builder.get(None).await.unwrap().unwrap();

    assert_eq!(transport.last_request().uri, "https://g.example/sites/abc/items/xyz?$expand=fields");
    assert_eq!(
        item,
        BaseItem::ListItem {
            base: BaseItemFields {
                id: Some("xyz".into()),
                ..Default::default()
            },
            content_type: Some("Document".into()),
        }
    );
}

#[tokio::test]
async fn test_with_url_ignores_adapter_base_url() {
    let transport = MockTransport::new(vec![]);
    let adapter: Arc<dyn RequestAdapter> = Arc::new(HttpRequestAdapter::with_config(
        transport.clone(),
        AdapterConfig {
            base_url: "https://other.example/v1.0".into(),
            ..Default::default()
        },
    ));
    BaseItemItemRequestBuilder::new(adapter.clone(), site_parameters())
        .with_url("https://g.example/sites/abc/items/xyz")
        .get(None)
        .await
        .unwrap();
    assert_eq!(transport.last_request().uri, "https://g.example/sites/abc/items/xyz");

    let mut parameters = site_parameters();
    parameters.insert("baseItem%2Did".into(), "q".into());
    BaseItemItemRequestBuilder::new(adapter, parameters)
        .get(None)
        .await
        .unwrap();
    assert_eq!(transport.last_request().uri, "https://other.example/v1.0/sites/abc/items/q");
}

#[tokio::test]
async fn test_unknown_content_type() {
    let transport = MockTransport::new(vec![MockResponse::json(200, "<item/>").with_content_type("application/xml")]);
    let builder = BaseItemItemRequestBuilder::new(adapter(&transport), site_parameters());

    let err = builder.get(None).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization(_)), "{err:?}");
    assert!(err.as_api_error().is_none());
}

#[tokio::test]
async fn test_vendor_json_content_type() {
    let transport = MockTransport::new(vec![MockResponse::json(200, r#"{"id":"v","name":"n"}"#)
        .with_content_type("application/vnd.ms.graph+json; odata.metadata=minimal")]);
    let builder = BaseItemItemRequestBuilder::new(adapter(&transport), site_parameters());
    let item = builder.get(None).await.unwrap().unwrap();
    assert_eq!(item.base().name.as_deref(), Some("n"));
}

#[tokio::test]
#[allow(deprecated)]
async fn test_grant_body_and_deprecated_alias() {
    let response = r#"{"value":[{"id":"p1","roles":["read"]}]}"#;
    let transport = MockTransport::new(vec![MockResponse::json(200, response), MockResponse::json(200, response)]);
    let builder = GrantRequestBuilder::new(
        adapter(&transport),
        path_parameters(&[("baseurl", "https://g.example"), ("sharedDriveItem%2Did", "u!abc")]),
    );
    let body = GrantPostRequestBody {
        recipients: vec![DriveRecipient {
            email: Some("a@contoso.com".into()),
        }],
        roles: vec!["read".into()],
    };

    let granted = builder.post_as_grant_post_response(&body, None).await.unwrap().unwrap();
    assert_eq!(granted.value[0].roles, vec!["read"]);

    let sent = transport.last_request();
    assert_eq!(sent.uri, "https://g.example/shares/u%21abc/permission/grant");
    assert_eq!(sent.header("content-type"), Some("application/json"));
    let sent_body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(
        sent_body,
        serde_json::json!({"recipients": [{"email": "a@contoso.com"}], "roles": ["read"]})
    );

    let legacy = builder.post(&body, None).await.unwrap().unwrap();
    assert_eq!(legacy.value, granted.value);
}

#[tokio::test]
async fn test_native_response_handler_skips_parsing() {
    let transport = MockTransport::new(vec![MockResponse::json(404, r#"{"error":{"code":"x"}}"#)]);
    let native = NativeResponseHandler::new();
    let config: RequestConfiguration<ExpandSelectQueryParameters> =
        RequestConfiguration::new().with_option(native.option());

    let builder = BaseItemItemRequestBuilder::new(adapter(&transport), site_parameters());
    assert!(builder.get(Some(&config)).await.unwrap().is_none());
    let response = native.take().unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(&response.body()[..], br#"{"error":{"code":"x"}}"#);
}
