use {
    http::{StatusCode, header},
    lambda_http::{Body, Request},
    visits_core::{CorsPolicy, HttpResponse, VisitsBody, DEFAULT_COUNTER_NAME},
    visits_counter::{
        CounterService,
        lambda::{handle_event, into_lambda_response},
        store::{BoxedStore, MemoryStore},
    },
    crate::stores::UnavailableStore,
};


fn event() -> Request {
    http::Request::builder()
        .method("GET")
        .uri("https://abc123.execute-api.eu-west-1.amazonaws.com/prod/visits")
        .body(Body::Empty)
        .unwrap()
}

#[tokio::test]
async fn event_is_counted() {
    let store = MemoryStore::new();
    let service = CounterService::new(BoxedStore::new(store.clone()), CorsPolicy::default());

    let response = handle_event(&service, event()).await.unwrap();
    assert_eq!(StatusCode::OK, response.status());
    assert_eq!("*", response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap());
    match response.body() {
        Body::Text(text) => assert_eq!(r#"{"visits":1}"#, text),
        other => panic!("expected text body, got: {other:?}"),
    }

    handle_event(&service, event()).await.unwrap();
    assert_eq!(Some(2), store.visits(DEFAULT_COUNTER_NAME).unwrap());
}

#[tokio::test]
async fn store_failure_propagates_to_runtime() {
    let service = CounterService::new(BoxedStore::new(UnavailableStore::new()), CorsPolicy::default());

    let err = handle_event(&service, event()).await.err().unwrap();
    assert!(err.to_string().contains("storage unavailable"), "unexpected error: {err}");
}

#[test]
fn json_body_stays_text() {
    let response = into_lambda_response(HttpResponse::json(&VisitsBody { visits: 3 }).unwrap());

    assert_eq!("application/json", response.headers().get(header::CONTENT_TYPE).unwrap());
    match response.body() {
        Body::Text(text) => assert_eq!(r#"{"visits":3}"#, text),
        other => panic!("expected text body, got: {other:?}"),
    }
}
