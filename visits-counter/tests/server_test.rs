use {
    std::{net::SocketAddr, sync::Arc},
    tokio::{net::{TcpListener, TcpStream}, io::{AsyncReadExt, AsyncWriteExt}},
    visits_core::{CorsPolicy, DEFAULT_COUNTER_NAME},
    visits_counter::{
        CounterService,
        server::CounterServer,
        store::{BoxedStore, MemoryStore},
    },
    crate::stores::UnavailableStore,
};


async fn start_server(store: BoxedStore) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = CounterService::new(store, CorsPolicy::new("https://d111111abcdef8.cloudfront.net").unwrap());
    tokio::spawn(CounterServer::new(Arc::new(service)).serve(listener));
    addr
}

async fn send(addr: SocketAddr, method: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(format!("{method} /visits HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_visits_over_http() {
    let store = MemoryStore::new();
    let addr = start_server(BoxedStore::new(store.clone())).await;

    let first = send(addr, "GET").await;
    assert!(first.starts_with("HTTP/1.1 200 OK"), "unexpected response: {first}");
    assert!(first.ends_with(r#"{"visits":1}"#), "unexpected response: {first}");

    let second = send(addr, "POST").await.to_lowercase();
    assert!(second.contains("content-type: application/json"), "unexpected response: {second}");
    assert!(second.contains("access-control-allow-origin: https://d111111abcdef8.cloudfront.net"), "unexpected response: {second}");
    assert!(second.contains("access-control-allow-methods: options,post,get"), "unexpected response: {second}");
    assert!(second.contains("access-control-allow-headers: content-type, origin"), "unexpected response: {second}");
    assert!(second.ends_with(r#"{"visits":2}"#), "unexpected response: {second}");

    assert_eq!(Some(2), store.visits(DEFAULT_COUNTER_NAME).unwrap());
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let addr = start_server(BoxedStore::new(UnavailableStore::new())).await;

    let response = send(addr, "GET").await;
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error"), "unexpected response: {response}");
    assert!(
        response.to_lowercase().contains("access-control-allow-origin: https://d111111abcdef8.cloudfront.net"),
        "unexpected response: {response}"
    );
}
