//! End-to-end relay behaviour through a real listener.

use rr_balancer::{HttpServer, Upstream};

mod common;

#[tokio::test]
async fn test_post_is_relayed_verbatim() {
    let backend = common::start_echo_backend().await;
    let server = HttpServer::new(common::config_for(&[backend])).unwrap();
    let (proxy, shutdown) = common::start_proxy(server).await;

    let res = common::client()
        .post(format!("http://{proxy}/submit?draft=1"))
        .header("x-custom", "greeting")
        .body("hello")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body = res.text().await.unwrap();
    assert_eq!(body, format!("POST\ngreeting\n{backend}\n127.0.0.1\nhello"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_response_is_passed_through() {
    let backend = common::start_raw_backend(
        b"HTTP/1.1 201 Created\r\nX-Upstream: yes\r\nContent-Length: 4\r\nConnection: close\r\n\r\nmade",
    )
    .await;
    let server = HttpServer::new(common::config_for(&[backend])).unwrap();
    let (proxy, shutdown) = common::start_proxy(server).await;

    let res = common::client()
        .put(format!("http://{proxy}/things/1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 201);
    assert_eq!(res.headers().get("x-upstream").unwrap(), "yes");
    assert_eq!(res.text().await.unwrap(), "made");

    shutdown.trigger();
}

#[tokio::test]
async fn test_round_robin_across_backends() {
    let b1 = common::start_mock_backend("b1").await;
    let b2 = common::start_mock_backend("b2").await;
    let b3 = common::start_mock_backend("b3").await;
    let server = HttpServer::new(common::config_for(&[b1, b2, b3])).unwrap();
    let (proxy, shutdown) = common::start_proxy(server).await;

    let client = common::client();
    let mut bodies = Vec::new();
    for _ in 0..6 {
        let res = client.get(format!("http://{proxy}/")).send().await.unwrap();
        bodies.push(res.text().await.unwrap());
    }
    assert_eq!(bodies, ["b1", "b2", "b3", "b1", "b2", "b3"]);

    shutdown.trigger();
}

#[tokio::test]
async fn test_dead_upstream_is_skipped() {
    let b1 = common::start_mock_backend("b1").await;
    let b2 = common::start_mock_backend("b2").await;
    let server = HttpServer::new(common::config_for(&[b1, b2])).unwrap();
    server.dispatcher().pool().members()[0].set_alive(false);
    let (proxy, shutdown) = common::start_proxy(server).await;

    let client = common::client();
    for _ in 0..4 {
        let res = client.get(format!("http://{proxy}/")).send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), "b2");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_invalid_upstream_rejected_at_startup() {
    let mut config = common::config_for(&[]);
    assert!(matches!(
        HttpServer::new(config.clone()).err().unwrap(),
        rr_balancer::ProxyError::EmptyPool
    ));

    config.upstreams = vec!["not a url".into()];
    assert!(matches!(
        HttpServer::new(config).err().unwrap(),
        rr_balancer::ProxyError::InvalidAddress { .. }
    ));
}
