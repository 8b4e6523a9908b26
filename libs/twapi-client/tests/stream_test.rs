use std::sync::{Arc, Mutex};
use std::time::Duration;

use httpmock::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use twapi_client::{
    BoxError, CancellationToken, Client, ClientConfig, ErrorKind, Reply, Request, StatusCode,
    StopStreaming,
};

fn client_for(base_url: String) -> Client {
    Client::from_config(ClientConfig::default().with_base_url(base_url)).unwrap()
}

fn data_of(reply: &Reply) -> String {
    reply.data.as_ref().map(|d| d.get().to_owned()).unwrap_or_default()
}

#[tokio::test]
async fn test_stream_delivers_in_order() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/2/tweets/search/stream")
            .query_param("expansions", "author_id");
        then.status(200).body(
            "{\"data\":{\"id\":\"1\"}}\r\n\r\n{\"data\":{\"id\":\"2\"},\"matching_rules\":[]}\n{\"data\":{\"id\":\"3\"}}",
        );
    });

    let client = client_for(server.base_url());
    let request = Request::builder()
        .path("tweets/search/stream")
        .param("expansions", ["author_id"])
        .build()
        .unwrap();

    let mut seen = Vec::new();
    client
        .stream(&CancellationToken::new(), &request, |reply| {
            seen.push(data_of(&reply));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(seen, vec![r#"{"id":"1"}"#, r#"{"id":"2"}"#, r#"{"id":"3"}"#]);
    mock.assert();
}

#[tokio::test]
async fn test_stop_after_first_message() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/2/tweets/sample/stream");
        then.status(200).body("{\"data\":1}\n{\"data\":2}\n");
    });

    let client = client_for(server.base_url());
    let mut calls = 0;
    let result = client
        .stream(
            &CancellationToken::new(),
            &Request::get("tweets/sample/stream"),
            |_| {
                calls += 1;
                Err(StopStreaming.into())
            },
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_callback_error_is_wrapped() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/2/tweets/sample/stream");
        then.status(200).body("{\"data\":1}\n{\"data\":2}\n");
    });

    let client = client_for(server.base_url());
    let err = client
        .stream(
            &CancellationToken::new(),
            &Request::get("tweets/sample/stream"),
            |_| -> Result<(), BoxError> { Err("queue full".into()) },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Callback);
    assert_eq!(
        std::error::Error::source(&err).unwrap().to_string(),
        "queue full"
    );
}

#[tokio::test]
async fn test_stream_status_error_never_calls_back() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/2/tweets/search/stream");
        then.status(503)
            .body(r#"{"title":"Service Unavailable","type":"about:blank"}"#);
    });

    let client = client_for(server.base_url());
    let err = client
        .stream(
            &CancellationToken::new(),
            &Request::get("tweets/search/stream"),
            |_| panic!("callback must not run for a failed status"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(err.status_code(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(
        &err.body().unwrap()[..],
        br#"{"title":"Service Unavailable","type":"about:blank"}"#
    );
}

#[tokio::test]
async fn test_malformed_message_stops_stream() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/2/tweets/sample/stream");
        then.status(200).body("{\"data\":1}\n{\"data\":}\n{\"data\":3}\n");
    });

    let client = client_for(server.base_url());
    let mut seen = Vec::new();
    let err = client
        .stream(
            &CancellationToken::new(),
            &Request::get("tweets/sample/stream"),
            |reply| {
                seen.push(data_of(&reply));
                Ok(())
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(seen, vec!["1"]);
}

#[tokio::test]
async fn test_stream_body_is_logged_per_message() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/2/tweets/sample/stream");
        then.status(200).body("{\"data\":1}{\"data\":2}");
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let config = ClientConfig::default()
        .with_base_url(server.base_url())
        .with_log(Arc::new(move |tag: &str, msg: &str| {
            sink.lock().unwrap().push(format!("{tag} {msg}"));
        }));
    let client = Client::from_config(config).unwrap();

    client
        .stream(
            &CancellationToken::new(),
            &Request::get("tweets/sample/stream"),
            |_| Ok(()),
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen[0].starts_with("RequestURL "));
    assert_eq!(seen[1], "HTTPStatus 200 OK");
    assert_eq!(seen[2], r#"StreamBody {"data":1}"#);
    assert_eq!(seen[3], r#"StreamBody {"data":2}"#);
}

#[tokio::test]
async fn test_cancelled_before_start_issues_nothing() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/2/tweets/sample/stream");
        then.status(200).body("{\"data\":1}\n");
    });

    let client = client_for(server.base_url());
    let cancel = CancellationToken::new();
    cancel.cancel();

    client
        .stream(&cancel, &Request::get("tweets/sample/stream"), |_| {
            panic!("callback must not run after cancellation")
        })
        .await
        .unwrap();

    mock.assert_hits(0);
}

/// Serves one chunked 200 response that sends `first` and then never ends.
async fn endless_stream_server(first: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ntransfer-encoding: chunked\r\n\r\n";
        let chunk = format!("{:x}\r\n{first}\r\n", first.len());
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(chunk.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        // Hold the connection open until the client goes away.
        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_cancel_unblocks_endless_stream() {
    let base_url = endless_stream_server("{\"data\":{\"id\":\"1\"}}\r\n").await;
    let client = client_for(base_url);

    let cancel = CancellationToken::new();
    let (first_tx, first_rx) = tokio::sync::oneshot::channel::<()>();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if first_rx.await.is_ok() {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        }
    });

    let mut first_tx = Some(first_tx);
    let mut seen = Vec::new();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.stream(&cancel, &Request::get("tweets/sample/stream"), |reply| {
            seen.push(data_of(&reply));
            if let Some(tx) = first_tx.take() {
                let _ = tx.send(());
            }
            Ok(())
        }),
    )
    .await
    .expect("stream did not observe cancellation");

    assert!(result.is_ok());
    assert_eq!(seen, vec![r#"{"id":"1"}"#]);
}
