use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, accept_hdr_async};

use voxstream::config::AppConfig;
use voxstream::stream_client::{RecognizerClient, StreamError};

fn test_config(addr: std::net::SocketAddr, key_env: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.stream.endpoint = format!("ws://{}", addr);
    config.stream.api_key_env = key_env.to_string();
    config
}

#[tokio::test]
async fn streams_config_audio_and_results() {
    std::env::set_var("VOXSTREAM_TEST_KEY", "test-key");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_hdr_async(stream, |req: &Request, resp: Response| {
            assert_eq!(
                req.headers().get("authorization").unwrap(),
                "Bearer test-key"
            );
            Ok(resp)
        })
        .await
        .unwrap();

        // First frame must be the JSON start message.
        let first = ws.next().await.unwrap().unwrap();
        let start: serde_json::Value = match first {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text start frame, got {:?}", other),
        };
        assert_eq!(start["config"]["encoding"], "LINEAR16");
        assert_eq!(start["config"]["sample_rate_hertz"], 16000);
        assert_eq!(start["config"]["language_code"], "en-US");
        assert_eq!(start["config"]["interim_results"], true);

        // Then binary audio.
        let audio = ws.next().await.unwrap().unwrap();
        match audio {
            Message::Binary(data) => assert_eq!(&data[..], &[0u8, 0, 255, 127][..]),
            other => panic!("expected binary audio frame, got {:?}", other),
        }

        ws.send(Message::Text(
            r#"{"results":[{"alternatives":[{"transcript":"hi"}],"is_final":false,"stability":0.7}]}"#
                .to_string()
                .into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"results":[{"alternatives":[{"transcript":"hi there","confidence":0.9}],"is_final":true}]}"#
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

        // Drain until the client closes.
        while let Some(message) = ws.next().await {
            if message.is_err() {
                break;
            }
        }
    });

    let config = test_config(addr, "VOXSTREAM_TEST_KEY");
    let (mut sink, mut responses) = RecognizerClient::connect(&config.stream, &config.audio)
        .await
        .unwrap();

    sink.send_audio(&[0, 0, 255, 127]).await.unwrap();

    let interim = responses.next_response().await.unwrap().unwrap();
    assert!(!interim.results[0].is_final);
    assert_eq!(interim.results[0].best_transcript(), Some("hi"));

    let final_response = responses.next_response().await.unwrap().unwrap();
    assert!(final_response.results[0].is_final);
    assert_eq!(
        final_response.results[0].best_transcript(),
        Some("hi there")
    );

    sink.finish().await.unwrap();
    assert!(responses.next_response().await.unwrap().is_none());

    server.await.unwrap();
}

#[tokio::test]
async fn missing_api_key_is_fatal() {
    let mut config = AppConfig::default();
    config.stream.api_key_env = "VOXSTREAM_UNSET_KEY_FOR_TEST".to_string();

    let err = RecognizerClient::connect(&config.stream, &config.audio)
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::MissingApiKey(_)));
}

#[tokio::test]
async fn abnormal_close_is_an_error() {
    std::env::set_var("VOXSTREAM_TEST_KEY2", "test-key");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _start = ws.next().await.unwrap().unwrap();
        ws.close(Some(CloseFrame {
            code: CloseCode::Policy,
            reason: "quota exhausted".into(),
        }))
        .await
        .unwrap();
        while let Some(message) = ws.next().await {
            if message.is_err() {
                break;
            }
        }
    });

    let config = test_config(addr, "VOXSTREAM_TEST_KEY2");
    let (_sink, mut responses) = RecognizerClient::connect(&config.stream, &config.audio)
        .await
        .unwrap();

    let err = responses.next_response().await.unwrap_err();
    match err {
        StreamError::Closed(reason) => assert!(reason.contains("quota exhausted")),
        other => panic!("expected Closed error, got {:?}", other),
    }

    // Drop our half so the server's drain loop sees the connection end.
    drop(_sink);
    drop(responses);
    server.await.unwrap();
}

#[tokio::test]
async fn unparseable_response_is_an_error() {
    std::env::set_var("VOXSTREAM_TEST_KEY3", "test-key");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _start = ws.next().await.unwrap().unwrap();
        ws.send(Message::Text("not json".to_string().into()))
            .await
            .unwrap();
        while let Some(message) = ws.next().await {
            if message.is_err() {
                break;
            }
        }
    });

    let config = test_config(addr, "VOXSTREAM_TEST_KEY3");
    let (_sink, mut responses) = RecognizerClient::connect(&config.stream, &config.audio)
        .await
        .unwrap();

    let err = responses.next_response().await.unwrap_err();
    assert!(matches!(err, StreamError::MalformedResponse(_)));

    drop(_sink);
    drop(responses);
    server.await.unwrap();
}
