//! Integration tests for escradio

use escradio::{Error, EscRadioClient, StreamDirectory};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create a mock stream variant JSON record
fn mock_stream_json(id: u64, bitrate: u32, listeners: u32) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("ESC Radio {}kbps", bitrate),
        "mount_point": format!("/live-{}", bitrate),
        "url": format!("https://radio.example.org/live-{}", bitrate),
        "bitrate": bitrate,
        "format": "mp3",
        "description": "ESC Radio live stream",
        "status": "online",
        "max_listeners": 500,
        "current_listeners": listeners,
        "metadata": {
            "title": "Waterline",
            "artist": "Jedward",
            "album": null,
            "artwork_url": null
        },
        "last_updated": "2025-06-01T12:00:00Z",
        "is_primary": bitrate == 128
    })
}

#[tokio::test]
async fn test_list_streams() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "streams": [
                    mock_stream_json(1, 128, 42),
                    mock_stream_json(2, 320, 17),
                ]
            }
        })))
        .mount(&mock_server)
        .await;

    let client = EscRadioClient::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap();

    let streams = client.list_streams().await.unwrap();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].id, 1);
    assert_eq!(streams[0].bitrate, 128);
    assert!(streams[0].is_primary);
    assert_eq!(streams[1].bitrate, 320);
    assert_eq!(streams[0].metadata.display(), "Jedward - Waterline");
}

#[tokio::test]
async fn test_list_streams_with_string_encoded_metadata() {
    // Some backend versions deliver metadata as a JSON-encoded string
    let mock_server = MockServer::start().await;

    let mut stream = mock_stream_json(1, 128, 42);
    stream["metadata"] =
        json!("{\"title\": \"Satellite\", \"artist\": \"Lena\", \"album\": null, \"artwork_url\": null}");

    Mock::given(method("GET"))
        .and(path("/api/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "streams": [stream] }
        })))
        .mount(&mock_server)
        .await;

    let client = EscRadioClient::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap();

    let streams = client.list_streams().await.unwrap();
    assert_eq!(streams[0].metadata.title, "Satellite");
    assert_eq!(streams[0].metadata.artist, "Lena");
}

#[tokio::test]
async fn test_stream_detail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/streams/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "stream": mock_stream_json(2, 320, 99) }
        })))
        .mount(&mock_server)
        .await;

    let client = EscRadioClient::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap();

    let stream = client.stream_detail(2).await.unwrap();
    assert_eq!(stream.id, 2);
    assert_eq!(stream.current_listeners, 99);
    assert_eq!(stream.url, "https://radio.example.org/live-320");
}

#[tokio::test]
async fn test_stream_detail_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/streams/999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = EscRadioClient::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap();

    let result = client.stream_detail(999).await;
    assert!(matches!(result, Err(Error::StreamNotFound(999))));
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/streams"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = EscRadioClient::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap();

    let result = client.list_streams().await;
    assert!(matches!(result, Err(Error::Api(_))));
}

#[tokio::test]
async fn test_selectable_streams_hides_fallback_relay() {
    let mock_server = MockServer::start().await;

    let mut fallback = mock_stream_json(3, 64, 0);
    fallback["name"] = json!("ESC Radio Fallback");

    Mock::given(method("GET"))
        .and(path("/api/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "streams": [mock_stream_json(1, 128, 42), fallback]
            }
        })))
        .mount(&mock_server)
        .await;

    let client = EscRadioClient::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap();

    let selectable = client.selectable_streams().await.unwrap();
    assert_eq!(selectable.len(), 1);
    assert_eq!(selectable[0].id, 1);
}
