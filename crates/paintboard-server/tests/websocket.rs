//! End-to-end tests over a real WebSocket connection.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::{SinkExt, StreamExt};
use paintboard_core::{BoardConfig, CanvasService, MemoryStore};
use paintboard_server::{BroadcastHub, ServerMessage, router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (String, Arc<BroadcastHub>) {
    let config = BoardConfig {
        width: 16,
        height: 8,
        block_size: 4,
        colors: vec![
            "#ffffff".to_string(),
            "#000000".to_string(),
            "#ff0000".to_string(),
            "#00ff00".to_string(),
        ],
        background: 0,
    };
    let service = CanvasService::open(config, Arc::new(MemoryStore::new())).unwrap();
    let hub = BroadcastHub::new(Arc::new(service));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(hub.clone()).into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{addr}/board/ws"), hub)
}

async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame");
        match frame {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn send(client: &mut Client, value: serde_json::Value) {
    client.send(Message::text(value.to_string())).await.unwrap();
}

async fn connect(url: &str) -> Client {
    let (mut client, _) = connect_async(url).await.unwrap();
    match recv(&mut client).await {
        ServerMessage::Welcome { width, height, colors, .. } => {
            assert_eq!((width, height), (16, 8));
            assert_eq!(colors.len(), 4);
        }
        other => panic!("expected welcome, got {other:?}"),
    }
    client
}

fn decode(data: &str) -> Vec<u8> {
    STANDARD.decode(data).unwrap()
}

#[tokio::test]
async fn test_paint_reaches_every_peer() {
    let (url, hub) = start_server().await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    send(&mut alice, json!({"type": "paint", "x": 5, "y": 6, "color": 2})).await;

    let expected = ServerMessage::Update { x: 5, y: 6, color: 2 };
    assert_eq!(recv(&mut alice).await, expected);
    assert_eq!(recv(&mut bob).await, expected);
    assert_eq!(hub.service().get_pixel(5, 6), 2);
}

#[tokio::test]
async fn test_read_board_and_chunk() {
    let (url, _hub) = start_server().await;
    let mut client = connect(&url).await;

    send(&mut client, json!({"type": "paint", "x": 0, "y": 1, "color": 3})).await;
    assert!(matches!(recv(&mut client).await, ServerMessage::Update { .. }));

    send(&mut client, json!({"type": "get_board", "seq": 1})).await;
    match recv(&mut client).await {
        ServerMessage::Board { seq, width, height, data } => {
            assert_eq!(seq, Some(1));
            assert_eq!((width, height), (16, 8));
            let pixels = decode(&data);
            assert_eq!(pixels.len(), 128);
            assert_eq!(pixels[16], 3);
            assert_eq!(pixels.iter().filter(|&&p| p != 0).count(), 1);
        }
        other => panic!("expected board, got {other:?}"),
    }

    send(&mut client, json!({"type": "get_chunk", "seq": 2, "x": -1, "y": 0, "cx": 2, "cy": 2})).await;
    match recv(&mut client).await {
        ServerMessage::Chunk { seq, x, y, cx, cy, data } => {
            assert_eq!(seq, Some(2));
            assert_eq!((x, y, cx, cy), (-1, 0, 2, 2));
            assert_eq!(decode(&data), vec![0, 0, 0, 3]);
        }
        other => panic!("expected chunk, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_requests_keep_connection_open() {
    let (url, hub) = start_server().await;
    let mut client = connect(&url).await;

    send(&mut client, json!({"type": "get_chunk", "seq": 7, "x": 0, "y": 0, "cx": 2000, "cy": 2000})).await;
    match recv(&mut client).await {
        ServerMessage::Error { seq, id, .. } => {
            assert_eq!(seq, Some(7));
            assert_eq!(id, "get_chunk:chunk_too_big");
        }
        other => panic!("expected error, got {other:?}"),
    }

    send(&mut client, json!({"type": "paint", "x": 16, "y": 0, "color": 1})).await;
    assert!(matches!(
        recv(&mut client).await,
        ServerMessage::Error { ref id, .. } if id == "paint:out_of_board"
    ));

    client.send(Message::text("{ not json".to_string())).await.unwrap();
    assert!(matches!(
        recv(&mut client).await,
        ServerMessage::Error { ref id, .. } if id == "base:parameter_error"
    ));

    // Still usable, and nothing was painted.
    send(&mut client, json!({"type": "paint", "x": 1, "y": 1, "color": 1})).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Update { x: 1, y: 1, color: 1 });
    assert_eq!(hub.service().get_board().iter().filter(|&&p| p != 0).count(), 1);
}

#[tokio::test]
async fn test_shutdown_disconnects_peers() {
    let (url, hub) = start_server().await;
    let mut client = connect(&url).await;
    assert_eq!(hub.peer_count(), 1);

    hub.stop_accepting();
    send(&mut client, json!({"type": "paint", "seq": 1, "x": 0, "y": 0, "color": 1})).await;
    assert!(matches!(
        recv(&mut client).await,
        ServerMessage::Error { ref id, .. } if id == "base:server_stopping"
    ));

    hub.disconnect_all();
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
    assert!(hub.wait_for_peers(Duration::from_secs(5)).await);
    assert_eq!(hub.service().get_pixel(0, 0), 0);
}
