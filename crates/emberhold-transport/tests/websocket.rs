//! Integration tests for the WebSocket transport.
//!
//! These spin up a real WebSocket server and client so bytes actually cross
//! the loopback interface.

#[cfg(feature = "websocket")]
mod websocket {
    use emberhold_transport::{Connection, Transport, WebSocketTransport};
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn pair() -> (emberhold_transport::WebSocketConnection, Client) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        (server.await.expect("task should complete"), client)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive() {
        let (server_conn, mut client) = pair().await;
        assert!(server_conn.id().into_inner() > 0);

        server_conn.send(b"You are standing in a field.").await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"You are standing in a field.");

        client
            .send(Message::Text("north\r\n".into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().expect("should have data");
        assert_eq!(received, b"north\r\n");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_send_does_not_wait_for_pending_recv() {
        // The session's reader sits in recv() for the whole connection;
        // the writer must still be able to push output.
        let (server_conn, mut client) = pair().await;
        let server_conn = std::sync::Arc::new(server_conn);

        let reader = {
            let conn = server_conn.clone();
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_conn.send(b"prompt> "),
        )
        .await
        .expect("send must not block behind recv")
        .unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"prompt> ");

        client.send(Message::Close(None)).await.unwrap();
        assert!(reader.await.unwrap().unwrap().is_none());
    }
}
