//! Integration tests for the telnet transport.
//!
//! A real listener on an OS-assigned port and a raw `TcpStream` playing the
//! part of a MUD client.

#[cfg(feature = "telnet")]
mod telnet {
    use emberhold_transport::{Connection, IacParser, TelnetTransport, Transport};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn pair() -> (emberhold_transport::TelnetConnection, TcpStream) {
        let mut transport = TelnetTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let client = TcpStream::connect(addr).await.expect("client should connect");
        let conn = server.await.expect("task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_greeting_negotiates_echo_sga_naws() {
        let (_conn, mut client) = pair().await;

        let mut greeting = [0u8; 9];
        client.read_exact(&mut greeting).await.unwrap();
        assert_eq!(greeting, IacParser::greeting());
    }

    #[tokio::test]
    async fn test_recv_strips_negotiation_and_records_window() {
        let (conn, mut client) = pair().await;
        let mut greeting = [0u8; 9];
        client.read_exact(&mut greeting).await.unwrap();

        assert_eq!(conn.window_size(), None);

        // WILL NAWS, then a NAWS report of 132x50, then typed text.
        client
            .write_all(&[255, 251, 31, 255, 250, 31, 0, 132, 0, 50, 255, 240])
            .await
            .unwrap();
        client.write_all(b"look\r\n").await.unwrap();

        let mut received = Vec::new();
        while received.len() < 6 {
            let chunk = conn.recv().await.unwrap().expect("data");
            received.extend_from_slice(&chunk);
        }
        assert_eq!(received, b"look\r\n");
        assert_eq!(conn.window_size(), Some((132, 50)));
    }

    #[tokio::test]
    async fn test_send_reaches_client() {
        let (conn, mut client) = pair().await;
        let mut greeting = [0u8; 9];
        client.read_exact(&mut greeting).await.unwrap();

        conn.send(b"Welcome.\r\n").await.unwrap();
        let mut buf = [0u8; 10];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"Welcome.\r\n");
    }

    #[tokio::test]
    async fn test_recv_none_after_client_hangs_up() {
        let (conn, client) = pair().await;
        drop(client);
        assert!(conn.recv().await.unwrap().is_none());
    }
}
