//! Timing tests on a paused clock with an in-memory transport.
//!
//! A scripted connector records when each connection attempt happens, so
//! backoff delays and pacing can be asserted exactly.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rotel_client::{ClientConfig, ClientError, Connection, Connector, RotelClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::time::Instant;

enum Outcome {
    Accept,
    /// Accept with a transport buffer small enough to stall writes
    AcceptNarrow,
    Refuse,
}

/// Connector that follows a script and reports every attempt.
struct ScriptedConnector {
    script: Mutex<VecDeque<Outcome>>,
    attempts: mpsc::UnboundedSender<Instant>,
    peers: mpsc::UnboundedSender<DuplexStream>,
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, host: &str, port: u16) -> rotel_client::Result<Connection> {
        let _ = self.attempts.send(Instant::now());
        let outcome = self.script.lock().pop_front().unwrap_or(Outcome::Refuse);
        match outcome {
            Outcome::Accept | Outcome::AcceptNarrow => {
                let capacity = match outcome {
                    Outcome::AcceptNarrow => 8,
                    _ => 1024,
                };
                let (client_end, device_end) = tokio::io::duplex(capacity);
                let _ = self.peers.send(device_end);
                let (reader, writer) = tokio::io::split(client_end);
                Ok(Connection::new(reader, writer))
            }
            Outcome::Refuse => Err(ClientError::Connect {
                addr: format!("{host}:{port}"),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            }),
        }
    }
}

struct Harness {
    client: RotelClient,
    attempts: mpsc::UnboundedReceiver<Instant>,
    peers: mpsc::UnboundedReceiver<DuplexStream>,
}

fn harness(script: Vec<Outcome>, config: ClientConfig) -> Harness {
    let (attempts_tx, attempts) = mpsc::unbounded_channel();
    let (peers_tx, peers) = mpsc::unbounded_channel();
    let connector = ScriptedConnector {
        script: Mutex::new(script.into()),
        attempts: attempts_tx,
        peers: peers_tx,
    };
    let client = RotelClient::builder("amp.test")
        .with_config(config)
        .with_connector(connector)
        .build()
        .unwrap();
    Harness {
        client,
        attempts,
        peers,
    }
}

fn quiet_config() -> ClientConfig {
    ClientConfig::default().with_resync_on_reconnect(false)
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_to_cap_across_failed_attempts() {
    let mut h = harness(vec![Outcome::Accept], quiet_config());

    h.client.connect().await.unwrap();
    let mut previous = h.attempts.recv().await.unwrap();
    drop(h.peers.recv().await.unwrap());

    let mut delays = Vec::new();
    for _ in 0..7 {
        let attempt = h.attempts.recv().await.unwrap();
        delays.push(attempt - previous);
        previous = attempt;
    }

    let expected: Vec<Duration> = [1, 2, 4, 8, 16, 30, 30]
        .into_iter()
        .map(Duration::from_secs)
        .collect();
    assert_eq!(delays, expected);
    assert!(!h.client.is_connected());

    h.client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_successful_read_resets_backoff() {
    let script = vec![
        Outcome::Accept,
        Outcome::Refuse,
        Outcome::Refuse,
        Outcome::Accept,
        Outcome::Accept,
    ];
    let mut h = harness(script, quiet_config());

    h.client.connect().await.unwrap();
    let start = h.attempts.recv().await.unwrap();
    drop(h.peers.recv().await.unwrap());

    // 1s, then 2s, then 4s
    let second = h.attempts.recv().await.unwrap();
    let third = h.attempts.recv().await.unwrap();
    assert_eq!(second - start, Duration::from_secs(1));
    assert_eq!(third - second, Duration::from_secs(2));
    let reconnected = h.attempts.recv().await.unwrap();
    assert_eq!(reconnected - third, Duration::from_secs(4));

    // Data arrives, then the device drops again.
    let mut peer = h.peers.recv().await.unwrap();
    peer.write_all(b"power=on$").await.unwrap();
    let dropped_at = Instant::now();
    drop(peer);

    let next = h.attempts.recv().await.unwrap();
    assert_eq!(next - dropped_at, Duration::from_secs(1));

    h.client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_without_data_keeps_backing_off() {
    let script = vec![Outcome::Accept, Outcome::Accept, Outcome::Accept];
    let mut h = harness(script, quiet_config());

    h.client.connect().await.unwrap();
    let mut previous = h.attempts.recv().await.unwrap();

    let mut delays = Vec::new();
    for _ in 0..2 {
        drop(h.peers.recv().await.unwrap());
        let attempt = h.attempts.recv().await.unwrap();
        delays.push(attempt - previous);
        previous = attempt;
    }

    assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    h.client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_resync_after_reconnect_is_paced() {
    let mut h = harness(vec![Outcome::Accept, Outcome::Accept], ClientConfig::default());

    h.client.connect().await.unwrap();
    drop(h.peers.recv().await.unwrap());

    let mut peer = h.peers.recv().await.unwrap();
    let reconnected_at = Instant::now();

    let expected = "rs232_update_on!power?volume?mute?source?";
    let mut received = vec![0u8; expected.len()];
    peer.read_exact(&mut received).await.unwrap();
    assert_eq!(String::from_utf8(received).unwrap(), expected);

    // three paced gaps precede the last query
    assert!(Instant::now() - reconnected_at >= Duration::from_millis(150));

    h.client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_query_times_out_after_two_seconds() {
    let mut h = harness(vec![Outcome::Accept], ClientConfig::default());
    h.client.connect().await.unwrap();
    let _peer = h.peers.recv().await.unwrap();

    let started = Instant::now();
    let answer = h.client.query("model?").await.unwrap();

    assert_eq!(answer, None);
    assert_eq!(Instant::now() - started, Duration::from_secs(2));
    assert_eq!(h.client.listener_count(), 0);

    h.client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_refresh_all_paces_queries() {
    let mut h = harness(vec![Outcome::Accept], ClientConfig::default());
    h.client.connect().await.unwrap();
    let mut peer = h.peers.recv().await.unwrap();

    let started = Instant::now();
    h.client.refresh_all().await;
    assert_eq!(Instant::now() - started, Duration::from_millis(200));

    let mut received = vec![0u8; "power?volume?mute?source?".len()];
    peer.read_exact(&mut received).await.unwrap();
    assert_eq!(received, b"power?volume?mute?source?");

    h.client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_stalled_write_times_out_and_does_not_block_close() {
    let mut h = harness(vec![Outcome::AcceptNarrow], quiet_config());
    h.client.connect().await.unwrap();
    // The device end stays open but never reads.
    let _peer = h.peers.recv().await.unwrap();

    let started = Instant::now();
    let (sent, ()) = tokio::join!(h.client.send("source_select_bluetooth!"), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        h.client.close().await;
    });

    assert!(matches!(sent, Err(ClientError::WriteTimeout { .. })));
    assert_eq!(Instant::now() - started, Duration::from_secs(5));
    assert!(!h.client.is_connected());
    assert!(matches!(
        h.client.send("power?").await,
        Err(ClientError::NotConnected)
    ));
}
