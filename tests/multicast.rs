//! Replication across a live multicast group.
//!
//! Each test uses its own port so the suites can run in parallel without
//! cross-talk.

use std::sync::{Arc, Once};
use std::time::{Duration, SystemTime};

use fadecast::{Fader, Memory, Multicast};
use tokio::time;

const KEY: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
const ID_ONE: [u8; 10] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
const ID_TWO: [u8; 10] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
const ID_THREE: [u8; 10] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 2];

static INIT: Once = Once::new();

async fn set_up(address: &str, id: &[u8]) -> Multicast<Memory> {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });

    Multicast::new(
        Memory::new(Duration::from_millis(50)),
        address,
        &KEY,
        Some(id),
        None,
    )
    .await
    .expect("join multicast group")
}

#[tokio::test]
async fn transfer_between_two_stores() {
    let one = set_up("224.0.0.1:7801", &ID_ONE).await;
    let two = set_up("224.0.0.1:7801", &ID_TWO).await;

    let now = SystemTime::now();
    one.put(b"test", now, b"value").await.unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(one.size().await, 1);
    assert_eq!(two.size().await, 1);

    for fader in [&one, &two] {
        let earliest = fader.earliest().await.unwrap();
        assert_eq!(earliest.key(), b"test");
        assert_eq!(earliest.time(), now);
        assert_eq!(earliest.value(), b"value");
    }
}

#[tokio::test]
async fn transfer_of_multiple_puts() {
    let one = set_up("224.0.0.1:7802", &ID_ONE).await;
    let two = set_up("224.0.0.1:7802", &ID_TWO).await;

    let now = SystemTime::now();
    one.put(b"one", now, b"value one").await.unwrap();
    one.put(b"two", now + Duration::from_millis(1), b"value two")
        .await
        .unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(one.size().await, 2);
    assert_eq!(two.size().await, 2);

    for fader in [&one, &two] {
        let earliest = fader.earliest().await.unwrap();
        assert_eq!(earliest.key(), b"one");
        assert_eq!(earliest.time(), now);
        assert_eq!(earliest.value(), b"value one");
    }
}

#[tokio::test]
async fn transfer_and_expire() {
    let one = set_up("224.0.0.1:7803", &ID_ONE).await;
    let two = set_up("224.0.0.1:7803", &ID_TWO).await;

    one.put(b"test", SystemTime::now(), b"value").await.unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(one.size().await, 1);
    assert_eq!(two.size().await, 1);

    time::sleep(Duration::from_millis(100)).await;

    assert_eq!(one.size().await, 0);
    assert_eq!(two.size().await, 0);
}

#[tokio::test]
async fn replayed_sender_id_is_rejected() {
    let one = set_up("224.0.0.1:7804", &ID_ONE).await;
    let two = set_up("224.0.0.1:7804", &ID_TWO).await;

    let now = SystemTime::now();
    one.put(b"test", now, b"value").await.unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(one.size().await, 1);
    assert_eq!(two.size().await, 1);

    // Forge a replay: a third member reuses store one's identity, so its
    // datagram carries an already-accepted nonce for that id.
    let forger = set_up("224.0.0.1:7804", &ID_ONE).await;
    forger.put(b"test", now, b"value").await.unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(one.size().await, 1);
    assert_eq!(two.size().await, 1);
}

#[tokio::test]
async fn receive_filter_drops_items() {
    let one = set_up("224.0.0.1:7805", &ID_ONE).await;

    let two = Multicast::new(
        Memory::new(Duration::from_millis(50)),
        "224.0.0.1:7805",
        &KEY,
        Some(&ID_TWO),
        Some(Arc::new(|key: &[u8], _: SystemTime, _: &[u8]| {
            key != b"secret"
        })),
    )
    .await
    .unwrap();

    let now = SystemTime::now();
    one.put(b"secret", now, b"value").await.unwrap();
    one.put(b"public", now, b"value").await.unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(one.size().await, 2);
    assert_eq!(two.size().await, 1);
    assert!(two.get(b"public").await.is_some());
    assert!(two.get(b"secret").await.is_none());
}

#[tokio::test]
async fn close_stops_replication() {
    let one = set_up("224.0.0.1:7806", &ID_ONE).await;
    let two = set_up("224.0.0.1:7806", &ID_TWO).await;

    two.close().await.unwrap();
    time::sleep(Duration::from_millis(10)).await;

    one.put(b"test", SystemTime::now(), b"value").await.unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(one.size().await, 1);
    assert_eq!(two.size().await, 0);
}

#[tokio::test]
async fn chained_replication_layers() {
    // The replicated store holds its parent by capability, so replication
    // layers stack: two groups bridged through one memory store.
    let memory = Memory::new(Duration::from_millis(50));
    let inner = Multicast::new(memory, "224.0.0.1:7807", &KEY, Some(&ID_ONE), None)
        .await
        .unwrap();
    let outer = Multicast::new(inner, "224.0.0.1:7808", &KEY, Some(&ID_TWO), None)
        .await
        .unwrap();

    let observer_inner = set_up("224.0.0.1:7807", &ID_THREE).await;
    let observer_outer = set_up("224.0.0.1:7808", &ID_THREE).await;

    outer.put(b"test", SystemTime::now(), b"value").await.unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(outer.size().await, 1);
    assert_eq!(observer_inner.size().await, 1);
    assert_eq!(observer_outer.size().await, 1);
}
