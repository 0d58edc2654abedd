//! Integration tests for RotelDevice and the setup probe against a mock amplifier.


use std::sync::Arc;
use std::time::Duration;

use rotel_sdk::{
    probe_device_with, DeviceConfig, DeviceState, RotelClient, RotelDevice, SdkError,
    DEFAULT_NAME,
};
use test_helpers::{test_config, MockAmplifier};

fn client_for(amp: &MockAmplifier) -> Arc<RotelClient> {
    Arc::new(
        RotelClient::builder("127.0.0.1")
            .with_port(Some(amp.port()))
            .with_config(test_config())
            .build()
            .unwrap(),
    )
}

async fn wait_for_state(device: &RotelDevice, expected: &DeviceState) {
    let mut updates = device.watch();
    tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|state| state == expected),
    )
    .await
    .expect("state never reached")
    .unwrap();
}

#[tokio::test]
async fn test_attach_primes_and_tracks_state() {
    let amp = MockAmplifier::start().await;
    let device = RotelDevice::attach(client_for(&amp), Some("Den"), Some("RA-1572"))
        .await
        .unwrap();
    let mut peer = amp.accept().await;

    assert_eq!(
        peer.expect("source?").await,
        "rs232_update_on!power?volume?mute?source?"
    );
    assert_eq!(device.name(), "Den");
    assert!(device.is_available());

    peer.push(b"power=on$volume=48$mute=off$source=cd$").await;
    let expected = DeviceState {
        power: Some(true),
        muted: false,
        volume_raw: Some(48),
        source: Some("cd".to_string()),
    };
    wait_for_state(&device, &expected).await;
    assert_eq!(device.volume_level(), Some(0.5));

    device.client().close().await;
    assert!(!device.is_available());
}

#[tokio::test]
async fn test_controls_send_profile_commands() {
    let amp = MockAmplifier::start().await;
    let device = RotelDevice::attach(client_for(&amp), None, None).await.unwrap();
    let mut peer = amp.accept().await;
    peer.expect("source?").await;

    device.turn_on().await.unwrap();
    assert_eq!(peer.expect("power_on!").await, "power_on!");

    device.turn_off().await.unwrap();
    assert_eq!(peer.expect("power_off!").await, "power_off!");

    device.set_mute(true).await.unwrap();
    assert_eq!(peer.expect("mute_on!").await, "mute_on!");

    device.set_volume_level(0.5).await.unwrap();
    assert_eq!(peer.expect("vol_48!").await, "vol_48!");

    device.set_volume_level(-1.0).await.unwrap();
    assert_eq!(peer.expect("vol_00!").await, "vol_00!");

    device.set_volume_raw(150).await.unwrap();
    assert_eq!(peer.expect("vol_96!").await, "vol_96!");

    device.select_source("Bluetooth").await.unwrap();
    assert_eq!(peer.expect("bluetooth!").await, "bluetooth!");

    device.select_source("Tape").await.unwrap();
    assert_eq!(peer.expect("tape!").await, "tape!");

    assert!(matches!(
        device.select_listed_source("tape").await,
        Err(SdkError::UnknownSource(_))
    ));
    assert_eq!(device.name(), DEFAULT_NAME);
    assert_eq!(device.source_list().len(), 11);

    device.client().close().await;
}

#[tokio::test]
async fn test_detach_stops_tracking() {
    let amp = MockAmplifier::start().await;
    let client = client_for(&amp);
    let device = RotelDevice::attach(Arc::clone(&client), None, None)
        .await
        .unwrap();
    let mut peer = amp.accept().await;
    peer.expect("source?").await;

    assert_eq!(client.listener_count(), 1);
    assert!(device.detach());
    assert!(!device.detach());
    assert_eq!(client.listener_count(), 0);

    peer.push(b"power=on$").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(device.state(), DeviceState::default());

    client.close().await;
}

#[tokio::test]
async fn test_probe_reads_model_and_selects_profile() {
    let amp = MockAmplifier::start().await;

    let (config, _) = tokio::join!(
        probe_device_with("127.0.0.1 ", Some(amp.port()), None, test_config()),
        async {
            let mut peer = amp.accept().await;
            peer.expect("model?").await;
            peer.push(b"model=RA-1572$").await;
        }
    );
    let config = config.unwrap();

    assert_eq!(
        config,
        DeviceConfig {
            host: "127.0.0.1".to_string(),
            port: amp.port(),
            name: DEFAULT_NAME.to_string(),
            model: "ra-1572".to_string(),
            profile: "rotel_ascii_v1".to_string(),
        }
    );
}

#[tokio::test]
async fn test_probe_without_answer_records_unknown_model() {
    let amp = MockAmplifier::start().await;

    let (config, _peer) = tokio::join!(
        probe_device_with("127.0.0.1", Some(amp.port()), Some("Office"), test_config()),
        amp.accept()
    );
    let config = config.unwrap();

    assert_eq!(config.model, "unknown");
    assert_eq!(config.name, "Office");
    assert_eq!(config.profile, "rotel_ascii_v1");
}

#[tokio::test]
async fn test_probe_unreachable_device_fails() {
    let amp = MockAmplifier::start().await;
    let port = amp.port();
    drop(amp);

    let result = probe_device_with("127.0.0.1", Some(port), None, test_config()).await;
    assert!(matches!(result, Err(SdkError::Client(_))));
}
