use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use adbx::{AdbClient, AdbSocketConfig, DeviceEvent, DeviceState};

async fn test_client() -> (AdbClient, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let client = AdbClient::new(AdbSocketConfig::new("127.0.0.1", port));
    (client, listener)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.unwrap();
    let len = usize::from_str_radix(std::str::from_utf8(&len_buf).unwrap(), 16).unwrap();
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    String::from_utf8(payload).unwrap()
}

async fn accept_tracker(stream: &mut TcpStream) {
    assert_eq!(read_request(stream).await, "host:track-devices");
    stream.write_all(b"OKAY").await.unwrap();
}

async fn write_snapshot(stream: &mut TcpStream, payload: &str) {
    stream
        .write_all(format!("{:04x}", payload.len()).as_bytes())
        .await
        .unwrap();
    stream.write_all(payload.as_bytes()).await.unwrap();
}

#[tokio::test]
async fn test_first_snapshot_reports_all_devices_as_added() {
    let (client, listener) = test_client().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_tracker(&mut stream).await;
        write_snapshot(&mut stream, "serial1\tdevice\nserial2\toffline\n").await;
    });

    let mut tracker = client.track_devices().await.unwrap();

    match tracker.next_event().await.unwrap() {
        DeviceEvent::Add(device) => {
            assert_eq!(device.serial, "serial1");
            assert_eq!(device.state, DeviceState::Device);
        }
        other => panic!("expected Add, got {:?}", other),
    }
    match tracker.next_event().await.unwrap() {
        DeviceEvent::Add(device) => assert_eq!(device.serial, "serial2"),
        other => panic!("expected Add, got {:?}", other),
    }
    match tracker.next_event().await.unwrap() {
        DeviceEvent::ChangeSet(diff) => {
            assert_eq!(diff.added.len(), 2);
            assert!(diff.removed.is_empty());
            assert!(diff.changed.is_empty());
        }
        other => panic!("expected ChangeSet, got {:?}", other),
    }

    // 服务器关闭后发End
    match tracker.next_event().await.unwrap() {
        DeviceEvent::End => {}
        other => panic!("expected End, got {:?}", other),
    }
    assert!(tracker.next_event().await.is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn test_add_change_remove_across_snapshots() {
    let (client, listener) = test_client().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_tracker(&mut stream).await;
        write_snapshot(&mut stream, "serial1\tdevice\nserial2\tdevice\n").await;
        write_snapshot(&mut stream, "serial1\toffline\nserial3\tdevice\n").await;
    });

    let mut tracker = client.track_devices().await.unwrap();

    // 第一个快照：两个Add + ChangeSet
    for _ in 0..2 {
        assert!(matches!(
            tracker.next_event().await.unwrap(),
            DeviceEvent::Add(_)
        ));
    }
    assert!(matches!(
        tracker.next_event().await.unwrap(),
        DeviceEvent::ChangeSet(_)
    ));

    // 第二个快照：serial3新增、serial2移除、serial1状态变化
    match tracker.next_event().await.unwrap() {
        DeviceEvent::Add(device) => assert_eq!(device.serial, "serial3"),
        other => panic!("expected Add, got {:?}", other),
    }
    match tracker.next_event().await.unwrap() {
        DeviceEvent::Remove(device) => assert_eq!(device.serial, "serial2"),
        other => panic!("expected Remove, got {:?}", other),
    }
    match tracker.next_event().await.unwrap() {
        DeviceEvent::Change(change) => {
            assert_eq!(change.device.serial, "serial1");
            assert_eq!(change.old_state, DeviceState::Device);
            assert_eq!(change.device.state, DeviceState::Offline);
        }
        other => panic!("expected Change, got {:?}", other),
    }
    match tracker.next_event().await.unwrap() {
        DeviceEvent::ChangeSet(diff) => {
            assert_eq!(diff.added.len(), 1);
            assert_eq!(diff.removed.len(), 1);
            assert_eq!(diff.changed.len(), 1);
        }
        other => panic!("expected ChangeSet, got {:?}", other),
    }

    assert!(matches!(
        tracker.next_event().await.unwrap(),
        DeviceEvent::End
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn test_identical_snapshot_yields_empty_changeset() {
    let (client, listener) = test_client().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_tracker(&mut stream).await;
        write_snapshot(&mut stream, "serial1\tdevice\n").await;
        write_snapshot(&mut stream, "serial1\tdevice\n").await;
    });

    let mut tracker = client.track_devices().await.unwrap();
    assert!(matches!(
        tracker.next_event().await.unwrap(),
        DeviceEvent::Add(_)
    ));
    assert!(matches!(
        tracker.next_event().await.unwrap(),
        DeviceEvent::ChangeSet(_)
    ));
    match tracker.next_event().await.unwrap() {
        DeviceEvent::ChangeSet(diff) => assert!(diff.is_empty()),
        other => panic!("expected empty ChangeSet, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_stop_suppresses_further_events() {
    let (client, listener) = test_client().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_tracker(&mut stream).await;
        write_snapshot(&mut stream, "serial1\tdevice\n").await;
        // 保持连接打开但不再发送快照
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
    });

    let mut tracker = client.track_devices().await.unwrap();
    assert!(matches!(
        tracker.next_event().await.unwrap(),
        DeviceEvent::Add(_)
    ));
    assert!(matches!(
        tracker.next_event().await.unwrap(),
        DeviceEvent::ChangeSet(_)
    ));

    tracker.stop();
    assert!(tracker.next_event().await.is_none());
}

#[tokio::test]
async fn test_truncated_frame_emits_error_not_end() {
    let (client, listener) = test_client().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_tracker(&mut stream).await;
        write_snapshot(&mut stream, "serial1\tdevice\n").await;
        // 长度前缀只写了一半就断开：不是干净的流结束
        stream.write_all(b"00").await.unwrap();
    });

    let mut tracker = client.track_devices().await.unwrap();
    assert!(matches!(
        tracker.next_event().await.unwrap(),
        DeviceEvent::Add(_)
    ));
    assert!(matches!(
        tracker.next_event().await.unwrap(),
        DeviceEvent::ChangeSet(_)
    ));
    match tracker.next_event().await.unwrap() {
        DeviceEvent::Error(e) => assert_eq!(e.error_code(), "CONNECTION_FAILED"),
        other => panic!("expected Error, got {:?}", other),
    }
    assert!(tracker.next_event().await.is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn test_truncated_snapshot_payload_emits_error() {
    let (client, listener) = test_client().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_tracker(&mut stream).await;
        // 声明了0x20字节载荷但只发出一部分就断开
        stream.write_all(b"0020serial1\tdev").await.unwrap();
    });

    let mut tracker = client.track_devices().await.unwrap();
    match tracker.next_event().await.unwrap() {
        DeviceEvent::Error(e) => assert_eq!(e.error_code(), "CONNECTION_FAILED"),
        other => panic!("expected Error, got {:?}", other),
    }
    assert!(tracker.next_event().await.is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn test_malformed_snapshot_emits_error_once() {
    let (client, listener) = test_client().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_tracker(&mut stream).await;
        write_snapshot(&mut stream, "loneserial\n").await;
        // 解析失败后跟踪器应当停止
    });

    let mut tracker = client.track_devices().await.unwrap();
    match tracker.next_event().await.unwrap() {
        DeviceEvent::Error(e) => assert_eq!(e.error_code(), "PARSE_ERROR"),
        other => panic!("expected Error, got {:?}", other),
    }
    assert!(tracker.next_event().await.is_none());
    server.await.unwrap();
}
