use log::error;
use tokio::sync::mpsc;

use crate::beans::{
    diff_device_sets, parse_device_list, to_device_set, AdbDeviceInfo, DeviceChange, DeviceDiff,
    DeviceSet,
};
use crate::client::adb_connection::AdbConnection;
use crate::client::cancel::{wait_cancelled, CancelHandle};
use crate::errors::{AdbError, AdbResult};
use crate::protocols::AdbProtocol;

/// 设备跟踪器发出的事件。
///
/// 单个快照内先按diff顺序发出逐设备事件，再发出一个
/// `ChangeSet`聚合事件。流正常结束发`End`；出错发一次
/// `Error`后停止。
#[derive(Debug)]
pub enum DeviceEvent {
    Add(AdbDeviceInfo),
    Remove(AdbDeviceInfo),
    Change(DeviceChange),
    ChangeSet(DeviceDiff),
    End,
    Error(AdbError),
}

/// `host:track-devices`的长连接消费者。
///
/// 第一个快照与空集合做diff，因此启动时已在线的设备都会
/// 以`Add`事件报告。
pub struct DeviceTracker {
    rx: mpsc::Receiver<DeviceEvent>,
    cancel: CancelHandle,
}

impl DeviceTracker {
    pub(crate) fn spawn(conn: AdbConnection) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let cancel = CancelHandle::new();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            track_loop(conn, tx, task_cancel).await;
        });
        Self { rx, cancel }
    }

    /// 等待下一个事件；跟踪器停止后返回None。
    pub async fn next_event(&mut self) -> Option<DeviceEvent> {
        self.rx.recv().await
    }

    /// 关闭传输并抑制后续事件。幂等。
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

async fn track_loop(
    mut conn: AdbConnection,
    tx: mpsc::Sender<DeviceEvent>,
    cancel: CancelHandle,
) {
    let mut cancel_rx = cancel.subscribe();
    let mut previous = DeviceSet::new();

    loop {
        let snapshot = tokio::select! {
            _ = wait_cancelled(&mut cancel_rx) => return,
            r = conn.read_string_block_or_end() => r,
        };
        // 只有帧边界上的干净关闭算正常结束；半帧断开与解析失败都是错误
        let result: AdbResult<Option<DeviceSet>> = snapshot.and_then(|opt| match opt {
            Some(text) => Ok(Some(to_device_set(parse_device_list(&text)?))),
            None => Ok(None),
        });
        match result {
            Ok(None) => {
                let _ = tx.send(DeviceEvent::End).await;
                return;
            }
            Ok(Some(current)) => {
                let diff = diff_device_sets(&previous, &current);
                for device in &diff.added {
                    if tx.send(DeviceEvent::Add(device.clone())).await.is_err() {
                        return;
                    }
                }
                for device in &diff.removed {
                    if tx.send(DeviceEvent::Remove(device.clone())).await.is_err() {
                        return;
                    }
                }
                for change in &diff.changed {
                    if tx.send(DeviceEvent::Change(change.clone())).await.is_err() {
                        return;
                    }
                }
                if tx.send(DeviceEvent::ChangeSet(diff)).await.is_err() {
                    return;
                }
                previous = current;
            }
            Err(e) => {
                error!("Device tracker stopped >>> {:#?}", &e);
                let _ = tx.send(DeviceEvent::Error(e)).await;
                return;
            }
        }
    }
}
