use std::sync::Arc;

use tokio::sync::watch;

/// 可克隆的取消句柄。
///
/// 每个可取消的操作（传输、跟踪器、开机等待）持有一个句柄；
/// 任意克隆上调用`cancel()`会让该操作在下一个挂起点以
/// `Cancelled`失败并关闭所属传输。取消是幂等的。
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// 发出取消信号
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// 订阅取消信号，配合`tokio::select!`中断挂起的IO
    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// 等待取消信号变为`true`。
///
/// 等价于`rx.wait_for(|c| *c)`，但不在`.await`点跨越持有
/// `watch::Ref`，以便在`tokio::select!`中保持future为`Send`。
pub(crate) async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}
