use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use log::info;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::beans::{parse_file_entry, parse_file_stat, FileEntry, FileStat};
use crate::client::adb_connection::AdbConnection;
use crate::client::cancel::{wait_cancelled, CancelHandle};
use crate::errors::{AdbError, AdbResult};
use crate::protocols::{AdbProtocol, SyncCommand, SyncProtocol, SYNC_DATA_MAX};

/// 每次拉取在途的最大块数，塞满后暂停从传输读取（背压）
const PULL_CHANNEL_CAPACITY: usize = 8;

/// `sync:`切换后的文件传输会话。
///
/// stat/list是短命令，可在同一会话上连续发起；push/pull把
/// 会话的所有权交给传输任务，结束或取消后需重新打开会话。
pub struct AdbSync {
    conn: AdbConnection,
}

impl AdbSync {
    pub(crate) fn new(conn: AdbConnection) -> Self {
        Self { conn }
    }

    /// STAT一个远端路径。
    ///
    /// mode为0表示路径不存在；此时返回的stat各谓词均为false。
    pub async fn stat(&mut self, path: &str) -> AdbResult<FileStat> {
        self.conn
            .send_sync_request(SyncCommand::Stat, path.as_bytes())
            .await?;
        match self.conn.read_sync_command().await? {
            SyncCommand::Stat => {
                let data = self.conn.recv_exact(12).await?;
                parse_file_stat(&data, path)
            }
            SyncCommand::Fail => Err(self.conn.read_sync_fail().await),
            other => Err(AdbError::protocol(format!(
                "unexpected sync response {:?} to STAT",
                other
            ))),
        }
    }

    /// 列出远端目录。`.`与`..`被过滤。
    pub async fn list(&mut self, path: &str) -> AdbResult<Vec<FileEntry>> {
        self.conn
            .send_sync_request(SyncCommand::List, path.as_bytes())
            .await?;
        let mut entries = vec![];
        loop {
            match self.conn.read_sync_command().await? {
                SyncCommand::Dent => {
                    let header = self.conn.recv_exact(16).await?;
                    let name_len =
                        u32::from_le_bytes(header[12..16].try_into().unwrap()) as usize;
                    let name_bytes = self.conn.recv_exact(name_len).await?;
                    let name = String::from_utf8_lossy(&name_bytes).to_string();
                    if name == "." || name == ".." {
                        continue;
                    }
                    entries.push(parse_file_entry(&header[0..12], name)?);
                }
                SyncCommand::Done => {
                    // DONE载荷忽略
                    let _ = AdbProtocol::read_u32_le(&mut self.conn).await?;
                    break;
                }
                SyncCommand::Fail => return Err(self.conn.read_sync_fail().await),
                other => {
                    return Err(AdbError::protocol(format!(
                        "unexpected sync response {:?} to LIST",
                        other
                    )))
                }
            }
        }
        Ok(entries)
    }

    /// 开始拉取一个远端文件，返回分块交付的传输句柄。
    pub fn pull(self, path: &str) -> PullTransfer {
        PullTransfer::spawn(self.conn, path.to_string())
    }

    /// 开始推送数据到远端路径。
    ///
    /// # 参数
    /// - `source`: 数据来源。
    /// - `path`: 远端路径。
    /// - `mode`: 远端文件权限位。
    /// - `mtime`: 远端记录的修改时间（Unix秒）。
    pub fn push<R>(self, source: R, path: &str, mode: u32, mtime: u32) -> PushTransfer
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        PushTransfer::spawn(self.conn, source, path.to_string(), mode, mtime)
    }

    /// 发送QUIT并关闭会话。
    pub async fn quit(mut self) -> AdbResult<()> {
        self.conn
            .send_sync_request(SyncCommand::Quit, b"")
            .await?;
        Ok(())
    }
}

/// 拉取传输句柄。
///
/// 块按到达顺序经由有界通道交付；`bytes_transferred`在块
/// 交付前累加。取消后传输关闭，通道里出现一个`Cancelled`。
pub struct PullTransfer {
    rx: mpsc::Receiver<AdbResult<Bytes>>,
    transferred: Arc<AtomicU64>,
    cancel: CancelHandle,
}

impl PullTransfer {
    fn spawn(conn: AdbConnection, path: String) -> Self {
        let (tx, rx) = mpsc::channel(PULL_CHANNEL_CAPACITY);
        let transferred = Arc::new(AtomicU64::new(0));
        let cancel = CancelHandle::new();
        let task_transferred = transferred.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            pull_loop(conn, path, tx, task_transferred, task_cancel).await;
        });
        Self {
            rx,
            transferred,
            cancel,
        }
    }

    /// 下一个数据块；传输结束后返回None。
    pub async fn next_chunk(&mut self) -> Option<AdbResult<Bytes>> {
        self.rx.recv().await
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.transferred.load(Ordering::SeqCst)
    }

    /// 取消传输并关闭底层传输。幂等。
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// 把全部内容收进内存
    pub async fn read_to_end(mut self) -> AdbResult<Vec<u8>> {
        let mut content = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            content.extend_from_slice(&chunk?);
        }
        Ok(content)
    }

    /// 把全部内容写入一个异步sink，返回写入的字节数
    pub async fn write_to<W>(mut self, sink: &mut W) -> AdbResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.next_chunk().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }
}

async fn pull_loop(
    mut conn: AdbConnection,
    path: String,
    tx: mpsc::Sender<AdbResult<Bytes>>,
    transferred: Arc<AtomicU64>,
    cancel: CancelHandle,
) {
    let mut cancel_rx = cancel.subscribe();
    let inner = async {
        conn.send_sync_request(SyncCommand::Recv, path.as_bytes())
            .await?;
        loop {
            match conn.read_sync_command().await? {
                SyncCommand::Data => {
                    let len = AdbProtocol::read_u32_le(&mut conn).await? as usize;
                    if len > SYNC_DATA_MAX {
                        return Err(AdbError::protocol(format!(
                            "oversized DATA chunk: {} bytes",
                            len
                        )));
                    }
                    let data = conn.recv_exact(len).await?;
                    // 进度先于数据交付
                    transferred.fetch_add(len as u64, Ordering::SeqCst);
                    if tx.send(Ok(Bytes::from(data))).await.is_err() {
                        // 消费方放弃
                        return Ok(());
                    }
                }
                SyncCommand::Done => {
                    let _ = AdbProtocol::read_u32_le(&mut conn).await?;
                    let _ = conn.send_sync_request(SyncCommand::Quit, b"").await;
                    info!("Pull Finished <{:#?}>", &path);
                    return Ok(());
                }
                SyncCommand::Fail => return Err(conn.read_sync_fail().await),
                other => {
                    return Err(AdbError::protocol(format!(
                        "unexpected sync response {:?} to RECV",
                        other
                    )))
                }
            }
        }
    };
    tokio::select! {
        _ = wait_cancelled(&mut cancel_rx) => {
            let _ = tx.send(Err(AdbError::Cancelled)).await;
        }
        result = inner => {
            if let Err(e) = result {
                let _ = tx.send(Err(e)).await;
            }
        }
    }
}

/// 推送传输句柄。
///
/// 写入任务在后台消费数据源；`wait()`返回最终结果。取消后
/// 远端可能留下写了一半的文件，这是对外可见的行为。
pub struct PushTransfer {
    transferred: Arc<AtomicU64>,
    cancel: CancelHandle,
    task: Option<JoinHandle<AdbResult<()>>>,
}

impl PushTransfer {
    fn spawn<R>(conn: AdbConnection, source: R, path: String, mode: u32, mtime: u32) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let transferred = Arc::new(AtomicU64::new(0));
        let cancel = CancelHandle::new();
        let task_transferred = transferred.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            push_loop(conn, source, path, mode, mtime, task_transferred, task_cancel).await
        });
        Self {
            transferred,
            cancel,
            task: Some(task),
        }
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.transferred.load(Ordering::SeqCst)
    }

    /// 取消传输并关闭底层传输。幂等。
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// 等待推送完成。只可等待一次。
    pub async fn wait(&mut self) -> AdbResult<()> {
        match self.task.take() {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => Err(AdbError::connection_failed(format!(
                    "push task aborted: {}",
                    e
                ))),
            },
            None => Err(AdbError::protocol("push transfer already awaited")),
        }
    }
}

async fn push_loop<R>(
    mut conn: AdbConnection,
    mut source: R,
    path: String,
    mode: u32,
    mtime: u32,
    transferred: Arc<AtomicU64>,
    cancel: CancelHandle,
) -> AdbResult<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut cancel_rx = cancel.subscribe();
    let inner = async {
        let request = format!("{},{}", path, mode);
        conn.send_sync_request(SyncCommand::Send, request.as_bytes())
            .await?;
        let mut buf = vec![0u8; SYNC_DATA_MAX];
        loop {
            let n = source.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            conn.send_sync_request(SyncCommand::Data, &buf[..n]).await?;
            // 进度在成功写出之后累加
            transferred.fetch_add(n as u64, Ordering::SeqCst);
        }
        conn.send_sync_value(SyncCommand::Done, mtime).await?;
        match conn.read_sync_command().await? {
            SyncCommand::Okay => {
                let _ = AdbProtocol::read_u32_le(&mut conn).await?;
                let _ = conn.send_sync_request(SyncCommand::Quit, b"").await;
                info!("Push Finished <{:#?}>", &path);
                Ok(())
            }
            SyncCommand::Fail => Err(conn.read_sync_fail().await),
            other => Err(AdbError::protocol(format!(
                "unexpected sync response {:?} to SEND",
                other
            ))),
        }
    };
    tokio::select! {
        _ = wait_cancelled(&mut cancel_rx) => Err(AdbError::Cancelled),
        result = inner => result,
    }
}
