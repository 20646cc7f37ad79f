use async_trait::async_trait;
use log::error;

use crate::errors::{AdbError, AdbResult};
use crate::protocols::AdbProtocol;

/// SYNC子协议单个DATA块的最大载荷（ADB限制）
pub const SYNC_DATA_MAX: usize = 64 * 1024;

/// SYNC子协议的4字节标识字。
///
/// `sync:`切换后，连接上的请求与响应都采用
/// 标识字 + 小端u32长度 + 载荷 的帧格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    Stat,
    List,
    Send,
    Recv,
    Dent,
    Data,
    Done,
    Okay,
    Fail,
    Quit,
}

impl SyncCommand {
    pub fn code(&self) -> &'static [u8; 4] {
        match self {
            SyncCommand::Stat => b"STAT",
            SyncCommand::List => b"LIST",
            SyncCommand::Send => b"SEND",
            SyncCommand::Recv => b"RECV",
            SyncCommand::Dent => b"DENT",
            SyncCommand::Data => b"DATA",
            SyncCommand::Done => b"DONE",
            SyncCommand::Okay => b"OKAY",
            SyncCommand::Fail => b"FAIL",
            SyncCommand::Quit => b"QUIT",
        }
    }

    /// 从4字节识别标识字；未知标识返回None。
    pub fn from_code(data: &[u8]) -> Option<SyncCommand> {
        match data {
            b"STAT" => Some(SyncCommand::Stat),
            b"LIST" => Some(SyncCommand::List),
            b"SEND" => Some(SyncCommand::Send),
            b"RECV" => Some(SyncCommand::Recv),
            b"DENT" => Some(SyncCommand::Dent),
            b"DATA" => Some(SyncCommand::Data),
            b"DONE" => Some(SyncCommand::Done),
            b"OKAY" => Some(SyncCommand::Okay),
            b"FAIL" => Some(SyncCommand::Fail),
            b"QUIT" => Some(SyncCommand::Quit),
            _ => None,
        }
    }
}

/// SYNC帧读写接口，叠加在已切换到`sync:`模式的连接之上。
#[async_trait]
pub trait SyncProtocol: AdbProtocol {
    /// 发送一个带载荷的SYNC请求：标识字 + 小端长度 + 载荷。
    ///
    /// # 参数
    /// - `command`: SYNC标识字。
    /// - `payload`: 请求载荷（路径等）。
    async fn send_sync_request(&mut self, command: SyncCommand, payload: &[u8]) -> AdbResult<()> {
        let mut data = Vec::with_capacity(8 + payload.len());
        data.extend_from_slice(command.code());
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(payload);
        self.send(&data).await
    }

    /// 发送一个长度字段承载数值的SYNC帧（DONE的mtime等）。
    async fn send_sync_value(&mut self, command: SyncCommand, value: u32) -> AdbResult<()> {
        let mut data = Vec::with_capacity(8);
        data.extend_from_slice(command.code());
        data.extend_from_slice(&value.to_le_bytes());
        self.send(&data).await
    }

    /// 读取下一个SYNC标识字。
    async fn read_sync_command(&mut self) -> AdbResult<SyncCommand> {
        let data = self.recv_exact(4).await?;
        SyncCommand::from_code(&data).ok_or_else(|| {
            AdbError::protocol(format!(
                "unknown sync id {:?}",
                String::from_utf8_lossy(&data)
            ))
        })
    }

    /// 读取FAIL帧的错误信息（小端长度 + UTF-8文本）并返回错误。
    async fn read_sync_fail(&mut self) -> AdbError {
        match AdbProtocol::read_u32_le(self).await {
            Ok(len) => match self.recv_exact(len as usize).await {
                Ok(data) => {
                    let message = String::from_utf8_lossy(&data).to_string();
                    error!("Sync FAIL >>> {:#?}", &message);
                    AdbError::remote(message)
                }
                Err(e) => e,
            },
            Err(e) => e,
        }
    }
}

#[async_trait]
impl<T> SyncProtocol for T where T: AdbProtocol {}
