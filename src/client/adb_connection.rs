use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::connections::AdbSocketConfig;
use crate::errors::{AdbError, AdbResult};
use crate::protocols::{AdbProtocol, AdbRespStatus};

/// AdbConnection 结构体定义了与 ADB 服务器的一次连接。
///
/// 每条命令独占一个连接；返回值式命令读完即弃，流式命令通过
/// `into_inner`把底层字节流整体移交给调用方。
pub struct AdbConnection {
    pub(crate) stream: TcpStream, // TCP 流，用于与 ADB 服务器进行通信。
    pub config: AdbSocketConfig,  // ADB 连接配置，包含地址与adb可执行文件路径。
}

impl AdbConnection {
    /// 按配置建立一个新连接。
    ///
    /// # 参数
    /// - `config`: ADB服务器连接配置。
    ///
    /// # 返回值
    /// 返回建立好的 AdbConnection 实例，如果无法建立连接，则返回错误。
    pub async fn connect(config: AdbSocketConfig) -> AdbResult<Self> {
        let stream = config.safe_connect().await?;
        Ok(Self { stream, config })
    }

    /// 放弃连接所有权，取回底层字节流（socket模式切换后的移交）。
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }

    /// 读取可选的第二个状态字。
    ///
    /// `host:forward`在部分服务器版本上回复两个OKAY，在另一些
    /// 版本上只回复一个就关闭连接；两种都接受。
    pub async fn check_optional_okay(&mut self) -> AdbResult<()> {
        match self.recv_exact(4).await {
            Ok(data) => match AdbRespStatus::from_bytes(&data) {
                AdbRespStatus::OKAY => Ok(()),
                AdbRespStatus::FAIL => {
                    let message = self.read_string_block().await?;
                    Err(AdbError::remote(message))
                }
                AdbRespStatus::UNKNOWN => Err(AdbError::protocol(format!(
                    "unexpected status word {:?}",
                    String::from_utf8_lossy(&data)
                ))),
            },
            // 对端直接关闭：单OKAY的服务器
            Err(AdbError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl AsyncRead for AdbConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for AdbConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().stream).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_shutdown(cx)
    }
}
