use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::net::TcpStream;

use crate::beans::FramebufferMeta;
use crate::errors::AdbResult;

/// `framebuffer:`服务返回的原始像素流。
///
/// 头部已解析为元数据；socket上剩余的恰好是`meta.size`个
/// 字节的像素数据，按需读取，不整体缓冲。图像格式转换由
/// 外部工具完成。
pub struct Framebuffer {
    pub meta: FramebufferMeta,
    stream: TcpStream,
}

impl Framebuffer {
    pub(crate) fn new(meta: FramebufferMeta, stream: TcpStream) -> Self {
        Self { meta, stream }
    }

    /// 把整幅图像读进内存（小图方便用）
    pub async fn read_to_vec(mut self) -> AdbResult<Vec<u8>> {
        let mut pixels = vec![0u8; self.meta.size as usize];
        self.stream.read_exact(&mut pixels).await?;
        Ok(pixels)
    }
}

impl AsyncRead for Framebuffer {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_read(cx, buf)
    }
}
