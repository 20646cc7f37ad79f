use async_trait::async_trait;
use log::{error, info};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::errors::{AdbError, AdbResult};
use crate::protocols::AdbRespStatus;

/// 单个请求载荷的最大字节数（4位十六进制长度前缀的上限）
pub const MAX_REQUEST_LEN: usize = 0xFFFF;

/// AdbProtocol trait定义了ADB主机协议的帧读写接口。
///
/// 所有方法都是对底层字节流的纯粹封装，任何实现了异步读写的
/// 类型（TcpStream、内存双工流等）都自动获得该接口。
#[async_trait]
pub trait AdbProtocol: AsyncReadExt + AsyncWriteExt + Unpin + Send {
    /// 发送数据到服务器。
    ///
    /// # 参数
    /// - `data`: 要发送的数据切片。
    ///
    /// # 返回值
    /// - 成功返回()，失败返回错误。
    async fn send(&mut self, data: &[u8]) -> AdbResult<()> {
        info!(">>>>>>> Send Size: {:#?} >>>>>>>", data.len());
        self.write_all(data).await?;
        Ok(())
    }

    /// 从服务器接收指定数量的数据。
    ///
    /// # 参数
    /// - `n`: 要接收的数据大小。
    ///
    /// # 返回值
    /// - 成功返回接收到的数据，失败返回错误。
    async fn recv_exact(&mut self, n: usize) -> AdbResult<Vec<u8>> {
        let mut target = vec![0u8; n];
        self.read_exact(&mut target).await?;
        info!("<<<<<<< Recv Size: {:#?} <<<<<<<", n);
        Ok(target)
    }

    /// 发送命令帧：4位十六进制长度前缀 + 载荷。
    ///
    /// # 参数
    /// - `command`: 要发送的命令字符串。
    ///
    /// # 返回值
    /// - 成功返回()，失败返回错误。载荷超过0xFFFF字节时返回协议错误。
    async fn send_command(&mut self, command: &str) -> AdbResult<()> {
        info!("Send COMMAND: <{:#?}>", command);
        let cmd_bytes = command.as_bytes();
        if cmd_bytes.len() > MAX_REQUEST_LEN {
            return Err(AdbError::protocol(format!(
                "request payload too long: {} bytes",
                cmd_bytes.len()
            )));
        }
        let length = format!("{:04x}", cmd_bytes.len());
        let mut data = Vec::with_capacity(length.len() + cmd_bytes.len());
        data.extend_from_slice(length.as_bytes());
        data.extend_from_slice(cmd_bytes);
        self.send(&data).await
    }

    /// 读取指定大小的字符串。
    ///
    /// # 参数
    /// - `size`: 字符串的字节大小。
    ///
    /// # 返回值
    /// - 成功返回读取的字符串，失败返回错误。
    async fn read_string(&mut self, size: usize) -> AdbResult<String> {
        let data = self.recv_exact(size).await?;
        Ok(String::from_utf8_lossy(&data).to_string())
    }

    /// 读取4位十六进制长度前缀。
    ///
    /// # 返回值
    /// - 成功返回解析后的长度，非十六进制字符返回协议错误。
    async fn read_hex_length(&mut self) -> AdbResult<usize> {
        let data = self.recv_exact(4).await?;
        let text = std::str::from_utf8(&data)
            .map_err(|_| AdbError::protocol("length prefix is not ASCII"))?;
        usize::from_str_radix(text, 16)
            .map_err(|_| AdbError::protocol(format!("invalid hex length prefix {:?}", text)))
    }

    /// 读取一个字符串块，以十六进制长度前缀开始。
    ///
    /// # 返回值
    /// - 成功返回读取的字符串，失败返回错误。
    async fn read_string_block(&mut self) -> AdbResult<String> {
        let string_size = self.read_hex_length().await?;
        self.read_string(string_size).await
    }

    /// 接收指定数量的数据，区分干净关闭与半途断开。
    ///
    /// 对端在尚未读到任何字节时关闭返回None；已读到部分字节后
    /// 断开按连接错误处理。
    async fn recv_exact_or_eof(&mut self, n: usize) -> AdbResult<Option<Vec<u8>>> {
        let mut target = vec![0u8; n];
        let mut filled = 0usize;
        while filled < n {
            let count = self.read(&mut target[filled..]).await?;
            if count == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(AdbError::connection_failed(format!(
                    "connection closed after {} of {} bytes",
                    filled, n
                )));
            }
            filled += count;
        }
        Ok(Some(target))
    }

    /// 读取一个字符串块；流在帧边界干净关闭时返回None。
    ///
    /// 长度前缀或载荷读到一半断开不算干净结束，按错误返回。
    async fn read_string_block_or_end(&mut self) -> AdbResult<Option<String>> {
        let prefix = match self.recv_exact_or_eof(4).await? {
            Some(data) => data,
            None => return Ok(None),
        };
        let text = std::str::from_utf8(&prefix)
            .map_err(|_| AdbError::protocol("length prefix is not ASCII"))?;
        let string_size = usize::from_str_radix(text, 16)
            .map_err(|_| AdbError::protocol(format!("invalid hex length prefix {:?}", text)))?;
        match self.recv_exact_or_eof(string_size).await? {
            Some(data) => Ok(Some(String::from_utf8_lossy(&data).to_string())),
            None => Err(AdbError::connection_failed(format!(
                "connection closed before {} payload bytes",
                string_size
            ))),
        }
    }

    /// 读取直到对端关闭连接的全部内容。
    ///
    /// # 返回值
    /// - 成功返回读取的全部字节，失败返回错误。
    async fn read_until_close(&mut self) -> AdbResult<Vec<u8>> {
        let mut content = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            content.extend_from_slice(&buf[..n]);
        }
        Ok(content)
    }

    /// 读取一个小端u32。
    async fn read_u32_le(&mut self) -> AdbResult<u32> {
        let data = self.recv_exact(4).await?;
        Ok(u32::from_le_bytes(data.try_into().unwrap()))
    }

    /// 检查服务器返回是否为"OKAY"。
    ///
    /// FAIL后面跟着带十六进制长度前缀的错误信息；其余状态字视为协议错误。
    ///
    /// # 返回值
    /// - 成功返回()，表示检查通过，失败返回错误。
    async fn check_okay(&mut self) -> AdbResult<()> {
        let data = self.recv_exact(4).await?;
        info!("Check Okay Response >>> {:#?}", String::from_utf8_lossy(&data));
        match AdbRespStatus::from_bytes(&data) {
            AdbRespStatus::OKAY => Ok(()),
            AdbRespStatus::FAIL => {
                let message = self.read_string_block().await?;
                error!("Server FAIL >>> {:#?}", &message);
                Err(AdbError::remote(message))
            }
            AdbRespStatus::UNKNOWN => Err(AdbError::protocol(format!(
                "unexpected status word {:?}",
                String::from_utf8_lossy(&data)
            ))),
        }
    }

    async fn send_cmd_then_check_okay(&mut self, command: &str) -> AdbResult<()> {
        self.send_command(command).await?;
        self.check_okay().await?;
        Ok(())
    }
}

#[async_trait]
impl<T> AdbProtocol for T where T: AsyncReadExt + AsyncWriteExt + Unpin + Send {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_command_framing() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.send_command("host:version").await.unwrap();
        let mut buf = vec![0u8; 16];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"000chost:version");
    }

    #[tokio::test]
    async fn test_send_command_empty_payload() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.send_command("").await.unwrap();
        let mut buf = vec![0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"0000");
    }

    #[tokio::test]
    async fn test_send_command_rejects_oversized_payload() {
        let (mut client, _server) = tokio::io::duplex(256);
        let huge = "x".repeat(MAX_REQUEST_LEN + 1);
        let err = client.send_command(&huge).await.unwrap_err();
        assert_eq!(err.error_code(), "PROTOCOL_ERROR");
    }

    #[tokio::test]
    async fn test_send_command_accepts_max_payload() {
        let (mut client, mut server) = tokio::io::duplex(128 * 1024);
        let max = "x".repeat(MAX_REQUEST_LEN);
        client.send_command(&max).await.unwrap();
        let mut buf = vec![0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ffff");
    }

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(256 * 1024);
        let max = "y".repeat(MAX_REQUEST_LEN);
        for payload in ["", "x", max.as_str()] {
            a.send_command(payload).await.unwrap();
            let got = b.read_string_block().await.unwrap();
            assert_eq!(got, payload);
        }
    }

    #[tokio::test]
    async fn test_check_okay_success() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"OKAY").await.unwrap();
        client.check_okay().await.unwrap();
    }

    #[tokio::test]
    async fn test_check_okay_fail_with_message() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let msg = b"device 'abc' not found";
        server.write_all(b"FAIL").await.unwrap();
        server
            .write_all(format!("{:04x}", msg.len()).as_bytes())
            .await
            .unwrap();
        server.write_all(msg).await.unwrap();
        let err = client.check_okay().await.unwrap_err();
        assert_eq!(err.error_code(), "REMOTE_ERROR");
        assert!(format!("{}", err).contains("not found"));
    }

    #[tokio::test]
    async fn test_check_okay_unauthorized_fail() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let msg = b"device unauthorized.";
        server.write_all(b"FAIL").await.unwrap();
        server
            .write_all(format!("{:04x}", msg.len()).as_bytes())
            .await
            .unwrap();
        server.write_all(msg).await.unwrap();
        let err = client.check_okay().await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_check_okay_garbage_status() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"WHAT").await.unwrap();
        let err = client.check_okay().await.unwrap_err();
        assert_eq!(err.error_code(), "PROTOCOL_ERROR");
    }

    #[tokio::test]
    async fn test_read_string_block_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"00040031").await.unwrap();
        let block = client.read_string_block().await.unwrap();
        assert_eq!(block, "0031");
    }

    #[tokio::test]
    async fn test_read_hex_length_rejects_garbage() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"zzzz").await.unwrap();
        let err = client.read_hex_length().await.unwrap_err();
        assert_eq!(err.error_code(), "PROTOCOL_ERROR");
    }

    #[tokio::test]
    async fn test_read_until_close() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"hi\n").await.unwrap();
        drop(server);
        let content = client.read_until_close().await.unwrap();
        assert_eq!(content, b"hi\n");
    }

    #[tokio::test]
    async fn test_read_string_block_or_end_clean_eof() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"0002hi").await.unwrap();
        drop(server);
        assert_eq!(
            client.read_string_block_or_end().await.unwrap(),
            Some("hi".to_string())
        );
        // 帧边界上的关闭是干净结束
        assert_eq!(client.read_string_block_or_end().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_string_block_or_end_truncated_prefix() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"00").await.unwrap();
        drop(server);
        let err = client.read_string_block_or_end().await.unwrap_err();
        assert_eq!(err.error_code(), "CONNECTION_FAILED");
    }

    #[tokio::test]
    async fn test_read_string_block_or_end_truncated_payload() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"0005ab").await.unwrap();
        drop(server);
        let err = client.read_string_block_or_end().await.unwrap_err();
        assert_eq!(err.error_code(), "CONNECTION_FAILED");
    }

    #[tokio::test]
    async fn test_read_string_block_or_end_empty_block() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"0000").await.unwrap();
        assert_eq!(
            client.read_string_block_or_end().await.unwrap(),
            Some(String::new())
        );
    }
}
