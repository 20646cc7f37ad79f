use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{error, info};
use tokio::net::TcpStream;
use tokio::process::Command;

use crate::errors::{AdbError, AdbResult};
use crate::utils::adb_path;

pub const DEFAULT_ADB_HOST: &str = "127.0.0.1";
pub const DEFAULT_ADB_PORT: u16 = 5037;
pub const DEFAULT_ADB_BIN: &str = "adb";

///
/// Adb Socket相关配置
/// host: adb server 地址, 默认值 127.0.0.1
/// port: adb server 端口, 默认值 5037
/// bin: 本机adb可执行文件, 首次连接被拒时用于启动服务器
#[derive(Clone, Debug)]
pub struct AdbSocketConfig {
    pub host: String,
    pub port: u16,
    pub bin: PathBuf,
}

///
/// AdbSocketConfig 默认配置
impl Default for AdbSocketConfig {
    fn default() -> Self {
        AdbSocketConfig {
            host: DEFAULT_ADB_HOST.to_string(),
            port: DEFAULT_ADB_PORT,
            bin: PathBuf::from(DEFAULT_ADB_BIN),
        }
    }
}

impl AdbSocketConfig {
    /// 创建一个新的配置。
    ///
    /// # 参数
    /// - `host`: ADB服务器地址。
    /// - `port`: ADB服务器端口。
    ///
    /// # 返回值
    /// 返回配置好的AdbSocketConfig
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            bin: PathBuf::from(DEFAULT_ADB_BIN),
        }
    }

    ///
    /// 指定adb可执行文件路径
    pub fn with_bin<P: Into<PathBuf>>(mut self, bin: P) -> Self {
        self.bin = bin.into();
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    // 服务器自动拉起只对本机地址生效
    fn is_local(&self) -> bool {
        self.host == "localhost" || self.host == "127.0.0.1"
    }

    ///
    /// 使用配置连接到Adb Server
    /// 本方法不做服务器拉起, 请使用safe_connect
    pub async fn create_socket(&self) -> std::io::Result<TcpStream> {
        TcpStream::connect(self.addr()).await
    }

    /// 安全尝试连接到ADB服务器。
    ///
    /// 首次连接被拒绝且目标是本机时，执行一次`<bin> start-server`
    /// 后重试；其他错误立即返回。
    ///
    /// # 返回值
    /// 成功时返回连接好的TCP流，失败时返回连接错误。
    pub async fn safe_connect(&self) -> AdbResult<TcpStream> {
        match self.create_socket().await {
            Ok(stream) => Ok(stream),
            Err(e) if e.kind() == ErrorKind::ConnectionRefused && self.is_local() => {
                error!(
                    "Connect To Adb Failed, Try To Start Adb Server >>> {:#?}",
                    e
                );
                self.start_server().await?;
                self.create_socket().await.map_err(|e| {
                    AdbError::connection_failed(format!(
                        "connect to {} failed after starting server: {}",
                        self.addr(),
                        e
                    ))
                })
            }
            Err(e) => Err(AdbError::connection_failed(format!(
                "connect to {} failed: {}",
                self.addr(),
                e
            ))),
        }
    }

    /// 执行`adb start-server`并等待其退出。
    pub async fn start_server(&self) -> AdbResult<()> {
        let bin = if self.bin == Path::new(DEFAULT_ADB_BIN) {
            adb_path().unwrap_or_else(|_| self.bin.clone())
        } else {
            self.bin.clone()
        };
        info!("Starting adb server via {:?}", &bin);
        let status = Command::new(&bin)
            .arg("start-server")
            .status()
            .await
            .map_err(|e| {
                AdbError::connection_failed(format!("failed to run {:?} start-server: {}", bin, e))
            })?;
        if !status.success() {
            return Err(AdbError::connection_failed(format!(
                "{:?} start-server exited with {}",
                bin, status
            )));
        }
        Ok(())
    }
}
