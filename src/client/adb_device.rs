use std::collections::HashMap;
use std::time::Duration;

use log::info;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;

use crate::beans::command::AdbCommand;
use crate::beans::framebuffer::{FramebufferMeta, FRAMEBUFFER_V1_WORDS, FRAMEBUFFER_V2_WORDS};
use crate::beans::intent::Intent;
use crate::beans::net_info::NetworkType;
use crate::beans::package_info::{
    check_activity_output, is_boot_completed, parse_features, parse_is_installed, parse_packages,
    parse_properties, FeatureValue,
};
use crate::beans::{parse_forward_list, FileEntry, FileStat, ForwardItem};
use crate::client::adb_connection::AdbConnection;
use crate::client::cancel::{wait_cancelled, CancelHandle};
use crate::client::framebuffer::Framebuffer;
use crate::client::sync::{AdbSync, PullTransfer, PushTransfer};
use crate::connections::AdbSocketConfig;
use crate::errors::{AdbError, AdbResult};
use crate::protocols::AdbProtocol;
use crate::utils::get_free_port;

/// 等待开机完成时两次探测之间的间隔
const BOOT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// AdbDevice结构体定义了一个ADB设备的基本信息。
///
/// 设备上的每个操作都在新连接上先用`host:transport:<serial>`
/// 绑定设备，再发起具体服务请求。
#[derive(Debug, Clone)]
pub struct AdbDevice {
    pub serial: String,          // 设备的序列号，唯一标识一个设备。
    pub config: AdbSocketConfig, // ADB连接配置信息。
}

impl AdbDevice {
    /// 创建一个新的ADB设备实例。
    ///
    /// # 参数
    /// - `serial`: 设备的序列号，作为一个唯一标识符。
    /// - `cfg`: AdbSocketConfig结构体，包含连接配置信息。
    ///
    /// # 返回值
    /// 返回一个初始化好的AdbDevice结构体实例。
    pub fn new_device(serial: &str, cfg: AdbSocketConfig) -> Self {
        Self {
            serial: serial.to_string(),
            config: cfg,
        }
    }

    /// 创建一个具有默认配置的新的ADB设备实例。
    pub fn new_device_default(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            config: AdbSocketConfig::default(),
        }
    }

    /// 获取与ADB服务器的连接。
    pub async fn get_connection(&self) -> AdbResult<AdbConnection> {
        AdbConnection::connect(self.config.clone()).await
    }

    /// 构造打开设备传输的请求前缀。
    ///
    /// 提供命令时格式为`host-serial:<serial>:<command>`（命令由
    /// 服务器代答，不切换传输）；不提供时为`host:transport:<serial>`，
    /// 成功后连接绑定到设备。
    pub fn get_open_transport_prefix(&self, command: Option<&str>) -> String {
        match command {
            Some(command) => format!("host-serial:{}:{}", self.serial, command),
            None => format!("host:transport:{}", self.serial),
        }
    }

    /// 打开一个Adb连接，通过给定的命令选项配置传输前缀。
    ///
    /// - `command`：可选的命令字符串，用于配置传输前缀。
    /// - 返回值：成功时返回一个`AdbConnection`实例，表示与设备的连接。
    pub async fn open_transport(&self, command: Option<&str>) -> AdbResult<AdbConnection> {
        let prefix = self.get_open_transport_prefix(command);
        let mut conn = self.get_connection().await?;
        conn.send_cmd_then_check_okay(&prefix).await?;
        Ok(conn)
    }

    pub async fn get_with_command(&self, command: &str) -> AdbResult<String> {
        let mut conn = self.open_transport(Some(command)).await?;
        let result = conn.read_string_block().await?;
        Ok(result)
    }

    ///
    /// 与 命令 adb get-state 相同  => device
    pub async fn get_state(&self) -> AdbResult<String> {
        self.get_with_command("get-state").await
    }

    ///
    /// adb get-serialno => emulator-5554
    pub async fn get_serialno(&self) -> AdbResult<String> {
        self.get_with_command("get-serialno").await
    }

    /// adb get-devpath
    pub async fn get_devpath(&self) -> AdbResult<String> {
        self.get_with_command("get-devpath").await
    }

    /// 服务器侧记录的设备特性（逗号分隔原文）
    pub async fn get_features(&self) -> AdbResult<String> {
        self.get_with_command("features").await
    }

    /// 执行ADB shell命令流，并返回承载输出的连接。
    ///
    /// # 参数
    /// - `command`: 单个命令字符串或参数向量；向量会逐参数转义。
    ///
    /// # 返回值
    /// - 成功时返回已切换到`shell:`模式的连接，由调用方消费输出；
    ///   协议不区分stdout与stderr。
    pub async fn shell_stream<T: Into<AdbCommand>>(
        &self,
        command: T,
    ) -> AdbResult<AdbConnection> {
        let command = command.into();
        let mut conn = self.open_transport(None).await?;
        let send_cmd = format!("shell:{}", command.get_command_cow());
        conn.send_cmd_then_check_okay(&send_cmd).await?;
        Ok(conn)
    }

    /// 在设备上执行Shell命令，并返回命令的输出。
    ///
    /// # 参数
    /// - `command`: 要执行的Shell命令及其参数。
    ///
    /// # 返回值
    /// - 命令执行成功则返回输出文本，执行过程中出现错误则返回错误信息。
    pub async fn shell<T: Into<AdbCommand>>(&self, command: T) -> AdbResult<String> {
        let mut s = self.shell_stream(command).await?;
        let output = s.read_until_close().await?;
        Ok(String::from_utf8_lossy(&output).to_string())
    }

    pub async fn shell_trim<T: Into<AdbCommand>>(&self, command: T) -> AdbResult<String> {
        let output = self.shell(command).await?;
        Ok(output.trim().to_string())
    }

    /// 轮询`sys.boot_completed`直到设备完成开机。
    ///
    /// 每次探测使用独立连接，探测之间睡眠约1秒；通过句柄取消时
    /// 以`Cancelled`结束。
    pub async fn wait_boot_complete(&self, cancel: &CancelHandle) -> AdbResult<()> {
        let mut cancel_rx = cancel.subscribe();
        loop {
            if cancel.is_cancelled() {
                return Err(AdbError::Cancelled);
            }
            let output = self.shell(["getprop", "sys.boot_completed"]).await?;
            if is_boot_completed(&output) {
                return Ok(());
            }
            tokio::select! {
                _ = wait_cancelled(&mut cancel_rx) => return Err(AdbError::Cancelled),
                _ = tokio::time::sleep(BOOT_PROBE_INTERVAL) => {}
            }
        }
    }

    /// 建立端口转发（host-serial形式，同样容忍单/双OKAY）。
    pub async fn forward(&self, local: &str, remote: &str, norebind: bool) -> AdbResult<()> {
        let mut args = vec!["forward"];
        if norebind {
            args.push("norebind");
        }
        let forward_str = format!("{};{}", local, remote);
        args.push(&forward_str);
        let full_cmd = args.join(":");
        let mut conn = self.open_transport(Some(&full_cmd)).await?;
        conn.check_optional_okay().await?;
        Ok(())
    }

    pub async fn forward_list(&self) -> AdbResult<Vec<ForwardItem>> {
        let mut conn = self.open_transport(Some("list-forward")).await?;
        let content = conn.read_string_block().await?;
        parse_forward_list(&content)
    }

    /// 把设备端端口转发到本机自动选择的空闲端口，返回本机端口。
    /// 已有同目标的转发规则时直接复用。
    pub async fn forward_remote_port(&self, remote: u16) -> AdbResult<u16> {
        let remote = format!("tcp:{}", remote);
        for item in self.forward_list().await? {
            if item.serial == self.serial && item.remote == remote {
                if let Some(local) = item.local.strip_prefix("tcp:") {
                    if let Ok(port) = local.parse::<u16>() {
                        return Ok(port);
                    }
                }
            }
        }
        let local_port = get_free_port()?;
        let local = format!("tcp:{}", local_port);
        self.forward(&local, &remote, false).await?;
        Ok(local_port)
    }

    /// 反向转发：设备端端口映射回本机
    pub async fn reverse(&self, remote: &str, local: &str, norebind: bool) -> AdbResult<()> {
        let mut conn = self.open_transport(None).await?;
        let mut args = vec!["reverse:forward"];
        if norebind {
            args.push("norebind");
        }
        let forward_str = format!("{};{}", remote, local);
        args.push(&forward_str);
        let full_cmd = args.join(":");
        conn.send_cmd_then_check_okay(&full_cmd).await?;
        conn.check_optional_okay().await?;
        Ok(())
    }

    /// 打开`sync:`文件传输会话。
    pub async fn sync(&self) -> AdbResult<AdbSync> {
        let mut conn = self.open_transport(None).await?;
        conn.send_cmd_then_check_okay("sync:").await?;
        Ok(AdbSync::new(conn))
    }

    /// STAT一个远端路径
    pub async fn stat(&self, path: &str) -> AdbResult<FileStat> {
        let mut sync = self.sync().await?;
        let stat = sync.stat(path).await?;
        let _ = sync.quit().await;
        Ok(stat)
    }

    /// 路径在设备上是否存在
    pub async fn exists(&self, path: &str) -> AdbResult<bool> {
        Ok(self.stat(path).await?.exists())
    }

    /// 列出远端目录
    pub async fn list(&self, path: &str) -> AdbResult<Vec<FileEntry>> {
        let mut sync = self.sync().await?;
        let entries = sync.list(path).await?;
        let _ = sync.quit().await;
        Ok(entries)
    }

    /// 开始拉取一个远端文件。
    pub async fn pull(&self, path: &str) -> AdbResult<PullTransfer> {
        let sync = self.sync().await?;
        Ok(sync.pull(path))
    }

    /// 开始推送数据到远端路径。
    ///
    /// # 参数
    /// - `source`: 数据来源。
    /// - `path`: 远端路径。
    /// - `mode`: 远端文件权限位（如0o644）。
    /// - `mtime`: 设备将记录的修改时间（Unix秒）。
    pub async fn push<R>(
        &self,
        source: R,
        path: &str,
        mode: u32,
        mtime: u32,
    ) -> AdbResult<PushTransfer>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sync = self.sync().await?;
        Ok(sync.push(source, path, mode, mtime))
    }

    /// 把远端文本文件整体读为字符串
    pub async fn read_text(&self, path: &str) -> AdbResult<String> {
        let transfer = self.pull(path).await?;
        let content = transfer.read_to_end().await?;
        Ok(String::from_utf8_lossy(&content).to_string())
    }

    /// 抓取当前屏幕的原始帧缓冲。
    ///
    /// 返回已解析的头部元数据与未缓冲的像素流；图像编码转换
    /// 由外部工具完成。
    pub async fn framebuffer(&self) -> AdbResult<Framebuffer> {
        let mut conn = self.open_transport(None).await?;
        conn.send_cmd_then_check_okay("framebuffer:").await?;
        let version = AdbProtocol::read_u32_le(&mut conn).await?;
        let word_count = match version {
            1 => FRAMEBUFFER_V1_WORDS,
            2 => FRAMEBUFFER_V2_WORDS,
            other => {
                return Err(AdbError::protocol(format!(
                    "unsupported framebuffer version {}",
                    other
                )))
            }
        };
        let mut words = Vec::with_capacity(word_count);
        for _ in 0..word_count {
            words.push(AdbProtocol::read_u32_le(&mut conn).await?);
        }
        let meta = FramebufferMeta::from_words(version, &words)?;
        info!(
            "Framebuffer v{} {}x{} {}bpp",
            meta.version, meta.width, meta.height, meta.bpp
        );
        Ok(Framebuffer::new(meta, conn.into_inner()))
    }

    /// 打开到设备端TCP端口的隧道，返回原始字节流。
    ///
    /// # 参数
    /// - `port`: 设备端端口。
    /// - `host`: 可选的设备侧目标主机。
    pub async fn open_tcp(&self, port: u16, host: Option<&str>) -> AdbResult<TcpStream> {
        let mut conn = self.open_transport(None).await?;
        let cmd = match host {
            Some(host) => format!("tcp:{}:{}", port, host),
            None => format!("tcp:{}", port),
        };
        conn.send_cmd_then_check_okay(&cmd).await?;
        Ok(conn.into_inner())
    }

    /// 打开设备端其他地址族的socket隧道（localabstract等）。
    pub async fn open_local<T: std::fmt::Display>(
        &self,
        network_type: NetworkType,
        address: T,
    ) -> AdbResult<TcpStream> {
        let mut conn = self.open_transport(None).await?;
        let cmd = format!("{}{}", network_type.service_prefix(), address);
        conn.send_cmd_then_check_okay(&cmd).await?;
        Ok(conn.into_inner())
    }

    /// 打开`jdwp`服务流（可调试进程PID列表），移交给调用方。
    pub async fn open_jdwp(&self) -> AdbResult<TcpStream> {
        let mut conn = self.open_transport(None).await?;
        conn.send_cmd_then_check_okay("jdwp").await?;
        Ok(conn.into_inner())
    }

    /// 打开`log:<name>`日志缓冲流，移交给调用方解析。
    pub async fn open_log(&self, name: &str) -> AdbResult<TcpStream> {
        let mut conn = self.open_transport(None).await?;
        let cmd = format!("log:{}", name);
        conn.send_cmd_then_check_okay(&cmd).await?;
        Ok(conn.into_inner())
    }

    /// 在设备上启动monkey并连上它的控制端口。
    ///
    /// monkey进程绑定端口需要时间，连接端带重试；协议解析由
    /// 外部库完成。
    pub async fn open_monkey(&self, port: u16) -> AdbResult<MonkeyConnection> {
        let shell = self
            .shell_stream(["monkey", "--port", &port.to_string(), "-v"])
            .await?;
        let mut last_err = None;
        for _ in 0..10 {
            match self.open_tcp(port, None).await {
                Ok(stream) => {
                    return Ok(MonkeyConnection {
                        stream,
                        _shell: shell,
                    })
                }
                Err(e) => {
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| AdbError::connection_failed("monkey did not come up")))
    }

    /// 读取单个系统属性
    pub async fn getprop(&self, name: &str) -> AdbResult<String> {
        self.shell_trim(["getprop", name]).await
    }

    /// 读取全部系统属性
    pub async fn properties(&self) -> AdbResult<HashMap<String, String>> {
        let output = self.shell("getprop").await?;
        parse_properties(&output)
    }

    /// 列出设备声明的特性（`pm list features`）
    pub async fn list_features(&self) -> AdbResult<HashMap<String, FeatureValue>> {
        let output = self.shell(["pm", "list", "features"]).await?;
        parse_features(&output)
    }

    /// 列出已安装的包名
    pub async fn packages(&self) -> AdbResult<Vec<String>> {
        let output = self.shell(["pm", "list", "packages"]).await?;
        parse_packages(&output)
    }

    /// 包是否已安装（`pm path`）
    pub async fn is_installed(&self, package: &str) -> AdbResult<bool> {
        let output = self.shell(["pm", "path", package]).await?;
        parse_is_installed(&output)
    }

    /// 推送本地APK并安装。
    ///
    /// # 参数
    /// - `source`: APK内容来源。
    /// - `mtime`: 远端临时文件记录的时间戳，同时用于生成唯一路径。
    pub async fn install<R>(&self, source: R, mtime: u32) -> AdbResult<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let dst = format!("/data/local/tmp/tmp-{}.apk", mtime);
        info!("Pushing apk to <{:#?}>", &dst);
        let mut transfer = self.push(source, &dst, 0o644, mtime).await?;
        transfer.wait().await?;
        let result = self.install_remote(&dst, true).await;
        info!("Install Apk Result {:#?}", &result);
        result.map(|_| ())
    }

    /// 安装设备上已有的APK文件。
    pub async fn install_remote(&self, path: &str, clean: bool) -> AdbResult<String> {
        let output = self.shell(["pm", "install", "-r", "-t", path]).await?;
        if !output.contains("Success") {
            return Err(AdbError::device(format!(
                "install failed: {}",
                output.trim()
            )));
        }
        if clean {
            self.shell(["rm", path]).await?;
        }
        Ok(output)
    }

    pub async fn uninstall(&self, package_name: &str) -> AdbResult<String> {
        self.shell(["pm", "uninstall", package_name]).await
    }

    /// 清除应用数据
    pub async fn clear(&self, package_name: &str) -> AdbResult<()> {
        let output = self.shell(["pm", "clear", package_name]).await?;
        if output.trim() != "Success" {
            return Err(AdbError::device(format!("clear failed: {}", output.trim())));
        }
        Ok(())
    }

    /// 启动activity（`am start`）。
    ///
    /// 输出中出现`Error:`或`Exception:`行即失败。
    pub async fn start_activity(&self, intent: &Intent) -> AdbResult<()> {
        self.run_am("start", intent).await
    }

    /// 发送广播（`am broadcast`）。
    pub async fn broadcast(&self, intent: &Intent) -> AdbResult<()> {
        self.run_am("broadcast", intent).await
    }

    async fn run_am(&self, verb: &str, intent: &Intent) -> AdbResult<()> {
        let mut args = vec!["am".to_string(), verb.to_string()];
        args.extend(intent.to_args());
        let output = self.shell(args).await?;
        check_activity_output(&output)
    }

    /// 重启设备。
    ///
    /// # 参数
    /// - `mode`: 可选的目标（bootloader、recovery等）。
    pub async fn reboot(&self, mode: Option<&str>) -> AdbResult<()> {
        let mut conn = self.open_transport(None).await?;
        let cmd = format!("reboot:{}", mode.unwrap_or(""));
        conn.send_cmd_then_check_okay(&cmd).await?;
        Ok(())
    }

    /// 以可写方式重新挂载系统分区
    pub async fn remount(&self) -> AdbResult<String> {
        let mut conn = self.open_transport(None).await?;
        conn.send_cmd_then_check_okay("remount:").await?;
        let output = conn.read_until_close().await?;
        Ok(String::from_utf8_lossy(&output).to_string())
    }

    /// 以root身份重启adbd
    pub async fn root(&self) -> AdbResult<String> {
        let mut conn = self.open_transport(None).await?;
        conn.send_cmd_then_check_okay("root:").await?;
        let output = conn.read_until_close().await?;
        Ok(String::from_utf8_lossy(&output).to_string())
    }

    /// 让adbd监听TCP端口
    pub async fn tcpip(&self, port: u16) -> AdbResult<String> {
        let mut conn = self.open_transport(None).await?;
        let cmd = format!("tcpip:{}", port);
        conn.send_cmd_then_check_okay(&cmd).await?;
        let output = conn.read_until_close().await?;
        Ok(String::from_utf8_lossy(&output).to_string())
    }

    /// 删除远端文件
    pub async fn remove(&self, path: &str) -> AdbResult<String> {
        self.shell_trim(vec!["rm".to_string(), path.to_string()]).await
    }

    pub async fn get_sdk_version(&self) -> AdbResult<String> {
        self.getprop("ro.build.version.sdk").await
    }

    pub async fn get_android_version(&self) -> AdbResult<String> {
        self.getprop("ro.build.version.release").await
    }

    pub async fn get_device_model(&self) -> AdbResult<String> {
        self.getprop("ro.product.model").await
    }

    pub async fn get_device_brand(&self) -> AdbResult<String> {
        self.getprop("ro.product.brand").await
    }
}

/// monkey会话：保持发起monkey的shell连接存活，同时暴露控制socket
pub struct MonkeyConnection {
    pub stream: TcpStream,
    _shell: AdbConnection,
}
