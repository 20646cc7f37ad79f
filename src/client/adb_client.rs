use anyhow::Context;
use futures_core::Stream;
use futures_util::stream;

use crate::beans::{parse_device_list, parse_forward_list, AdbDeviceInfo, ForwardItem};
use crate::client::adb_connection::AdbConnection;
use crate::client::adb_device::AdbDevice;
use crate::client::tracker::DeviceTracker;
use crate::connections::AdbSocketConfig;
use crate::errors::AdbResult;
use crate::protocols::AdbProtocol;

/// ADB服务器的主机级客户端。
///
/// 客户端本身只携带配置；每条命令在新建的连接上执行，命令之间
/// 互不共享socket。
#[derive(Clone, Debug, Default)]
pub struct AdbClient {
    pub config: AdbSocketConfig,
}

impl AdbClient {
    pub fn new(config: AdbSocketConfig) -> Self {
        Self { config }
    }

    /// 为一条命令取得新连接
    async fn connection(&self) -> AdbResult<AdbConnection> {
        AdbConnection::connect(self.config.clone()).await
    }

    /// 根据设备序列号创建一个 AdbDevice 实例。
    ///
    /// # 参数
    /// - `serial`: 设备的序列号。
    ///
    /// # 返回值
    /// 返回一个新的 AdbDevice 实例。
    pub fn device(&self, serial: &str) -> AdbDevice {
        AdbDevice::new_device(serial, self.config.clone())
    }

    /// 获取 ADB 服务器的版本号。
    ///
    /// # 返回值
    /// 返回服务器的版本号，如果获取失败，则返回错误。
    pub async fn server_version(&self) -> AdbResult<u32> {
        let mut conn = self.connection().await?;
        conn.send_cmd_then_check_okay("host:version").await?;
        let version_string = conn.read_string_block().await?;
        let version = u32::from_str_radix(&version_string, 16)?;
        Ok(version)
    }

    /// 关闭 ADB 服务器。
    ///
    /// # 返回值
    /// 如果关闭成功，则返回空结果，否则返回错误。
    pub async fn server_kill(&self) -> AdbResult<()> {
        let mut conn = self.connection().await?;
        conn.send_cmd_then_check_okay("host:kill").await?;
        Ok(())
    }

    /// 列出所有连接的 ADB 设备。
    ///
    /// # 返回值
    /// 返回一个包含所有设备的向量，如果获取设备列表失败，则返回错误。
    pub async fn list_devices(&self) -> AdbResult<Vec<AdbDeviceInfo>> {
        let mut conn = self.connection().await?;
        conn.send_cmd_then_check_okay("host:devices").await?;
        let resp = conn.read_string_block().await?;
        parse_device_list(&resp)
    }

    /// 列出所有设备及其路径和键值属性（`host:devices-l`）。
    pub async fn list_devices_extended(&self) -> AdbResult<Vec<AdbDeviceInfo>> {
        let mut conn = self.connection().await?;
        conn.send_cmd_then_check_okay("host:devices-l").await?;
        let resp = conn.read_string_block().await?;
        parse_device_list(&resp)
    }

    /// 以流的形式列出所有连接的 ADB 设备。
    ///
    /// # 返回值
    /// 返回一个设备流，如果获取设备列表失败，则返回错误。
    pub async fn iter_devices(&self) -> AdbResult<impl Stream<Item = AdbDevice>> {
        let devices = self
            .list_devices()
            .await
            .context("Get Device List Error")?;
        let config = self.config.clone();
        Ok(stream::iter(
            devices
                .into_iter()
                .map(move |d| AdbDevice::new_device(&d.serial, config.clone())),
        ))
    }

    /// 开始跟踪设备的上线与离线。
    ///
    /// 切换到`host:track-devices`后连接转为无限快照流，由返回的
    /// 跟踪器消费并发出diff事件。
    pub async fn track_devices(&self) -> AdbResult<DeviceTracker> {
        let mut conn = self.connection().await?;
        conn.send_cmd_then_check_okay("host:track-devices").await?;
        Ok(DeviceTracker::spawn(conn))
    }

    /// 连接到指定的 ADB 设备。
    ///
    /// # 参数
    /// - `serial`: 设备的序列号，用于指定要连接的设备。
    ///
    /// # 返回值
    /// 返回连接结果的字符串表示，如果连接失败，则返回错误。
    pub async fn connect_device(&self, serial: &str) -> AdbResult<String> {
        let mut conn = self.connection().await?;
        let command = format!("host:connect:{}", serial);
        conn.send_cmd_then_check_okay(&command).await?;
        let result = conn.read_string_block().await?;
        Ok(result)
    }

    /// 断开与指定 ADB 设备的连接。
    ///
    /// # 参数
    /// - `serial`: 设备的序列号，用于指定要断开连接的设备。
    ///
    /// # 返回值
    /// 返回断开连接结果的字符串表示，如果断开连接失败，则返回错误。
    pub async fn disconnect_device(&self, serial: &str) -> AdbResult<String> {
        if serial.is_empty() {
            return Err(crate::errors::AdbError::parse("serial is empty"));
        }
        let mut conn = self.connection().await?;
        let command = format!("host:disconnect:{}", serial);
        conn.send_cmd_then_check_okay(&command).await?;
        Ok(conn.read_string_block().await?)
    }

    /// 列出服务器上全部端口转发规则。
    pub async fn list_forward(&self) -> AdbResult<Vec<ForwardItem>> {
        let mut conn = self.connection().await?;
        conn.send_cmd_then_check_okay("host:list-forward").await?;
        let content = conn.read_string_block().await?;
        parse_forward_list(&content)
    }

    /// 建立一条端口转发规则。
    ///
    /// `host:forward`在不同服务器版本上回复一个或两个OKAY，
    /// 两种都接受。
    pub async fn forward(&self, local: &str, remote: &str) -> AdbResult<()> {
        let mut conn = self.connection().await?;
        let command = format!("host:forward:{};{}", local, remote);
        conn.send_cmd_then_check_okay(&command).await?;
        conn.check_optional_okay().await?;
        Ok(())
    }
}
