use std::collections::{BTreeMap, HashMap};

use crate::errors::{AdbError, AdbResult};

/// 设备在服务器端的连接状态。
///
/// 未识别的状态字原样保留，避免新版服务器引入状态时解析失败。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceState {
    Device,
    Emulator,
    Offline,
    Unauthorized,
    Bootloader,
    Recovery,
    NoPermissions,
    Host,
    Other(String),
}

impl DeviceState {
    /// 从设备列表中的状态字解析
    pub fn from_token(token: &str) -> DeviceState {
        match token {
            "device" => DeviceState::Device,
            "emulator" => DeviceState::Emulator,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            "bootloader" => DeviceState::Bootloader,
            "recovery" => DeviceState::Recovery,
            "no permissions" => DeviceState::NoPermissions,
            "host" => DeviceState::Host,
            other => DeviceState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Device => "device",
            DeviceState::Emulator => "emulator",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Bootloader => "bootloader",
            DeviceState::Recovery => "recovery",
            DeviceState::NoPermissions => "no permissions",
            DeviceState::Host => "host",
            DeviceState::Other(s) => s,
        }
    }
}

/// AdbDeviceInfo结构体描述服务器可见的一台设备。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbDeviceInfo {
    pub serial: String,
    pub state: DeviceState,
    /// `-l`形式中键值对之前的路径残段（usb:...等）
    pub path: Option<String>,
    /// `-l`形式中的键值对：product、model、device、transport_id
    pub properties: HashMap<String, String>,
}

impl AdbDeviceInfo {
    pub fn new(serial: String, state: DeviceState) -> AdbDeviceInfo {
        AdbDeviceInfo {
            serial,
            state,
            path: None,
            properties: HashMap::new(),
        }
    }
}

/// 按序列号排序的当前设备视图
pub type DeviceSet = BTreeMap<String, AdbDeviceInfo>;

// `-l`形式中已知的键值对键名；路径残段（usb:1-4等）同样含冒号，
// 只能按键名区分
const DEVICE_KV_KEYS: [&str; 4] = ["product", "model", "device", "transport_id"];

/// 解析`host:devices` / `host:devices-l`的文本载荷。
///
/// 每个非空行的格式为 `serial\tstate` 或 `serial\tstate\t<path与键值对>`。
///
/// # 返回值
/// 返回解析出的设备向量，行内缺少状态字段时返回解析错误。
pub fn parse_device_list(text: &str) -> AdbResult<Vec<AdbDeviceInfo>> {
    let mut devices = vec![];
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, '\t');
        let serial = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AdbError::parse(format!("device line without serial: {:?}", line)))?;
        let state = parts
            .next()
            .ok_or_else(|| AdbError::parse(format!("device line without state: {:?}", line)))?;
        let mut info = AdbDeviceInfo::new(serial.to_string(), DeviceState::from_token(state.trim()));
        if let Some(rest) = parts.next() {
            let mut path_parts = vec![];
            for token in rest.split_whitespace() {
                match token.split_once(':') {
                    Some((key, value)) if DEVICE_KV_KEYS.contains(&key) => {
                        info.properties.insert(key.to_string(), value.to_string());
                    }
                    _ => {
                        if info.properties.is_empty() {
                            path_parts.push(token);
                        }
                    }
                }
            }
            if !path_parts.is_empty() {
                info.path = Some(path_parts.join(" "));
            }
        }
        devices.push(info);
    }
    Ok(devices)
}

/// 将设备向量整理为按序列号排序的集合
pub fn to_device_set(devices: Vec<AdbDeviceInfo>) -> DeviceSet {
    devices.into_iter().map(|d| (d.serial.clone(), d)).collect()
}

/// 一台设备的状态变化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceChange {
    pub device: AdbDeviceInfo,
    pub old_state: DeviceState,
}

/// 两次设备快照之间的差异。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDiff {
    pub added: Vec<AdbDeviceInfo>,
    pub removed: Vec<AdbDeviceInfo>,
    pub changed: Vec<DeviceChange>,
}

impl DeviceDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// 把差异应用到一个设备集合上，得到后一次快照
    pub fn apply(&self, set: &mut DeviceSet) {
        for device in &self.removed {
            set.remove(&device.serial);
        }
        for change in &self.changed {
            set.insert(change.device.serial.clone(), change.device.clone());
        }
        for device in &self.added {
            set.insert(device.serial.clone(), device.clone());
        }
    }
}

/// 对比前后两次快照。
///
/// 新增：序列号只在新快照出现；移除：只在旧快照出现；
/// 变化：同一序列号状态不同。遍历顺序即序列号顺序。
pub fn diff_device_sets(previous: &DeviceSet, current: &DeviceSet) -> DeviceDiff {
    let mut diff = DeviceDiff::default();

    for (serial, device) in current {
        match previous.get(serial) {
            None => diff.added.push(device.clone()),
            Some(old) if old.state != device.state => diff.changed.push(DeviceChange {
                device: device.clone(),
                old_state: old.state.clone(),
            }),
            Some(_) => {}
        }
    }

    for (serial, device) in previous {
        if !current.contains_key(serial) {
            diff.removed.push(device.clone());
        }
    }

    diff
}
