use std::fmt::Display;
use std::str::FromStr;

use crate::errors::AdbError;

/// 设备端socket服务的地址族。
///
/// 用于`tcp:`之外的本地socket隧道（localabstract等）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkType {
    Tcp,
    Unix,
    Dev,
    Local,
    LocalReserved,
    LocalFileSystem,
    LocalAbstract,
}

impl NetworkType {
    /// 服务请求前缀，含结尾冒号
    pub fn service_prefix(&self) -> &'static str {
        match self {
            NetworkType::Tcp => "tcp:",
            NetworkType::Unix | NetworkType::LocalAbstract => "localabstract:",
            NetworkType::Dev => "dev:",
            NetworkType::Local => "local:",
            NetworkType::LocalReserved => "localreserved:",
            NetworkType::LocalFileSystem => "localfilesystem:",
        }
    }
}

impl Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.service_prefix())
    }
}

impl FromStr for NetworkType {
    type Err = AdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(NetworkType::Tcp),
            "unix" | "localabstract" => Ok(NetworkType::LocalAbstract),
            "dev" => Ok(NetworkType::Dev),
            "local" => Ok(NetworkType::Local),
            "localreserved" => Ok(NetworkType::LocalReserved),
            "localfilesystem" => Ok(NetworkType::LocalFileSystem),
            other => Err(AdbError::parse(format!("unknown network type {:?}", other))),
        }
    }
}
