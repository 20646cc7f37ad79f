mod host;
pub mod sync;

pub use host::{AdbProtocol, MAX_REQUEST_LEN};
pub use sync::{SyncCommand, SyncProtocol, SYNC_DATA_MAX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdbRespStatus {
    OKAY,    // 操作成功
    FAIL,    // 操作失败
    UNKNOWN, // 未知类型
}

impl AdbRespStatus {
    /// 将 AdbRespStatus 枚举值转换为对应的静态字符串。
    ///
    /// # 返回值
    /// 返回一个静态字符串，对应于枚举值的含义。如果枚举值未匹配到任何已知类型，则返回空字符串。
    pub fn as_str(&self) -> &'static str {
        match self {
            AdbRespStatus::OKAY => "OKAY", // 操作成功
            AdbRespStatus::FAIL => "FAIL", // 操作失败
            _ => "",                       // 未知或未定义的枚举值
        }
    }

    /// 从响应的前4个字节识别状态字。
    pub fn from_bytes(data: &[u8]) -> AdbRespStatus {
        match data {
            b"OKAY" => AdbRespStatus::OKAY,
            b"FAIL" => AdbRespStatus::FAIL,
            _ => AdbRespStatus::UNKNOWN,
        }
    }
}
