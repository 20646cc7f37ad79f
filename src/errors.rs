use thiserror::Error;

/// ADB操作中可能出现的错误类型
#[derive(Error, Debug)]
pub enum AdbError {
    /// 连接相关错误（无法连接服务器或命令执行中的IO失败）
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// 服务器返回FAIL帧
    #[error("Remote failure: {message}")]
    RemoteError { message: String },

    /// 协议错误（字节流不符合协议语法）
    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    /// 解析错误（文本输出不符合预期格式）
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// 设备错误（命令已执行但设备报告失败）
    #[error("Device error: {message}")]
    DeviceError { message: String },

    /// 设备未授权
    #[error("Device unauthorized: {message}")]
    Unauthorized { message: String },

    /// 调用方主动取消
    #[error("Operation cancelled")]
    Cancelled,

    /// IO错误的包装
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 正则表达式错误
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// UTF-8编码错误
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数字解析错误
    #[error("Parse number error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// Anyhow错误的包装
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// 专门用于结果类型的别名
pub type AdbResult<T> = Result<T, AdbError>;

impl AdbError {
    /// 创建连接失败错误
    pub fn connection_failed<S: Into<String>>(message: S) -> Self {
        AdbError::ConnectionFailed {
            message: message.into(),
        }
    }

    /// 创建远端FAIL错误；带授权相关信息的FAIL单独归类
    pub fn remote<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("unauthorized") || lower.contains("authorization") {
            AdbError::Unauthorized { message }
        } else {
            AdbError::RemoteError { message }
        }
    }

    /// 创建协议错误
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        AdbError::ProtocolError {
            message: message.into(),
        }
    }

    /// 创建解析错误
    pub fn parse<S: Into<String>>(message: S) -> Self {
        AdbError::ParseError {
            message: message.into(),
        }
    }

    /// 创建设备错误
    pub fn device<S: Into<String>>(message: S) -> Self {
        AdbError::DeviceError {
            message: message.into(),
        }
    }

    /// 创建设备未授权错误
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        AdbError::Unauthorized {
            message: message.into(),
        }
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdbError::ConnectionFailed { .. } | AdbError::Io(_))
    }

    /// 检查是否为致命错误（不应重试）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AdbError::Unauthorized { .. }
                | AdbError::ProtocolError { .. }
                | AdbError::ParseError { .. }
        )
    }

    /// 获取错误的简短描述
    pub fn error_code(&self) -> &'static str {
        match self {
            AdbError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            AdbError::RemoteError { .. } => "REMOTE_ERROR",
            AdbError::ProtocolError { .. } => "PROTOCOL_ERROR",
            AdbError::ParseError { .. } => "PARSE_ERROR",
            AdbError::DeviceError { .. } => "DEVICE_ERROR",
            AdbError::Unauthorized { .. } => "UNAUTHORIZED",
            AdbError::Cancelled => "CANCELLED",
            AdbError::Io(_) => "IO_ERROR",
            AdbError::Regex(_) => "REGEX_ERROR",
            AdbError::Utf8(_) => "UTF8_ERROR",
            AdbError::ParseInt(_) => "PARSE_INT_ERROR",
            AdbError::Anyhow(_) => "ANYHOW_ERROR",
        }
    }
}
