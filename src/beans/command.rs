use std::borrow::Cow;

/// ADB shell命令表示，支持单个字符串或多个参数
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AdbCommand {
    /// 单个命令字符串，原样发送
    Single(String),
    /// 多个命令参数，发送前逐个转义
    Multiple(Vec<String>),
}

impl AdbCommand {
    /// 创建单个命令
    pub fn single<S: Into<String>>(cmd: S) -> Self {
        AdbCommand::Single(cmd.into())
    }

    /// 创建多参数命令
    pub fn multiple<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AdbCommand::Multiple(args.into_iter().map(|s| s.into()).collect())
    }

    /// 获取完整的命令字符串
    pub fn get_command(&self) -> String {
        match self {
            AdbCommand::Single(s) => s.clone(),
            AdbCommand::Multiple(parts) => shell_escape_args(parts),
        }
    }

    /// 获取命令字符串的借用版本（减少分配）
    pub fn get_command_cow(&self) -> Cow<str> {
        match self {
            AdbCommand::Single(s) => Cow::Borrowed(s),
            AdbCommand::Multiple(parts) => Cow::Owned(shell_escape_args(parts)),
        }
    }
}

/// 将参数数组转换为可直接发给`shell:`的命令行字符串
pub fn shell_escape_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| shell_escape_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 转义单个参数。
///
/// 仅包含 `[A-Za-z0-9_.+,:@%/=-]` 的参数原样返回；其余参数用单引号
/// 包裹，内部的单引号替换为 `'"'"'` 序列；空参数变为 `''`。
/// 这是一个便利功能，不构成安全边界。
pub fn shell_escape_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    let is_safe = |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | ',' | ':' | '@' | '%' | '/' | '=' | '-')
    };
    if arg.chars().all(is_safe) {
        return arg.to_string();
    }

    let mut escaped = String::with_capacity(arg.len() + 2);
    escaped.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            escaped.push_str("'\"'\"'");
        } else {
            escaped.push(c);
        }
    }
    escaped.push('\'');
    escaped
}

// From trait 实现
impl From<String> for AdbCommand {
    fn from(s: String) -> Self {
        AdbCommand::Single(s)
    }
}

impl From<&str> for AdbCommand {
    fn from(s: &str) -> Self {
        AdbCommand::Single(s.to_string())
    }
}

impl From<Vec<String>> for AdbCommand {
    fn from(args: Vec<String>) -> Self {
        AdbCommand::Multiple(args)
    }
}

impl From<Vec<&str>> for AdbCommand {
    fn from(args: Vec<&str>) -> Self {
        AdbCommand::Multiple(args.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for AdbCommand {
    fn from(args: [&str; N]) -> Self {
        AdbCommand::Multiple(args.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<&[&str; N]> for AdbCommand {
    fn from(args: &[&str; N]) -> Self {
        AdbCommand::Multiple(args.iter().map(|&s| String::from(s)).collect())
    }
}

impl From<&[&str]> for AdbCommand {
    fn from(args: &[&str]) -> Self {
        AdbCommand::Multiple(args.iter().map(|&s| String::from(s)).collect())
    }
}
