use crate::errors::AdbResult;

/// `host:list-forward`输出中的一条端口转发规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardItem {
    pub serial: String,
    pub local: String,
    pub remote: String,
}

impl ForwardItem {
    pub fn new<T>(serial: T, local: T, remote: T) -> ForwardItem
    where
        T: ToString,
    {
        ForwardItem {
            serial: serial.to_string(),
            local: local.to_string(),
            remote: remote.to_string(),
        }
    }
}

/// 解析转发表文本：每行`serial local remote`三元组，其他行忽略。
pub fn parse_forward_list(text: &str) -> AdbResult<Vec<ForwardItem>> {
    let mut items = vec![];
    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() == 3 {
            items.push(ForwardItem::new(parts[0], parts[1], parts[2]));
        }
    }
    Ok(items)
}
