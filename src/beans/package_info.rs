use std::collections::HashMap;

use crate::errors::{AdbError, AdbResult};

/// `pm list features`中一个特性的取值：无`=`时为开启，有则保留原文
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureValue {
    Enabled,
    Value(String),
}

impl FeatureValue {
    pub fn is_enabled(&self) -> bool {
        matches!(self, FeatureValue::Enabled)
    }
}

/// 解析`pm list features`输出。
///
/// 形如`feature:<name>`或`feature:<name>=<value>`的行进入结果，
/// 其余行忽略。
pub fn parse_features(output: &str) -> AdbResult<HashMap<String, FeatureValue>> {
    let re = regex::Regex::new(r"^feature:([^=]+)(?:=(.*))?$").unwrap();
    let mut features = HashMap::new();
    for line in output.lines() {
        if let Some(cap) = re.captures(line.trim()) {
            let name = cap.get(1).unwrap().as_str().to_string();
            let value = match cap.get(2) {
                Some(v) => FeatureValue::Value(v.as_str().to_string()),
                None => FeatureValue::Enabled,
            };
            features.insert(name, value);
        }
    }
    Ok(features)
}

/// 解析`getprop`输出：`[key]: [value]`行。
pub fn parse_properties(output: &str) -> AdbResult<HashMap<String, String>> {
    let re = regex::Regex::new(r"^\[([^\]]+)\]: \[(.*)\]$").unwrap();
    let mut properties = HashMap::new();
    for line in output.lines() {
        if let Some(cap) = re.captures(line.trim_end()) {
            properties.insert(
                cap.get(1).unwrap().as_str().to_string(),
                cap.get(2).unwrap().as_str().to_string(),
            );
        }
    }
    Ok(properties)
}

/// 解析`pm list packages`输出：`package:<name>`行。
pub fn parse_packages(output: &str) -> AdbResult<Vec<String>> {
    let mut packages = vec![];
    for line in output.lines() {
        if let Some(name) = line.trim().strip_prefix("package:") {
            if !name.is_empty() {
                packages.push(name.to_string());
            }
        }
    }
    Ok(packages)
}

/// 解析`pm path <pkg>`输出判断是否已安装。
///
/// 任意一行以`package:`开头即视为已安装；空输出表示未安装；
/// `Error:`行表示设备侧执行失败。
pub fn parse_is_installed(output: &str) -> AdbResult<bool> {
    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("package:") {
            return Ok(true);
        }
        if line.starts_with("Error:") {
            return Err(AdbError::device(line.to_string()));
        }
    }
    Ok(false)
}

/// 检查`am start` / `am broadcast`输出。
///
/// 任意一行以`Error:`或`Exception:`开头即失败，首个出错行
/// 作为设备错误信息返回。
pub fn check_activity_output(output: &str) -> AdbResult<()> {
    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("Error:") || line.starts_with("Exception:") {
            return Err(AdbError::device(line.to_string()));
        }
    }
    Ok(())
}

/// `getprop sys.boot_completed`探测：去除空白后等于`1`即完成启动。
pub fn is_boot_completed(output: &str) -> bool {
    output.trim() == "1"
}
