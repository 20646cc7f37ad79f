use std::path::PathBuf;

use tracing::Level;
use which::which;

use crate::errors::{AdbError, AdbResult};

#[cfg(windows)]
const ADB_EXECUTE_FILE_NAME: &str = "adb.exe";
#[cfg(not(windows))]
const ADB_EXECUTE_FILE_NAME: &str = "adb";

const ADBX_ADB_PATH: &str = "ADBX_ADB_PATH";

pub fn init_logger() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_thread_names(true)
        .with_thread_ids(true)
        .init();
}

/// 定位本机adb可执行文件：优先环境变量ADBX_ADB_PATH，其次PATH查找。
pub fn adb_path() -> AdbResult<PathBuf> {
    if let Ok(adb_env) = std::env::var(ADBX_ADB_PATH) {
        Ok(PathBuf::from(adb_env))
    } else {
        which(ADB_EXECUTE_FILE_NAME)
            .map_err(|_| AdbError::connection_failed("adb binary not found in PATH"))
    }
}

/// 申请一个空闲的本机TCP端口
pub fn get_free_port() -> AdbResult<u16> {
    let socket = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(socket.local_addr()?.port())
}
