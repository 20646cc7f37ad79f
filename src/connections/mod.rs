pub mod adb_socket_config;

pub use adb_socket_config::AdbSocketConfig;
