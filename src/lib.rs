pub mod beans;
pub mod client;
pub mod connections;
pub mod errors;
pub mod protocols;
pub mod utils;

pub use beans::{
    AdbCommand, AdbDeviceInfo, ColorFormat, DeviceDiff, DeviceSet, DeviceState, ExtraValue,
    FeatureValue, FileEntry, FileStat, ForwardItem, FramebufferMeta, Intent, NetworkType,
};
pub use client::{
    AdbClient, AdbConnection, AdbDevice, AdbSync, CancelHandle, DeviceEvent, DeviceTracker,
    Framebuffer, PullTransfer, PushTransfer,
};
pub use connections::AdbSocketConfig;
pub use errors::{AdbError, AdbResult};
pub use utils::adb_path;
