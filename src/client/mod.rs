pub mod adb_client;
pub mod adb_connection;
pub mod adb_device;
pub mod cancel;
pub mod framebuffer;
pub mod sync;
pub mod tracker;

pub use adb_client::AdbClient;
pub use adb_connection::AdbConnection;
pub use adb_device::{AdbDevice, MonkeyConnection};
pub use cancel::CancelHandle;
pub use framebuffer::Framebuffer;
pub use sync::{AdbSync, PullTransfer, PushTransfer};
pub use tracker::{DeviceEvent, DeviceTracker};
