pub(crate) mod command;
pub(crate) mod device_info;
pub(crate) mod file_info;
pub(crate) mod forward_item;
pub(crate) mod framebuffer;
pub(crate) mod intent;
pub(crate) mod net_info;
pub(crate) mod package_info;

pub use command::{shell_escape_arg, shell_escape_args, AdbCommand};
pub use device_info::{
    diff_device_sets, parse_device_list, to_device_set, AdbDeviceInfo, DeviceChange, DeviceDiff,
    DeviceSet, DeviceState,
};
pub use file_info::{parse_file_entry, parse_file_stat, FileEntry, FileStat};
pub use forward_item::{parse_forward_list, ForwardItem};
pub use framebuffer::{
    ColorFormat, FramebufferMeta, FRAMEBUFFER_V1_WORDS, FRAMEBUFFER_V2_WORDS,
};
pub use intent::{ExtraValue, Intent};
pub use net_info::NetworkType;
pub use package_info::{
    check_activity_output, is_boot_completed, parse_features, parse_is_installed, parse_packages,
    parse_properties, FeatureValue,
};
