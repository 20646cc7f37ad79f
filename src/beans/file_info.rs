use chrono::{DateTime, Utc};

use crate::errors::{AdbError, AdbResult};

/// SYNC STAT应答携带的文件元数据。
///
/// mode为0表示路径不存在，此时所有谓词返回false。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileStat {
    pub mode: u32,
    pub size: u32,
    /// 最后修改时间（Unix秒）
    pub mtime: u32,
    pub mdtime: Option<DateTime<Utc>>,
    pub path: String,
}

impl FileStat {
    pub fn exists(&self) -> bool {
        self.mode != 0
    }

    pub fn is_file(&self) -> bool {
        file_type_bits(self.mode) == 0b100
    }

    pub fn is_dir(&self) -> bool {
        file_type_bits(self.mode) == 0b010
    }

    pub fn is_symlink(&self) -> bool {
        file_type_bits(self.mode) == 0b101
    }
}

/// SYNC DENT记录描述的目录项。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileEntry {
    pub name: String,
    pub mode: u32,
    pub size: u32,
    pub mtime: u32,
    pub mdtime: Option<DateTime<Utc>>,
}

impl FileEntry {
    pub fn is_file(&self) -> bool {
        file_type_bits(self.mode) == 0b100
    }

    pub fn is_dir(&self) -> bool {
        file_type_bits(self.mode) == 0b010
    }

    pub fn is_symlink(&self) -> bool {
        file_type_bits(self.mode) == 0b101
    }
}

// mode第14到16位是文件类型：0b100文件、0b010目录、0b101符号链接
fn file_type_bits(mode: u32) -> u32 {
    (mode >> 13) & 0b111
}

fn mdtime_from_epoch(mtime: u32) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(mtime as i64, 0)
}

/// 从STAT应答的12字节载荷解析文件元数据。
///
/// # 参数
/// - `data`: mode、size、mtime三个小端u32。
/// - `path`: 发起STAT的路径，回填到结果中。
pub fn parse_file_stat<T: ToString>(data: &[u8], path: T) -> AdbResult<FileStat> {
    let (mode, size, mtime) = parse_stat_words(data)?;
    Ok(FileStat {
        mode,
        size,
        mtime,
        mdtime: mdtime_from_epoch(mtime),
        path: path.to_string(),
    })
}

/// 从DENT记录头（mode、size、mtime）加名字构造目录项。
pub fn parse_file_entry(data: &[u8], name: String) -> AdbResult<FileEntry> {
    let (mode, size, mtime) = parse_stat_words(data)?;
    Ok(FileEntry {
        name,
        mode,
        size,
        mtime,
        mdtime: mdtime_from_epoch(mtime),
    })
}

fn parse_stat_words(data: &[u8]) -> AdbResult<(u32, u32, u32)> {
    if data.len() < 12 {
        return Err(AdbError::protocol(format!(
            "stat payload too short: {} bytes",
            data.len()
        )));
    }
    let mode = u32::from_le_bytes(data[0..4].try_into().unwrap());
    let size = u32::from_le_bytes(data[4..8].try_into().unwrap());
    let mtime = u32::from_le_bytes(data[8..12].try_into().unwrap());
    Ok((mode, size, mtime))
}
