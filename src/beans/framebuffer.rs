use crate::errors::{AdbError, AdbResult};

/// 版本1头部中版本字之后的u32个数（48字节）
pub const FRAMEBUFFER_V1_WORDS: usize = 12;
/// 版本2头部中版本字之后的u32个数（多一个format字，52字节）
pub const FRAMEBUFFER_V2_WORDS: usize = 13;

/// 由通道布局推导出的像素格式标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    Unknown,
}

/// `framebuffer:`服务头部解析结果。
///
/// 版本1：版本字后跟12个u32；版本2在颜色布局字段前多一个
/// 原始format字，该字不做解释原样透出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferMeta {
    pub version: u32,
    /// 版本2头部携带的原始像素格式字
    pub format: Option<u32>,
    pub bpp: u32,
    pub size: u32,
    pub width: u32,
    pub height: u32,
    pub red_offset: u32,
    pub red_length: u32,
    pub blue_offset: u32,
    pub blue_length: u32,
    pub green_offset: u32,
    pub green_length: u32,
    pub alpha_offset: u32,
    pub alpha_length: u32,
}

impl FramebufferMeta {
    /// 从版本字之后的u32序列解析头部。
    ///
    /// # 参数
    /// - `version`: 已读取的版本字，必须是1或2。
    /// - `words`: 版本1时12个u32，版本2时13个u32。
    pub fn from_words(version: u32, words: &[u32]) -> AdbResult<FramebufferMeta> {
        let expected = match version {
            1 => FRAMEBUFFER_V1_WORDS,
            2 => FRAMEBUFFER_V2_WORDS,
            other => {
                return Err(AdbError::protocol(format!(
                    "unsupported framebuffer version {}",
                    other
                )))
            }
        };
        if words.len() != expected {
            return Err(AdbError::protocol(format!(
                "framebuffer v{} header expects {} words, got {}",
                version,
                expected,
                words.len()
            )));
        }
        let (format, layout) = if version == 2 {
            (Some(words[0]), &words[1..])
        } else {
            (None, words)
        };
        Ok(FramebufferMeta {
            version,
            format,
            bpp: layout[0],
            size: layout[1],
            width: layout[2],
            height: layout[3],
            red_offset: layout[4],
            red_length: layout[5],
            blue_offset: layout[6],
            blue_length: layout[7],
            green_offset: layout[8],
            green_length: layout[9],
            alpha_offset: layout[10],
            alpha_length: layout[11],
        })
    }

    /// 依据通道偏移与alpha长度推导格式标签
    pub fn color_format(&self) -> ColorFormat {
        let has_alpha = self.alpha_length > 0;
        if self.red_offset == 0 && self.green_offset == 8 && self.blue_offset == 16 {
            if has_alpha {
                ColorFormat::Rgba
            } else {
                ColorFormat::Rgb
            }
        } else if self.blue_offset == 0 && self.green_offset == 8 && self.red_offset == 16 {
            if has_alpha {
                ColorFormat::Bgra
            } else {
                ColorFormat::Bgr
            }
        } else {
            ColorFormat::Unknown
        }
    }
}
