/// `am`命令的类型化extra取值。
///
/// 每种取值对应一个`--e*`旗标；数组类取值以逗号连接后
/// 用带`a`后缀的旗标传递。
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraValue {
    Str(String),
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Uri(String),
    Component(String),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    StrArray(Vec<String>),
}

impl ExtraValue {
    /// 取值对应的`am`旗标
    pub fn flag(&self) -> &'static str {
        match self {
            ExtraValue::Str(_) => "--es",
            ExtraValue::Null => "--esn",
            ExtraValue::Bool(_) => "--ez",
            ExtraValue::Int(_) => "--ei",
            ExtraValue::Long(_) => "--el",
            ExtraValue::Float(_) => "--ef",
            ExtraValue::Uri(_) => "--eu",
            ExtraValue::Component(_) => "--ecn",
            ExtraValue::IntArray(_) => "--eia",
            ExtraValue::LongArray(_) => "--ela",
            ExtraValue::FloatArray(_) => "--efa",
            ExtraValue::StrArray(_) => "--esa",
        }
    }

    /// 渲染取值文本；Null只有键没有值。浮点取值按`%g`格式渲染。
    fn render(&self) -> Option<String> {
        fn join<T: ToString>(values: &[T]) -> String {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        }
        match self {
            ExtraValue::Str(s) | ExtraValue::Uri(s) | ExtraValue::Component(s) => Some(s.clone()),
            ExtraValue::Null => None,
            ExtraValue::Bool(b) => Some(b.to_string()),
            ExtraValue::Int(i) => Some(i.to_string()),
            ExtraValue::Long(i) => Some(i.to_string()),
            ExtraValue::Float(f) => Some(format_g(*f)),
            ExtraValue::IntArray(v) => Some(join(v)),
            ExtraValue::LongArray(v) => Some(join(v)),
            ExtraValue::FloatArray(v) => Some(
                v.iter()
                    .map(|f| format_g(*f))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            ExtraValue::StrArray(v) => Some(v.join(",")),
        }
    }
}

/// C printf的`%g`：6位有效数字，十进制指数落在[-4, 6)之外时
/// 换科学计数法，随后去掉小数部分的尾零。
fn format_g(value: f32) -> String {
    const SIGNIFICANT: usize = 6;
    if value == 0.0 {
        return if value.is_sign_negative() {
            "-0".to_string()
        } else {
            "0".to_string()
        };
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    // 先按%e舍入到6位有效数字，再从结果中取十进制指数
    let sci = format!("{:.*e}", SIGNIFICANT - 1, value);
    let (mantissa, exp_text) = sci.split_once('e').unwrap();
    let exp: i32 = exp_text.parse().unwrap();

    if exp >= -4 && exp < SIGNIFICANT as i32 {
        let decimals = (SIGNIFICANT as i32 - 1 - exp).max(0) as usize;
        trim_trailing_zeros(format!("{:.*}", decimals, value))
    } else {
        let mantissa = trim_trailing_zeros(mantissa.to_string());
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    }
}

fn trim_trailing_zeros(mut text: String) -> String {
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    text
}

impl From<&str> for ExtraValue {
    fn from(s: &str) -> Self {
        ExtraValue::Str(s.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(s: String) -> Self {
        ExtraValue::Str(s)
    }
}

impl From<bool> for ExtraValue {
    fn from(b: bool) -> Self {
        ExtraValue::Bool(b)
    }
}

impl From<i32> for ExtraValue {
    fn from(i: i32) -> Self {
        ExtraValue::Int(i)
    }
}

impl From<i64> for ExtraValue {
    fn from(i: i64) -> Self {
        ExtraValue::Long(i)
    }
}

impl From<f32> for ExtraValue {
    fn from(f: f32) -> Self {
        ExtraValue::Float(f)
    }
}

impl From<Vec<i32>> for ExtraValue {
    fn from(v: Vec<i32>) -> Self {
        ExtraValue::IntArray(v)
    }
}

impl From<Vec<i64>> for ExtraValue {
    fn from(v: Vec<i64>) -> Self {
        ExtraValue::LongArray(v)
    }
}

impl From<Vec<f32>> for ExtraValue {
    fn from(v: Vec<f32>) -> Self {
        ExtraValue::FloatArray(v)
    }
}

impl From<Vec<String>> for ExtraValue {
    fn from(v: Vec<String>) -> Self {
        ExtraValue::StrArray(v)
    }
}

impl From<Vec<&str>> for ExtraValue {
    fn from(v: Vec<&str>) -> Self {
        ExtraValue::StrArray(v.into_iter().map(String::from).collect())
    }
}

/// 结构化的activity描述，编码为`am start` / `am broadcast`的参数向量。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intent {
    pub action: Option<String>,
    pub data_uri: Option<String>,
    pub mime_type: Option<String>,
    pub categories: Vec<String>,
    pub component: Option<String>,
    pub flags: Option<u32>,
    pub extras: Vec<(String, ExtraValue)>,
}

impl Intent {
    pub fn new() -> Intent {
        Intent::default()
    }

    pub fn from_action(action: &str) -> Intent {
        let mut intent = Intent::new();
        intent.action = Some(action.to_string());
        intent
    }

    pub fn with_data_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.data_uri = Some(uri.into());
        self
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_component<S: Into<String>>(mut self, component: S) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn with_extra<K: Into<String>, V: Into<ExtraValue>>(mut self, key: K, value: V) -> Self {
        self.extras.push((key.into(), value.into()));
        self
    }

    /// 编码为参数向量。
    ///
    /// 顺序：`-a` `-d` `-t` `-c`* `-n` `-f`，然后按声明顺序输出extras，
    /// 每个extra恰好出现一次。flags以十进制渲染。
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![];
        if let Some(action) = &self.action {
            args.push("-a".to_string());
            args.push(action.clone());
        }
        if let Some(data_uri) = &self.data_uri {
            args.push("-d".to_string());
            args.push(data_uri.clone());
        }
        if let Some(mime_type) = &self.mime_type {
            args.push("-t".to_string());
            args.push(mime_type.clone());
        }
        for category in &self.categories {
            args.push("-c".to_string());
            args.push(category.clone());
        }
        if let Some(component) = &self.component {
            args.push("-n".to_string());
            args.push(component.clone());
        }
        if let Some(flags) = self.flags {
            args.push("-f".to_string());
            args.push(flags.to_string());
        }
        for (key, value) in &self.extras {
            args.push(value.flag().to_string());
            args.push(key.clone());
            if let Some(rendered) = value.render() {
                args.push(rendered);
            }
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_intent() {
        assert!(Intent::new().to_args().is_empty());
    }

    #[test]
    fn test_basic_fields_order() {
        let intent = Intent::from_action("android.intent.action.VIEW")
            .with_data_uri("http://example.org")
            .with_mime_type("text/html")
            .with_category("android.intent.category.BROWSABLE")
            .with_category("android.intent.category.DEFAULT")
            .with_component("com.example/.MainActivity")
            .with_flags(0x10000000);
        assert_eq!(
            intent.to_args(),
            vec![
                "-a",
                "android.intent.action.VIEW",
                "-d",
                "http://example.org",
                "-t",
                "text/html",
                "-c",
                "android.intent.category.BROWSABLE",
                "-c",
                "android.intent.category.DEFAULT",
                "-n",
                "com.example/.MainActivity",
                "-f",
                "268435456",
            ]
        );
    }

    #[test]
    fn test_typed_extras() {
        let intent = Intent::new()
            .with_extra("name", "value")
            .with_extra("missing", ExtraValue::Null)
            .with_extra("enabled", true)
            .with_extra("count", 7i32)
            .with_extra("stamp", 1_700_000_000i64)
            .with_extra("ratio", 0.5f32)
            .with_extra("link", ExtraValue::Uri("content://x".to_string()))
            .with_extra("target", ExtraValue::Component("a/b".to_string()));
        assert_eq!(
            intent.to_args(),
            vec![
                "--es", "name", "value", "--esn", "missing", "--ez", "enabled", "true", "--ei",
                "count", "7", "--el", "stamp", "1700000000", "--ef", "ratio", "0.5", "--eu",
                "link", "content://x", "--ecn", "target", "a/b",
            ]
        );
    }

    #[test]
    fn test_array_extras_comma_joined() {
        let intent = Intent::new()
            .with_extra("ints", vec![1i32, 2, 3])
            .with_extra("longs", vec![4i64, 5])
            .with_extra("names", vec!["a", "b"]);
        assert_eq!(
            intent.to_args(),
            vec![
                "--eia", "ints", "1,2,3", "--ela", "longs", "4,5", "--esa", "names", "a,b",
            ]
        );
    }

    #[test]
    fn test_format_g_fixed_notation() {
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(-0.0), "-0");
        assert_eq!(format_g(0.5), "0.5");
        assert_eq!(format_g(-2.5), "-2.5");
        assert_eq!(format_g(100.0), "100");
        assert_eq!(format_g(3.14159), "3.14159");
        assert_eq!(format_g(0.0001), "0.0001");
    }

    #[test]
    fn test_format_g_six_significant_digits() {
        assert_eq!(format_g(3.14159265), "3.14159");
        assert_eq!(format_g(123456.7), "123457");
    }

    #[test]
    fn test_format_g_scientific_notation() {
        assert_eq!(format_g(123456789.0), "1.23457e+08");
        assert_eq!(format_g(1234567.0), "1.23457e+06");
        assert_eq!(format_g(0.00001), "1e-05");
        assert_eq!(format_g(-0.00001), "-1e-05");
    }

    #[test]
    fn test_float_extras_render_with_g_format() {
        let intent = Intent::new()
            .with_extra("big", 123456789.0f32)
            .with_extra("tiny", 0.00001f32)
            .with_extra("ratios", vec![0.5f32, 100.0]);
        assert_eq!(
            intent.to_args(),
            vec![
                "--ef", "big", "1.23457e+08", "--ef", "tiny", "1e-05", "--efa", "ratios",
                "0.5,100",
            ]
        );
    }

    #[test]
    fn test_each_extra_appears_once() {
        let intent = Intent::new()
            .with_extra("a", 1i32)
            .with_extra("b", 2i32)
            .with_extra("c", true);
        let args = intent.to_args();
        for key in ["a", "b", "c"] {
            assert_eq!(args.iter().filter(|v| v.as_str() == key).count(), 1);
        }
    }
}
