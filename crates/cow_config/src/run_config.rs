// crates/cow_config/src/run_config.rs

//! RunConfig - 分布式运行配置
//!
//! JSON 文件描述全局网格、进程网格、保护区宽度与输出选项；
//! 标量字段可由命令行 `key=value` 覆盖。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::variant::{NamedValues, Variant};

/// 轴数上限
pub const MAX_AXES: usize = 5;

/// 运行配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// 全局网格形状（1–5 个轴）
    #[serde(default = "default_global_shape")]
    pub global_shape: Vec<usize>,

    /// 进程数
    #[serde(default = "default_processes")]
    pub processes: usize,

    /// 每轴进程数；缺省时自动分解
    #[serde(default)]
    pub dims: Option<Vec<usize>>,

    /// 保护区宽度
    #[serde(default)]
    pub guard: GuardConfig,

    /// 同步轮数
    #[serde(default = "default_exchange_steps")]
    pub exchange_steps: usize,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_global_shape() -> Vec<usize> { vec![64, 64] }
fn default_processes() -> usize { 4 }
fn default_exchange_steps() -> usize { 1 }

/// 保护区宽度配置，长度不超过全局形状的轴数，缺省轴为 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// 低侧宽度
    #[serde(default = "default_guard_width")]
    pub lower: Vec<usize>,
    /// 高侧宽度
    #[serde(default = "default_guard_width")]
    pub upper: Vec<usize>,
}

fn default_guard_width() -> Vec<usize> { vec![2, 2] }

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            lower: default_guard_width(),
            upper: default_guard_width(),
        }
    }
}

/// 输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// 每个 rank 写一个 VTK 文件
    #[serde(default)]
    pub write_vtk: bool,

    /// 把每个 rank 的本地数组写入数据集目录
    #[serde(default)]
    pub write_arrays: bool,

    /// VTK 使用二进制编码
    #[serde(default = "default_binary")]
    pub binary: bool,

    /// VTK 标题
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_binary() -> bool { true }
fn default_title() -> String { "cow".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            write_vtk: false,
            write_arrays: false,
            binary: default_binary(),
            title: default_title(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            global_shape: default_global_shape(),
            processes: default_processes(),
            dims: None,
            guard: GuardConfig::default(),
            exchange_steps: default_exchange_steps(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// 从文件加载并验证
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: RunConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 保存到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 全局形状的轴数
    pub fn rank(&self) -> usize {
        self.global_shape.len()
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rank = self.rank();
        if rank == 0 || rank > MAX_AXES {
            return Err(ConfigError::invalid(
                "global_shape",
                format!("{:?}", self.global_shape),
                format!("轴数必须在 1..={} 之间", MAX_AXES),
            ));
        }
        if self.global_shape.contains(&0) {
            return Err(ConfigError::invalid(
                "global_shape",
                format!("{:?}", self.global_shape),
                "轴长必须为正",
            ));
        }
        if self.processes == 0 {
            return Err(ConfigError::invalid("processes", self.processes, "进程数必须为正"));
        }
        if let Some(dims) = &self.dims {
            if dims.len() != rank {
                return Err(ConfigError::invalid(
                    "dims",
                    format!("{:?}", dims),
                    format!("必须有 {} 个轴", rank),
                ));
            }
            if dims.iter().product::<usize>() != self.processes {
                return Err(ConfigError::invalid(
                    "dims",
                    format!("{:?}", dims),
                    format!("各轴之积必须等于进程数 {}", self.processes),
                ));
            }
        }
        for (key, widths) in [("guard.lower", &self.guard.lower), ("guard.upper", &self.guard.upper)] {
            if widths.len() > rank {
                return Err(ConfigError::invalid(
                    key,
                    format!("{:?}", widths),
                    format!("不能超过全局形状的 {} 个轴", rank),
                ));
            }
        }
        Ok(())
    }

    /// 可由命令行覆盖的标量字段
    pub fn to_named_values(&self) -> NamedValues {
        let mut v = NamedValues::new();
        v.insert("global_shape".into(), Variant::Str(join(&self.global_shape)));
        v.insert(
            "dims".into(),
            Variant::Str(self.dims.as_deref().map(join).unwrap_or_default()),
        );
        v.insert("processes".into(), Variant::Int(self.processes as i64));
        v.insert("guard.lower".into(), Variant::Str(join(&self.guard.lower)));
        v.insert("guard.upper".into(), Variant::Str(join(&self.guard.upper)));
        v.insert("exchange_steps".into(), Variant::Int(self.exchange_steps as i64));
        v.insert(
            "output.directory".into(),
            Variant::Str(self.output.directory.display().to_string()),
        );
        v.insert("output.write_vtk".into(), Variant::Bool(self.output.write_vtk));
        v.insert("output.write_arrays".into(), Variant::Bool(self.output.write_arrays));
        v.insert("output.binary".into(), Variant::Bool(self.output.binary));
        v.insert("output.title".into(), Variant::Str(self.output.title.clone()));
        v
    }

    /// 应用 `key=value` 覆盖并重新验证
    ///
    /// 列表字段写作逗号分隔，如 `global_shape=128,64`；`dims=` 表示自动分解。
    pub fn apply_overrides(&mut self, overrides: &NamedValues) -> Result<(), ConfigError> {
        let mut named = self.to_named_values();
        Variant::update(&mut named, overrides)?;

        let mut next = self.clone();
        next.global_shape = parse_list("global_shape", &named["global_shape"])?;
        let dims = parse_list("dims", &named["dims"])?;
        next.dims = if dims.is_empty() { None } else { Some(dims) };
        next.processes = non_negative("processes", &named["processes"])?;
        next.guard.lower = parse_list("guard.lower", &named["guard.lower"])?;
        next.guard.upper = parse_list("guard.upper", &named["guard.upper"])?;
        next.exchange_steps = non_negative("exchange_steps", &named["exchange_steps"])?;
        next.output.directory = PathBuf::from(named["output.directory"].to_string());
        next.output.write_vtk = named["output.write_vtk"].as_bool();
        next.output.write_arrays = named["output.write_arrays"].as_bool();
        next.output.binary = named["output.binary"].as_bool();
        next.output.title = named["output.title"].to_string();

        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn join(values: &[usize]) -> String {
    values
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_list(key: &str, value: &Variant) -> Result<Vec<usize>, ConfigError> {
    let text = value.to_string();
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|e| ConfigError::invalid(key, &text, format!("{}", e)))
        })
        .collect()
}

fn non_negative(key: &str, value: &Variant) -> Result<usize, ConfigError> {
    let n = value.as_int()?;
    usize::try_from(n).map_err(|_| ConfigError::invalid(key, n, "不能为负"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rank(), 2);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{"global_shape": [128]}"#).unwrap();
        assert_eq!(config.processes, 4);
        assert_eq!(config.guard.lower, vec![2, 2]);
        assert!(config.output.binary);
        // 默认保护区写了两个轴，与一维形状不符
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dims_must_match_processes() {
        let mut config = RunConfig::default();
        config.dims = Some(vec![2, 3]);
        assert!(config.validate().is_err());
        config.dims = Some(vec![2, 2]);
        assert!(config.validate().is_ok());
        config.dims = Some(vec![4]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let mut config = RunConfig::default();
        config.global_shape = vec![];
        assert!(config.validate().is_err());
        config.global_shape = vec![1; 6];
        assert!(config.validate().is_err());
        config.global_shape = vec![4, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = RunConfig::default();
        let overrides = Variant::from_command_line([
            "global_shape=128",
            "guard.lower=2",
            "guard.upper=3",
            "processes=4",
            "dims=4",
            "output.write_vtk=true",
            "output.title=blast wave",
        ]);
        config.apply_overrides(&overrides).unwrap();
        assert_eq!(config.global_shape, vec![128]);
        assert_eq!(config.dims, Some(vec![4]));
        assert_eq!(config.guard.upper, vec![3]);
        assert!(config.output.write_vtk);
        assert_eq!(config.output.title, "blast wave");
    }

    #[test]
    fn test_failed_override_leaves_config() {
        let mut config = RunConfig::default();
        let before = config.clone();
        assert!(config
            .apply_overrides(&Variant::from_command_line(["processes=-2"]))
            .is_err());
        assert!(config
            .apply_overrides(&Variant::from_command_line(["dims=3,3"]))
            .is_err());
        assert!(matches!(
            config.apply_overrides(&Variant::from_command_line(["cfl=0.4"])),
            Err(ConfigError::Unrecognized(_))
        ));
        assert_eq!(config, before);
    }
}
