// apps/cow_cli/src/commands/mod.rs

//! 子命令与共用的配置装配

pub mod info;
pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use cow_config::{RunConfig, Variant};
use cow_mesh::{dims_create, GuardZoneExtension};

/// 读取配置文件（缺省用默认配置），再应用 `key=value` 覆盖
pub fn load_config(path: Option<&Path>, overrides: &[String]) -> Result<RunConfig> {
    let mut config = match path {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("无法加载配置文件 {}", path.display()))?,
        None => RunConfig::default(),
    };
    if !overrides.is_empty() {
        config
            .apply_overrides(&Variant::from_command_line(overrides))
            .context("命令行覆盖无效")?;
    }
    Ok(config)
}

/// 进程网格与保护区
pub struct Decomposition {
    /// 每轴进程数
    pub dims: Vec<usize>,
    /// 保护区宽度
    pub guard: GuardZoneExtension,
}

impl Decomposition {
    /// 由配置得到分解；未给出 `dims` 时自动均衡分解
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let dims = match &config.dims {
            Some(dims) => dims.clone(),
            None => dims_create(config.processes, config.rank())?,
        };
        let guard = GuardZoneExtension::from_widths(&config.guard.lower, &config.guard.upper)?;
        Ok(Self { dims, guard })
    }
}
