// apps/cow_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 检查配置文件本身，再检查它描述的分解能否建立。

use anyhow::{bail, Result};
use clap::Args;
use cow_config::RunConfig;
use cow_mesh::{DistributedUniformMesh, LocalCartComm};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::Decomposition;

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("验证配置 {}", args.config.display());

    let mut result = ValidationResult::default();
    if let Some(config) = validate_file(&args.config, &mut result) {
        validate_decomposition(&config, &mut result);
        check_output(&config, &mut result);
    }

    for msg in &result.warnings {
        warn!("{}", msg);
        println!("  ! {}", msg);
    }
    for msg in &result.errors {
        error!("{}", msg);
        println!("  ✗ {}", msg);
    }

    if result.is_ok(args.strict) {
        println!("✓ 配置有效");
        Ok(())
    } else {
        bail!(
            "验证失败: {} 个错误, {} 个警告",
            result.errors.len(),
            result.warnings.len()
        )
    }
}

fn validate_file(path: &Path, result: &mut ValidationResult) -> Option<RunConfig> {
    if !path.exists() {
        result.add_error(format!("配置文件不存在: {}", path.display()));
        return None;
    }
    match RunConfig::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            result.add_error(e.to_string());
            None
        }
    }
}

fn validate_decomposition(config: &RunConfig, result: &mut ValidationResult) {
    let plan = match Decomposition::from_config(config) {
        Ok(plan) => plan,
        Err(e) => {
            result.add_error(format!("{:#}", e));
            return;
        }
    };
    // 各 rank 的检查相同，只需构造 rank 0
    let comm = match LocalCartComm::create(&plan.dims) {
        Ok(comms) => comms.into_iter().next(),
        Err(e) => {
            result.add_error(e.to_string());
            return;
        }
    };
    if let Some(comm) = comm {
        if let Err(e) = DistributedUniformMesh::new(&config.global_shape, comm, plan.guard) {
            result.add_error(e.to_string());
        }
    }

    for (axis, (&n, &p)) in config.global_shape.iter().zip(&plan.dims).enumerate() {
        if n % p != 0 {
            result.add_warning(format!("轴 {}: {} 个单元不能被 {} 个进程整除", axis, n, p));
        }
    }
    if config.guard.lower.iter().chain(&config.guard.upper).all(|&w| w == 0) {
        result.add_warning("所有保护区宽度为 0，同步不会交换数据");
    }
}

fn check_output(config: &RunConfig, result: &mut ValidationResult) {
    if config.output.write_vtk && config.rank() > 3 {
        result.add_warning(format!(
            "VTK 输出只支持至多 3 个轴，当前 {} 个轴将跳过",
            config.rank()
        ));
    }
}
