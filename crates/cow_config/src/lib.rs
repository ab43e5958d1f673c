// crates/cow_config/src/lib.rs

//! Cow Config Layer
//!
//! 运行配置与命令行参数覆盖。
//!
//! # 模块概览
//!
//! - [`run_config`]: RunConfig 分布式运行配置（JSON）
//! - [`variant`]: Variant 带类型标签的参数值与 `key=value` 覆盖
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! apps/cow_cli    ─> RunConfig, Variant
//! cow_config      ─> RunConfig, Variant (本层)
//! cow_io          ─> DataSet, DatasetStore
//! cow_mesh        ─> DistributedUniformMesh, CartesianTopology
//! cow_foundation  ─> Array, Region
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod run_config;
pub mod variant;

// 重导出核心类型
pub use error::ConfigError;
pub use run_config::{GuardConfig, OutputConfig, RunConfig};
pub use variant::{NamedValues, Variant};
