// cow\crates\cow_io\src/lib.rs

//! Cow IO 模块
//!
//! 数组的可视化输出与持久化。
//!
//! # 模块
//!
//! - [`vtk`]: 旧式 VTK 直线网格写出 (ASCII / 大端二进制)
//! - [`dataset`]: 数据集存储接口（数组、标量、参数组），内存与目录两种实现
//! - [`error`]: IO 错误类型

#![warn(missing_docs)]

pub mod dataset;
pub mod error;
pub mod vtk;

// 重导出常用类型
pub use dataset::{DatasetStore, DirectoryStore, MemoryStore, Scalar};
pub use error::{IoError, IoResult};
pub use vtk::{DataSet, MeshLocation};
