// cow\crates\cow_foundation\src/lib.rs

//! Cow Foundation Layer
//!
//! 五轴稠密数组与区域寻址，是网格分解和 IO 层的共同基础。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型
//! - [`shape`]: 固定五轴的形状、索引与步长
//! - [`region`]: `Range` / `Region` 区域描述与解析
//! - [`memory`]: 64 字节对齐的定长缓冲区
//! - [`array`]: 五轴 `f64` 数组，区域抽取/写入、转置、重塑
//! - [`view`]: 区域视图与里程表游标
//! - [`matrix`]: 小型稠密矩阵
//! - [`metrics`]: 计数器、计时器、秒表
//!
//! # 示例
//!
//! ```
//! use cow_foundation::prelude::*;
//!
//! let a = Array::from_extents(&[12, 13, 14]).unwrap();
//! let t = a.transpose_axes(0, 1).unwrap();
//! assert_eq!(t.shape(), [13, 12, 14, 1, 1]);
//!
//! let interior = Region::new().with_lower(0, 2).with_upper(0, -2);
//! assert_eq!(a.view(&interior).unwrap().shape(), [8, 13, 14, 1, 1]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod error;
pub mod matrix;
pub mod memory;
pub mod metrics;
pub mod region;
pub mod shape;
pub mod view;

// 重导出常用类型
pub use array::Array;
pub use error::{CowError, CowResult};
pub use matrix::Matrix;
pub use memory::AlignedVec;
pub use region::{Range, Region};
pub use shape::{Index, Shape, ShapeExt, AXES};
pub use view::{RegionCursor, View, ViewMut};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::array::Array;
    pub use crate::error::{CowError, CowResult};
    pub use crate::region::{Range, Region};
    pub use crate::shape::{shape_from, Index, Shape, ShapeExt, AXES};
    pub use crate::view::{Element, RegionCursor, View, ViewMut};
    pub use crate::ensure;
}
