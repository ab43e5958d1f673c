// cow\crates\cow_foundation\src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `CowError` 枚举和 `CowResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! 1. **越界**: 线性索引或多轴索引超出数组当前范围
//! 2. **区域**: 区域解析后长度为负、越出数组范围，或形状与操作要求不符
//! 3. **重塑**: 重塑改变了元素总数
//! 4. **秩不匹配**: 全局形状的轴数与进程拓扑的维数不一致
//!
//! 以上错误均属于调用方违反契约，在检测点立即返回，不重试也不修正。
//!
//! # 示例
//!
//! ```
//! use cow_foundation::error::{CowError, CowResult};
//!
//! fn reshape_checked(from: usize, to: usize) -> CowResult<()> {
//!     if from != to {
//!         return Err(CowError::reshape_size(from, to));
//!     }
//!     Ok(())
//! }
//! assert!(reshape_checked(12, 13).is_err());
//! ```

use thiserror::Error;

use crate::shape::Shape;

/// 统一结果类型
pub type CowResult<T> = Result<T, CowError>;

/// Cow 错误类型
#[derive(Error, Debug)]
pub enum CowError {
    // ========================================================================
    // 索引错误
    // ========================================================================
    /// 多轴索引越界
    #[error("索引越界: 轴 {axis} 的索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 越界的轴
        axis: usize,
        /// 访问的索引
        index: usize,
        /// 该轴的长度
        len: usize,
    },

    /// 线性索引越界
    #[error("线性索引越界: {index} 超出范围 0..{len}")]
    LinearIndexOutOfBounds {
        /// 访问的索引
        index: usize,
        /// 元素总数
        len: usize,
    },

    /// 轴编号无效
    #[error("无效的轴编号: {axis} (共 {count} 个轴)")]
    InvalidAxis {
        /// 给定的轴编号
        axis: usize,
        /// 可用的轴数
        count: usize,
    },

    /// 轴数超过上限
    #[error("轴数过多: 给定 {given} 个, 最多 {max} 个")]
    TooManyAxes {
        /// 给定的轴数
        given: usize,
        /// 上限
        max: usize,
    },

    // ========================================================================
    // 区域错误
    // ========================================================================
    /// 区域长度为负
    #[error("区域长度为负: 轴 {axis} 解析为 [{lower}, {upper})")]
    NegativeRegion {
        /// 出错的轴
        axis: usize,
        /// 解析后的下界
        lower: isize,
        /// 解析后的上界
        upper: isize,
    },

    /// 区域超出数组范围
    #[error("区域超出数组范围: 轴 {axis} 上界 {upper} 超过长度 {len}")]
    RegionOutOfBounds {
        /// 出错的轴
        axis: usize,
        /// 解析后的上界
        upper: isize,
        /// 该轴的长度
        len: usize,
    },

    /// 形状不匹配
    #[error("形状不匹配: {operation} 期望 {expected:?}, 实际 {actual:?}")]
    ShapeMismatch {
        /// 触发检查的操作
        operation: &'static str,
        /// 期望形状
        expected: Shape,
        /// 实际形状
        actual: Shape,
    },

    /// 收发区域重叠
    #[error("收发区域重叠: 轴 {axis} 的发送区与接收区相交")]
    RegionOverlap {
        /// 交换所在的轴
        axis: usize,
    },

    // ========================================================================
    // 重塑与分解错误
    // ========================================================================
    /// 重塑改变元素总数
    #[error("重塑失败: 元素总数 {from} 不等于 {to}")]
    ReshapeSize {
        /// 原元素总数
        from: usize,
        /// 新元素总数
        to: usize,
    },

    /// 形状秩与拓扑维数不一致
    #[error("秩不匹配: 全局形状 {shape_rank} 轴, 拓扑 {topology_rank} 维")]
    RankMismatch {
        /// 全局形状的轴数
        shape_rank: usize,
        /// 拓扑的维数
        topology_rank: usize,
    },

    /// 区域分解无效
    #[error("无效的区域分解: {message}")]
    InvalidDecomposition {
        /// 具体原因
        message: String,
    },

    /// 数据长度不匹配
    #[error("数据长度不匹配: {name} 期望 {expected}, 实际 {actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望长度
        expected: usize,
        /// 实际长度
        actual: usize,
    },

    // ========================================================================
    // 通信与 IO
    // ========================================================================
    /// 通信失败
    #[error("通信失败: {message}")]
    Communication {
        /// 底层传输给出的信息
        message: String,
    },

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl CowError {
    /// 多轴索引越界
    pub fn index_out_of_bounds(axis: usize, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { axis, index, len }
    }

    /// 线性索引越界
    pub fn linear_out_of_bounds(index: usize, len: usize) -> Self {
        Self::LinearIndexOutOfBounds { index, len }
    }

    /// 无效轴编号
    pub fn invalid_axis(axis: usize, count: usize) -> Self {
        Self::InvalidAxis { axis, count }
    }

    /// 区域长度为负
    pub fn negative_region(axis: usize, lower: isize, upper: isize) -> Self {
        Self::NegativeRegion { axis, lower, upper }
    }

    /// 形状不匹配
    pub fn shape_mismatch(operation: &'static str, expected: Shape, actual: Shape) -> Self {
        Self::ShapeMismatch {
            operation,
            expected,
            actual,
        }
    }

    /// 重塑改变元素总数
    pub fn reshape_size(from: usize, to: usize) -> Self {
        Self::ReshapeSize { from, to }
    }

    /// 秩不匹配
    pub fn rank_mismatch(shape_rank: usize, topology_rank: usize) -> Self {
        Self::RankMismatch {
            shape_rank,
            topology_rank,
        }
    }

    /// 区域分解无效
    pub fn invalid_decomposition(message: impl Into<String>) -> Self {
        Self::InvalidDecomposition {
            message: message.into(),
        }
    }

    /// 通信失败
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 是否为越界类错误
    pub fn is_bounds_error(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfBounds { .. } | Self::LinearIndexOutOfBounds { .. }
        )
    }

    /// 是否为区域类错误
    pub fn is_region_error(&self) -> bool {
        matches!(
            self,
            Self::NegativeRegion { .. }
                | Self::RegionOutOfBounds { .. }
                | Self::ShapeMismatch { .. }
                | Self::RegionOverlap { .. }
        )
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl CowError {
    /// 检查单轴索引是否在范围内
    #[inline]
    pub fn check_index(axis: usize, index: usize, len: usize) -> CowResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(axis, index, len))
        } else {
            Ok(())
        }
    }

    /// 检查轴编号
    #[inline]
    pub fn check_axis(axis: usize, count: usize) -> CowResult<()> {
        if axis >= count {
            Err(Self::invalid_axis(axis, count))
        } else {
            Ok(())
        }
    }

    /// 检查数据长度
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> CowResult<()> {
        if expected != actual {
            Err(Self::SizeMismatch {
                name,
                expected,
                actual,
            })
        } else {
            Ok(())
        }
    }
}

/// 条件不满足时提前返回错误
///
/// ```
/// use cow_foundation::{ensure, CowError, CowResult};
///
/// fn positive(v: i32) -> CowResult<()> {
///     ensure!(v > 0, CowError::invalid_input("必须为正"));
///     Ok(())
/// }
/// assert!(positive(-1).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for CowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_names_axis() {
        let err = CowError::index_out_of_bounds(2, 14, 12);
        let msg = err.to_string();
        assert!(msg.contains("轴 2"));
        assert!(msg.contains("14"));
        assert!(msg.contains("12"));
        assert!(err.is_bounds_error());
    }

    #[test]
    fn test_negative_region_display() {
        let err = CowError::negative_region(0, 5, 3);
        assert!(err.to_string().contains("[5, 3)"));
        assert!(err.is_region_error());
    }

    #[test]
    fn test_check_index() {
        assert!(CowError::check_index(0, 4, 5).is_ok());
        assert!(CowError::check_index(0, 5, 5).is_err());
    }

    #[test]
    fn test_check_axis() {
        assert!(CowError::check_axis(4, 5).is_ok());
        assert!(matches!(
            CowError::check_axis(5, 5),
            Err(CowError::InvalidAxis { axis: 5, count: 5 })
        ));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: CowError = io_err.into();
        assert!(matches!(err, CowError::Io { .. }));
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: i32) -> CowResult<()> {
            ensure!(value > 0, CowError::invalid_input("value must be positive"));
            Ok(())
        }

        assert!(check(1).is_ok());
        assert!(check(-1).is_err());
    }
}
