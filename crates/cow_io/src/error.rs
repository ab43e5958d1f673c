// cow\crates\cow_io\src/error.rs
//! IO 错误类型定义
//!
//! 提供 IO 层的统一错误枚举，底层错误通过 thiserror 自动转换，
//! 并可转换为 `CowError` 以跨层传递。

use cow_foundation::CowError;
use thiserror::Error;

/// IO 层结果类型别名
pub type IoResult<T> = Result<T, IoError>;

/// IO 错误枚举
#[derive(Error, Debug)]
pub enum IoError {
    /// 文件读写失败
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 字段形状与网格不符
    #[error("字段形状无效: {field} 期望 {expected:?}, 实际 {actual:?}")]
    FieldShape {
        /// 字段名
        field: String,
        /// 期望形状
        expected: [usize; 5],
        /// 实际形状
        actual: [usize; 5],
    },

    /// 数据集名称无效
    #[error("无效的数据集名称: '{name}'")]
    InvalidName {
        /// 给定名称
        name: String,
    },

    /// 数据集不存在
    #[error("数据集不存在: {name}")]
    NotFound {
        /// 数据集名称
        name: String,
    },

    /// 文件内容格式错误
    #[error("文件格式错误: {path}: {reason}")]
    Format {
        /// 文件路径
        path: String,
        /// 原因
        reason: String,
    },

    /// JSON 序列化失败
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 基础层错误
    #[error("基础层错误: {0}")]
    Foundation(#[from] CowError),
}

impl IoError {
    /// 文件格式错误
    pub fn format(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// 数据集不存在
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}

impl From<IoError> for CowError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => CowError::from(e),
            IoError::Foundation(e) => e,
            other => CowError::invalid_input(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_foundation() {
        let err: CowError = IoError::not_found("rho").into();
        assert!(matches!(err, CowError::InvalidInput { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err: CowError = IoError::from(io).into();
        assert!(matches!(err, CowError::Io { .. }));
    }
}
