//! 固定五轴的形状与索引
//!
//! 所有数组、区域都固定为 5 个轴，逻辑秩不足 5 时尾部补长度为 1 的轴。
//! 轴 0 变化最慢，轴 4 变化最快（行主序）。
//!
//! # 用法
//!
//! ```
//! use cow_foundation::shape::{shape_from, ShapeExt, AXES};
//!
//! let s = shape_from(&[12, 13, 14]).unwrap();
//! assert_eq!(s, [12, 13, 14, 1, 1]);
//! assert_eq!(s.volume(), 12 * 13 * 14);
//! assert_eq!(s.logical(), vec![12, 13, 14]);
//! assert_eq!(AXES, 5);
//! ```

use crate::error::{CowError, CowResult};

/// 轴数上限
pub const AXES: usize = 5;

/// 每轴长度
pub type Shape = [usize; AXES];

/// 五轴坐标 (i, j, k, m, n)
pub type Index = [usize; AXES];

/// 由 1–5 个轴长构造形状，缺省轴补 1
pub fn shape_from(extents: &[usize]) -> CowResult<Shape> {
    if extents.len() > AXES {
        return Err(CowError::TooManyAxes {
            given: extents.len(),
            max: AXES,
        });
    }
    let mut shape = [1; AXES];
    shape[..extents.len()].copy_from_slice(extents);
    Ok(shape)
}

/// 由 0–5 个坐标构造索引，缺省坐标补 0
pub fn index_from(coords: &[usize]) -> CowResult<Index> {
    if coords.len() > AXES {
        return Err(CowError::TooManyAxes {
            given: coords.len(),
            max: AXES,
        });
    }
    let mut index = [0; AXES];
    index[..coords.len()].copy_from_slice(coords);
    Ok(index)
}

/// 行主序步长：`S[4] = 1`, `S[n] = S[n+1] * shape[n+1]`
#[inline]
pub fn row_major_strides(shape: &Shape) -> [usize; AXES] {
    let mut strides = [1; AXES];
    for n in (0..AXES - 1).rev() {
        strides[n] = strides[n + 1] * shape[n + 1];
    }
    strides
}

/// 形状扩展方法
pub trait ShapeExt {
    /// 元素总数
    fn volume(&self) -> usize;

    /// 展示用的逻辑形状（去掉尾部长度为 1 的轴）
    fn logical(&self) -> Vec<usize>;

    /// 逻辑秩
    fn logical_rank(&self) -> usize {
        self.logical().len()
    }
}

impl ShapeExt for Shape {
    #[inline]
    fn volume(&self) -> usize {
        self.iter().product()
    }

    fn logical(&self) -> Vec<usize> {
        let rank = self
            .iter()
            .rposition(|&n| n != 1)
            .map_or(0, |last| last + 1);
        self[..rank].to_vec()
    }
}
