// cow\crates\cow_foundation\src/region.rs

//! 区域寻址
//!
//! [`Range`] 描述单轴上的半开区间 `[lower : upper : stride)`，
//! [`Region`] 由 5 个 `Range` 组成，描述五轴数组中的一个子块。
//!
//! # 相对与绝对
//!
//! - `upper <= 0` 表示距轴末端的偏移，`lower < 0` 同理；这样的区间称为*相对*区间
//! - 相对区间必须先用 [`Region::absolute`] 针对目标形状解析一次，才能用于拷贝或遍历
//! - 默认区间 `[0 : 0 : 1)` 是相对的，解析后覆盖整条轴（因此不存在"空"的默认区间）
//! - `stride == 0` 表示该轴被禁用：长度为 0，不访问任何元素
//!
//! 长度按 `(upper - lower) / stride` 整除计算，余下不足一步的部分被舍弃，
//! 所有遍历（拷贝、游标、交换布局）都只访问 `size()` 个点。
//!
//! # 示例
//!
//! ```
//! use cow_foundation::region::{Range, Region};
//!
//! let r = Region::new().with_range(0, Range::new(6, 7, 1));
//! let abs = r.absolute(&[12, 12, 12, 1, 1]).unwrap();
//! assert_eq!(abs.shape(), [1, 12, 12, 1, 1]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CowError, CowResult};
use crate::shape::{Shape, AXES};

// ============================================================================
// Range
// ============================================================================

/// 单轴区间 `[lower : upper : stride)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// 下界（负值表示距末端）
    pub lower: isize,
    /// 上界（非正值表示距末端）
    pub upper: isize,
    /// 步长（0 表示禁用）
    pub stride: isize,
}

impl Default for Range {
    fn default() -> Self {
        Self::all()
    }
}

impl Range {
    /// 创建区间
    #[inline]
    pub const fn new(lower: isize, upper: isize, stride: isize) -> Self {
        Self {
            lower,
            upper,
            stride,
        }
    }

    /// 整条轴 `[0 : 0 : 1)`
    #[inline]
    pub const fn all() -> Self {
        Self::new(0, 0, 1)
    }

    /// 单个位置 `[i : i+1 : 1)`
    #[inline]
    pub const fn at(index: isize) -> Self {
        Self::new(index, index + 1, 1)
    }

    /// 禁用的区间（长度为 0）
    #[inline]
    pub const fn disabled() -> Self {
        Self::new(0, 0, 0)
    }

    /// 是否为相对区间
    #[inline]
    pub const fn is_relative(&self) -> bool {
        self.upper <= 0 || self.lower < 0
    }

    /// 是否被禁用
    #[inline]
    pub const fn is_disabled(&self) -> bool {
        self.stride == 0
    }

    /// 针对轴长解析负值/零值边界
    ///
    /// 结果可能是负长度区间，由调用方（[`Region::absolute`]）检查。
    #[inline]
    pub const fn absolute(&self, axis_size: usize) -> Self {
        let n = axis_size as isize;
        let lower = if self.lower < 0 {
            self.lower + n
        } else {
            self.lower
        };
        let upper = if self.upper <= 0 {
            self.upper + n
        } else {
            self.upper
        };
        Self::new(lower, upper, self.stride)
    }

    /// 绝对区间在步长作用后的长度
    #[inline]
    pub const fn size(&self) -> usize {
        if self.stride <= 0 || self.upper <= self.lower {
            0
        } else {
            ((self.upper - self.lower) / self.stride) as usize
        }
    }

    /// 第 `k` 个访问位置
    #[inline]
    pub const fn position(&self, k: usize) -> usize {
        (self.lower + self.stride * k as isize) as usize
    }

    /// 绝对区间是否包含位置 `i`
    pub fn contains(&self, i: usize) -> bool {
        let i = i as isize;
        if self.stride <= 0 || i < self.lower {
            return false;
        }
        let step = (i - self.lower) / self.stride;
        (i - self.lower) % self.stride == 0 && (step as usize) < self.size()
    }

    /// 两个绝对区间是否有公共位置
    pub fn intersects(&self, other: &Range) -> bool {
        let (a, b) = if self.size() <= other.size() {
            (self, other)
        } else {
            (other, self)
        };
        (0..a.size()).any(|k| b.contains(a.position(k)))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}:{})", self.lower, self.upper, self.stride)
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start as isize, r.end as isize, 1)
    }
}

// ============================================================================
// Region
// ============================================================================

/// 五轴区域
///
/// 值类型：构造器方法返回新区域，从不原地修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    ranges: [Range; AXES],
}

impl Region {
    /// 覆盖全部轴的相对区域
    pub const fn new() -> Self {
        Self {
            ranges: [Range::all(); AXES],
        }
    }

    /// 由至多 5 个区间构造，缺省轴覆盖整条轴
    pub fn from_ranges(ranges: &[Range]) -> CowResult<Self> {
        if ranges.len() > AXES {
            return Err(CowError::TooManyAxes {
                given: ranges.len(),
                max: AXES,
            });
        }
        let mut region = Self::new();
        region.ranges[..ranges.len()].copy_from_slice(ranges);
        Ok(region)
    }

    /// 覆盖整个形状的绝对区域
    pub fn whole(shape: &Shape) -> Self {
        let mut region = Self::new();
        for (range, &n) in region.ranges.iter_mut().zip(shape) {
            *range = Range::new(0, n as isize, 1);
        }
        region
    }

    /// 替换某轴区间
    ///
    /// # Panics
    /// `axis >= 5` 时 panic。
    pub fn with_range(mut self, axis: usize, range: Range) -> Self {
        self.ranges[axis] = range;
        self
    }

    /// 替换某轴下界
    pub fn with_lower(mut self, axis: usize, lower: isize) -> Self {
        self.ranges[axis].lower = lower;
        self
    }

    /// 替换某轴上界
    pub fn with_upper(mut self, axis: usize, upper: isize) -> Self {
        self.ranges[axis].upper = upper;
        self
    }

    /// 替换某轴步长
    pub fn with_stride(mut self, axis: usize, stride: isize) -> Self {
        self.ranges[axis].stride = stride;
        self
    }

    /// 某轴区间
    #[inline]
    pub fn range(&self, axis: usize) -> Range {
        self.ranges[axis]
    }

    /// 全部区间
    #[inline]
    pub fn ranges(&self) -> &[Range; AXES] {
        &self.ranges
    }

    /// 每轴下界
    pub fn lower(&self) -> [isize; AXES] {
        self.ranges.map(|r| r.lower)
    }

    /// 每轴上界
    pub fn upper(&self) -> [isize; AXES] {
        self.ranges.map(|r| r.upper)
    }

    /// 每轴步长
    pub fn stride(&self) -> [isize; AXES] {
        self.ranges.map(|r| r.stride)
    }

    /// 是否有任一轴为相对区间
    pub fn is_relative(&self) -> bool {
        self.ranges.iter().any(Range::is_relative)
    }

    /// 针对形状解析为绝对区域
    ///
    /// 对已经是绝对的轴不做改动，因此重复解析是幂等的。
    /// 解析后任一轴下界超过上界时返回 [`CowError::NegativeRegion`]。
    pub fn absolute(&self, shape: &Shape) -> CowResult<Self> {
        let mut resolved = *self;
        for (axis, range) in resolved.ranges.iter_mut().enumerate() {
            if range.is_disabled() {
                continue;
            }
            let abs = range.absolute(shape[axis]);
            if abs.lower > abs.upper {
                return Err(CowError::negative_region(axis, abs.lower, abs.upper));
            }
            *range = abs;
        }
        Ok(resolved)
    }

    /// 解析并确认区域落在形状之内
    pub fn resolve_within(&self, shape: &Shape) -> CowResult<Self> {
        let resolved = self.absolute(shape)?;
        for (axis, range) in resolved.ranges.iter().enumerate() {
            if range.is_disabled() {
                continue;
            }
            if range.lower < 0 || range.upper > shape[axis] as isize {
                return Err(CowError::RegionOutOfBounds {
                    axis,
                    upper: range.upper,
                    len: shape[axis],
                });
            }
        }
        Ok(resolved)
    }

    /// 每轴访问点数（区域需为绝对的）
    pub fn shape(&self) -> Shape {
        self.ranges.map(|r| r.size())
    }

    /// 访问点总数
    pub fn volume(&self) -> usize {
        self.shape().iter().product()
    }

    /// 是否不含任何点
    pub fn is_empty(&self) -> bool {
        self.volume() == 0
    }

    /// 两个绝对区域是否共享至少一个点
    pub fn overlaps(&self, other: &Region) -> bool {
        self.ranges
            .iter()
            .zip(other.ranges.iter())
            .all(|(a, b)| a.intersects(b))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region(")?;
        for (n, range) in self.ranges.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", range)?;
        }
        write!(f, ")")
    }
}
