// cow\crates\cow_mesh\src/guard.rs

//! 保护区（光环）宽度
//!
//! 每轴两侧各有一条宽度为 `lower[axis]` / `upper[axis]` 的保护带。
//! 宽度为 0 的一侧对应的区域步长为 0（禁用），交换时跳过。

use serde::{Deserialize, Serialize};

use cow_foundation::{CowError, CowResult, Range, Region, AXES};

use crate::halo::Direction;

/// 每轴两侧的保护区宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GuardZoneExtension {
    /// 低坐标一侧的宽度
    pub lower: [usize; AXES],
    /// 高坐标一侧的宽度
    pub upper: [usize; AXES],
}

impl GuardZoneExtension {
    /// 无保护区
    pub const fn none() -> Self {
        Self {
            lower: [0; AXES],
            upper: [0; AXES],
        }
    }

    /// 前 `rank` 个轴两侧都为 `width`
    pub fn uniform(width: usize, rank: usize) -> Self {
        let mut guard = Self::none();
        for axis in 0..rank.min(AXES) {
            guard.lower[axis] = width;
            guard.upper[axis] = width;
        }
        guard
    }

    /// 由至多 5 个轴的宽度构造，缺省为 0
    pub fn from_widths(lower: &[usize], upper: &[usize]) -> CowResult<Self> {
        let given = lower.len().max(upper.len());
        if given > AXES {
            return Err(CowError::TooManyAxes { given, max: AXES });
        }
        let mut guard = Self::none();
        guard.lower[..lower.len()].copy_from_slice(lower);
        guard.upper[..upper.len()].copy_from_slice(upper);
        Ok(guard)
    }

    /// 某轴两侧宽度之和
    #[inline]
    pub fn total(&self, axis: usize) -> usize {
        self.lower[axis] + self.upper[axis]
    }

    /// 低侧保护带 `[0 : lower)`，其余轴取全长
    pub fn region_lower(&self, axis: usize) -> Region {
        let w = self.lower[axis] as isize;
        Region::new().with_range(axis, strip(0, w, w))
    }

    /// 高侧保护带 `[-upper : 0)`，其余轴取全长
    pub fn region_upper(&self, axis: usize) -> Region {
        let w = self.upper[axis] as isize;
        Region::new().with_range(axis, strip(-w, 0, w))
    }

    /// 内部区域（去掉全部保护带）
    pub fn interior_region(&self) -> Region {
        let mut region = Region::new();
        for axis in 0..AXES {
            region = region.with_range(
                axis,
                Range::new(self.lower[axis] as isize, -(self.upper[axis] as isize), 1),
            );
        }
        region
    }

    /// 某方向交换时本进程发出的内部条带
    ///
    /// - 发往低侧：低端内部条带，宽度为高侧保护带宽度（填补邻居的高侧保护带）
    /// - 发往高侧：高端内部条带，宽度为低侧保护带宽度
    pub fn send_region(&self, axis: usize, direction: Direction) -> Region {
        let lo = self.lower[axis] as isize;
        let up = self.upper[axis] as isize;
        let range = match direction {
            Direction::TowardLower => strip(lo, lo + up, up),
            Direction::TowardHigher => strip(-(up + lo), -up, lo),
        };
        Region::new().with_range(axis, range)
    }

    /// 某方向交换时本进程接收的保护带
    pub fn recv_region(&self, axis: usize, direction: Direction) -> Region {
        match direction {
            Direction::TowardLower => self.region_upper(axis),
            Direction::TowardHigher => self.region_lower(axis),
        }
    }
}

/// 宽度为 0 时返回禁用区间
fn strip(lower: isize, upper: isize, width: isize) -> Range {
    if width == 0 {
        Range::disabled()
    } else {
        Range::new(lower, upper, 1)
    }
}
