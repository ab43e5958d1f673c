// cow\crates\cow_mesh\src/halo.rs

//! 光环交换
//!
//! [`BlockLayout`] 描述数组缓冲区内的一个跨步子块（不复制数据），
//! [`shift_exchange`] 沿某轴把发送块交给一侧邻居，同时从另一侧邻居接收到接收块。

use std::fmt;

use cow_foundation::view::for_each_offset;
use cow_foundation::{Array, CowError, CowResult, Region, AXES};

use crate::topology::CartesianTopology;

/// 交换方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// 发往坐标较小的邻居，从坐标较大的邻居接收
    TowardLower,
    /// 发往坐标较大的邻居，从坐标较小的邻居接收
    TowardHigher,
}

impl Direction {
    /// 两个方向，按交换顺序
    pub const BOTH: [Direction; 2] = [Direction::TowardLower, Direction::TowardHigher];

    /// 发送目标相对本进程的坐标偏移
    #[inline]
    pub fn send_offset(self) -> isize {
        match self {
            Self::TowardLower => -1,
            Self::TowardHigher => 1,
        }
    }

    /// 接收来源相对本进程的坐标偏移
    #[inline]
    pub fn recv_offset(self) -> isize {
        -self.send_offset()
    }

    /// 交换消息标签：同一轴同一方向的收发两端使用相同标签
    #[inline]
    pub fn tag(self, axis: usize) -> u32 {
        let dir = match self {
            Self::TowardLower => 0,
            Self::TowardHigher => 1,
        };
        (axis * 2 + dir) as u32
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TowardLower => write!(f, "toward-lower"),
            Self::TowardHigher => write!(f, "toward-higher"),
        }
    }
}

// ============================================================================
// 布局描述
// ============================================================================

/// 缓冲区内跨步子块的布局描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    region: Region,
    strides: [usize; AXES],
    extent: usize,
}

impl BlockLayout {
    /// 针对数组解析区域并记录其步长
    pub fn new(array: &Array, region: &Region) -> CowResult<Self> {
        Ok(Self {
            region: region.resolve_within(&array.shape())?,
            strides: array.strides(),
            extent: array.len(),
        })
    }

    /// 解析后的绝对区域
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// 块内元素数
    pub fn len(&self) -> usize {
        self.region.volume()
    }

    /// 是否为空块
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_buffer(&self, buffer: &[f64]) -> CowResult<()> {
        CowError::check_size("exchange buffer", self.extent, buffer.len())
    }

    /// 按行主序把子块打包为连续消息
    pub fn gather(&self, buffer: &[f64]) -> CowResult<Vec<f64>> {
        self.check_buffer(buffer)?;
        let mut packed = Vec::with_capacity(self.len());
        for_each_offset(&self.region, &self.strides, |offset| packed.push(buffer[offset]));
        Ok(packed)
    }

    /// 把连续消息按行主序写回子块
    pub fn scatter(&self, buffer: &mut [f64], message: &[f64]) -> CowResult<()> {
        self.check_buffer(buffer)?;
        if message.len() != self.len() {
            return Err(CowError::communication(format!(
                "消息长度 {} 与接收块 {} 不符",
                message.len(),
                self.len()
            )));
        }
        let mut values = message.iter();
        for_each_offset(&self.region, &self.strides, |offset| {
            if let Some(&v) = values.next() {
                buffer[offset] = v;
            }
        });
        Ok(())
    }
}

// ============================================================================
// 交换
// ============================================================================

/// 沿 `axis` 做一次配对收发
///
/// 发送目标与接收来源由拓扑的周期 `shift` 给出。`send` 与 `recv`
/// 在同一数组内不得重叠；调试构建下检查并返回 [`CowError::RegionOverlap`]。
/// 返回发送的元素数。
pub fn shift_exchange<T: CartesianTopology + ?Sized>(
    topology: &T,
    array: &mut Array,
    axis: usize,
    direction: Direction,
    send: &Region,
    recv: &Region,
) -> CowResult<usize> {
    CowError::check_axis(axis, topology.dimensions().len())?;

    let send_layout = BlockLayout::new(array, send)?;
    let recv_layout = BlockLayout::new(array, recv)?;

    if cfg!(debug_assertions)
        && !send_layout.is_empty()
        && send_layout.region().overlaps(recv_layout.region())
    {
        return Err(CowError::RegionOverlap { axis });
    }

    let dest = topology.shift(axis, direction.send_offset());
    let source = topology.shift(axis, direction.recv_offset());
    let tag = direction.tag(axis);

    tracing::debug!(
        rank = topology.rank(),
        axis,
        %direction,
        dest,
        source,
        elements = send_layout.len(),
        "halo exchange"
    );

    topology.exchange(
        array.as_mut_slice(),
        &send_layout,
        dest,
        &recv_layout,
        source,
        tag,
    )?;
    Ok(send_layout.len())
}
