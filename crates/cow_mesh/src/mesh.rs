// cow\crates\cow_mesh\src/mesh.rs

//! 分布式均匀网格
//!
//! 把全局形状按笛卡尔拓扑切分到各进程，每个进程的本地数组为
//! 内部分区加两侧保护带。内部分区长度由 [`best_partition`] 均衡给出：
//! 余数分给坐标最小的若干进程，任意两进程分区长度之差不超过 1。
//!
//! # 示例
//!
//! ```
//! use cow_mesh::{DistributedUniformMesh, GuardZoneExtension, LocalCartComm};
//!
//! let comms = LocalCartComm::create(&[4]).unwrap();
//! let guard = GuardZoneExtension::from_widths(&[2], &[3]).unwrap();
//! let mesh = DistributedUniformMesh::new(&[128], comms[0].clone(), guard).unwrap();
//! assert_eq!(mesh.local_array_shape(), [37, 1, 1, 1, 1]);
//! ```

use serde::Serialize;

use cow_foundation::ensure;
use cow_foundation::metrics::{Counter, Timer};
use cow_foundation::{Array, CowError, CowResult, Index, Region, Shape, AXES};

use crate::guard::GuardZoneExtension;
use crate::halo::{self, Direction};
use crate::topology::CartesianTopology;

/// 第 `index` 个分区的长度
///
/// `floor(total / parts) + (index < total % parts ? 1 : 0)`。
/// `parts` 为 0 时返回 0。
#[inline]
pub fn best_partition(total: usize, parts: usize, index: usize) -> usize {
    if parts == 0 {
        return 0;
    }
    total / parts + usize::from(index < total % parts)
}

/// 第 `index` 个分区在全局轴上的起点
fn partition_start(total: usize, parts: usize, index: usize) -> usize {
    (0..index).map(|i| best_partition(total, parts, i)).sum()
}

// ============================================================================
// 交换统计
// ============================================================================

/// 光环交换统计
#[derive(Debug, Default)]
pub struct ExchangeStats {
    exchanges: Counter,
    elements: Counter,
    timer: Timer,
}

/// 统计快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExchangeSummary {
    /// 交换次数
    pub exchanges: u64,
    /// 发送的字节数
    pub bytes_sent: u64,
    /// 累计耗时（毫秒）
    pub total_ms: f64,
}

impl ExchangeStats {
    /// 当前快照
    pub fn summary(&self) -> ExchangeSummary {
        ExchangeSummary {
            exchanges: self.exchanges.get(),
            bytes_sent: self.elements.get() * std::mem::size_of::<f64>() as u64,
            total_ms: self.timer.total_ms(),
        }
    }

    /// 清零
    pub fn reset(&self) {
        self.exchanges.reset();
        self.elements.reset();
        self.timer.reset();
    }
}

// ============================================================================
// 网格
// ============================================================================

/// 分布式均匀网格
#[derive(Debug)]
pub struct DistributedUniformMesh<T: CartesianTopology> {
    global_shape: Vec<usize>,
    topology: T,
    guard: GuardZoneExtension,
    stats: ExchangeStats,
}

impl<T: CartesianTopology> DistributedUniformMesh<T> {
    /// 创建网格
    ///
    /// # 错误
    ///
    /// - 全局形状轴数与拓扑维数不同: [`CowError::RankMismatch`]
    /// - 轴数超过 5: [`CowError::TooManyAxes`]
    /// - 非活动轴带保护区，或分区窄于保护带: [`CowError::InvalidDecomposition`]
    pub fn new(global_shape: &[usize], topology: T, guard: GuardZoneExtension) -> CowResult<Self> {
        let rank = global_shape.len();
        ensure!(
            rank == topology.dimensions().len(),
            CowError::rank_mismatch(rank, topology.dimensions().len())
        );
        ensure!(rank <= AXES, CowError::TooManyAxes { given: rank, max: AXES });
        ensure!(rank > 0, CowError::invalid_decomposition("全局形状为空"));

        for axis in rank..AXES {
            if guard.total(axis) != 0 {
                return Err(CowError::invalid_decomposition(format!(
                    "轴 {} 不参与分解，但保护区宽度为 ({}, {})",
                    axis, guard.lower[axis], guard.upper[axis]
                )));
            }
        }
        for (axis, (&total, &parts)) in global_shape.iter().zip(topology.dimensions()).enumerate() {
            let narrowest = best_partition(total, parts, parts.saturating_sub(1));
            let widest_guard = guard.lower[axis].max(guard.upper[axis]);
            if narrowest < widest_guard {
                return Err(CowError::invalid_decomposition(format!(
                    "轴 {}: 分区长度 {} 小于保护区宽度 {}",
                    axis, narrowest, widest_guard
                )));
            }
        }

        let mesh = Self {
            global_shape: global_shape.to_vec(),
            topology,
            guard,
            stats: ExchangeStats::default(),
        };
        tracing::info!(
            rank = mesh.topology.rank(),
            global = ?mesh.global_shape,
            dims = ?mesh.topology.dimensions(),
            local = ?mesh.local_array_shape(),
            "distributed mesh created"
        );
        Ok(mesh)
    }

    /// 全局形状
    pub fn global_shape(&self) -> &[usize] {
        &self.global_shape
    }

    /// 进程拓扑
    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// 保护区宽度
    pub fn guard(&self) -> &GuardZoneExtension {
        &self.guard
    }

    /// 交换统计
    pub fn stats(&self) -> &ExchangeStats {
        &self.stats
    }

    /// 本进程内部分区形状（不含保护带）
    pub fn interior_shape(&self) -> Shape {
        let coords = self.topology.coordinates();
        let dims = self.topology.dimensions();
        let mut shape = [1; AXES];
        for (axis, &total) in self.global_shape.iter().enumerate() {
            shape[axis] = best_partition(total, dims[axis], coords[axis]);
        }
        shape
    }

    /// 本地数组形状：内部分区加两侧保护带
    pub fn local_array_shape(&self) -> Shape {
        let mut shape = self.interior_shape();
        for (axis, n) in shape.iter_mut().enumerate() {
            *n += self.guard.total(axis);
        }
        shape
    }

    /// 本进程第一个内部单元的全局坐标
    pub fn global_start(&self) -> Index {
        let coords = self.topology.coordinates();
        let dims = self.topology.dimensions();
        let mut start = [0; AXES];
        for (axis, &total) in self.global_shape.iter().enumerate() {
            start[axis] = partition_start(total, dims[axis], coords[axis]);
        }
        start
    }

    /// 本地数组中的内部区域
    pub fn interior_region(&self) -> Region {
        self.guard.interior_region()
    }

    /// 按本地形状分配零初始化数组
    pub fn create_array(&self) -> Array {
        Array::new(self.local_array_shape())
    }

    /// 沿 `axis` 的一次配对交换，使用调用方给出的收发区域
    pub fn shift_exchange(
        &self,
        array: &mut Array,
        axis: usize,
        direction: Direction,
        send: &Region,
        recv: &Region,
    ) -> CowResult<()> {
        let _timing = self.stats.timer.start();
        let sent = halo::shift_exchange(&self.topology, array, axis, direction, send, recv)?;
        self.stats.exchanges.inc();
        self.stats.elements.add(sent as u64);
        Ok(())
    }

    /// 用保护区定义的条带沿 `axis` 交换一个方向；宽度为 0 的方向跳过
    pub fn exchange_guard(&self, array: &mut Array, axis: usize, direction: Direction) -> CowResult<()> {
        let send = self.guard.send_region(axis, direction);
        if send.range(axis).is_disabled() {
            return Ok(());
        }
        let recv = self.guard.recv_region(axis, direction);
        self.shift_exchange(array, axis, direction, &send, &recv)
    }

    /// 刷新全部保护带
    ///
    /// 按轴 0 起的固定顺序、每轴两个方向依次交换，
    /// 后面的轴会带上前面轴已更新的边，角区因此一致。全体进程都必须调用。
    pub fn synchronize(&self, array: &mut Array) -> CowResult<()> {
        if array.shape() != self.local_array_shape() {
            return Err(CowError::shape_mismatch(
                "synchronize",
                self.local_array_shape(),
                array.shape(),
            ));
        }
        for axis in 0..self.global_shape.len() {
            for direction in Direction::BOTH {
                self.exchange_guard(array, axis, direction)?;
            }
        }
        Ok(())
    }
}
