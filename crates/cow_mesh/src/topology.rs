// cow\crates\cow_mesh\src/topology.rs

//! 笛卡尔进程拓扑
//!
//! [`CartesianTopology`] 是网格层与传输层之间的接缝：进程按行主序排成
//! 笛卡尔网格，各轴周期相接。实现者只需提供点对点收发、屏障和规约，
//! 坐标换算、邻居查找、配对交换和顺序执行由默认方法给出。

use cow_foundation::{CowError, CowResult};

use crate::halo::BlockLayout;
use crate::request::Request;

/// 笛卡尔进程拓扑
pub trait CartesianTopology {
    /// 本进程编号
    fn rank(&self) -> usize;

    /// 进程总数
    fn size(&self) -> usize;

    /// 每轴进程数
    fn dimensions(&self) -> &[usize];

    /// 缓冲式发送：消息入队后立即返回
    fn send(&self, dest: usize, tag: u32, message: Vec<f64>) -> CowResult<()>;

    /// 阻塞接收来自 `source`、标签为 `tag` 的下一条消息
    fn recv(&self, source: usize, tag: u32) -> CowResult<Vec<f64>>;

    /// 非阻塞发送
    fn post_send(&self, dest: usize, tag: u32, message: Vec<f64>) -> CowResult<Request>;

    /// 非阻塞接收
    fn post_recv(&self, source: usize, tag: u32) -> CowResult<Request>;

    /// 全体进程同步
    fn barrier(&self);

    /// 全局最小值
    fn minimum(&self, value: f64) -> CowResult<f64>;

    /// 全局最大值
    fn maximum(&self, value: f64) -> CowResult<f64>;

    /// 逐分量全局求和，各进程向量长度须一致
    fn sum(&self, values: &[f64]) -> CowResult<Vec<f64>>;

    // ========================================================================
    // 默认方法
    // ========================================================================

    /// 本进程坐标
    fn coordinates(&self) -> Vec<usize> {
        coordinates_of(self.dimensions(), self.rank())
    }

    /// 编号对应的坐标
    fn coordinates_of(&self, rank: usize) -> Vec<usize> {
        coordinates_of(self.dimensions(), rank)
    }

    /// 坐标对应的编号，越界坐标按周期折回
    fn rank_of(&self, coords: &[isize]) -> usize {
        rank_of(self.dimensions(), coords)
    }

    /// 沿 `axis` 偏移 `offset` 的邻居编号（周期）
    fn shift(&self, axis: usize, offset: isize) -> usize {
        let mut coords: Vec<isize> = self.coordinates().iter().map(|&c| c as isize).collect();
        coords[axis] += offset;
        self.rank_of(&coords)
    }

    /// 配对收发
    ///
    /// 把 `buffer` 中 `send` 块发往 `dest`，同时从 `source` 接收到 `recv` 块，
    /// 两端使用同一标签。默认实现依赖 `send` 的缓冲语义。
    fn exchange(
        &self,
        buffer: &mut [f64],
        send: &BlockLayout,
        dest: usize,
        recv: &BlockLayout,
        source: usize,
        tag: u32,
    ) -> CowResult<()> {
        let outgoing = send.gather(buffer)?;
        self.send(dest, tag, outgoing)?;
        let incoming = self.recv(source, tag)?;
        recv.scatter(buffer, &incoming)
    }

    /// 按编号顺序逐个执行，每轮之后同步
    fn run_in_sequence<F>(&self, mut f: F)
    where
        F: FnMut(usize),
        Self: Sized,
    {
        for turn in 0..self.size() {
            if turn == self.rank() {
                f(turn);
            }
            self.barrier();
        }
    }
}

/// 行主序编号 -> 坐标
pub fn coordinates_of(dims: &[usize], rank: usize) -> Vec<usize> {
    let mut coords = vec![0; dims.len()];
    let mut rest = rank;
    for (c, &d) in coords.iter_mut().zip(dims).rev() {
        *c = rest % d;
        rest /= d;
    }
    coords
}

/// 坐标 -> 行主序编号，坐标按周期折回
pub fn rank_of(dims: &[usize], coords: &[isize]) -> usize {
    dims.iter().zip(coords).fold(0, |acc, (&d, &c)| {
        acc * d + c.rem_euclid(d as isize) as usize
    })
}

/// 把 `nprocs` 个进程均衡分解到 `ndims` 个轴
///
/// 结果各轴之积等于 `nprocs`，按非增顺序排列。
pub fn dims_create(nprocs: usize, ndims: usize) -> CowResult<Vec<usize>> {
    if nprocs == 0 || ndims == 0 {
        return Err(CowError::invalid_decomposition(format!(
            "无法把 {} 个进程分解到 {} 个轴",
            nprocs, ndims
        )));
    }

    let mut factors = Vec::new();
    let mut rest = nprocs;
    let mut p = 2;
    while p * p <= rest {
        while rest % p == 0 {
            factors.push(p);
            rest /= p;
        }
        p += 1;
    }
    if rest > 1 {
        factors.push(rest);
    }

    // 大因子优先分给当前乘积最小的轴
    let mut dims = vec![1; ndims];
    for &f in factors.iter().rev() {
        if let Some(slot) = dims.iter_mut().min_by_key(|d| **d) {
            *slot *= f;
        }
    }
    dims.sort_unstable_by(|a, b| b.cmp(a));
    Ok(dims)
}
