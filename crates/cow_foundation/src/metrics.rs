// cow\crates\cow_foundation\src\metrics.rs
//! 轻量计数与计时
//!
//! 原子计数器、累积计时器和秒表，供网格层统计交换次数、字节数与耗时。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 原子计数器（无锁）
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// 创建零值计数器
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// 增加计数
    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// 增加指定值
    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// 获取当前值
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// 重置为零
    #[inline]
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

// ============================================================================
// 计时器
// ============================================================================

/// 累积计时器
#[derive(Debug, Default)]
pub struct Timer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Timer {
    /// 创建计时器
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// 开始计时，守卫 drop 时记录
    ///
    /// ```
    /// use cow_foundation::metrics::Timer;
    ///
    /// let timer = Timer::new();
    /// {
    ///     let _guard = timer.start();
    /// }
    /// assert_eq!(timer.count(), 1);
    /// ```
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            start: Instant::now(),
        }
    }

    /// 手动记录一次
    pub fn record(&self, elapsed: Duration) {
        self.total_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// 总时间（纳秒）
    pub fn total_ns(&self) -> u64 {
        self.total_ns.load(Ordering::Relaxed)
    }

    /// 总时间（毫秒）
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }

    /// 记录次数
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// 平均时间（毫秒）
    pub fn avg_ms(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            c => self.total_ms() / c as f64,
        }
    }

    /// 重置
    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// 计时守卫
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    start: Instant,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

// ============================================================================
// 秒表
// ============================================================================

/// 自创建起计时的秒表
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    born: Instant,
}

impl Stopwatch {
    /// 从现在开始
    pub fn new() -> Self {
        Self {
            born: Instant::now(),
        }
    }

    /// 创建以来经过的秒数
    pub fn age(&self) -> f64 {
        self.born.elapsed().as_secs_f64()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
