// apps/cow_cli/src/commands/run.rs

//! 运行交换命令
//!
//! 每个 rank 一个线程：按全局周期场填充内部，多轮同步保护带，
//! 然后逐单元检查保护带是否等于周期场，并用归约汇总结果。

use anyhow::{bail, Context, Result};
use clap::Args;
use cow_config::RunConfig;
use cow_foundation::metrics::Stopwatch;
use cow_foundation::{Array, Index, Region, RegionCursor};
use cow_io::{DataSet, DatasetStore, DirectoryStore, MeshLocation, Scalar};
use cow_mesh::{
    CartesianTopology, DistributedUniformMesh, ExchangeSummary, GuardZoneExtension, LocalCartComm,
};
use std::f64::consts::PI;
use std::path::PathBuf;
use std::thread;
use tracing::{debug, info, warn};

use super::{load_config, Decomposition};

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// `key=value` 覆盖，如 `global_shape=128,64 processes=8`
    pub overrides: Vec<String>,
}

/// 单个 rank 的结果
struct RankReport {
    mismatches: usize,
    minimum: f64,
    maximum: f64,
    total: f64,
    exchange: ExchangeSummary,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), &args.overrides)?;
    let plan = Decomposition::from_config(&config)?;
    info!(
        global = ?config.global_shape,
        dims = ?plan.dims,
        steps = config.exchange_steps,
        "=== 开始保护区交换 ==="
    );

    if config.output.write_vtk || config.output.write_arrays {
        std::fs::create_dir_all(&config.output.directory)
            .with_context(|| format!("无法创建输出目录 {}", config.output.directory.display()))?;
    }

    let clock = Stopwatch::new();
    let comms = LocalCartComm::create(&plan.dims)?;
    let reports: Vec<Result<RankReport>> = thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let config = &config;
                let guard = plan.guard;
                thread::Builder::new()
                    .name(format!("rank-{}", comm.rank()))
                    .spawn_scoped(s, move || run_rank(config, comm, guard))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h {
                Ok(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("rank 线程崩溃"))),
                Err(e) => Err(e.into()),
            })
            .collect()
    });
    let reports = reports.into_iter().collect::<Result<Vec<_>>>()?;

    // 归约结果在每个 rank 上相同，取 rank 0
    let Some(first) = reports.first() else {
        bail!("没有 rank");
    };
    let mismatches: usize = reports.iter().map(|r| r.mismatches).sum();
    let exchanges: u64 = reports.iter().map(|r| r.exchange.exchanges).sum();
    let bytes: u64 = reports.iter().map(|r| r.exchange.bytes_sent).sum();
    let slowest = reports
        .iter()
        .map(|r| r.exchange.total_ms)
        .fold(0.0_f64, f64::max);

    info!("=== 交换完成 ===");
    info!(
        "内部值: min={:.6}, max={:.6}, sum={:.6}",
        first.minimum, first.maximum, first.total
    );
    info!("交换次数: {}, 发送字节: {}, 最慢 rank 交换耗时: {:.3} ms", exchanges, bytes, slowest);
    info!("总耗时: {:.3} s", clock.age());

    if mismatches > 0 {
        bail!("{} 个单元与周期场不符", mismatches);
    }
    info!("全部保护带与周期场一致");
    Ok(())
}

/// 全局周期场，坐标先按周期折回
fn periodic_field(global: &[usize], coords: &[isize]) -> f64 {
    coords
        .iter()
        .zip(global)
        .enumerate()
        .map(|(axis, (&c, &n))| {
            let wrapped = c.rem_euclid(n as isize) as f64;
            (2.0 * PI * (axis + 1) as f64 * wrapped / n as f64).sin()
        })
        .sum()
}

/// 本地下标对应的全局坐标（可能越出全局范围）
fn global_coords(mesh: &DistributedUniformMesh<LocalCartComm>, index: &Index) -> Vec<isize> {
    let start = mesh.global_start();
    let guard = mesh.guard();
    (0..mesh.global_shape().len())
        .map(|n| (start[n] + index[n]) as isize - guard.lower[n] as isize)
        .collect()
}

fn run_rank(
    config: &RunConfig,
    comm: LocalCartComm,
    guard: GuardZoneExtension,
) -> Result<RankReport> {
    let global = config.global_shape.as_slice();
    let mesh = DistributedUniformMesh::new(global, comm, guard)?;
    let mut field = mesh.create_array();
    let interior = mesh.interior_region().resolve_within(&field.shape())?;

    for index in RegionCursor::new(&interior) {
        field[index] = periodic_field(global, &global_coords(&mesh, &index));
    }

    for step in 0..config.exchange_steps {
        mesh.synchronize(&mut field)?;
        debug!(step, "guard zones synchronized");
    }

    let mismatches = if config.exchange_steps > 0 {
        count_mismatches(&mesh, &field)
    } else {
        0
    };

    let values: Vec<f64> = field.view(&interior)?.values().collect();
    let local_min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let local_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let local_sum: f64 = values.iter().sum();

    let topology = mesh.topology();
    let minimum = topology.minimum(local_min)?;
    let maximum = topology.maximum(local_max)?;
    let total = topology.sum(&[local_sum, mismatches as f64])?;

    // 输出失败须全体知晓，否则其余 rank 会停在后面的集体操作上
    let written = write_outputs(config, &mesh, &field);
    let failed = topology.sum(&[if written.is_err() { 1.0 } else { 0.0 }])?;
    written.with_context(|| format!("rank {} 写出失败", topology.rank()))?;
    if failed[0] > 0.0 {
        bail!("{} 个 rank 写出失败", failed[0]);
    }

    let exchange = mesh.stats().summary();
    let interior_shape = mesh.interior_shape();
    topology.run_in_sequence(|rank| {
        info!(
            rank,
            coords = ?topology.coordinates(),
            interior = ?&interior_shape[..global.len()],
            exchanges = exchange.exchanges,
            bytes = exchange.bytes_sent,
            "rank 完成"
        );
    });
    if topology.rank() == 0 && total[1] > 0.0 {
        warn!("全体 {} 个单元不一致", total[1]);
    }

    Ok(RankReport {
        mismatches,
        minimum,
        maximum,
        total: total[0],
        exchange,
    })
}

/// 逐单元（含保护带与角区）与周期场比较
fn count_mismatches(mesh: &DistributedUniformMesh<LocalCartComm>, field: &Array) -> usize {
    let global = mesh.global_shape();
    RegionCursor::new(&Region::whole(&field.shape()))
        .filter(|index| field[*index] != periodic_field(global, &global_coords(mesh, index)))
        .inspect(|index| debug!(?index, "guard cell mismatch"))
        .count()
}

fn write_outputs(
    config: &RunConfig,
    mesh: &DistributedUniformMesh<LocalCartComm>,
    field: &Array,
) -> Result<()> {
    let rank = mesh.topology().rank();
    let output = &config.output;

    if output.write_arrays {
        let mut store = DirectoryStore::create(&output.directory)?;
        let group = format!("rank{}", rank);
        store.write_array(&format!("{}/field", group), field)?;
        store.write_scalar(&format!("{}/rank", group), &Scalar::Int(rank as i64))?;
        store.write_scalar(
            &format!("{}/steps", group),
            &Scalar::Int(config.exchange_steps as i64),
        )?;
    }

    if output.write_vtk {
        if config.rank() > 3 {
            if rank == 0 {
                warn!("VTK 输出只支持至多 3 个轴，跳过");
            }
            return Ok(());
        }
        let shape = field.shape();
        let mut ds = DataSet::new([shape[0], shape[1], shape[2]]);
        ds.set_title(format!("{} rank {}", output.title, rank));
        ds.set_binary(output.binary);
        ds.add_scalar_field("field", field.clone(), MeshLocation::Cell)?;
        let path = output.directory.join(format!("rank{:04}.vtk", rank));
        ds.write_to_file(&path)?;
        debug!(path = %path.display(), "vtk written");
    }
    Ok(())
}
