// apps/cow_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 打印生效的配置和每个 rank 的分区。

use anyhow::Result;
use clap::Args;
use cow_config::Variant;
use cow_mesh::{CartesianTopology, DistributedUniformMesh, LocalCartComm};
use std::path::PathBuf;
use tracing::info;

use super::{load_config, Decomposition};

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 只显示配置表
    #[arg(long)]
    pub defaults: bool,

    /// `key=value` 覆盖
    pub overrides: Vec<String>,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), &args.overrides)?;

    println!("=== 配置 ===");
    print!("{}", Variant::describe(&config.to_named_values()));
    if args.defaults {
        return Ok(());
    }

    let plan = Decomposition::from_config(&config)?;
    info!(dims = ?plan.dims, "进程网格");

    println!("\n=== 分区 ===");
    println!(
        "{:>5}  {:<16} {:<16} {:<16} {}",
        "rank", "coords", "global start", "interior", "local shape"
    );
    let rank = config.rank();
    // 网格构造不通信，可以在一个线程里逐个创建
    for comm in LocalCartComm::create(&plan.dims)? {
        let mesh = DistributedUniformMesh::new(&config.global_shape, comm, plan.guard)?;
        println!(
            "{:>5}  {:<16} {:<16} {:<16} {:?}",
            mesh.topology().rank(),
            format!("{:?}", mesh.topology().coordinates()),
            format!("{:?}", &mesh.global_start()[..rank]),
            format!("{:?}", &mesh.interior_shape()[..rank]),
            &mesh.local_array_shape()[..rank],
        );
    }
    Ok(())
}
