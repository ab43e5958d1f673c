// apps/cow_cli/src/main.rs

//! Cow 命令行界面
//!
//! 在进程内用线程模拟笛卡尔进程网格，驱动分布式均匀网格的保护区交换。
//!
//! # 子命令
//!
//! - `run`: 按配置分解全局网格、多轮同步保护带并检查结果
//! - `info`: 打印配置与每个 rank 的分区
//! - `validate`: 检查配置文件

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// 分布式均匀网格命令行工具
#[derive(Parser)]
#[command(name = "cow")]
#[command(author = "Cow Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Distributed uniform mesh with guard zone exchange", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// 日志写入文件而不是标准输出
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行交换
    Run(commands::run::RunArgs),
    /// 显示分解信息
    Info(commands::info::InfoArgs),
    /// 验证配置
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_names(true);
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => tracing::subscriber::set_global_default(builder.finish())?,
    }

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
