// cow\crates\cow_mesh\src/lib.rs

//! Cow Mesh Layer
//!
//! 笛卡尔区域分解与光环交换。
//!
//! # 模块概览
//!
//! - [`guard`]: 每轴两侧的保护区宽度及对应条带区域
//! - [`topology`]: `CartesianTopology` 接口与坐标换算
//! - [`request`]: 非阻塞请求
//! - [`local`]: 进程内通信器，每个 rank 一个线程
//! - [`halo`]: 布局描述与配对交换
//! - [`mesh`]: `DistributedUniformMesh`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod guard;
pub mod halo;
pub mod local;
pub mod mesh;
pub mod request;
pub mod topology;

pub use guard::GuardZoneExtension;
pub use halo::{shift_exchange, BlockLayout, Direction};
pub use local::LocalCartComm;
pub use mesh::{best_partition, DistributedUniformMesh, ExchangeStats, ExchangeSummary};
pub use request::{PendingOp, Request};
pub use topology::{dims_create, CartesianTopology};
