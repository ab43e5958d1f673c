// cow\crates\cow_mesh\src/local.rs

//! 进程内笛卡尔通信器
//!
//! 每个 rank 持有一个 [`LocalCartComm`]，通常各自运行在一个线程上。
//! 消息投递到目标 rank 的邮箱（按来源与标签分队列），接收端阻塞等待；
//! 发送是缓冲的，因此向自身发送、环形配对交换都不会死锁。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Barrier};

use parking_lot::{Condvar, Mutex};

use cow_foundation::{CowError, CowResult};

use crate::request::{PendingOp, Request};
use crate::topology::CartesianTopology;

/// 规约使用的保留标签
const REDUCE_TAG: u32 = u32::MAX - 1;

type Queues = HashMap<(usize, u32), VecDeque<Vec<f64>>>;

#[derive(Default)]
struct Mailbox {
    queues: Mutex<Queues>,
    arrived: Condvar,
}

impl Mailbox {
    fn deliver(&self, source: usize, tag: u32, message: Vec<f64>) {
        let mut queues = self.queues.lock();
        queues.entry((source, tag)).or_default().push_back(message);
        self.arrived.notify_all();
    }

    fn try_take(&self, source: usize, tag: u32) -> Option<Vec<f64>> {
        self.queues
            .lock()
            .get_mut(&(source, tag))
            .and_then(VecDeque::pop_front)
    }

    fn take(&self, source: usize, tag: u32) -> Vec<f64> {
        let mut queues = self.queues.lock();
        loop {
            if let Some(message) = queues.get_mut(&(source, tag)).and_then(VecDeque::pop_front) {
                return message;
            }
            self.arrived.wait(&mut queues);
        }
    }
}

struct Shared {
    dims: Vec<usize>,
    mailboxes: Vec<Mailbox>,
    barrier: Barrier,
}

/// 进程内通信器（单个 rank 的句柄）
#[derive(Clone)]
pub struct LocalCartComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl LocalCartComm {
    /// 按每轴进程数一次性创建全部 rank 的句柄，下标即编号
    pub fn create(dims: &[usize]) -> CowResult<Vec<LocalCartComm>> {
        if dims.is_empty() || dims.contains(&0) {
            return Err(CowError::invalid_decomposition(format!(
                "无效的进程网格 {:?}",
                dims
            )));
        }
        let size: usize = dims.iter().product();
        let shared = Arc::new(Shared {
            dims: dims.to_vec(),
            mailboxes: (0..size).map(|_| Mailbox::default()).collect(),
            barrier: Barrier::new(size),
        });
        tracing::debug!(?dims, size, "local cartesian communicator created");
        Ok((0..size)
            .map(|rank| LocalCartComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }

    fn check_rank(&self, rank: usize) -> CowResult<()> {
        if rank >= self.size() {
            return Err(CowError::communication(format!(
                "rank {} 不存在 (共 {} 个)",
                rank,
                self.size()
            )));
        }
        Ok(())
    }

    /// 全体交换一个向量，按编号顺序返回每个 rank 的贡献
    fn all_gather(&self, values: &[f64]) -> CowResult<Vec<Vec<f64>>> {
        for dest in 0..self.size() {
            self.send(dest, REDUCE_TAG, values.to_vec())?;
        }
        (0..self.size())
            .map(|source| self.recv(source, REDUCE_TAG))
            .collect()
    }

    fn reduce_scalar(&self, value: f64, op: fn(f64, f64) -> f64) -> CowResult<f64> {
        let parts = self.all_gather(&[value])?;
        parts
            .iter()
            .map(|p| p.first().copied())
            .try_fold(None, |acc: Option<f64>, x| match x {
                Some(x) => Ok(Some(acc.map_or(x, |a| op(a, x)))),
                None => Err(CowError::communication("规约消息为空")),
            })?
            .ok_or_else(|| CowError::communication("没有参与规约的 rank"))
    }
}

impl std::fmt::Debug for LocalCartComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCartComm")
            .field("rank", &self.rank)
            .field("dims", &self.shared.dims)
            .finish()
    }
}

impl CartesianTopology for LocalCartComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.mailboxes.len()
    }

    fn dimensions(&self) -> &[usize] {
        &self.shared.dims
    }

    fn send(&self, dest: usize, tag: u32, message: Vec<f64>) -> CowResult<()> {
        self.check_rank(dest)?;
        tracing::trace!(from = self.rank, to = dest, tag, len = message.len(), "send");
        self.shared.mailboxes[dest].deliver(self.rank, tag, message);
        Ok(())
    }

    fn recv(&self, source: usize, tag: u32) -> CowResult<Vec<f64>> {
        self.check_rank(source)?;
        let message = self.shared.mailboxes[self.rank].take(source, tag);
        tracing::trace!(at = self.rank, from = source, tag, len = message.len(), "recv");
        Ok(message)
    }

    fn post_send(&self, dest: usize, tag: u32, message: Vec<f64>) -> CowResult<Request> {
        self.send(dest, tag, message)?;
        Ok(Request::completed(format!("send {}->{} tag {}", self.rank, dest, tag)))
    }

    fn post_recv(&self, source: usize, tag: u32) -> CowResult<Request> {
        self.check_rank(source)?;
        let op = PendingRecv {
            shared: Arc::clone(&self.shared),
            rank: self.rank,
            source,
            tag,
        };
        Ok(Request::new(
            format!("recv {}<-{} tag {}", self.rank, source, tag),
            Box::new(op),
        ))
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn minimum(&self, value: f64) -> CowResult<f64> {
        self.reduce_scalar(value, f64::min)
    }

    fn maximum(&self, value: f64) -> CowResult<f64> {
        self.reduce_scalar(value, f64::max)
    }

    fn sum(&self, values: &[f64]) -> CowResult<Vec<f64>> {
        let parts = self.all_gather(values)?;
        let mut total = vec![0.0; values.len()];
        for part in &parts {
            if part.len() != total.len() {
                return Err(CowError::communication(format!(
                    "求和向量长度不一致: {} 与 {}",
                    total.len(),
                    part.len()
                )));
            }
            for (t, x) in total.iter_mut().zip(part) {
                *t += x;
            }
        }
        Ok(total)
    }
}

/// 挂起的接收
struct PendingRecv {
    shared: Arc<Shared>,
    rank: usize,
    source: usize,
    tag: u32,
}

impl PendingOp for PendingRecv {
    fn poll(&mut self) -> CowResult<Option<Vec<f64>>> {
        Ok(self.shared.mailboxes[self.rank].try_take(self.source, self.tag))
    }

    fn block(&mut self) -> CowResult<Vec<f64>> {
        Ok(self.shared.mailboxes[self.rank].take(self.source, self.tag))
    }

    fn cancel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_create_assigns_coordinates() {
        let comms = LocalCartComm::create(&[2, 3]).unwrap();
        assert_eq!(comms.len(), 6);
        assert_eq!(comms[4].coordinates(), vec![1, 1]);
        assert_eq!(comms[4].shift(1, 1), 5);
        assert_eq!(comms[5].shift(1, 1), 3);
        assert_eq!(comms[0].shift(0, -1), 3);
        assert!(LocalCartComm::create(&[0]).is_err());
    }

    #[test]
    fn test_self_send_does_not_block() {
        let comms = LocalCartComm::create(&[1]).unwrap();
        comms[0].send(0, 7, vec![1.0, 2.0]).unwrap();
        assert_eq!(comms[0].recv(0, 7).unwrap(), vec![1.0, 2.0]);
        assert!(comms[0].send(1, 7, vec![]).is_err());
    }

    #[test]
    fn test_messages_keep_order_per_tag() {
        let comms = LocalCartComm::create(&[2]).unwrap();
        comms[0].send(1, 1, vec![1.0]).unwrap();
        comms[0].send(1, 2, vec![2.0]).unwrap();
        comms[0].send(1, 1, vec![3.0]).unwrap();
        assert_eq!(comms[1].recv(0, 2).unwrap(), vec![2.0]);
        assert_eq!(comms[1].recv(0, 1).unwrap(), vec![1.0]);
        assert_eq!(comms[1].recv(0, 1).unwrap(), vec![3.0]);
    }

    #[test]
    fn test_reductions_across_threads() {
        let comms = LocalCartComm::create(&[4]).unwrap();
        let results: Vec<(f64, f64, Vec<f64>)> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let r = comm.rank() as f64;
                        (
                            comm.minimum(r).unwrap(),
                            comm.maximum(r).unwrap(),
                            comm.sum(&[r, 1.0]).unwrap(),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (min, max, sum) in results {
            assert_eq!(min, 0.0);
            assert_eq!(max, 3.0);
            assert_eq!(sum, vec![6.0, 4.0]);
        }
    }

    #[test]
    fn test_post_recv_request() {
        let comms = LocalCartComm::create(&[2]).unwrap();
        let mut req = comms[1].post_recv(0, 3).unwrap();
        assert_eq!(req.test().unwrap(), None);
        comms[0].post_send(1, 3, vec![9.0]).unwrap().wait().unwrap();
        assert_eq!(req.test().unwrap(), Some(vec![9.0]));
    }

    #[test]
    fn test_run_in_sequence_orders_ranks() {
        let comms = LocalCartComm::create(&[3]).unwrap();
        let order = Mutex::new(Vec::new());
        thread::scope(|s| {
            for comm in &comms {
                let order = &order;
                s.spawn(move || comm.run_in_sequence(|rank| order.lock().push(rank)));
            }
        });
        assert_eq!(order.into_inner(), vec![0, 1, 2]);
    }
}
