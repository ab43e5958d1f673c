// cow\crates\cow_mesh\src/request.rs

//! 非阻塞请求
//!
//! [`Request`] 包装一个尚未完成的收发操作，可 `wait` / `test` / `cancel`。
//! 请求在仍未完成时被丢弃会记录一条警告。

use cow_foundation::CowResult;

/// 传输层提供的未完成操作
pub trait PendingOp: Send {
    /// 非阻塞检查，完成时返回收到的数据（发送操作返回空向量）
    fn poll(&mut self) -> CowResult<Option<Vec<f64>>>;

    /// 阻塞直到完成
    fn block(&mut self) -> CowResult<Vec<f64>>;

    /// 放弃操作
    fn cancel(&mut self);
}

/// 非阻塞请求句柄
pub struct Request {
    label: String,
    op: Option<Box<dyn PendingOp>>,
}

impl Request {
    /// 包装未完成操作
    pub fn new(label: impl Into<String>, op: Box<dyn PendingOp>) -> Self {
        Self {
            label: label.into(),
            op: Some(op),
        }
    }

    /// 已完成的请求
    pub fn completed(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            op: None,
        }
    }

    /// 描述
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 是否仍未完成
    pub fn is_pending(&self) -> bool {
        self.op.is_some()
    }

    /// 阻塞等待完成
    pub fn wait(mut self) -> CowResult<Vec<f64>> {
        match self.op.take() {
            Some(mut op) => op.block(),
            None => Ok(Vec::new()),
        }
    }

    /// 非阻塞检查；完成后请求变为已完成
    pub fn test(&mut self) -> CowResult<Option<Vec<f64>>> {
        let Some(op) = self.op.as_mut() else {
            return Ok(Some(Vec::new()));
        };
        let done = op.poll()?;
        if done.is_some() {
            self.op = None;
        }
        Ok(done)
    }

    /// 取消
    pub fn cancel(mut self) {
        if let Some(mut op) = self.op.take() {
            op.cancel();
            tracing::debug!(request = %self.label, "request cancelled");
        }
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if self.op.is_some() {
            tracing::warn!(request = %self.label, "request dropped while still pending");
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("label", &self.label)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown(usize);

    impl PendingOp for Countdown {
        fn poll(&mut self) -> CowResult<Option<Vec<f64>>> {
            if self.0 == 0 {
                Ok(Some(vec![1.0]))
            } else {
                self.0 -= 1;
                Ok(None)
            }
        }

        fn block(&mut self) -> CowResult<Vec<f64>> {
            self.0 = 0;
            Ok(vec![1.0])
        }

        fn cancel(&mut self) {}
    }

    #[test]
    fn test_request_test_until_done() {
        let mut req = Request::new("countdown", Box::new(Countdown(2)));
        assert_eq!(req.test().unwrap(), None);
        assert_eq!(req.test().unwrap(), None);
        assert_eq!(req.test().unwrap(), Some(vec![1.0]));
        assert!(!req.is_pending());
    }

    #[test]
    fn test_request_wait_and_cancel() {
        let req = Request::new("wait", Box::new(Countdown(5)));
        assert_eq!(req.wait().unwrap(), vec![1.0]);

        let req = Request::new("cancel", Box::new(Countdown(5)));
        assert!(req.is_pending());
        req.cancel();

        assert!(Request::completed("done").wait().unwrap().is_empty());
    }
}
