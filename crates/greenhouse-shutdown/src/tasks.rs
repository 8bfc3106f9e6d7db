use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

/// 长运行任务组
///
/// 记录网关派生的后台任务，关闭时限时汇合
pub struct TaskGroup {
    handles: Vec<(String, JoinHandle<()>)>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// 派生一个命名后台任务
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        info!(task = %name, "Spawning background task");
        self.handles.push((name, tokio::spawn(future)));
    }

    /// 限时等待所有任务退出
    ///
    /// 超时的任务被中止，不允许泄漏
    pub async fn join_all(self, deadline: Duration) {
        for (name, handle) in self.handles {
            let abort = handle.abort_handle();
            match timeout(deadline, handle).await {
                Ok(Ok(())) => {
                    info!(task = %name, "Task exited cleanly");
                }
                Ok(Err(e)) => {
                    warn!(task = %name, error = %e, "Task panicked or was aborted");
                }
                Err(_) => {
                    abort.abort();
                    warn!(task = %name, timeout = ?deadline, "Task did not exit in time, aborting");
                }
            }
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_completed_tasks() {
        let mut group = TaskGroup::new();
        group.spawn("noop", async {});
        group.spawn("short", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
        });

        group.join_all(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_join_times_out_on_stuck_task() {
        let mut group = TaskGroup::new();
        group.spawn("stuck", async {
            std::future::pending::<()>().await;
        });

        // 不应永久阻塞
        group.join_all(Duration::from_millis(50)).await;
    }
}
