//! 控制器运行时
//!
//! 将同步控制器放入独立的 tokio 任务中。界面事件通过句柄通道送达，
//! 每次存储调用都在单独的任务中执行，结果经内部完成通道回送，界面不会被阻塞。
//! 所有句柄释放或收到停止请求后，事件循环会等进行中的调用全部完成再退出。

use crate::clinic::patient::events::UiEvent;
use crate::clinic::patient::service::{Completion, PatientSyncController, PendingCall};
use crate::clinic::patient::state::ViewState;
use crate::clinic::patient::store::RecordStore;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum Message {
    Ui(UiEvent),
    Snapshot(oneshot::Sender<ViewState>),
    WhenIdle(oneshot::Sender<()>),
    Shutdown,
}

/// 控制器句柄（可克隆，供界面层发送事件）
///
/// 最后一个句柄释放后，事件循环在进行中的调用完成后退出
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl ControllerHandle {
    /// 发送界面事件（不等待存储调用完成）
    pub fn send(&self, event: impl Into<UiEvent>) -> Result<()> {
        self.tx
            .send(Message::Ui(event.into()))
            .map_err(|_| anyhow!("控制器已停止"))
    }

    /// 获取当前视图状态的快照
    pub async fn snapshot(&self) -> Result<ViewState> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Snapshot(reply))
            .map_err(|_| anyhow!("控制器已停止"))?;
        rx.await.map_err(|_| anyhow!("控制器已停止"))
    }

    /// 等待所有进行中的存储调用（包括触发的刷新）完成
    pub async fn wait_idle(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::WhenIdle(reply))
            .map_err(|_| anyhow!("控制器已停止"))?;
        rx.await.map_err(|_| anyhow!("控制器已停止"))
    }

    /// 停止接收界面事件；进行中的调用仍会完成并应用结果，之后事件循环退出
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

/// 启动控制器事件循环，返回句柄和任务（任务结束时交还控制器）
pub fn spawn_controller(
    controller: PatientSyncController,
) -> (ControllerHandle, JoinHandle<PatientSyncController>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(controller, rx));
    (ControllerHandle { tx }, task)
}

/// 在独立任务中执行调用，结果回送到完成通道
fn spawn_calls(
    store: &Arc<dyn RecordStore>,
    done_tx: &mpsc::UnboundedSender<Completion>,
    calls: Vec<PendingCall>,
) -> usize {
    let count = calls.len();
    for call in calls {
        let store = store.clone();
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let completion = PatientSyncController::execute(store, call).await;
            if done_tx.send(completion).is_err() {
                warn!("[PatientRuntime] 控制器已停止，丢弃调用结果");
            }
        });
    }
    count
}

async fn run(
    mut controller: PatientSyncController,
    mut rx: mpsc::UnboundedReceiver<Message>,
) -> PatientSyncController {
    let store = controller.store();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut in_flight = 0usize;
    let mut draining = false;
    let mut idle_waiters: Vec<oneshot::Sender<()>> = Vec::new();

    info!("[PatientRuntime] 🚀 控制器事件循环启动");

    loop {
        if draining && in_flight == 0 {
            break;
        }

        tokio::select! {
            message = rx.recv(), if !draining => match message {
                Some(Message::Ui(event)) => {
                    debug!("[PatientRuntime] 收到界面事件: {:?}", event);
                    let calls = controller.dispatch(event);
                    in_flight += spawn_calls(&store, &done_tx, calls);
                }
                Some(Message::Snapshot(reply)) => {
                    let _ = reply.send(controller.state().clone());
                }
                Some(Message::WhenIdle(reply)) => idle_waiters.push(reply),
                Some(Message::Shutdown) => {
                    info!("[PatientRuntime] 收到停止请求，剩余 {} 个调用", in_flight);
                    draining = true;
                }
                None => {
                    debug!("[PatientRuntime] 所有句柄已释放，剩余 {} 个调用", in_flight);
                    draining = true;
                }
            },
            Some(completion) = done_rx.recv(), if in_flight > 0 => {
                in_flight -= 1;
                let calls = controller.apply_completion(completion).await;
                in_flight += spawn_calls(&store, &done_tx, calls);
            }
            else => break,
        }

        if in_flight == 0 {
            for waiter in idle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    info!("[PatientRuntime] 👋 控制器事件循环退出");
    controller
}
