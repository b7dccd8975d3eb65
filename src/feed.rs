//! 원격 변경 알림
//!
//! 구독자는 어떤 테이블이 바뀌었는지만 받습니다. 변경 내용은 다시 조회해야 합니다.

use crate::remote::{RemoteStore, RemoteTable};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: RemoteTable,
}

pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// 외부(실시간 브리지 등)에서 직접 알림을 넣는 피드
pub struct ChannelFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChannelFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// 알림 발행. 받은 구독자 수 반환 (구독자가 없으면 0)
    pub fn notify(&self, table: RemoteTable) -> usize {
        self.sender.send(ChangeEvent { table }).unwrap_or(0)
    }
}

impl ChangeFeed for ChannelFeed {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

/// 주기적으로 테이블 내용을 조회해 지문이 바뀌면 알림
///
/// 첫 조회는 기준값만 기록합니다. 조회 실패 시 이전 지문을 유지합니다.
pub struct PollingFeed {
    sender: broadcast::Sender<ChangeEvent>,
    task: JoinHandle<()>,
}

impl PollingFeed {
    /// tokio 런타임 안에서 호출해야 함
    pub fn start(remote: Arc<dyn RemoteStore>, tables: &[RemoteTable], every: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(poll_loop(remote, tables.to_vec(), every, sender.clone()));
        log::info!("[Feed] polling {} tables every {:?}", tables.len(), every);
        Self { sender, task }
    }
}

impl ChangeFeed for PollingFeed {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Drop for PollingFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn fingerprint(rows: &[serde_json::Value]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for row in rows {
        row.to_string().hash(&mut hasher);
    }
    hasher.finish()
}

async fn poll_loop(
    remote: Arc<dyn RemoteStore>,
    tables: Vec<RemoteTable>,
    every: Duration,
    sender: broadcast::Sender<ChangeEvent>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seen: HashMap<RemoteTable, u64> = HashMap::new();

    loop {
        ticker.tick().await;

        for &table in &tables {
            let rows = match remote.select(table, &[]).await {
                Ok(rows) => rows,
                Err(e) => {
                    log::warn!("[Feed] polling {} failed: {}", table, e);
                    continue;
                }
            };

            let current = fingerprint(&rows);
            match seen.insert(table, current) {
                Some(previous) if previous != current => {
                    log::debug!("[Feed] {} changed", table);
                    let _ = sender.send(ChangeEvent { table });
                }
                _ => {}
            }
        }
    }
}
