//! 派发队列
//!
//! 单元先在一个短窗口内缓冲，窗口到期或达到批次上限时整体交给翻译服务。
//! 每个批次在独立任务中执行，批次在途时新单元继续进入下一个窗口。
//! 失败的批次最多重试一次（且仅限可重试错误），之后整批丢弃并以
//! [`DispatchOutcome::Failed`] 报告，不会重新入队。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};

use super::attach::UnitSink;
use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::Unit;
use crate::translation::provider::{TranslatedUnit, Translator};

/// 派发参数
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub window: Duration,
    pub max_batch_units: usize,
    /// 超过 1 的取值按 1 处理
    pub max_retry_attempts: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from(&TranslationConfig::default())
    }
}

impl From<&TranslationConfig> for DispatchConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            window: config.batch_window(),
            max_batch_units: config.max_batch_units.max(1),
            max_retry_attempts: config.max_retry_attempts.min(1),
        }
    }
}

/// 被丢弃的批次
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub batch: u64,
    pub unit_ids: Vec<String>,
    pub attempts: usize,
    pub error: TranslationError,
}

impl BatchFailure {
    pub fn to_error(&self) -> TranslationError {
        TranslationError::BatchDropped {
            batch: self.batch,
            attempts: self.attempts,
            reason: self.error.to_string(),
        }
    }
}

/// 批次结果
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Translated {
        batch: u64,
        results: Vec<TranslatedUnit>,
    },
    Failed(BatchFailure),
}

/// 提交端
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<Unit>,
}

impl DispatchHandle {
    pub fn push(&self, unit: Unit) -> TranslationResult<()> {
        self.tx.send(unit).map_err(|_| TranslationError::QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl UnitSink for DispatchHandle {
    fn push_unit(&mut self, unit: Unit) -> TranslationResult<()> {
        self.push(unit)
    }
}

/// 派发队列
pub struct DispatchQueue;

impl DispatchQueue {
    /// 启动派发任务，必须在 tokio 运行时内调用
    ///
    /// 所有 [`DispatchHandle`] 被丢弃后，任务冲刷剩余单元、等待在途批次，然后关闭结果通道。
    pub fn spawn(
        translator: Arc<dyn Translator>,
        config: DispatchConfig,
    ) -> (DispatchHandle, mpsc::UnboundedReceiver<DispatchOutcome>) {
        let (unit_tx, unit_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_queue(unit_rx, outcome_tx, translator, config));

        (DispatchHandle { tx: unit_tx }, outcome_rx)
    }
}

async fn run_queue(
    mut units: mpsc::UnboundedReceiver<Unit>,
    outcomes: mpsc::UnboundedSender<DispatchOutcome>,
    translator: Arc<dyn Translator>,
    config: DispatchConfig,
) {
    let mut buffer: Vec<Unit> = Vec::new();
    let mut deadline: Option<Instant> = None;
    let mut in_flight = JoinSet::new();
    let mut next_batch: u64 = 0;

    tracing::debug!(
        "派发队列启动: 窗口 {:?}, 批次上限 {}",
        config.window,
        config.max_batch_units
    );

    loop {
        let flush_at = deadline.unwrap_or_else(Instant::now);

        tokio::select! {
            received = units.recv() => match received {
                Some(unit) => {
                    buffer.push(unit);
                    deadline.get_or_insert_with(|| Instant::now() + config.window);
                    if buffer.len() >= config.max_batch_units {
                        flush(&mut buffer, &mut next_batch, &mut in_flight, &translator, &outcomes, &config);
                        deadline = None;
                    }
                }
                None => break,
            },
            _ = sleep_until(flush_at), if deadline.is_some() => {
                flush(&mut buffer, &mut next_batch, &mut in_flight, &translator, &outcomes, &config);
                deadline = None;
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("批次任务异常退出: {}", e);
                }
            }
        }
    }

    flush(&mut buffer, &mut next_batch, &mut in_flight, &translator, &outcomes, &config);
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!("批次任务异常退出: {}", e);
        }
    }
    tracing::debug!("派发队列关闭，共 {} 个批次", next_batch);
}

fn flush(
    buffer: &mut Vec<Unit>,
    next_batch: &mut u64,
    in_flight: &mut JoinSet<()>,
    translator: &Arc<dyn Translator>,
    outcomes: &mpsc::UnboundedSender<DispatchOutcome>,
    config: &DispatchConfig,
) {
    while !buffer.is_empty() {
        let take = buffer.len().min(config.max_batch_units);
        let batch_units: Vec<Unit> = buffer.drain(..take).collect();
        *next_batch += 1;

        tracing::debug!("派发批次 #{}: {} 个单元", next_batch, batch_units.len());
        in_flight.spawn(send_batch(
            *next_batch,
            batch_units,
            translator.clone(),
            outcomes.clone(),
            config.max_retry_attempts.min(1),
        ));
    }
}

async fn send_batch(
    batch: u64,
    units: Vec<Unit>,
    translator: Arc<dyn Translator>,
    outcomes: mpsc::UnboundedSender<DispatchOutcome>,
    max_retry_attempts: usize,
) {
    let mut attempts = 0;

    let outcome = loop {
        attempts += 1;
        match translator.translate_batch(&units).await {
            Ok(results) => break DispatchOutcome::Translated { batch, results },
            Err(e) if e.is_retryable() && attempts <= max_retry_attempts => {
                tracing::warn!("批次 #{} 第 {} 次尝试失败，重试: {}", batch, attempts, e);
            }
            Err(e) => {
                tracing::error!("批次 #{} 在 {} 次尝试后被丢弃: {}", batch, attempts, e);
                break DispatchOutcome::Failed(BatchFailure {
                    batch,
                    unit_ids: units.iter().map(|unit| unit.id.clone()).collect(),
                    attempts,
                    error: e,
                });
            }
        }
    };

    if outcomes.send(outcome).is_err() {
        tracing::debug!("结果通道已关闭，批次 #{} 的结果被丢弃", batch);
    }
}
