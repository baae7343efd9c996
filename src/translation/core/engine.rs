//! 翻译引擎
//!
//! 把挂载控制、派发队列和合并引擎组装在一起，对外提供一个协作式的接口：
//!
//! 1. `setup` 扫描根节点，挂载所有合格元素，单元进入派发队列
//! 2. 派发任务按窗口成批调用翻译服务
//! 3. `run` / `pump` / `shutdown` 把批次结果按响应顺序合并回原始树
//! 4. `observe` 对新插入的子树重复上述过程
//!
//! ## 线程模型
//!
//! 引擎持有 `Rc` 节点，因此是 `!Send` 的，只能在创建它的任务上使用；
//! 唯一在后台运行的是派发队列（`tokio::spawn`），所以引擎必须在 tokio 运行时内创建。
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dom_splice::parsers::html::html_to_dom;
//! use dom_splice::translation::{HttpTranslator, TranslationConfig, TranslationEngine};
//!
//! # async fn demo() -> dom_splice::translation::TranslationResult<()> {
//! let config = TranslationConfig::default();
//! let translator = Arc::new(HttpTranslator::new(&config)?);
//! let dom = html_to_dom(b"<p>Hello</p>", "utf-8".to_string());
//!
//! let mut engine = TranslationEngine::new(translator, config);
//! let report = engine.translate_document(&dom.document).await?;
//! println!("合并了 {} 条结果", report.results_merged);
//! # Ok(())
//! # }
//! ```

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use markup5ever_rcdom::Handle;
use tokio::sync::mpsc;

use super::attach::{AttachController, AttachOutcome, Eligibility, MutationRecord, TagEligibility};
use super::dispatch::{BatchFailure, DispatchConfig, DispatchHandle, DispatchOutcome, DispatchQueue};
use super::merge::{MergeEngine, MergeOutcome};
use crate::translation::config::TranslationConfig;
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::provider::{TranslatedUnit, Translator};
use crate::translation::storage::UnitRegistry;
use crate::translation::style::{DefaultStyleOracle, StyleOracle};

/// 翻译引擎
pub struct TranslationEngine {
    registry: UnitRegistry,
    attach: AttachController,
    merge: MergeEngine,
    /// 关闭后为 `None`，此后的挂载返回 [`TranslationError::QueueClosed`]
    dispatch: Option<DispatchHandle>,
    outcomes: mpsc::UnboundedReceiver<DispatchOutcome>,
    stats: EngineStats,
    failures: Vec<BatchFailure>,
}

impl TranslationEngine {
    /// 使用默认样式判定器和默认资格判定创建引擎
    pub fn new(translator: Arc<dyn Translator>, config: TranslationConfig) -> Self {
        Self::with_oracle(translator, config, Rc::new(DefaultStyleOracle))
    }

    /// 使用自定义样式判定器创建引擎
    pub fn with_oracle(
        translator: Arc<dyn Translator>,
        config: TranslationConfig,
        oracle: Rc<dyn StyleOracle>,
    ) -> Self {
        let eligibility = Box::new(TagEligibility::from_config(&config));
        Self::with_parts(translator, config, oracle, eligibility)
    }

    /// 完全自定义的构造方式
    pub fn with_parts(
        translator: Arc<dyn Translator>,
        config: TranslationConfig,
        oracle: Rc<dyn StyleOracle>,
        eligibility: Box<dyn Eligibility>,
    ) -> Self {
        let (dispatch, outcomes) = DispatchQueue::spawn(translator, DispatchConfig::from(&config));
        tracing::info!(
            "翻译引擎已创建: 页面 {}, 目标语言 {}",
            config.page_url,
            config.target_lang
        );

        Self {
            registry: UnitRegistry::new(),
            attach: AttachController::new(oracle, eligibility, &config),
            merge: MergeEngine::new(),
            dispatch: Some(dispatch),
            outcomes,
            stats: EngineStats::default(),
            failures: Vec::new(),
        }
    }

    /// 初始扫描，返回派发的单元数
    pub fn setup(&mut self, root: &Handle) -> TranslationResult<usize> {
        let dispatch = self.dispatch.as_mut().ok_or(TranslationError::QueueClosed)?;
        let units = self.attach.scan(&mut self.registry, root, dispatch)?;

        self.stats.add_units_dispatched(units);
        tracing::info!("初始扫描完成: {} 个单元, {} 个登记节点", units, self.registry.len());
        Ok(units)
    }

    /// 挂载单个节点
    pub fn attach(&mut self, node: &Handle) -> TranslationResult<AttachOutcome> {
        let dispatch = self.dispatch.as_mut().ok_or(TranslationError::QueueClosed)?;
        let outcome = self.attach.attach(&mut self.registry, node, dispatch)?;

        if let AttachOutcome::Attached { units } = outcome {
            self.stats.add_units_dispatched(units);
        }
        Ok(outcome)
    }

    /// 处理一次结构变更
    pub fn observe(&mut self, record: &MutationRecord) -> TranslationResult<usize> {
        let dispatch = self.dispatch.as_mut().ok_or(TranslationError::QueueClosed)?;
        let units = self.attach.observe(&mut self.registry, record, dispatch)?;

        self.stats.add_units_dispatched(units);
        if units > 0 {
            tracing::debug!("结构变更产生 {} 个新单元", units);
        }
        Ok(units)
    }

    /// 合并单条翻译结果
    pub fn merge(&mut self, result: &TranslatedUnit) -> MergeOutcome {
        let outcome = self.merge.merge(&self.registry, result);
        match outcome {
            MergeOutcome::Merged { texts } => {
                self.stats.inc_results_merged();
                self.stats.add_texts_written(texts);
            }
            MergeOutcome::UnknownId => self.stats.inc_results_dropped(),
        }
        outcome
    }

    /// 应用所有已到达的批次结果，不等待；返回处理的批次数
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.outcomes.try_recv() {
            self.apply(outcome);
            applied += 1;
        }
        applied
    }

    /// 等待并应用下一个批次结果；队列已关闭且结果耗尽时返回 `false`
    pub async fn process_next(&mut self) -> bool {
        match self.outcomes.recv().await {
            Some(outcome) => {
                self.apply(outcome);
                true
            }
            None => false,
        }
    }

    /// 协作式主循环：处理结构变更和批次结果，直到变更流结束，然后关闭并排空
    pub async fn run<S>(&mut self, mut mutations: S) -> TranslationResult<EngineReport>
    where
        S: Stream<Item = MutationRecord> + Unpin,
    {
        loop {
            tokio::select! {
                record = mutations.next() => match record {
                    Some(record) => {
                        self.observe(&record)?;
                    }
                    None => break,
                },
                Some(outcome) = self.outcomes.recv() => self.apply(outcome),
            }
        }

        tracing::info!("变更流已结束");
        Ok(self.shutdown().await)
    }

    /// 关闭单元提交，等待在途批次并合并其结果
    ///
    /// 在途的服务调用不会被取消；其结果若指向已逐出的节点则被丢弃。
    pub async fn shutdown(&mut self) -> EngineReport {
        if self.dispatch.take().is_some() {
            tracing::info!("关闭单元提交，等待在途批次");
        }

        while let Some(outcome) = self.outcomes.recv().await {
            self.apply(outcome);
        }

        let report = self.report();
        tracing::info!(
            "翻译完成: 派发 {} 个单元, 合并 {} 条, 丢弃 {} 条, 失败批次 {}",
            report.units_dispatched,
            report.results_merged,
            report.results_dropped,
            report.failures.len()
        );
        report
    }

    /// 一次性翻译整棵树：扫描后立即关闭并排空
    pub async fn translate_document(&mut self, root: &Handle) -> TranslationResult<EngineReport> {
        self.setup(root)?;
        Ok(self.shutdown().await)
    }

    /// 当前统计的快照
    pub fn report(&self) -> EngineReport {
        EngineReport {
            units_dispatched: self.stats.units_dispatched.load(Ordering::Relaxed),
            results_merged: self.stats.results_merged.load(Ordering::Relaxed),
            results_dropped: self.stats.results_dropped.load(Ordering::Relaxed),
            failures: self.failures.clone(),
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn is_closed(&self) -> bool {
        self.dispatch.is_none()
    }

    fn apply(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Translated { batch, results } => {
                self.stats.inc_batches_completed();
                tracing::debug!("批次 #{} 返回 {} 条结果", batch, results.len());
                // 按响应顺序应用
                for result in &results {
                    self.merge(result);
                }
            }
            DispatchOutcome::Failed(failure) => {
                self.stats.inc_batches_failed();
                let _ = helpers::log_error::<()>(failure.to_error());
                self.failures.push(failure);
            }
        }
    }
}

/// 引擎运行结果
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    pub units_dispatched: usize,
    pub results_merged: usize,
    pub results_dropped: usize,
    pub failures: Vec<BatchFailure>,
}

impl EngineReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.results_dropped == 0
    }
}

/// 引擎统计信息
///
/// 计数器只增不减，反映引擎创建以来的累计值。
#[derive(Debug, Default)]
pub struct EngineStats {
    /// 进入派发队列的单元
    pub units_dispatched: AtomicUsize,
    /// 成功返回的批次
    pub batches_completed: AtomicUsize,
    /// 重试后仍失败而被丢弃的批次
    pub batches_failed: AtomicUsize,
    /// 成功合并的结果
    pub results_merged: AtomicUsize,
    /// 因指纹已逐出而丢弃的结果
    pub results_dropped: AtomicUsize,
    /// 写入的文本节点
    pub texts_written: AtomicUsize,
}

impl EngineStats {
    pub fn add_units_dispatched(&self, count: usize) {
        self.units_dispatched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_batches_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_batches_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_results_merged(&self) {
        self.results_merged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_results_dropped(&self) {
        self.results_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_texts_written(&self, count: usize) {
        self.texts_written.fetch_add(count, Ordering::Relaxed);
    }
}
