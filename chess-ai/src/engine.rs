//! 异步 AI 引擎
//!
//! 搜索在 `spawn_blocking` 工作线程上运行，计时器任务在时间用完后设置取消标记，
//! 结果经 oneshot 通道送回。同一个引擎同时只允许一次搜索。

use std::sync::Arc;

use chess_core::{Game, Move};
use thiserror::Error;
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, warn};

use crate::search::{AiConfig, CancelToken, Difficulty, Searcher};

/// AI 引擎错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// 已有搜索正在进行
    #[error("A search is already in progress")]
    SearchInProgress,

    /// 搜索任务异常退出
    #[error("Search task failed: {0}")]
    TaskFailed(String),
}

/// 正在进行的搜索
///
/// 可以等待结果，也可以提前取消；取消后仍会返回最后完成深度的结果。
#[derive(Debug)]
pub struct SearchTask {
    cancel: CancelToken,
    result: oneshot::Receiver<Option<Move>>,
}

impl SearchTask {
    /// 请求提前结束搜索
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 等待搜索结果；没有合法走法时为 None
    pub async fn wait(self) -> Result<Option<Move>, AiError> {
        self.result
            .await
            .map_err(|_| AiError::TaskFailed("search worker exited without a result".to_string()))
    }
}

/// AI 引擎
pub struct AiEngine {
    config: AiConfig,
    /// 单许可信号量，保证搜索串行
    slot: Arc<Semaphore>,
}

impl AiEngine {
    /// 创建新的 AI 引擎
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// 从难度创建
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self::new(AiConfig::from_difficulty(difficulty))
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AiConfig) {
        self.config = config;
    }

    pub fn is_searching(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// 在后台开始搜索（须在 tokio 运行时内调用）
    ///
    /// 对局被复制一份，调用方可以继续使用原对局。
    pub fn spawn_search(&self, game: &Game) -> Result<SearchTask, AiError> {
        let permit = self
            .slot
            .clone()
            .try_acquire_owned()
            .map_err(|_| AiError::SearchInProgress)?;

        let cancel = CancelToken::new();
        let (tx, rx) = oneshot::channel();
        let config = self.config.clone();
        let game = game.clone();

        let timer = {
            let cancel = cancel.clone();
            let budget = config.time_budget;
            tokio::spawn(async move {
                tokio::time::sleep(budget).await;
                debug!("思考时间 {:?} 已到", budget);
                cancel.cancel();
            })
        };

        let worker_cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let result = Searcher::new(config, worker_cancel).search(&game);
            timer.abort();
            // 先释放许可再发送结果，调用方收到结果后即可开始下一次搜索
            drop(permit);
            if tx.send(result).is_err() {
                debug!("搜索结果无人接收");
            }
        });

        Ok(SearchTask { cancel, result: rx })
    }

    /// 搜索最佳走法
    pub async fn find_best_move(&self, game: &Game) -> Result<Option<Move>, AiError> {
        self.spawn_search(game)?.wait().await
    }

    /// 回调形式：搜索完成后调用 `callback`，返回可用于取消的标记
    pub fn find_best_move_with<F>(&self, game: &Game, callback: F) -> Result<CancelToken, AiError>
    where
        F: FnOnce(Option<Move>) + Send + 'static,
    {
        let task = self.spawn_search(game)?;
        let cancel = task.cancel_token();

        tokio::spawn(async move {
            match task.wait().await {
                Ok(mv) => callback(mv),
                Err(e) => {
                    warn!("搜索失败: {}", e);
                    callback(None);
                }
            }
        });

        Ok(cancel)
    }
}

impl Default for AiEngine {
    fn default() -> Self {
        Self::new(AiConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    #[tokio::test]
    async fn test_find_best_move_initial_position() {
        init_tracing();
        let game = Game::new();
        let engine = AiEngine::new(
            AiConfig::from_difficulty(Difficulty::Beginner).with_max_depth(2),
        );

        let mv = engine.find_best_move(&game).await.unwrap();
        assert!(mv.is_some_and(|mv| game.legal_moves().contains(&mv)));
        assert!(!engine.is_searching());
    }

    #[tokio::test]
    async fn test_tiny_budget_still_returns_move() {
        init_tracing();
        let game = Game::new();
        let engine = AiEngine::new(
            AiConfig::from_difficulty(Difficulty::Expert).with_time_budget(Duration::from_millis(1)),
        );

        let mv = engine.find_best_move(&game).await.unwrap();
        assert!(mv.is_some_and(|mv| game.legal_moves().contains(&mv)));
    }

    #[tokio::test]
    async fn test_no_legal_move_returns_none() {
        let game = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let engine = AiEngine::default();
        assert_eq!(engine.find_best_move(&game).await, Ok(None));
    }

    #[tokio::test]
    async fn test_concurrent_search_rejected() {
        init_tracing();
        let game = Game::new();
        let engine = AiEngine::from_difficulty(Difficulty::Expert);

        let first = engine.spawn_search(&game).unwrap();
        assert!(engine.is_searching());
        assert_eq!(engine.spawn_search(&game).err(), Some(AiError::SearchInProgress));

        first.cancel();
        let mv = first.wait().await.unwrap();
        assert!(mv.is_some_and(|mv| game.legal_moves().contains(&mv)));

        // 上一次搜索结束后可以再次搜索
        let mut engine = engine;
        engine.set_config(AiConfig::from_difficulty(Difficulty::Hard).with_max_depth(1));
        assert!(engine.find_best_move(&game).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_callback_delivers_result() {
        let game = Game::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
        let engine = AiEngine::new(
            AiConfig::from_difficulty(Difficulty::Expert)
                .with_max_depth(2)
                .with_seed(11),
        );

        let (tx, rx) = oneshot::channel();
        engine
            .find_best_move_with(&game, move |mv| {
                let _ = tx.send(mv);
            })
            .unwrap();

        let mv = rx.await.unwrap();
        assert_eq!(mv.map(|mv| mv.to_string()), Some("d1d5".to_string()));
    }
}
