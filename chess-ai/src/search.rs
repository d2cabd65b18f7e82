//! 搜索引擎
//!
//! 实现 Minimax + Alpha-Beta 剪枝 + 迭代加深
//!
//! 搜索在对局的一份私有副本上用 `apply_move` / `revert_move` 做增减，
//! 不为每个节点克隆整个对局。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chess_core::{Color, Game, Move};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::evaluate::Evaluator;

/// 未指定深度上限时的最大迭代深度
pub const MAX_SEARCH_DEPTH: u8 = 100;

/// AI 难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 入门
    Beginner,
    /// 简单
    Easy,
    /// 中等
    #[default]
    Medium,
    /// 困难
    Hard,
    /// 专家
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Beginner,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// 难度序号 (0-4)
    pub fn index(&self) -> usize {
        match self {
            Difficulty::Beginner => 0,
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
            Difficulty::Expert => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 默认思考时间
    pub fn time_budget(&self) -> Duration {
        match self {
            Difficulty::Beginner => Duration::from_millis(100),
            Difficulty::Easy => Duration::from_secs(1),
            Difficulty::Medium => Duration::from_secs(3),
            Difficulty::Hard => Duration::from_secs(5),
            Difficulty::Expert => Duration::from_secs(7),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    /// 接受小写名称或序号，例如 `hard` 或 `3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Ok(index) = s.parse::<usize>() {
            return Self::from_index(index).ok_or_else(|| format!("difficulty index out of range: {}", index));
        }
        Self::ALL
            .iter()
            .find(|d| d.name() == s)
            .copied()
            .ok_or_else(|| format!("unknown difficulty: {}", s))
    }
}

/// AI 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub difficulty: Difficulty,
    /// 思考时间
    pub time_budget: Duration,
    /// 迭代深度上限（None 表示只受时间限制）
    pub max_depth: Option<u8>,
    /// 根节点洗牌的随机种子（None 表示每次随机）
    pub seed: Option<u64>,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            time_budget: difficulty.time_budget(),
            max_depth: None,
            seed: None,
        }
    }

    pub fn with_time_budget(mut self, time_budget: Duration) -> Self {
        self.time_budget = time_budget;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::default())
    }
}

/// 带分数的走法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMove {
    pub mv: Move,
    pub score: i32,
}

/// 取消标记
///
/// 只会从 false 变为 true 一次，由计时器或调用方设置，搜索线程轮询读取。
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// 同步搜索器
///
/// 一个实例对应一次搜索；异步调度见 [`crate::AiEngine`]。
pub struct Searcher {
    config: AiConfig,
    cancel: CancelToken,
    nodes_searched: u64,
    completed_depth: u8,
    /// 当前迭代深度，第 1 层不响应取消
    current_depth: u8,
}

impl Searcher {
    pub fn new(config: AiConfig, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            nodes_searched: 0,
            completed_depth: 0,
            current_depth: 0,
        }
    }

    /// 搜索并按难度选择走法；没有合法走法时返回 None
    pub fn search(&mut self, game: &Game) -> Option<Move> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        info!(
            "开始搜索: 难度 {}, 时间 {:?}, 种子 {}",
            self.config.difficulty, self.config.time_budget, seed
        );

        let ranked = self.rank_moves(game, &mut rng);
        let chosen = select_with_draw(self.config.difficulty, &ranked, rng.gen());

        info!(
            "搜索结束: 深度 {}, 节点 {}, 走法 {:?}",
            self.completed_depth,
            self.nodes_searched,
            chosen.map(|mv| mv.to_string())
        );
        chosen
    }

    /// 迭代加深，返回最后一个完整深度的排序结果（最优在前）
    pub fn rank_moves(&mut self, game: &Game, rng: &mut ChaCha8Rng) -> Vec<ScoredMove> {
        self.nodes_searched = 0;
        self.completed_depth = 0;

        if game.is_game_over() {
            return Vec::new();
        }

        let mut root_moves = game.legal_moves();
        if root_moves.is_empty() {
            return Vec::new();
        }
        // 打乱根节点顺序，让同分走法有变化
        root_moves.shuffle(rng);

        let mut work = game.clone();
        let maximizing = game.side_to_move() == Color::White;
        let max_depth = self.config.max_depth.unwrap_or(MAX_SEARCH_DEPTH).max(1);
        let mut best = Vec::new();

        for depth in 1..=max_depth {
            self.current_depth = depth;
            match self.search_at_depth(&mut work, depth, &root_moves, maximizing) {
                Some(scored) => {
                    if let Some(top) = scored.first() {
                        debug!(
                            "深度 {} 完成: 最优 {} ({}), 节点 {}",
                            depth, top.mv, top.score, self.nodes_searched
                        );
                    }
                    best = scored;
                    self.completed_depth = depth;
                }
                None => {
                    debug!("深度 {} 被取消", depth);
                    break;
                }
            }
        }

        best
    }

    /// 搜索一个深度；被取消时返回 None，丢弃本层的部分结果
    fn search_at_depth(
        &mut self,
        game: &mut Game,
        depth: u8,
        root_moves: &[Move],
        maximizing: bool,
    ) -> Option<Vec<ScoredMove>> {
        let mut scored = Vec::with_capacity(root_moves.len());

        for &mv in root_moves {
            if self.should_stop() {
                return None;
            }
            if !game.apply_move(mv) {
                continue;
            }
            let score = self.minimax(game, depth - 1, i32::MIN, i32::MAX, !maximizing);
            game.revert_move();

            if self.should_stop() {
                return None;
            }
            scored.push(ScoredMove { mv, score });
        }

        // 稳定排序：白方取高分在前，黑方取低分在前
        if maximizing {
            scored.sort_by(|a, b| b.score.cmp(&a.score));
        } else {
            scored.sort_by(|a, b| a.score.cmp(&b.score));
        }
        Some(scored)
    }

    /// Minimax + Alpha-Beta（白方为极大方）
    fn minimax(&mut self, game: &mut Game, depth: u8, mut alpha: i32, mut beta: i32, maximizing: bool) -> i32 {
        // 被取消的分支结果会被丢弃
        if self.should_stop() {
            return 0;
        }
        self.nodes_searched += 1;

        if depth == 0 || game.is_game_over() {
            return Evaluator::evaluate(game);
        }

        let moves = game.legal_moves();
        if moves.is_empty() {
            return Evaluator::evaluate(game);
        }

        if maximizing {
            let mut best = i32::MIN;
            for mv in moves {
                game.apply_move(mv);
                let eval = self.minimax(game, depth - 1, alpha, beta, false);
                game.revert_move();
                best = best.max(eval);
                alpha = alpha.max(eval);
                if beta <= alpha {
                    break; // Beta 剪枝
                }
            }
            best
        } else {
            let mut best = i32::MAX;
            for mv in moves {
                game.apply_move(mv);
                let eval = self.minimax(game, depth - 1, alpha, beta, true);
                game.revert_move();
                best = best.min(eval);
                beta = beta.min(eval);
                if beta <= alpha {
                    break; // Alpha 剪枝
                }
            }
            best
        }
    }

    fn should_stop(&self) -> bool {
        self.current_depth > 1 && self.cancel.is_cancelled()
    }

    /// 获取搜索的节点数
    pub fn nodes_searched(&self) -> u64 {
        self.nodes_searched
    }

    /// 最后完成的深度
    pub fn completed_depth(&self) -> u8 {
        self.completed_depth
    }
}

/// 按难度从排序结果中选择走法，`r` 为 [0, 1) 的均匀随机数
///
/// 候选数少于阈值假设时退化为最优走法。
pub fn select_with_draw(difficulty: Difficulty, ranked: &[ScoredMove], r: f64) -> Option<Move> {
    let best = ranked.first()?.mv;
    let nth = |i: usize| ranked.get(i).map(|s| s.mv).unwrap_or(best);

    let chosen = match difficulty {
        Difficulty::Beginner => {
            if ranked.len() <= 2 || r < 0.60 {
                best
            } else if r < 0.90 {
                nth(1)
            } else {
                nth(2)
            }
        }
        Difficulty::Easy => {
            if ranked.len() == 1 || r < 0.85 {
                best
            } else {
                nth(1)
            }
        }
        Difficulty::Medium => {
            if ranked.len() == 1 || r < 0.95 {
                best
            } else {
                nth(1)
            }
        }
        Difficulty::Hard | Difficulty::Expert => best,
    };
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Position;

    fn sq(s: &str) -> Position {
        s.parse().unwrap()
    }

    fn scored(moves: &[&str]) -> Vec<ScoredMove> {
        moves
            .iter()
            .enumerate()
            .map(|(i, m)| ScoredMove {
                mv: Move::parse_with_promotion(m).unwrap().0,
                score: 100 - i as i32,
            })
            .collect()
    }

    #[test]
    fn test_difficulty_config() {
        let beginner = AiConfig::from_difficulty(Difficulty::Beginner);
        assert_eq!(beginner.time_budget, Duration::from_millis(100));
        assert_eq!(beginner.max_depth, None);

        let expert = AiConfig::from_difficulty(Difficulty::Expert);
        assert_eq!(expert.time_budget, Duration::from_secs(7));

        assert_eq!(AiConfig::default().difficulty, Difficulty::Medium);
        let custom = AiConfig::default().with_max_depth(2).with_seed(9);
        assert_eq!(custom.max_depth, Some(2));
        assert_eq!(custom.seed, Some(9));
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!("Expert".parse::<Difficulty>(), Ok(Difficulty::Expert));
        assert_eq!("0".parse::<Difficulty>(), Ok(Difficulty::Beginner));
        assert!("5".parse::<Difficulty>().is_err());
        assert!("grandmaster".parse::<Difficulty>().is_err());
        for difficulty in Difficulty::ALL {
            assert_eq!(Difficulty::from_index(difficulty.index()), Some(difficulty));
        }
    }

    #[test]
    fn test_select_beginner() {
        let ranked = scored(&["e2e4", "d2d4", "g1f3"]);
        assert_eq!(select_with_draw(Difficulty::Beginner, &ranked, 0.5), Some(ranked[0].mv));
        assert_eq!(select_with_draw(Difficulty::Beginner, &ranked, 0.7), Some(ranked[1].mv));
        assert_eq!(select_with_draw(Difficulty::Beginner, &ranked, 0.95), Some(ranked[2].mv));
        // 只有两个候选时总是最优
        assert_eq!(select_with_draw(Difficulty::Beginner, &ranked[..2], 0.95), Some(ranked[0].mv));
    }

    #[test]
    fn test_select_easy_and_medium() {
        let ranked = scored(&["e2e4", "d2d4"]);
        assert_eq!(select_with_draw(Difficulty::Easy, &ranked, 0.84), Some(ranked[0].mv));
        assert_eq!(select_with_draw(Difficulty::Easy, &ranked, 0.86), Some(ranked[1].mv));
        assert_eq!(select_with_draw(Difficulty::Medium, &ranked, 0.90), Some(ranked[0].mv));
        assert_eq!(select_with_draw(Difficulty::Medium, &ranked, 0.96), Some(ranked[1].mv));
        assert_eq!(select_with_draw(Difficulty::Easy, &ranked[..1], 0.99), Some(ranked[0].mv));
    }

    #[test]
    fn test_select_strong_levels_and_empty() {
        let ranked = scored(&["e2e4", "d2d4", "g1f3"]);
        assert_eq!(select_with_draw(Difficulty::Hard, &ranked, 0.99), Some(ranked[0].mv));
        assert_eq!(select_with_draw(Difficulty::Expert, &ranked, 0.99), Some(ranked[0].mv));
        assert_eq!(select_with_draw(Difficulty::Expert, &[], 0.1), None);
    }

    #[test]
    fn test_search_captures_hanging_queen() {
        let game = Game::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
        let config = AiConfig::from_difficulty(Difficulty::Expert)
            .with_max_depth(2)
            .with_seed(1);
        let mut searcher = Searcher::new(config, CancelToken::new());

        let mv = searcher.search(&game);
        assert_eq!(mv, Some(Move::new(sq("d1"), sq("d5"))));
        assert_eq!(searcher.completed_depth(), 2);
        assert!(searcher.nodes_searched() > 0);
    }

    #[test]
    fn test_search_as_black() {
        let game = Game::from_fen("3rk3/8/8/8/3Q4/8/8/4K3 b - - 0 1").unwrap();
        let config = AiConfig::from_difficulty(Difficulty::Hard)
            .with_max_depth(2)
            .with_seed(3);
        let mv = Searcher::new(config, CancelToken::new()).search(&game);
        assert_eq!(mv, Some(Move::new(sq("d8"), sq("d4"))));
    }

    #[test]
    fn test_ranking_is_sorted() {
        let game = Game::new();
        let config = AiConfig::default().with_max_depth(1);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let ranked = Searcher::new(config, CancelToken::new()).rank_moves(&game, &mut rng);

        assert_eq!(ranked.len(), 20);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_cancelled_search_keeps_depth_one() {
        let game = Game::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut searcher = Searcher::new(AiConfig::from_difficulty(Difficulty::Expert), cancel);
        let mv = searcher.search(&game);

        assert!(mv.is_some_and(|mv| game.legal_moves().contains(&mv)));
        assert_eq!(searcher.completed_depth(), 1);
    }

    #[test]
    fn test_no_move_when_checkmated() {
        let game = Game::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        assert!(game.is_game_over());
        let mut searcher = Searcher::new(AiConfig::default().with_max_depth(2), CancelToken::new());
        assert_eq!(searcher.search(&game), None);
    }

    #[test]
    fn test_seeded_search_is_reproducible() {
        let game = Game::new();
        let config = AiConfig::from_difficulty(Difficulty::Beginner)
            .with_max_depth(1)
            .with_seed(42);
        let first = Searcher::new(config.clone(), CancelToken::new()).search(&game);
        let second = Searcher::new(config, CancelToken::new()).search(&game);
        assert_eq!(first, second);
    }
}
