//! 国际象棋 AI 引擎
//!
//! 包含:
//! - 局面评估函数（子力、位置分、机动性、先手分）
//! - Minimax + Alpha-Beta 搜索
//! - 迭代加深与限时取消
//! - 按难度选择走法
//! - 异步引擎（后台搜索、取消、结果通道）

mod engine;
mod evaluate;
mod search;

pub use engine::{AiEngine, AiError, SearchTask};
pub use evaluate::{Evaluator, ENDGAME_PIECE_COUNT, TEMPO_BONUS};
pub use search::{
    select_with_draw, AiConfig, CancelToken, Difficulty, ScoredMove, Searcher, MAX_SEARCH_DEPTH,
};
