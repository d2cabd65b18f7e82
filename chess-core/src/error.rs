//! 错误类型定义

use thiserror::Error;

/// 国际象棋规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// 无效的坐标
    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    /// 没有棋子
    #[error("No piece on {square}")]
    NoPiece { square: String },

    /// 不是该方走棋
    #[error("Not your turn")]
    NotYourTurn,

    /// 目标格不在合法走法中
    #[error("Illegal move: {from} to {to}")]
    IllegalMove { from: String, to: String },

    /// 无效的 FEN 字符串
    #[error("Invalid FEN string: {reason}")]
    InvalidFen { reason: String },

    /// 游戏已结束
    #[error("Game is already over")]
    GameOver,
}

/// 规则操作结果类型
pub type Result<T> = std::result::Result<T, ChessError>;
