//! 对局快照与结局

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::piece::{Color, Position};

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// 将死
    Checkmate { winner: Color },
    /// 逼和（无子可动且未被将军）
    Stalemate,
    /// 五十回合规则
    FiftyMoveRule,
    /// 三次重复局面
    ThreefoldRepetition,
    /// 子力不足
    InsufficientMaterial,
}

impl Outcome {
    /// 结局提示文本
    pub fn message(&self) -> String {
        match self {
            Outcome::Checkmate { winner } => format!("Checkmate! {} wins.", winner),
            Outcome::Stalemate => "Draw by stalemate.".to_string(),
            Outcome::FiftyMoveRule => "Draw by the fifty-move rule.".to_string(),
            Outcome::ThreefoldRepetition => "Draw by threefold repetition.".to_string(),
            Outcome::InsufficientMaterial => "Draw by insufficient material.".to_string(),
        }
    }

    /// 胜方（和棋时为 None）
    pub fn winner(&self) -> Option<Color> {
        match self {
            Outcome::Checkmate { winner } => Some(*winner),
            _ => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.winner().is_none()
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// 对局快照
///
/// 每次落子后保存一份，创建后不再修改，只用于悔棋时恢复 [`crate::Game`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub(crate) board: Board,
    pub(crate) side_to_move: Color,
    pub(crate) outcome: Option<Outcome>,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
    pub(crate) repetitions: HashMap<String, u32>,
    pub(crate) en_passant: Option<Position>,
}

impl GameState {
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn repetitions(&self) -> &HashMap<String, u32> {
        &self.repetitions
    }

    pub fn en_passant(&self) -> Option<Position> {
        self.en_passant
    }
}
