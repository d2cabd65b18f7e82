//! 国际象棋规则库
//!
//! 包含:
//! - 棋子、棋盘、位置等核心数据结构
//! - 伪合法走法和攻击范围生成
//! - 规则引擎（合法性过滤、特殊走法、终局判定、悔棋）
//! - FEN 格式

mod board;
mod constants;
mod error;
mod fen;
mod game;
mod moves;
mod piece;
mod state;

pub use board::Board;
pub use constants::*;
pub use error::{ChessError, Result};
pub use fen::{Fen, FenPosition};
pub use game::Game;
pub use moves::{Move, MoveGenerator};
pub use piece::{Color, Piece, PieceKind, Position};
pub use state::{GameState, Outcome};
