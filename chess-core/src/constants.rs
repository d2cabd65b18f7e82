//! 规则常量定义

/// 棋盘边长（行数与列数）
pub const BOARD_SIZE: usize = 8;

/// 格子总数
pub const SQUARE_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// 五十回合规则对应的半回合数
pub const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// 三次重复局面判和
pub const REPETITION_LIMIT: u32 = 3;

/// 初始局面 FEN
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// 王的初始列（e 线）
pub const KING_HOME_COL: u8 = 4;

/// 王翼车所在列（h 线）
pub const KINGSIDE_ROOK_COL: u8 = 7;

/// 后翼车所在列（a 线）
pub const QUEENSIDE_ROOK_COL: u8 = 0;
