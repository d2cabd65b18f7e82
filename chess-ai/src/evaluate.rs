//! 局面评估函数
//!
//! 分数为白方视角：正值对白方有利，负值对黑方有利。
//! 每个棋子的价值 = 子力分 + 位置分 + 机动性（该棋子的合法走法数，
//! 只有走子方的棋子有合法走法），白方棋子累加、黑方棋子累减，
//! 最后为走子方加上固定的先手分。

use chess_core::{Color, Game, Piece, PieceKind, Position};

/// 残局判定阈值：棋盘上棋子总数不超过此值时使用残局王表
pub const ENDGAME_PIECE_COUNT: usize = 12;

/// 先手分
pub const TEMPO_BONUS: i32 = 10;

/// 评估器
pub struct Evaluator;

/// 棋子位置分值表（白方视角，黑方需要上下镜像）
/// 索引为 row * 8 + col，第 0 行是第 8 横线
mod position_tables {
    /// 兵的位置分值
    pub const PAWN: [i32; 64] = [
         0,  0,  0,  0,  0,  0,  0,  0,
        50, 50, 50, 50, 50, 50, 50, 50,
        10, 10, 20, 30, 30, 20, 10, 10,
         5,  5, 10, 25, 25, 10,  5,  5,
         0,  0,  0, 20, 20,  0,  0,  0,
         5, -5,-10,  0,  0,-10, -5,  5,
         5, 10, 10,-20,-20, 10, 10,  5,
         0,  0,  0,  0,  0,  0,  0,  0,
    ];

    /// 马的位置分值
    pub const KNIGHT: [i32; 64] = [
        -50,-40,-30,-30,-30,-30,-40,-50,
        -40,-20,  0,  0,  0,  0,-20,-40,
        -30,  0, 10, 15, 15, 10,  0,-30,
        -30,  5, 15, 20, 20, 15,  5,-30,
        -30,  0, 15, 20, 20, 15,  0,-30,
        -30,  5, 10, 15, 15, 10,  5,-30,
        -40,-20,  0,  5,  5,  0,-20,-40,
        -50,-40,-30,-30,-30,-30,-40,-50,
    ];

    /// 象的位置分值
    pub const BISHOP: [i32; 64] = [
        -20,-10,-10,-10,-10,-10,-10,-20,
        -10,  0,  0,  0,  0,  0,  0,-10,
        -10,  0,  5, 10, 10,  5,  0,-10,
        -10,  5,  5, 10, 10,  5,  5,-10,
        -10,  0, 10, 10, 10, 10,  0,-10,
        -10, 10, 10, 10, 10, 10, 10,-10,
        -10,  5,  0,  0,  0,  0,  5,-10,
        -20,-10,-10,-10,-10,-10,-10,-20,
    ];

    /// 王的位置分值（中局，鼓励留在底线易位后的位置）
    pub const KING_MIDDLEGAME: [i32; 64] = [
        -30,-40,-40,-50,-50,-40,-40,-30,
        -30,-40,-40,-50,-50,-40,-40,-30,
        -30,-40,-40,-50,-50,-40,-40,-30,
        -30,-40,-40,-50,-50,-40,-40,-30,
        -20,-30,-30,-40,-40,-30,-30,-20,
        -10,-20,-20,-20,-20,-20,-20,-10,
         20, 20,  0,  0,  0,  0, 20, 20,
         20, 30, 10,  0,  0, 10, 30, 20,
    ];

    /// 王的位置分值（残局，鼓励王走向中心）
    pub const KING_ENDGAME: [i32; 64] = [
        -50,-40,-30,-20,-20,-30,-40,-50,
        -30,-20,-10,  0,  0,-10,-20,-30,
        -30,-10, 20, 30, 30, 20,-10,-30,
        -30,-10, 30, 40, 40, 30,-10,-30,
        -30,-10, 30, 40, 40, 30,-10,-30,
        -30,-10, 20, 30, 30, 20,-10,-30,
        -30,-20,-10,  0,  0,-10,-20,-30,
        -50,-40,-30,-20,-20,-30,-40,-50,
    ];
}

impl Evaluator {
    /// 评估局面（白方视角）
    pub fn evaluate(game: &Game) -> i32 {
        let board = game.board();
        let endgame = board.piece_count() <= ENDGAME_PIECE_COUNT;

        let mut score = 0;
        for (pos, piece) in board.iter() {
            let piece_score = Self::evaluate_piece(game, pos, piece, endgame);
            match piece.color {
                Color::White => score += piece_score,
                Color::Black => score -= piece_score,
            }
        }

        if game.white_to_move() {
            score + TEMPO_BONUS
        } else {
            score - TEMPO_BONUS
        }
    }

    /// 单个棋子的价值（子力 + 位置 + 机动性）
    fn evaluate_piece(game: &Game, pos: Position, piece: Piece, endgame: bool) -> i32 {
        let mobility = game.legal_moves_from(pos).len() as i32;
        piece.value() + Self::position_bonus(pos, piece, endgame) + mobility
    }

    /// 获取位置加成分
    pub fn position_bonus(pos: Position, piece: Piece, endgame: bool) -> i32 {
        let index = match piece.color {
            Color::White => pos.row as usize * 8 + pos.col as usize,
            // 黑方需要镜像（行翻转）
            Color::Black => (7 - pos.row as usize) * 8 + pos.col as usize,
        };

        match piece.kind {
            PieceKind::Pawn => position_tables::PAWN[index],
            PieceKind::Knight => position_tables::KNIGHT[index],
            PieceKind::Bishop => position_tables::BISHOP[index],
            PieceKind::King if endgame => position_tables::KING_ENDGAME[index],
            PieceKind::King => position_tables::KING_MIDDLEGAME[index],
            // 车和后不加位置分
            PieceKind::Rook | PieceKind::Queen => 0,
        }
    }
}
