//! 走法生成
//!
//! 所有棋子共用一个入口 [`MoveGenerator::possible_moves`]，按棋子类型分派。
//! 这里只处理伪合法走法和攻击范围；吃过路兵、王车易位和自将过滤由 [`crate::Game`] 负责。

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::ChessError;
use crate::piece::{Color, Piece, PieceKind, Position};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const ORTHOGONAL: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

const DIAGONAL: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// 走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始位置
    pub from: Position,
    /// 目标位置
    pub to: Position,
}

impl Move {
    /// 创建新走法
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }

    /// 解析坐标记法，例如 `e2e4`、`e2-e4`、`e7e8n`
    ///
    /// 返回走法以及可选的升变字符。
    pub fn parse_with_promotion(s: &str) -> Result<(Move, Option<char>), ChessError> {
        let invalid = || ChessError::InvalidSquare(s.to_string());
        let compact: String = s.trim().chars().filter(|c| *c != '-').collect();
        if compact.len() != 4 && compact.len() != 5 {
            return Err(invalid());
        }
        let from: Position = compact.get(0..2).ok_or_else(invalid)?.parse()?;
        let to: Position = compact.get(2..4).ok_or_else(invalid)?.parse()?;
        let promotion = compact.chars().nth(4);
        Ok((Move::new(from, to), promotion))
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 生成棋子的伪合法目标格（不考虑将军）
    ///
    /// 包含吃子，不包含己方棋子所在的格子。
    pub fn possible_moves(board: &Board, pos: Position, piece: Piece) -> Vec<Position> {
        let mut targets = Vec::with_capacity(28);
        match piece.kind {
            PieceKind::Pawn => Self::generate_pawn_moves(board, pos, piece.color, &mut targets),
            PieceKind::Knight => Self::generate_step_moves(board, pos, piece.color, &KNIGHT_OFFSETS, &mut targets),
            PieceKind::Bishop => Self::generate_slide_moves(board, pos, piece.color, &DIAGONAL, &mut targets),
            PieceKind::Rook => Self::generate_slide_moves(board, pos, piece.color, &ORTHOGONAL, &mut targets),
            PieceKind::Queen => {
                Self::generate_slide_moves(board, pos, piece.color, &ORTHOGONAL, &mut targets);
                Self::generate_slide_moves(board, pos, piece.color, &DIAGONAL, &mut targets);
            }
            PieceKind::King => Self::generate_step_moves(board, pos, piece.color, &KING_OFFSETS, &mut targets),
        }
        targets
    }

    /// 生成棋子攻击的格子（用于将军检测）
    ///
    /// 兵只攻击斜前方两格，与它能走到的格子不同；滑行棋子的攻击线止于第一个棋子（含该格）。
    pub fn attacks(board: &Board, pos: Position, piece: Piece) -> Vec<Position> {
        match piece.kind {
            PieceKind::Pawn => {
                let forward = piece.color.pawn_direction();
                [-1, 1]
                    .iter()
                    .filter_map(|&dc| pos.offset(forward, dc))
                    .collect()
            }
            PieceKind::Knight => Self::step_targets(pos, &KNIGHT_OFFSETS),
            PieceKind::King => Self::step_targets(pos, &KING_OFFSETS),
            PieceKind::Bishop => Self::ray_targets(board, pos, &DIAGONAL),
            PieceKind::Rook => Self::ray_targets(board, pos, &ORTHOGONAL),
            PieceKind::Queen => {
                let mut targets = Self::ray_targets(board, pos, &ORTHOGONAL);
                targets.extend(Self::ray_targets(board, pos, &DIAGONAL));
                targets
            }
        }
    }

    /// 检查格子是否被指定阵营攻击
    pub fn is_square_attacked(board: &Board, target: Position, by: Color) -> bool {
        board
            .iter()
            .filter(|(_, piece)| piece.color == by)
            .any(|(pos, piece)| Self::attacks(board, pos, piece).contains(&target))
    }

    /// 检查指定阵营是否被将军
    pub fn is_in_check(board: &Board, color: Color) -> bool {
        match board.find_king(color) {
            Some(king_pos) => Self::is_square_attacked(board, king_pos, color.opponent()),
            // 没有王，视为不被将军
            None => false,
        }
    }

    /// 生成兵的走法
    fn generate_pawn_moves(board: &Board, pos: Position, color: Color, targets: &mut Vec<Position>) {
        let forward = color.pawn_direction();

        // 前进一格，起始行可再进一格
        if let Some(one) = pos.offset(forward, 0) {
            if board.get(one).is_none() {
                targets.push(one);
                if pos.row == color.pawn_start_row() {
                    if let Some(two) = one.offset(forward, 0) {
                        if board.get(two).is_none() {
                            targets.push(two);
                        }
                    }
                }
            }
        }

        // 斜前方吃子
        for dc in [-1i8, 1i8] {
            if let Some(to) = pos.offset(forward, dc) {
                if board.get(to).is_some_and(|target| target.color != color) {
                    targets.push(to);
                }
            }
        }
    }

    /// 生成马、王这类单步棋子的走法
    fn generate_step_moves(
        board: &Board,
        pos: Position,
        color: Color,
        offsets: &[(i8, i8)],
        targets: &mut Vec<Position>,
    ) {
        for &(dr, dc) in offsets {
            if let Some(to) = pos.offset(dr, dc) {
                Self::try_add_move(board, to, color, targets);
            }
        }
    }

    /// 生成象、车、后这类滑行棋子的走法
    fn generate_slide_moves(
        board: &Board,
        pos: Position,
        color: Color,
        directions: &[(i8, i8)],
        targets: &mut Vec<Position>,
    ) {
        for &(dr, dc) in directions {
            let mut current = pos;
            while let Some(to) = current.offset(dr, dc) {
                if let Some(target) = board.get(to) {
                    // 遇到棋子：对方的可以吃，然后停止
                    if target.color != color {
                        targets.push(to);
                    }
                    break;
                }
                targets.push(to);
                current = to;
            }
        }
    }

    /// 尝试添加走法（目标为空或为对方棋子）
    fn try_add_move(board: &Board, to: Position, color: Color, targets: &mut Vec<Position>) {
        match board.get(to) {
            Some(target) if target.color == color => {}
            _ => targets.push(to),
        }
    }

    fn step_targets(pos: Position, offsets: &[(i8, i8)]) -> Vec<Position> {
        offsets
            .iter()
            .filter_map(|&(dr, dc)| pos.offset(dr, dc))
            .collect()
    }

    fn ray_targets(board: &Board, pos: Position, directions: &[(i8, i8)]) -> Vec<Position> {
        let mut targets = Vec::new();
        for &(dr, dc) in directions {
            let mut current = pos;
            while let Some(next) = current.offset(dr, dc) {
                targets.push(next);
                if board.get(next).is_some() {
                    break;
                }
                current = next;
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Position {
        s.parse().unwrap()
    }

    fn board_with(pieces: &[(&str, PieceKind, Color)]) -> Board {
        let mut board = Board::empty();
        for (square, kind, color) in pieces {
            board.place(sq(square), Piece::new(*kind, *color));
        }
        board
    }

    fn moves_of(board: &Board, square: &str) -> Vec<Position> {
        let piece = board.get(sq(square)).unwrap();
        MoveGenerator::possible_moves(board, sq(square), piece)
    }

    #[test]
    fn test_initial_pawn_moves() {
        let board = Board::initial();
        let mut moves = moves_of(&board, "e2");
        moves.sort_by_key(|p| p.to_index());
        assert_eq!(moves, vec![sq("e4"), sq("e3")]);

        let black = moves_of(&board, "d7");
        assert_eq!(black.len(), 2);
        assert!(black.contains(&sq("d6")) && black.contains(&sq("d5")));
    }

    #[test]
    fn test_pawn_blocked() {
        let board = board_with(&[
            ("e2", PieceKind::Pawn, Color::White),
            ("e3", PieceKind::Knight, Color::Black),
        ]);
        assert!(moves_of(&board, "e2").is_empty());

        // 第二格被堵，只能走一格
        let board = board_with(&[
            ("e2", PieceKind::Pawn, Color::White),
            ("e4", PieceKind::Knight, Color::Black),
        ]);
        assert_eq!(moves_of(&board, "e2"), vec![sq("e3")]);
    }

    #[test]
    fn test_pawn_captures_and_attacks() {
        let board = board_with(&[
            ("d4", PieceKind::Pawn, Color::White),
            ("c5", PieceKind::Rook, Color::Black),
            ("e5", PieceKind::Rook, Color::White),
        ]);
        let moves = moves_of(&board, "d4");
        assert!(moves.contains(&sq("d5")));
        assert!(moves.contains(&sq("c5")));
        assert!(!moves.contains(&sq("e5")));

        // 攻击范围与占据无关
        let piece = board.get(sq("d4")).unwrap();
        let attacks = MoveGenerator::attacks(&board, sq("d4"), piece);
        assert_eq!(attacks.len(), 2);
        assert!(attacks.contains(&sq("c5")) && attacks.contains(&sq("e5")));
        assert!(!attacks.contains(&sq("d5")));
    }

    #[test]
    fn test_knight_moves() {
        let board = board_with(&[("d4", PieceKind::Knight, Color::White)]);
        assert_eq!(moves_of(&board, "d4").len(), 8);

        let board = board_with(&[("a1", PieceKind::Knight, Color::White)]);
        assert_eq!(moves_of(&board, "a1").len(), 2);

        // 初始局面马跳两格
        let board = Board::initial();
        assert_eq!(moves_of(&board, "g1").len(), 2);
    }

    #[test]
    fn test_rook_moves_and_blocking() {
        let board = board_with(&[("d4", PieceKind::Rook, Color::White)]);
        assert_eq!(moves_of(&board, "d4").len(), 14);

        let board = board_with(&[
            ("a1", PieceKind::Rook, Color::White),
            ("a4", PieceKind::Pawn, Color::White),
            ("c1", PieceKind::Pawn, Color::Black),
        ]);
        let mut moves = moves_of(&board, "a1");
        moves.sort_by_key(|p| p.to_index());
        // a2, a3 以及 b1, c1(吃子)
        assert_eq!(moves, vec![sq("a3"), sq("a2"), sq("b1"), sq("c1")]);
    }

    #[test]
    fn test_bishop_and_queen_moves() {
        let board = board_with(&[("d4", PieceKind::Bishop, Color::White)]);
        assert_eq!(moves_of(&board, "d4").len(), 13);

        let board = board_with(&[("d4", PieceKind::Queen, Color::White)]);
        assert_eq!(moves_of(&board, "d4").len(), 27);

        // 初始局面中后被完全堵住
        assert!(moves_of(&Board::initial(), "d1").is_empty());
    }

    #[test]
    fn test_king_moves() {
        let board = board_with(&[("e4", PieceKind::King, Color::White)]);
        assert_eq!(moves_of(&board, "e4").len(), 8);

        let board = board_with(&[("h1", PieceKind::King, Color::White)]);
        assert_eq!(moves_of(&board, "h1").len(), 3);
    }

    #[test]
    fn test_slider_attacks_include_blocker() {
        let board = board_with(&[
            ("a1", PieceKind::Rook, Color::White),
            ("a3", PieceKind::Pawn, Color::White),
        ]);
        let piece = board.get(sq("a1")).unwrap();
        let attacks = MoveGenerator::attacks(&board, sq("a1"), piece);
        // 己方棋子所在格也算受保护，不会越过它
        assert!(attacks.contains(&sq("a3")));
        assert!(!attacks.contains(&sq("a4")));
    }

    #[test]
    fn test_check_detection() {
        let board = board_with(&[
            ("e1", PieceKind::King, Color::White),
            ("e8", PieceKind::Rook, Color::Black),
        ]);
        assert!(MoveGenerator::is_in_check(&board, Color::White));

        let board = board_with(&[
            ("e1", PieceKind::King, Color::White),
            ("e2", PieceKind::Pawn, Color::White),
            ("e8", PieceKind::Rook, Color::Black),
        ]);
        assert!(!MoveGenerator::is_in_check(&board, Color::White));

        let board = board_with(&[
            ("e1", PieceKind::King, Color::White),
            ("f2", PieceKind::Pawn, Color::Black),
        ]);
        assert!(MoveGenerator::is_in_check(&board, Color::White));

        let board = board_with(&[
            ("e1", PieceKind::King, Color::White),
            ("f3", PieceKind::Knight, Color::Black),
        ]);
        assert!(MoveGenerator::is_in_check(&board, Color::White));
    }

    #[test]
    fn test_parse_move() {
        let (mv, promotion) = Move::parse_with_promotion("e2e4").unwrap();
        assert_eq!(mv, Move::new(sq("e2"), sq("e4")));
        assert_eq!(promotion, None);

        let (mv, promotion) = Move::parse_with_promotion("e7-e8n").unwrap();
        assert_eq!(mv, Move::new(sq("e7"), sq("e8")));
        assert_eq!(promotion, Some('n'));

        assert!(Move::parse_with_promotion("e2").is_err());
        assert!(Move::parse_with_promotion("z9e4").is_err());
        assert_eq!(mv.to_string(), "e7e8");
    }
}
