//! FEN 格式解析和生成
//!
//! 国际象棋 FEN 格式：
//! `<棋子布局> <走子方> <易位权> <吃过路兵目标> <半回合计数> <回合数>`
//!
//! 示例：
//! `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1`
//!
//! 棋盘本身不保存易位权，而是用王和车的"是否移动过"标记表达：
//! 解析时有易位权的王和车视为未移动，其余王和车视为已移动。

use crate::board::Board;
use crate::constants::{BOARD_SIZE, KING_HOME_COL, KINGSIDE_ROOK_COL, QUEENSIDE_ROOK_COL};
use crate::error::ChessError;
use crate::piece::{Color, Piece, PieceKind, Position};

/// FEN 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenPosition {
    pub board: Board,
    pub side_to_move: Color,
    pub en_passant: Option<Position>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

/// FEN 格式处理
pub struct Fen;

impl Fen {
    /// 解析 FEN 字符串，缺省的字段使用默认值
    pub fn parse(fen: &str) -> Result<FenPosition, ChessError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.is_empty() {
            return Err(invalid("Empty FEN string"));
        }

        let mut board = Self::parse_board(parts[0])?;

        let side_to_move = match parts.get(1) {
            Some(side) => {
                let mut chars = side.chars();
                match (chars.next().and_then(Color::from_fen_char), chars.next()) {
                    (Some(color), None) => color,
                    _ => return Err(invalid(format!("Invalid side to move: {}", side))),
                }
            }
            None => Color::White,
        };

        Self::apply_castling_rights(&mut board, parts.get(2).copied().unwrap_or("-"))?;

        let en_passant = match parts.get(3).copied().unwrap_or("-") {
            "-" => None,
            square => {
                let target = square
                    .parse::<Position>()
                    .map_err(|_| invalid(format!("Invalid en passant square: {}", square)))?;
                // 目标格只能在对方兵刚走两步越过的横线上（白走时第 6 横线，黑走时第 3 横线）
                let expected_row = match side_to_move {
                    Color::White => 2,
                    Color::Black => 5,
                };
                if target.row != expected_row {
                    return Err(invalid(format!("Invalid en passant square: {}", square)));
                }
                Some(target)
            }
        };

        let halfmove_clock = match parts.get(4) {
            Some(n) => n
                .parse()
                .map_err(|_| invalid(format!("Invalid halfmove clock: {}", n)))?,
            None => 0,
        };

        let fullmove_number = match parts.get(5) {
            Some(n) => n
                .parse()
                .map_err(|_| invalid(format!("Invalid fullmove number: {}", n)))?,
            None => 1,
        };

        Ok(FenPosition {
            board,
            side_to_move,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    /// 解析棋子布局部分
    fn parse_board(board_str: &str) -> Result<Board, ChessError> {
        let mut board = Board::empty();
        let rows: Vec<&str> = board_str.split('/').collect();

        if rows.len() != BOARD_SIZE {
            return Err(invalid(format!("Expected 8 rows, got {}", rows.len())));
        }

        // FEN 从第 8 横线开始，正好对应第 0 行
        for (row, line) in rows.iter().enumerate() {
            let mut col = 0usize;

            for c in line.chars() {
                if col >= BOARD_SIZE {
                    return Err(invalid(format!("Row {} has too many columns", row)));
                }

                if let Some(empty_count) = c.to_digit(10) {
                    col += empty_count as usize;
                } else if let Some(mut piece) = Piece::from_fen_char(c) {
                    // 易位权稍后再恢复
                    if matches!(piece.kind, PieceKind::King | PieceKind::Rook) {
                        piece.moved = true;
                    }
                    board.place(Position::new_unchecked(row as u8, col as u8), piece);
                    col += 1;
                } else {
                    return Err(invalid(format!("Invalid piece character: {}", c)));
                }
            }

            if col != BOARD_SIZE {
                return Err(invalid(format!("Row {} has {} columns, expected 8", row, col)));
            }
        }

        Ok(board)
    }

    /// 根据易位权把对应的王和车标记为未移动
    fn apply_castling_rights(board: &mut Board, rights: &str) -> Result<(), ChessError> {
        if rights == "-" {
            return Ok(());
        }

        for c in rights.chars() {
            let (color, rook_col) = match c {
                'K' => (Color::White, KINGSIDE_ROOK_COL),
                'Q' => (Color::White, QUEENSIDE_ROOK_COL),
                'k' => (Color::Black, KINGSIDE_ROOK_COL),
                'q' => (Color::Black, QUEENSIDE_ROOK_COL),
                _ => return Err(invalid(format!("Invalid castling rights: {}", rights))),
            };
            let row = color.home_row();
            // 王或车不在原位时忽略该易位权
            Self::mark_unmoved(board, Position::new_unchecked(row, KING_HOME_COL), PieceKind::King, color);
            Self::mark_unmoved(board, Position::new_unchecked(row, rook_col), PieceKind::Rook, color);
        }

        Ok(())
    }

    fn mark_unmoved(board: &mut Board, pos: Position, kind: PieceKind, color: Color) {
        if let Some(mut piece) = board.get(pos) {
            if piece.is(kind, color) {
                piece.moved = false;
                board.place(pos, piece);
            }
        }
    }

    /// 由王和车的移动标记推导易位权字段
    pub fn castling_rights(board: &Board) -> String {
        let mut rights = String::new();

        for color in [Color::White, Color::Black] {
            let row = color.home_row();
            let unmoved = |col: u8, kind: PieceKind| {
                board
                    .get(Position::new_unchecked(row, col))
                    .is_some_and(|p| p.is(kind, color) && !p.moved)
            };
            if !unmoved(KING_HOME_COL, PieceKind::King) {
                continue;
            }
            for (rook_col, c) in [(KINGSIDE_ROOK_COL, 'k'), (QUEENSIDE_ROOK_COL, 'q')] {
                if unmoved(rook_col, PieceKind::Rook) {
                    rights.push(match color {
                        Color::White => c.to_ascii_uppercase(),
                        Color::Black => c,
                    });
                }
            }
        }

        if rights.is_empty() {
            rights.push('-');
        }
        rights
    }

    /// 生成完整的 FEN 字符串
    pub fn format(position: &FenPosition) -> String {
        format!(
            "{} {} {} {} {} {}",
            position.board.fen_position(),
            position.side_to_move.to_fen_char(),
            Self::castling_rights(&position.board),
            position
                .en_passant
                .map(|sq| sq.to_string())
                .unwrap_or_else(|| "-".to_string()),
            position.halfmove_clock,
            position.fullmove_number
        )
    }
}

fn invalid(reason: impl Into<String>) -> ChessError {
    ChessError::InvalidFen {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::INITIAL_FEN;

    #[test]
    fn test_parse_initial_fen() {
        let position = Fen::parse(INITIAL_FEN).unwrap();

        assert_eq!(position.side_to_move, Color::White);
        assert_eq!(position.board, Board::initial());
        assert_eq!(position.en_passant, None);
        assert_eq!(position.halfmove_clock, 0);
        assert_eq!(position.fullmove_number, 1);
    }

    #[test]
    fn test_fen_roundtrip() {
        let position = Fen::parse(INITIAL_FEN).unwrap();
        assert_eq!(Fen::format(&position), INITIAL_FEN);

        let fen = "r3k2r/8/8/3pP3/8/8/8/R3K2R w Kq d6 3 17";
        assert_eq!(Fen::format(&Fen::parse(fen).unwrap()), fen);
    }

    #[test]
    fn test_en_passant_square_follows_side_to_move() {
        let position = Fen::parse("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        assert_eq!(position.en_passant, Some("d6".parse().unwrap()));

        let position = Fen::parse("4k3/8/8/8/3Pp3/8/8/4K3 b - d3 0 1").unwrap();
        assert_eq!(position.en_passant, Some("d3".parse().unwrap()));

        // 白方走子时目标格必须在第 6 横线
        assert!(Fen::parse("4k3/8/8/8/3PP3/8/8/4K3 w - d4 0 1").is_err());
        assert!(Fen::parse("4k3/8/8/8/3Pp3/8/8/4K3 w - d3 0 1").is_err());
    }

    #[test]
    fn test_castling_rights_set_moved_flags() {
        let position = Fen::parse("r3k2r/8/8/8/8/8/8/R3K2R w K - 0 1").unwrap();
        let board = &position.board;

        assert!(!board.get("e1".parse().unwrap()).unwrap().moved);
        assert!(!board.get("h1".parse().unwrap()).unwrap().moved);
        assert!(board.get("a1".parse().unwrap()).unwrap().moved);
        assert!(board.get("e8".parse().unwrap()).unwrap().moved);
        assert_eq!(Fen::castling_rights(board), "K");
    }

    #[test]
    fn test_parse_partial_fen() {
        let position = Fen::parse("4k3/8/8/8/8/8/8/4K3 b").unwrap();
        assert_eq!(position.side_to_move, Color::Black);
        assert_eq!(position.halfmove_clock, 0);
        assert_eq!(position.fullmove_number, 1);
        assert_eq!(Fen::castling_rights(&position.board), "-");
    }

    #[test]
    fn test_invalid_fen() {
        // 行数不对
        assert!(Fen::parse("8/8/8").is_err());
        // 列数不对
        assert!(Fen::parse("9/8/8/8/8/8/8/8 w").is_err());
        assert!(Fen::parse("4k4/8/8/8/8/8/8/4K3 w").is_err());
        // 无效字符
        assert!(Fen::parse("4x3/8/8/8/8/8/8/4K3 w").is_err());
        // 无效走子方、易位权、吃过路兵目标和计数
        assert!(Fen::parse("4k3/8/8/8/8/8/8/4K3 x").is_err());
        assert!(Fen::parse("4k3/8/8/8/8/8/8/4K3 w X").is_err());
        assert!(Fen::parse("4k3/8/8/8/8/8/8/4K3 w - z9").is_err());
        assert!(Fen::parse("4k3/8/8/8/8/8/8/4K3 w - e4 0 1").is_err());
        assert!(Fen::parse("4k3/8/8/8/8/8/8/4K3 b - d6 0 1").is_err());
        assert!(Fen::parse("4k3/8/8/8/8/8/8/4K3 w - - abc").is_err());
        assert!(Fen::parse("").is_err());
    }
}
