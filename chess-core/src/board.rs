//! 棋盘状态

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, SQUARE_COUNT};
use crate::piece::{Color, Piece, PieceKind, Position};

/// 底线棋子排列（a 线到 h 线）
const BACK_RANK: [PieceKind; BOARD_SIZE] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// 棋盘
///
/// 克隆得到的棋盘与原棋盘完全独立：棋子是值类型，不存在跨棋盘的引用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 8x8 棋盘，索引为 row * 8 + col，使用 Vec 以支持 serde
    squares: Vec<Option<Piece>>,
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            squares: vec![None; SQUARE_COUNT],
        }
    }

    /// 创建初始棋盘
    pub fn initial() -> Self {
        let mut board = Self::empty();

        for (col, kind) in BACK_RANK.iter().enumerate() {
            let col = col as u8;
            // 黑方（上方，第 0 行开始）
            board.place(Position::new_unchecked(0, col), Piece::new(*kind, Color::Black));
            board.place(Position::new_unchecked(1, col), Piece::new(PieceKind::Pawn, Color::Black));
            // 白方（下方，第 7 行开始）
            board.place(Position::new_unchecked(6, col), Piece::new(PieceKind::Pawn, Color::White));
            board.place(Position::new_unchecked(7, col), Piece::new(*kind, Color::White));
        }

        board
    }

    /// 获取指定位置的棋子
    pub fn get(&self, pos: Position) -> Option<Piece> {
        if pos.is_valid() {
            self.squares[pos.to_index()]
        } else {
            None
        }
    }

    /// 在指定位置放置棋子（覆盖原有棋子）
    pub fn place(&mut self, pos: Position, piece: Piece) {
        if pos.is_valid() {
            self.squares[pos.to_index()] = Some(piece);
        }
    }

    /// 移除指定位置的棋子并返回
    pub fn remove(&mut self, pos: Position) -> Option<Piece> {
        if pos.is_valid() {
            self.squares[pos.to_index()].take()
        } else {
            None
        }
    }

    /// 移动棋子（不检查规则），返回被覆盖的棋子
    pub fn move_piece(&mut self, from: Position, to: Position) -> Option<Piece> {
        let piece = self.remove(from)?;
        let captured = self.remove(to);
        self.place(to, piece);
        captured
    }

    /// 清空棋盘
    pub fn clear(&mut self) {
        self.squares.iter_mut().for_each(|square| *square = None);
    }

    /// 获取指定阵营的所有棋子（按索引顺序）
    pub fn pieces(&self, color: Color) -> Vec<(Position, Piece)> {
        self.iter().filter(|(_, piece)| piece.color == color).collect()
    }

    /// 按索引顺序遍历所有棋子
    pub fn iter(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.squares.iter().enumerate().filter_map(|(index, square)| {
            let pos = Position::new_unchecked((index / BOARD_SIZE) as u8, (index % BOARD_SIZE) as u8);
            square.map(|piece| (pos, piece))
        })
    }

    /// 棋盘上棋子总数
    pub fn piece_count(&self) -> usize {
        self.squares.iter().filter(|square| square.is_some()).count()
    }

    /// 查找指定阵营的王
    pub fn find_king(&self, color: Color) -> Option<Position> {
        self.iter()
            .find(|(_, piece)| piece.is(PieceKind::King, color))
            .map(|(pos, _)| pos)
    }

    /// 导出棋子布局（FEN 的第一段）
    ///
    /// 只描述棋子位置，不包含走子方、易位权和吃过路兵目标，仅用于重复局面判定。
    pub fn fen_position(&self) -> String {
        let mut rows = Vec::with_capacity(BOARD_SIZE);

        for row in 0..BOARD_SIZE as u8 {
            let mut line = String::new();
            let mut empty_count = 0;

            for col in 0..BOARD_SIZE as u8 {
                if let Some(piece) = self.get(Position::new_unchecked(row, col)) {
                    if empty_count > 0 {
                        line.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    line.push(piece.to_fen_char());
                } else {
                    empty_count += 1;
                }
            }

            if empty_count > 0 {
                line.push_str(&empty_count.to_string());
            }

            rows.push(line);
        }

        rows.join("/")
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..BOARD_SIZE as u8 {
            write!(f, "{} ", BOARD_SIZE as u8 - row)?;
            for col in 0..BOARD_SIZE as u8 {
                let c = self
                    .get(Position::new_unchecked(row, col))
                    .map(|piece| piece.to_fen_char())
                    .unwrap_or('.');
                write!(f, " {}", c)?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}
