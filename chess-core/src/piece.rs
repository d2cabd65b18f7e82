//! 棋子定义

use serde::{Deserialize, Serialize};

use crate::constants::BOARD_SIZE;
use crate::error::ChessError;

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    /// 兵
    Pawn,
    /// 马
    Knight,
    /// 象
    Bishop,
    /// 车
    Rook,
    /// 后
    Queen,
    /// 王
    King,
}

impl PieceKind {
    /// 获取棋子的基础分值（用于 AI 评估）
    ///
    /// 王的分值远大于其余棋子之和，保证任何战术比较都以王为先。
    pub fn value(&self) -> i32 {
        match self {
            PieceKind::Pawn => 100,
            PieceKind::Knight => 320,
            PieceKind::Bishop => 330,
            PieceKind::Rook => 500,
            PieceKind::Queen => 900,
            PieceKind::King => 20000,
        }
    }

    /// 棋谱中使用的字母（大写）
    pub fn symbol(&self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    /// 获取 FEN 字符（白方大写，黑方小写）
    pub fn to_fen_char(&self, color: Color) -> char {
        match color {
            Color::White => self.symbol(),
            Color::Black => self.symbol().to_ascii_lowercase(),
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<(PieceKind, Color)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        Some((kind, color))
    }

    /// 升变选择，不区分大小写；缺省或无法识别时升变为后
    pub fn from_promotion_choice(choice: Option<char>) -> PieceKind {
        match choice.map(|c| c.to_ascii_uppercase()) {
            Some('R') => PieceKind::Rook,
            Some('B') => PieceKind::Bishop,
            Some('N') => PieceKind::Knight,
            _ => PieceKind::Queen,
        }
    }

    /// 是否为轻子（马或象）
    pub fn is_minor(&self) -> bool {
        matches!(self, PieceKind::Knight | PieceKind::Bishop)
    }
}

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// 白方（先手，在下方）
    White,
    /// 黑方（后手，在上方）
    Black,
}

impl Color {
    /// 获取对方阵营
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn is_white(&self) -> bool {
        *self == Color::White
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Color> {
        match c {
            'w' | 'W' => Some(Color::White),
            'b' | 'B' => Some(Color::Black),
            _ => None,
        }
    }

    /// 兵前进方向（行增量）：白方向第 0 行，黑方向第 7 行
    pub fn pawn_direction(&self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// 兵的起始行
    pub fn pawn_start_row(&self) -> u8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// 兵的升变行
    pub fn promotion_row(&self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// 王和车的初始行
    pub fn home_row(&self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// 显示名称
    pub fn name(&self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 棋子
///
/// 棋子不记录自己的位置：位置就是它在棋盘数组中的下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
    /// 是否移动过（只对王车易位有意义）
    pub moved: bool,
}

impl Piece {
    /// 创建新棋子
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            moved: false,
        }
    }

    /// 创建已移动过的棋子
    pub fn new_moved(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            moved: true,
        }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        self.kind.to_fen_char(self.color)
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Piece> {
        PieceKind::from_fen_char(c).map(|(kind, color)| Piece::new(kind, color))
    }

    /// 获取棋子分值
    pub fn value(&self) -> i32 {
        self.kind.value()
    }

    pub fn is(&self, kind: PieceKind, color: Color) -> bool {
        self.kind == kind && self.color == color
    }
}

/// 棋盘位置
///
/// 第 0 行是第 8 横线（黑方底线），第 7 行是第 1 横线；第 0 列是 a 线。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 行 (0-7)
    pub row: u8,
    /// 列 (0-7)
    pub col: u8,
}

impl Position {
    /// 创建新位置
    pub fn new(row: u8, col: u8) -> Option<Self> {
        if (row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// 创建新位置（不检查边界，内部使用）
    pub const fn new_unchecked(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// 检查位置是否在棋盘内
    pub fn is_valid(&self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    /// 获取偏移后的位置
    pub fn offset(&self, dr: i8, dc: i8) -> Option<Position> {
        let row = self.row as i8 + dr;
        let col = self.col as i8 + dc;
        if (0..BOARD_SIZE as i8).contains(&row) && (0..BOARD_SIZE as i8).contains(&col) {
            Some(Position {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// 转换为数组索引
    pub fn to_index(&self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }

    /// 从数组索引转换
    pub fn from_index(index: usize) -> Option<Self> {
        if index < BOARD_SIZE * BOARD_SIZE {
            Some(Position {
                row: (index / BOARD_SIZE) as u8,
                col: (index % BOARD_SIZE) as u8,
            })
        } else {
            None
        }
    }

    /// 文件字母 (a-h)
    pub fn file(&self) -> char {
        (b'a' + self.col) as char
    }

    /// 横线编号 (1-8)
    pub fn rank(&self) -> u8 {
        BOARD_SIZE as u8 - self.row
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

impl std::str::FromStr for Position {
    type Err = ChessError;

    /// 解析代数记号，例如 `e4`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChessError::InvalidSquare(s.to_string());
        let mut chars = s.trim().chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(invalid());
        };
        let file = file.to_ascii_lowercase();
        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return Err(invalid());
        }
        let col = file as u8 - b'a';
        let row = BOARD_SIZE as u8 - (rank as u8 - b'0');
        Ok(Position::new_unchecked(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_fen_char() {
        let white_king = Piece::new(PieceKind::King, Color::White);
        assert_eq!(white_king.to_fen_char(), 'K');

        let black_knight = Piece::new(PieceKind::Knight, Color::Black);
        assert_eq!(black_knight.to_fen_char(), 'n');

        assert_eq!(
            Piece::from_fen_char('R'),
            Some(Piece::new(PieceKind::Rook, Color::White))
        );
        assert_eq!(
            Piece::from_fen_char('q'),
            Some(Piece::new(PieceKind::Queen, Color::Black))
        );
        assert_eq!(Piece::from_fen_char('x'), None);
    }

    #[test]
    fn test_promotion_choice() {
        assert_eq!(PieceKind::from_promotion_choice(Some('n')), PieceKind::Knight);
        assert_eq!(PieceKind::from_promotion_choice(Some('R')), PieceKind::Rook);
        assert_eq!(PieceKind::from_promotion_choice(Some('b')), PieceKind::Bishop);
        // 缺省和无效选择都升变为后
        assert_eq!(PieceKind::from_promotion_choice(None), PieceKind::Queen);
        assert_eq!(PieceKind::from_promotion_choice(Some('k')), PieceKind::Queen);
        assert_eq!(PieceKind::from_promotion_choice(Some('x')), PieceKind::Queen);
    }

    #[test]
    fn test_position_valid() {
        assert!(Position::new(0, 0).is_some());
        assert!(Position::new(7, 7).is_some());
        assert!(Position::new(8, 0).is_none());
        assert!(Position::new(0, 8).is_none());
        assert!(Position::new_unchecked(3, 3).offset(-4, 0).is_none());
        assert_eq!(
            Position::new_unchecked(3, 3).offset(1, -1),
            Some(Position::new_unchecked(4, 2))
        );
    }

    #[test]
    fn test_position_algebraic() {
        assert_eq!(Position::new_unchecked(7, 0).to_string(), "a1");
        assert_eq!(Position::new_unchecked(0, 7).to_string(), "h8");
        assert_eq!(Position::new_unchecked(4, 4).to_string(), "e4");

        assert_eq!("e4".parse::<Position>(), Ok(Position::new_unchecked(4, 4)));
        assert_eq!("A1".parse::<Position>(), Ok(Position::new_unchecked(7, 0)));
        assert!("i1".parse::<Position>().is_err());
        assert!("e9".parse::<Position>().is_err());
        assert!("e44".parse::<Position>().is_err());
    }

    #[test]
    fn test_position_index() {
        for index in 0..64 {
            let pos = Position::from_index(index).unwrap();
            assert_eq!(pos.to_index(), index);
        }
        assert!(Position::from_index(64).is_none());
    }

    #[test]
    fn test_color_opponent() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.opponent(), Color::White);
    }
}
