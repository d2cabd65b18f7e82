//! 规则引擎
//!
//! [`Game`] 维护完整的对局状态：棋盘、走子方、半回合计数、重复局面计数、
//! 吃过路兵目标、棋谱和悔棋快照栈。所有状态变化都经过 [`Game::try_move`]、
//! [`Game::apply_move`] 或悔棋恢复，不存在其他修改入口。

use std::collections::HashMap;

use tracing::{debug, info};

use crate::board::Board;
use crate::constants::{
    FIFTY_MOVE_HALFMOVES, KING_HOME_COL, KINGSIDE_ROOK_COL, QUEENSIDE_ROOK_COL, REPETITION_LIMIT,
};
use crate::error::{ChessError, Result};
use crate::fen::{Fen, FenPosition};
use crate::moves::{Move, MoveGenerator};
use crate::piece::{Color, Piece, PieceKind, Position};
use crate::state::{GameState, Outcome};

/// 对局
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    side_to_move: Color,
    outcome: Option<Outcome>,
    /// 距上次兵的移动或吃子的半回合数
    halfmove_clock: u32,
    fullmove_number: u32,
    /// 局面指纹（仅棋子布局）出现次数
    repetitions: HashMap<String, u32>,
    en_passant: Option<Position>,
    history: Vec<String>,
    /// 快照栈，新对局后至少有一项
    snapshots: Vec<GameState>,
}

impl Game {
    /// 创建标准初始局面的新对局
    pub fn new() -> Self {
        Self::from_parts(FenPosition {
            board: Board::initial(),
            side_to_move: Color::White,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        })
    }

    /// 从 FEN 创建对局
    ///
    /// 载入时即判定终局，因此可以直接载入已将死或逼和的局面。
    pub fn from_fen(fen: &str) -> Result<Self> {
        let position = Fen::parse(fen)?;
        let game = Self::from_parts(position);
        debug!("从 FEN 载入局面: {}", fen);
        Ok(game)
    }

    fn from_parts(position: FenPosition) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(position.board.fen_position(), 1);

        let mut game = Self {
            board: position.board,
            side_to_move: position.side_to_move,
            outcome: None,
            halfmove_clock: position.halfmove_clock,
            fullmove_number: position.fullmove_number,
            repetitions,
            en_passant: position.en_passant,
            history: Vec::new(),
            snapshots: Vec::new(),
        };
        game.outcome = game.detect_outcome();
        game.snapshots.push(game.snapshot());
        game
    }

    /// 重新开始（丢弃棋谱和快照）
    pub fn new_game(&mut self) {
        *self = Self::new();
        info!("新对局开始");
    }

    /// 导出完整 FEN
    pub fn to_fen(&self) -> String {
        Fen::format(&FenPosition {
            board: self.board.clone(),
            side_to_move: self.side_to_move,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        })
    }

    // ========================================================================
    // 状态查询
    // ========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn white_to_move(&self) -> bool {
        self.side_to_move.is_white()
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// 终局提示文本，对局进行中返回空字符串
    pub fn game_end_message(&self) -> String {
        self.outcome.map(|o| o.message()).unwrap_or_default()
    }

    /// 棋谱，例如 `["Pe2-e4", "Pf7-f6"]`
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// 当前重复局面计数表
    pub fn position_history(&self) -> &HashMap<String, u32> {
        &self.repetitions
    }

    pub fn en_passant_target(&self) -> Option<Position> {
        self.en_passant
    }

    /// 快照栈深度
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    // ========================================================================
    // 合法走法
    // ========================================================================

    /// 获取指定格子上棋子的合法目标格
    ///
    /// 格子为空或棋子不属于走子方时返回空列表。
    pub fn legal_moves_from(&self, pos: Position) -> Vec<Position> {
        match self.board.get(pos) {
            Some(piece) if piece.color == self.side_to_move => self.destinations(pos, piece),
            _ => Vec::new(),
        }
    }

    /// 走子方的全部合法走法（按棋盘索引顺序）
    pub fn legal_moves(&self) -> Vec<Move> {
        self.board
            .pieces(self.side_to_move)
            .into_iter()
            .flat_map(|(from, piece)| {
                self.destinations(from, piece)
                    .into_iter()
                    .map(move |to| Move::new(from, to))
            })
            .collect()
    }

    fn destinations(&self, pos: Position, piece: Piece) -> Vec<Position> {
        let mut targets = MoveGenerator::possible_moves(&self.board, pos, piece);

        if piece.kind == PieceKind::Pawn && piece.color == self.side_to_move {
            if let Some(target) = self.en_passant {
                if MoveGenerator::attacks(&self.board, pos, piece).contains(&target) {
                    targets.push(target);
                }
            }
        }

        if piece.kind == PieceKind::King && !piece.moved && !self.in_check(piece.color) {
            let row = piece.color.home_row();
            for (kingside, col) in [(true, 6), (false, 2)] {
                if self.can_castle(piece.color, pos, kingside) {
                    targets.push(Position::new_unchecked(row, col));
                }
            }
        }

        targets.retain(|&to| !self.leaves_king_in_check(pos, to, piece.color));
        targets
    }

    /// 检查王车易位条件（王未被将军由调用方保证）
    fn can_castle(&self, color: Color, king_pos: Position, kingside: bool) -> bool {
        let row = color.home_row();
        if king_pos != Position::new_unchecked(row, KING_HOME_COL) {
            return false;
        }

        let (rook_col, between, transit): (u8, &[u8], [u8; 3]) = if kingside {
            (KINGSIDE_ROOK_COL, &[5, 6], [4, 5, 6])
        } else {
            (QUEENSIDE_ROOK_COL, &[1, 2, 3], [4, 3, 2])
        };

        let rook_ready = self
            .board
            .get(Position::new_unchecked(row, rook_col))
            .is_some_and(|rook| rook.is(PieceKind::Rook, color) && !rook.moved);
        if !rook_ready {
            return false;
        }

        if between
            .iter()
            .any(|&col| self.board.get(Position::new_unchecked(row, col)).is_some())
        {
            return false;
        }

        !transit.iter().any(|&col| {
            MoveGenerator::is_square_attacked(
                &self.board,
                Position::new_unchecked(row, col),
                color.opponent(),
            )
        })
    }

    /// 在棋盘副本上模拟走法，检查是否自将
    fn leaves_king_in_check(&self, from: Position, to: Position, color: Color) -> bool {
        let mut board = self.board.clone();
        execute(&mut board, self.en_passant, from, to, PieceKind::Queen);
        MoveGenerator::is_in_check(&board, color)
    }

    fn has_any_legal_move(&self, color: Color) -> bool {
        self.board
            .pieces(color)
            .into_iter()
            .any(|(pos, piece)| !self.destinations(pos, piece).is_empty())
    }

    pub fn in_check(&self, color: Color) -> bool {
        MoveGenerator::is_in_check(&self.board, color)
    }

    pub fn is_checkmate(&self, color: Color) -> bool {
        self.in_check(color) && !self.has_any_legal_move(color)
    }

    pub fn find_king(&self, color: Color) -> Option<Position> {
        self.board.find_king(color)
    }

    pub fn is_square_attacked(&self, pos: Position, by: Color) -> bool {
        MoveGenerator::is_square_attacked(&self.board, pos, by)
    }

    /// 该走法是否为兵到达底线（需要选择升变棋子）
    pub fn is_promotion(&self, from: Position, to: Position) -> bool {
        self.board
            .get(from)
            .is_some_and(|p| p.kind == PieceKind::Pawn && to.row == p.color.promotion_row())
    }

    // ========================================================================
    // 走棋
    // ========================================================================

    /// 走棋，成功返回 true；非法请求返回 false 且不改变任何状态
    ///
    /// `promotion` 为升变选择（`'q'`、`'r'`、`'b'`、`'n'`，不区分大小写），
    /// 缺省或无法识别时升变为后。
    pub fn make_move(&mut self, from: Position, to: Position, promotion: Option<char>) -> bool {
        match self.try_move(from, to, promotion) {
            Ok(_) => true,
            Err(e) => {
                debug!("拒绝走法 {}{}: {}", from, to, e);
                false
            }
        }
    }

    /// 走棋，成功返回该步的棋谱记录，失败返回拒绝原因
    pub fn try_move(&mut self, from: Position, to: Position, promotion: Option<char>) -> Result<String> {
        if self.is_game_over() {
            return Err(ChessError::GameOver);
        }

        let piece = self.board.get(from).ok_or_else(|| ChessError::NoPiece {
            square: from.to_string(),
        })?;

        if piece.color != self.side_to_move {
            return Err(ChessError::NotYourTurn);
        }

        if !self.legal_moves_from(from).contains(&to) {
            return Err(ChessError::IllegalMove {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let captured = self.commit(from, to, PieceKind::from_promotion_choice(promotion));
        let notation = self.notation(piece, from, to, captured);
        self.history.push(notation.clone());

        if let Some(outcome) = self.outcome {
            info!("对局结束: {} ({})", outcome, notation);
        }

        Ok(notation)
    }

    /// 应用一个走法，不生成棋谱（供搜索使用，升变总是选后）
    ///
    /// 走法应来自 [`Game::legal_moves`]；这里只做廉价的基本检查。
    /// 与 [`Game::revert_move`] 配对使用。
    pub fn apply_move(&mut self, mv: Move) -> bool {
        if self.is_game_over() {
            return false;
        }
        match self.board.get(mv.from) {
            Some(piece) if piece.color == self.side_to_move => {
                self.commit(mv.from, mv.to, PieceKind::Queen);
                true
            }
            _ => false,
        }
    }

    /// 撤销最近一次 [`Game::apply_move`]，不修改棋谱
    pub fn revert_move(&mut self) {
        if self.snapshots.len() < 2 {
            return;
        }
        self.snapshots.pop();
        if let Some(state) = self.snapshots.last().cloned() {
            self.restore(state);
        }
    }

    /// 悔一步棋（少于两个快照时不做任何事）
    pub fn undo_move(&mut self) {
        if self.snapshots.len() < 2 {
            return;
        }
        self.revert_move();
        self.history.pop();
        debug!("悔棋，剩余 {} 步", self.history.len());
    }

    /// 执行已验证的走法并更新全部对局状态，返回是否吃子
    fn commit(&mut self, from: Position, to: Position, promotion: PieceKind) -> bool {
        let is_pawn = self
            .board
            .get(from)
            .is_some_and(|p| p.kind == PieceKind::Pawn);
        let en_passant_capture = is_pawn && Some(to) == self.en_passant && from.col != to.col;
        let captured = self.board.get(to).is_some() || en_passant_capture;

        self.en_passant = execute(&mut self.board, self.en_passant, from, to, promotion);

        self.side_to_move = self.side_to_move.opponent();
        if is_pawn || captured {
            self.halfmove_clock = 0;
            self.repetitions.clear();
        } else {
            self.halfmove_clock += 1;
        }
        if self.side_to_move == Color::White {
            self.fullmove_number += 1;
        }

        *self.repetitions.entry(self.board.fen_position()).or_insert(0) += 1;

        self.outcome = self.detect_outcome();
        self.snapshots.push(self.snapshot());
        captured
    }

    /// 判定终局，先匹配的条件优先
    fn detect_outcome(&self) -> Option<Outcome> {
        let side = self.side_to_move;

        if !self.has_any_legal_move(side) {
            return Some(if self.in_check(side) {
                Outcome::Checkmate {
                    winner: side.opponent(),
                }
            } else {
                Outcome::Stalemate
            });
        }

        if self.halfmove_clock >= FIFTY_MOVE_HALFMOVES {
            return Some(Outcome::FiftyMoveRule);
        }

        let seen = self
            .repetitions
            .get(&self.board.fen_position())
            .copied()
            .unwrap_or(0);
        if seen >= REPETITION_LIMIT {
            return Some(Outcome::ThreefoldRepetition);
        }

        if self.is_insufficient_material() {
            return Some(Outcome::InsufficientMaterial);
        }

        None
    }

    /// 只识别王对王、以及王对王加单个轻子
    fn is_insufficient_material(&self) -> bool {
        let others: Vec<Piece> = self
            .board
            .iter()
            .map(|(_, piece)| piece)
            .filter(|piece| piece.kind != PieceKind::King)
            .collect();

        match others.as_slice() {
            [] => true,
            [only] => only.kind.is_minor(),
            _ => false,
        }
    }

    fn notation(&self, piece: Piece, from: Position, to: Position, captured: bool) -> String {
        let separator = if captured { 'x' } else { '-' };
        let suffix = match self.outcome {
            Some(Outcome::Checkmate { .. }) => "#",
            _ if self.in_check(self.side_to_move) => "+",
            _ => "",
        };
        format!("{}{}{}{}{}", piece.kind.symbol(), from, separator, to, suffix)
    }

    fn snapshot(&self) -> GameState {
        GameState {
            board: self.board.clone(),
            side_to_move: self.side_to_move,
            outcome: self.outcome,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
            repetitions: self.repetitions.clone(),
            en_passant: self.en_passant,
        }
    }

    fn restore(&mut self, state: GameState) {
        self.board = state.board;
        self.side_to_move = state.side_to_move;
        self.outcome = state.outcome;
        self.halfmove_clock = state.halfmove_clock;
        self.fullmove_number = state.fullmove_number;
        self.repetitions = state.repetitions;
        self.en_passant = state.en_passant;
    }

    /// 当前快照（只读）
    pub fn current_state(&self) -> Option<&GameState> {
        self.snapshots.last()
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for Game {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_fen(s)
    }
}

/// 在棋盘上执行走法（不检查合法性），返回新的吃过路兵目标
///
/// 对局提交和自将模拟共用此函数，保证两者的走法语义一致。
fn execute(
    board: &mut Board,
    en_passant: Option<Position>,
    from: Position,
    to: Position,
    promotion: PieceKind,
) -> Option<Position> {
    let mut piece = board.remove(from)?;

    match piece.kind {
        PieceKind::King if from.col.abs_diff(to.col) == 2 => {
            let (rook_from, rook_to) = if to.col > from.col {
                (KINGSIDE_ROOK_COL, to.col - 1)
            } else {
                (QUEENSIDE_ROOK_COL, to.col + 1)
            };
            if let Some(mut rook) = board.remove(Position::new_unchecked(from.row, rook_from)) {
                rook.moved = true;
                board.place(Position::new_unchecked(from.row, rook_to), rook);
            }
        }
        PieceKind::Pawn if Some(to) == en_passant && from.col != to.col && board.get(to).is_none() => {
            // 被吃的兵在目标格正后方，与出发格同一行
            board.remove(Position::new_unchecked(from.row, to.col));
        }
        _ => {}
    }

    if matches!(piece.kind, PieceKind::King | PieceKind::Rook) {
        piece.moved = true;
    }

    if piece.kind == PieceKind::Pawn && to.row == piece.color.promotion_row() {
        piece = Piece::new_moved(promotion, piece.color);
    }

    board.remove(to);
    board.place(to, piece);

    if piece.kind == PieceKind::Pawn && from.row.abs_diff(to.row) == 2 {
        Some(Position::new_unchecked((from.row + to.row) / 2, from.col))
    } else {
        None
    }
}
