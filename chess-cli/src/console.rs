//! 终端对局循环
//!
//! 逐行读取命令：坐标走法（`e2e4`、`e2-e4`、`e7e8n`）或 `moves`、`undo` 等指令。
//! 人机对局时，轮到 AI 走棋就在后台搜索并等待结果。

use anyhow::{Context, Result};
use chess_ai::AiEngine;
use chess_core::{Color, Game, Move, Position};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

pub const HELP: &str = "\
Commands:
  e2e4 | e2-e4 | e7e8n   make a move (optional promotion: q, r, b, n)
  moves <square>         list legal destinations of a piece
  undo                   take back the last move (and the engine reply)
  new                    start a new game
  fen                    print the position as FEN
  history                print the move list
  board                  print the board
  save                   save the current settings
  help                   show this help
  quit                   leave";

/// 终端命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move { mv: Move, promotion: Option<char> },
    Moves(Position),
    Undo,
    New,
    Fen,
    History,
    Board,
    Save,
    Help,
    Quit,
}

impl Command {
    /// 解析一行输入
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match first.to_ascii_lowercase().as_str() {
            "moves" => {
                let square = words.next().ok_or("usage: moves <square>")?;
                Command::Moves(square.parse().map_err(|e| format!("{}", e))?)
            }
            "undo" => Command::Undo,
            "new" => Command::New,
            "fen" => Command::Fen,
            "history" => Command::History,
            "board" => Command::Board,
            "save" => Command::Save,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                let (mv, promotion) = Move::parse_with_promotion(other)
                    .map_err(|_| format!("unknown command: {} (type 'help')", other))?;
                Command::Move { mv, promotion }
            }
        };

        if words.next().is_some() {
            return Err(format!("unexpected input after '{}'", first));
        }
        Ok(command)
    }
}

/// 命令执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// 请求保存设置，由调用方处理
    SaveSettings,
    Quit,
}

/// 一局终端对局
pub struct Session {
    game: Game,
    engine: AiEngine,
    human: Color,
    pvp: bool,
}

impl Session {
    pub fn new(game: Game, engine: AiEngine, human: Color, pvp: bool) -> Self {
        Self {
            game,
            engine,
            human,
            pvp,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// 是否轮到 AI 走棋
    pub fn engine_to_move(&self) -> bool {
        !self.pvp && !self.game.is_game_over() && self.game.side_to_move() != self.human
    }

    /// 执行一条命令
    pub fn apply(&mut self, command: Command) -> Reply {
        match command {
            Command::Move { mv, promotion } => {
                if self.engine_to_move() {
                    return Reply::Text("It is the engine's turn.".to_string());
                }
                match self.game.try_move(mv.from, mv.to, promotion) {
                    Ok(notation) => Reply::Text(self.after_move(&notation)),
                    Err(e) => Reply::Text(e.to_string()),
                }
            }
            Command::Moves(pos) => {
                let targets = self.game.legal_moves_from(pos);
                if targets.is_empty() {
                    Reply::Text(format!("No legal moves from {}.", pos))
                } else {
                    let list: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
                    Reply::Text(format!("{}: {}", pos, list.join(" ")))
                }
            }
            Command::Undo => {
                let before = self.game.history().len();
                self.game.undo_move();
                // 人机对局时连同 AI 的回应一起撤销
                if !self.pvp && self.engine_to_move() && !self.game.history().is_empty() {
                    self.game.undo_move();
                }
                let undone = before - self.game.history().len();
                debug!("撤销 {} 步", undone);
                if undone == 0 {
                    Reply::Text("Nothing to undo.".to_string())
                } else {
                    Reply::Text(self.status())
                }
            }
            Command::New => {
                self.game.new_game();
                Reply::Text(self.status())
            }
            Command::Fen => Reply::Text(self.game.to_fen()),
            Command::History => Reply::Text(self.history_text()),
            Command::Board => Reply::Text(self.status()),
            Command::Save => Reply::SaveSettings,
            Command::Help => Reply::Text(HELP.to_string()),
            Command::Quit => Reply::Quit,
        }
    }

    /// 让 AI 走一步，返回输出文本
    pub async fn engine_move(&mut self) -> Result<String> {
        let mv = self
            .engine
            .find_best_move(&self.game)
            .await
            .context("AI 搜索失败")?;

        let Some(mv) = mv else {
            return Ok("Engine has no legal move.".to_string());
        };

        let notation = self
            .game
            .try_move(mv.from, mv.to, Some('q'))
            .with_context(|| format!("AI 走法被拒绝: {}", mv))?;
        info!("AI 走棋: {}", notation);
        Ok(format!("Engine plays {}\n{}", notation, self.after_move(&notation)))
    }

    fn after_move(&self, notation: &str) -> String {
        debug!("走棋: {}", notation);
        self.status()
    }

    /// 棋盘与当前状态
    pub fn status(&self) -> String {
        let mut text = format!("{}\n", self.game.board());
        if self.game.is_game_over() {
            text.push_str(&self.game.game_end_message());
        } else {
            let side = self.game.side_to_move();
            text.push_str(&format!("{} to move", side));
            if self.game.in_check(side) {
                text.push_str(" (check)");
            }
        }
        text
    }

    fn history_text(&self) -> String {
        if self.game.history().is_empty() {
            return "No moves yet.".to_string();
        }
        self.game
            .history()
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| format!("{}. {}", i + 1, pair.join(" ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 运行终端循环，直到 `quit` 或输入结束
///
/// `on_save` 在收到 `save` 命令时调用。
pub async fn run<F>(mut session: Session, mut on_save: F) -> Result<()>
where
    F: FnMut() -> Result<String>,
{
    println!("{}", session.status());
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if session.engine_to_move() {
            println!("Engine is thinking...");
            println!("{}", session.engine_move().await?);
            continue;
        }

        let Some(line) = lines.next_line().await.context("读取输入失败")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Ok(command) => match session.apply(command) {
                Reply::Text(text) => println!("{}", text),
                Reply::SaveSettings => match on_save() {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("Could not save settings: {:#}", e),
                },
                Reply::Quit => break,
            },
            Err(e) => println!("{}", e),
        }
    }

    info!("退出对局");
    Ok(())
}
