use std::path::PathBuf;

use anyhow::{Context, Result};
use chess_ai::{AiEngine, Difficulty};
use chess_cli::console;
use chess_cli::{Session, Settings};
use chess_core::{Color, Game};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 终端国际象棋
#[derive(Parser, Debug)]
#[command(name = "terminal-chess", version, about = "Play chess against the engine in a terminal")]
struct Args {
    /// Engine strength: beginner, easy, medium, hard, expert (or 0-4)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Engine thinking time in milliseconds
    #[arg(long)]
    time: Option<u64>,

    /// Maximum search depth
    #[arg(long)]
    depth: Option<u8>,

    /// Play the black pieces
    #[arg(long)]
    black: bool,

    /// Two players at one terminal, no engine
    #[arg(long)]
    pvp: bool,

    /// Start from this FEN position
    #[arg(long)]
    fen: Option<String>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Args {
    /// 命令行参数覆盖设置文件
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(difficulty) = self.difficulty {
            settings.difficulty = difficulty;
        }
        if let Some(ms) = self.time {
            settings.time_budget_ms = Some(ms);
        }
        if let Some(depth) = self.depth {
            settings.max_depth = Some(depth);
        }
        if self.black {
            settings.human_side = Color::Black;
        }
        if self.pvp {
            settings.pvp = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let path = match &args.settings {
        Some(path) => path.clone(),
        None => Settings::settings_path().context("无法获取配置目录")?,
    };
    let loaded = Settings::read(&path);
    let log_level = match &loaded {
        Ok(Some(settings)) => settings.log_level,
        _ => Default::default(),
    };

    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(format!("chess_cli={}", log_level.as_directive()).parse()?)
            .add_directive(format!("chess_ai={}", log_level.as_directive()).parse()?)
            .add_directive(format!("chess_core={}", log_level.as_directive()).parse()?))
        .init();

    let mut settings = Settings::resolve(&path, loaded);
    args.apply_to(&mut settings);

    let game = match &args.fen {
        Some(fen) => Game::from_fen(fen).with_context(|| format!("无法载入局面: {}", fen))?,
        None => Game::new(),
    };

    info!(
        "终端国际象棋启动: 难度 {}, 执{}, 双人 {}",
        settings.difficulty, settings.human_side, settings.pvp
    );

    let engine = AiEngine::new(settings.ai_config());
    let session = Session::new(game, engine, settings.human_side, settings.pvp);

    console::run(session, || {
        settings.save_to(&path)?;
        Ok(format!("Settings saved to {}", path.display()))
    })
    .await
}
