//! 国际象棋终端客户端
//!
//! 逐行命令驱动的对局界面，可与 AI 或另一位玩家对弈

pub mod console;
pub mod settings;

pub use console::{Command, Reply, Session};
pub use settings::{LogLevel, Settings};
