pub mod command;
pub mod decode;
pub mod info;
pub mod interleave;
pub mod progress;

use log::Level;

use command::Cli;

/// Warnings at or above this level abort the command.
pub fn fail_level(cli: &Cli) -> Level {
    if cli.strict { Level::Warn } else { Level::Error }
}

/// One log record as a single-line JSON object.
pub fn json_log_line(timestamp: &str, level: Level, message: &str) -> String {
    serde_json::json!({
        "ts": timestamp,
        "lvl": level.as_str(),
        "msg": message,
    })
    .to_string()
}
