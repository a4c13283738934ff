//! 日志初始化，二进制入口与测试共用

use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write;

/// 初始化 JSON 行日志 (`timestamp`, `level`, `message`, `target`)
///
/// 级别取自 `RUST_LOG`，默认 `info`；重复调用时后一次被忽略
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .try_init();
}

/// 测试日志: 由测试框架捕获，`debug` 及以上
pub fn init_test_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
