pub mod commands;
pub mod monitor_commands;
pub mod speedtest_commands;

pub use commands::Cli;
pub use monitor_commands::MonitorCommandHandler;
pub use speedtest_commands::SpeedTestCommandHandler;
