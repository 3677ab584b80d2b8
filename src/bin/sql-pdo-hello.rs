use clap::{Parser, ValueEnum};
use tracing::Level;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve a static Hello World! page")]
struct Args {
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: String,
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(Level::from(args.log_level))
        .init();

    if let Err(err) = sql_pdo::hello::bind_and_serve(&args.addr).await {
        tracing::error!(error = %err, addr = %args.addr, "server stopped");
        std::process::exit(1);
    }
}
