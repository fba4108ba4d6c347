use std::io;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::{debug, LevelFilter};

mod config;
mod console;
mod datetime;
mod feedback;
mod mite;
mod projection;
mod report;
mod revenue_command;
mod slack;
mod time_entry;
mod window;

use config::{MiteConfig, ServerConfig};
use console::{ConsolePlainReport, ConsolePresenter};
use mite::MiteClient;
use report::RevenueReport;
use revenue_command::{ReportArgs, RevenueCommand};

/// miteのタイムエントリーから売上と年間売上予測を報告するアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- serve
/// $ cargo run -- report --date 2024-06-30
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(short = 'v', long = "verbose", help = "Enables debug logging")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    #[clap(about = "Serves the Slack slash command")]
    Serve,
    #[clap(about = "Prints the revenue report once")]
    Report(ReportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger(if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    })?;
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }

    match args.subcommand {
        SubCommands::Serve => {
            let config = ServerConfig::from_env().context("Failed to load configuration")?;
            slack::serve(config).await?
        }
        SubCommands::Report(report) => report_command(report).await?,
    }

    Ok(())
}

/// `report`サブコマンドの処理を行う。
///
/// 日付が指定されていない場合は現在時刻を基準にする。
async fn report_command(args: ReportArgs) -> Result<()> {
    let mite_config = MiteConfig::from_env().context("Failed to load configuration")?;
    let currency = config::currency(|key| std::env::var(key).ok());
    let client = MiteClient::new(&mite_config);

    let now = args
        .date
        .unwrap_or_else(datetime::now)
        .with_timezone(&Local);
    let projection = RevenueCommand::new(&client).run(&now).await?;

    let mut stdout = io::stdout();
    ConsolePlainReport::new(&mut stdout, currency).show_report(&RevenueReport::from(&projection))
}

/// ログの出力先と形式を設定する。
fn setup_logger(level: LevelFilter) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::Blue);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S%:z"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", LevelFilter::Info)
        .level_for("reqwest", LevelFilter::Info)
        .chain(io::stdout())
        .apply()
        .context("Failed to set up logger")?;

    Ok(())
}
