use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use log::info;

use crate::mite::MiteRepository;
use crate::projection::{self, Projection};
use crate::window::RevenueWindows;

/// 売上の報告を出力するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct ReportArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom reference date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<DateTime<Utc>>,
}

pub struct RevenueCommand<'a, T: MiteRepository + ?Sized> {
    mite_client: &'a T,
}

impl<'a, T: MiteRepository + ?Sized> RevenueCommand<'a, T> {
    /// 新しい`RevenueCommand`を返す。
    ///
    /// # Arguments
    /// * `mite_client` - mite APIと通信するためのリポジトリ
    pub fn new(mite_client: &'a T) -> Self {
        Self { mite_client }
    }

    /// 基準日時の年のタイムエントリーを取得し、売上と年間売上予測を計算する。
    ///
    /// 取得に失敗した場合は計算を行わずにエラーを返す。
    ///
    /// # Arguments
    ///
    /// * `now` - 基準日時。年と日付の判定はこのタイムゾーンで行う。
    pub async fn run<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Projection> {
        let year = now.year();
        info!("Reference: {}, year: {}", now.naive_local(), year);

        let time_entries = self
            .mite_client
            .read_time_entries(year)
            .await
            .context("Failed to retrieve time entries")?;
        info!("Time entries retrieved successfully.");

        let windows = RevenueWindows::partition(&time_entries, now);
        info!(
            "Entries this year: {}, last 28 days: {}, last 7 days: {}",
            windows.year_to_date.entries.len(),
            windows.last_28_days.entries.len(),
            windows.last_7_days.entries.len()
        );

        Ok(projection::project(&windows, now))
    }
}

/// 日付をパースする。
fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let naive_date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse date: {}", s))?;
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .context("Failed to set hour, minute, and second")?;
    let datetime = Local
        .from_local_datetime(&naive_datetime)
        .single()
        .context("Failed to convert to DateTime<Local>")?
        .to_utc();

    Ok(datetime)
}
