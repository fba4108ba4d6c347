use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::datetime;
use crate::time_entry::TimeEntry;

/// 直近4週間の集計期間(日)。
pub const LAST_28_DAYS: u32 = 28;
/// 直近1週間の集計期間(日)。
pub const LAST_7_DAYS: u32 = 7;

/// 集計期間ごとのタイムエントリー。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RevenueWindow {
    pub entries: Vec<TimeEntry>,
    /// 集計期間の日数
    pub days: u32,
}

impl RevenueWindow {
    /// 期間内の売上合計を補助単位で返す。エントリーがない場合は0。
    pub fn revenue(&self) -> f64 {
        self.entries.iter().map(TimeEntry::revenue).sum()
    }
}

/// 売上予測に利用する3つの集計期間。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RevenueWindows {
    pub year_to_date: RevenueWindow,
    pub last_28_days: RevenueWindow,
    pub last_7_days: RevenueWindow,
}

impl RevenueWindows {
    /// タイムエントリーを基準日時に対する集計期間に振り分ける。
    ///
    /// - 年初来: `date`が基準日時と同じ年のエントリー
    /// - 直近28日: 年初来のうち、`created_at`からの経過時間が28日未満のエントリー
    /// - 直近7日: 直近28日のうち、`created_at`からの経過時間が7日未満のエントリー
    ///
    /// 入力の順序は各期間内で保持する。
    ///
    /// # Arguments
    ///
    /// * `entries` - 振り分けるタイムエントリー
    /// * `reference` - 基準日時
    pub fn partition<Tz: TimeZone>(entries: &[TimeEntry], reference: &DateTime<Tz>) -> Self {
        let year = reference.year();
        let reference_utc = reference.with_timezone(&Utc);

        let year_to_date: Vec<TimeEntry> = entries
            .iter()
            .filter(|entry| entry.date.year() == year)
            .cloned()
            .collect();
        let last_28_days = created_within(&year_to_date, &reference_utc, LAST_28_DAYS);
        let last_7_days = created_within(&last_28_days, &reference_utc, LAST_7_DAYS);

        Self {
            year_to_date: RevenueWindow {
                entries: year_to_date,
                days: datetime::day_of_year(reference),
            },
            last_28_days: RevenueWindow {
                entries: last_28_days,
                days: LAST_28_DAYS,
            },
            last_7_days: RevenueWindow {
                entries: last_7_days,
                days: LAST_7_DAYS,
            },
        }
    }
}

/// 作成日時からの経過時間が`days`日未満のエントリーを返す。
fn created_within(entries: &[TimeEntry], reference: &DateTime<Utc>, days: u32) -> Vec<TimeEntry> {
    let window = Duration::days(i64::from(days));
    entries
        .iter()
        .filter(|entry| reference.signed_duration_since(entry.created_at) < window)
        .cloned()
        .collect()
}
