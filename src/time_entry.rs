use chrono::{DateTime, NaiveDate, Utc};

/// 売上計算に利用するタイムエントリー。
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntry {
    /// 作業を記録した日付
    pub date: NaiveDate,
    /// エントリーの作成日時。直近の集計期間の判定に利用する。
    pub created_at: DateTime<Utc>,
    /// 作業時間(分)
    pub minutes: u32,
    /// 時給。通貨の補助単位(セントなど)で表す。
    pub hourly_rate: f64,
}

impl TimeEntry {
    /// エントリーの売上を補助単位で返す。
    pub fn revenue(&self) -> f64 {
        self.hourly_rate * (self.minutes as f64 / 60.0)
    }
}
