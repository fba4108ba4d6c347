use chrono::{DateTime, Datelike, TimeZone, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// うるう年かどうかを判定する。
///
/// 4で割り切れ、100で割り切れない年。ただし400で割り切れる年はうるう年とする。
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// 指定された年の日数を返す。
pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// 基準日時がその年の何日目かを返す。1月1日を1日目とする。
pub fn day_of_year<Tz: TimeZone>(reference: &DateTime<Tz>) -> u32 {
    reference.ordinal()
}
