use chrono::{DateTime, Datelike, TimeZone};

use crate::datetime;
use crate::window::{RevenueWindow, RevenueWindows};

/// 通貨の補助単位から主単位への換算比。
const SUBUNITS_PER_UNIT: f64 = 100.0;

/// 売上と年間売上予測。金額はすべて通貨の主単位に丸めた値。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    /// 年初来の売上
    pub current_revenue: i64,
    /// 年初来の売上を年間の日数比で伸ばした予測
    pub projected_annual_from_ytd: i64,
    /// 直近28日の日次売上で残りの日数を埋めた予測
    pub projected_annual_from_28_day: i64,
    /// 直近7日の日次売上で残りの日数を埋めた予測
    pub projected_annual_from_7_day: i64,
}

/// 集計期間ごとの売上から年間売上予測を計算する。
///
/// 途中の合計は精度を保ったまま扱い、主単位への換算時にのみ丸める。
/// 1月1日は年初来の売上を年間日数倍するため予測の振れ幅が大きくなるが、そのまま返す。
///
/// # Arguments
///
/// * `windows` - 基準日時で振り分けた集計期間
/// * `reference` - 基準日時
pub fn project<Tz: TimeZone>(windows: &RevenueWindows, reference: &DateTime<Tz>) -> Projection {
    let days_in_year = f64::from(datetime::days_in_year(reference.year()));
    let day_of_year = f64::from(datetime::day_of_year(reference));
    let days_remaining = days_in_year - day_of_year;

    let revenue_this_year = windows.year_to_date.revenue();

    Projection {
        current_revenue: to_units(revenue_this_year),
        projected_annual_from_ytd: to_units(revenue_this_year * (days_in_year / day_of_year)),
        projected_annual_from_28_day: to_units(
            revenue_this_year + daily_rate(&windows.last_28_days) * days_remaining,
        ),
        projected_annual_from_7_day: to_units(
            revenue_this_year + daily_rate(&windows.last_7_days) * days_remaining,
        ),
    }
}

/// 期間内の1日あたりの売上。
fn daily_rate(window: &RevenueWindow) -> f64 {
    if window.days == 0 {
        return 0.0;
    }
    window.revenue() / f64::from(window.days)
}

fn to_units(subunits: f64) -> i64 {
    (subunits / SUBUNITS_PER_UNIT).round() as i64
}
