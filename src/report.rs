use crate::projection::Projection;

/// 報告用に丸めた売上と年間売上予測。
///
/// 予測は千単位に丸める。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevenueReport {
    pub revenue: i64,
    pub yearly_in_thousands: i64,
    pub monthly_in_thousands: i64,
    pub weekly_in_thousands: i64,
}

impl From<&Projection> for RevenueReport {
    fn from(projection: &Projection) -> Self {
        Self {
            revenue: projection.current_revenue,
            yearly_in_thousands: in_thousands(projection.projected_annual_from_ytd),
            monthly_in_thousands: in_thousands(projection.projected_annual_from_28_day),
            weekly_in_thousands: in_thousands(projection.projected_annual_from_7_day),
        }
    }
}

impl RevenueReport {
    /// Slackのmrkdwn形式の報告を返す。
    pub fn to_markdown(&self, currency: &str) -> String {
        [
            format!("Revenue: *{} {}*", currency, self.revenue),
            String::new(),
            "_Projection_".to_string(),
            format!("Year: *{} {}K*", currency, self.yearly_in_thousands),
            format!("Last Month: *{} {}K*", currency, self.monthly_in_thousands),
            format!("Last Week: *{} {}K*", currency, self.weekly_in_thousands),
        ]
        .join("\n")
    }

    /// 装飾のない報告を返す。
    pub fn to_plain(&self, currency: &str) -> String {
        [
            format!("Revenue: {} {}", currency, self.revenue),
            "Projection".to_string(),
            format!("  Year: {} {}K", currency, self.yearly_in_thousands),
            format!("  Last Month: {} {}K", currency, self.monthly_in_thousands),
            format!("  Last Week: {} {}K", currency, self.weekly_in_thousands),
        ]
        .join("\n")
    }
}

fn in_thousands(amount: i64) -> i64 {
    (amount as f64 / 1000.0).round() as i64
}
