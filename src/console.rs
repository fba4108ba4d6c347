use std::io::Write;

use anyhow::{Context, Result};

use crate::report::RevenueReport;

/// Consoleに売上の報告を表示するためのtrait。
pub trait ConsolePresenter {
    /// 売上の報告を表示する。
    ///
    /// # Arguments
    ///
    /// * `report` - 表示する報告
    fn show_report(&mut self, report: &RevenueReport) -> Result<()>;
}

/// 売上の報告を装飾なしのテキストで表示する。
pub struct ConsolePlainReport<'a, W: Write> {
    writer: &'a mut W,
    currency: String,
}

impl<'a, W: Write> ConsolePlainReport<'a, W> {
    /// 新しい`ConsolePlainReport`を返す。
    pub fn new(writer: &'a mut W, currency: impl Into<String>) -> Self {
        Self {
            writer,
            currency: currency.into(),
        }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsolePlainReport<'a, W> {
    fn show_report(&mut self, report: &RevenueReport) -> Result<()> {
        writeln!(self.writer, "{}", report.to_plain(&self.currency))
            .with_context(|| format!("Failed to write report: {:?}", report))?;

        Ok(())
    }
}
