use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use log::info;
#[cfg(test)]
use mockall::automock;
use reqwest::{
    header::{CONTENT_TYPE, USER_AGENT},
    Client,
};
use serde::Deserialize;

use crate::config::MiteConfig;
use crate::time_entry::TimeEntry;

/// mite APIへのリクエストに付けるアプリケーション名。
pub const APPLICATION_NAME: &str = "MiteRevenueReport4Slack";

/// タイムエントリーを取得するためのtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MiteRepository: Send + Sync {
    /// 指定された年のタイムエントリーをすべて取得する。
    ///
    /// # Arguments
    ///
    /// * `year` - 取得する年
    async fn read_time_entries(&self, year: i32) -> Result<Vec<TimeEntry>>;
}

/// mite APIのレスポンスの各要素をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct MiteTimeEntryWrapper {
    time_entry: MiteTimeEntry,
}

/// mite APIのタイムエントリーをデシリアライズするための構造体。
///
/// 作業時間と時給が欠けている場合は0とする。
#[derive(Debug, Deserialize)]
struct MiteTimeEntry {
    date_at: String,
    created_at: String,
    #[serde(default)]
    minutes: Option<u32>,
    #[serde(default)]
    hourly_rate: Option<f64>,
}

impl TryFrom<MiteTimeEntry> for TimeEntry {
    type Error = anyhow::Error;

    fn try_from(entry: MiteTimeEntry) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&entry.date_at, "%Y-%m-%d")
            .with_context(|| format!("Failed to parse date_at: {}", entry.date_at))?;
        let created_at = DateTime::parse_from_rfc3339(&entry.created_at)
            .with_context(|| format!("Failed to parse created_at: {}", entry.created_at))?
            .to_utc();

        Ok(TimeEntry {
            date,
            created_at,
            minutes: entry.minutes.unwrap_or_default(),
            hourly_rate: entry.hourly_rate.unwrap_or_default(),
        })
    }
}

/// mite APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = MiteClient::new(&config);
/// let time_entries = client.read_time_entries(2024).await.unwrap();
/// ```
pub struct MiteClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl MiteClient {
    /// 新しい`MiteClient`を返す。
    ///
    /// APIのURLはアカウント名から`https://{account}.mite.yo.lk`とする。
    pub fn new(config: &MiteConfig) -> Self {
        Self::with_api_url(
            format!("https://{}.mite.yo.lk", config.account),
            &config.api_key,
        )
    }

    /// APIのURLを指定して新しい`MiteClient`を返す。
    pub fn with_api_url(api_url: impl Into<String>, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl MiteRepository for MiteClient {
    async fn read_time_entries(&self, year: i32) -> Result<Vec<TimeEntry>> {
        let wrappers = self
            .client
            .get(format!("{}/time_entries.json", self.api_url))
            .header("X-MiteApiKey", &self.api_key)
            .header(USER_AGENT, APPLICATION_NAME)
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("from", format!("{}-01-01", year)),
                ("to", format!("{}-12-31", year)),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send request to mite API at {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Vec<MiteTimeEntryWrapper>>()
            .await
            .context("Failed to deserialize response")?;
        info!("length of time entries: {}", wrappers.len());

        wrappers
            .into_iter()
            .map(|wrapper| TimeEntry::try_from(wrapper.time_entry))
            .collect()
    }
}
