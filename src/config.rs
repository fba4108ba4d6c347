use std::env;

use anyhow::{Context, Result};
use log::warn;

use crate::feedback::FeedbackSelector;

/// 通貨の表示に使う既定の接頭辞。
pub const DEFAULT_CURRENCY: &str = "EUR";

/// mite APIの接続設定。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiteConfig {
    pub account: String,
    pub api_key: String,
}

impl MiteConfig {
    /// 環境変数から`MiteConfig`を返す。
    ///
    /// `MITE_ACCOUNT`、`MITE_API_KEY`が設定されていない場合はエラーを返す。
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// `lookup`で設定値を読み込んで`MiteConfig`を返す。
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        Ok(Self {
            account: required(&lookup, "MITE_ACCOUNT")?,
            api_key: required(&lookup, "MITE_API_KEY")?,
        })
    }
}

/// Slackのスラッシュコマンドを受け付けるサーバーの設定。
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub mite: MiteConfig,
    pub verification_token: String,
    pub port: u16,
    pub currency: String,
    /// フィードバックが有効な場合のみ設定される
    pub feedback: Option<FeedbackSelector>,
}

impl ServerConfig {
    /// 環境変数から`ServerConfig`を返す。
    ///
    /// 必須の環境変数が設定されていない場合は、その名前を含むエラーを返す。
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// `lookup`で設定値を読み込んで`ServerConfig`を返す。
    ///
    /// フィードバックは`FEEDBACK`が`true`で、`FEEDBACK_L`と`FEEDBACK_H`の両方が設定されている場合のみ有効にする。
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mite = MiteConfig::from_lookup(&lookup)?;
        let verification_token = required(&lookup, "VERIFICATION_TOKEN")?;
        let port = required(&lookup, "PORT")?
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        Ok(Self {
            mite,
            verification_token,
            port,
            currency: currency(&lookup),
            feedback: feedback(&lookup)?,
        })
    }
}

/// 通貨の接頭辞を返す。`CURRENCY`が設定されていない場合は`EUR`とする。
pub fn currency<F: Fn(&str) -> Option<String>>(lookup: F) -> String {
    lookup("CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

fn feedback<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Option<FeedbackSelector>> {
    if lookup("FEEDBACK").as_deref() != Some("true") {
        return Ok(None);
    }
    let (Some(low), Some(high)) = (lookup("FEEDBACK_L"), lookup("FEEDBACK_H")) else {
        warn!("Feedback is disabled because FEEDBACK_L or FEEDBACK_H is not set");
        return Ok(None);
    };
    let low = threshold(&low, "FEEDBACK_L")?;
    let high = threshold(&high, "FEEDBACK_H")?;
    if low > high {
        warn!(
            "FEEDBACK_L ({}) is greater than FEEDBACK_H ({}), no projection is classified as okay",
            low, high
        );
    }

    Ok(Some(FeedbackSelector::new(low, high)))
}

/// 千単位の閾値を読み込む。有限の数値でなければエラーとする。
fn threshold(value: &str, key: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|threshold| threshold.is_finite())
        .with_context(|| format!("{} must be a number", key))
}

fn required<F: Fn(&str) -> Option<String>>(lookup: F, key: &str) -> Result<String> {
    lookup(key)
        .filter(|value| !value.is_empty())
        .with_context(|| format!("{} must be set", key))
}
