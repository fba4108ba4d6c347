use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Local;
use log::{debug, error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::datetime;
use crate::feedback::{Chance, FeedbackSelector, RandomChance, MAX_DELAY, MIN_DELAY};
use crate::mite::{MiteClient, MiteRepository, APPLICATION_NAME};
use crate::report::RevenueReport;
use crate::revenue_command::RevenueCommand;

/// 売上を報告するスラッシュコマンド。
pub const REVENUE_COMMAND: &str = "/revenue";

/// タイムエントリーの取得に失敗した場合の返信。
const FETCH_FAILED_MESSAGE: &str = "Sorry, I could not retrieve the time entries from mite.";

/// Slackから送られるスラッシュコマンド。
///
/// `token`が欠けている場合も検証トークンの不一致として扱うため、空文字列とする。
#[derive(Debug, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub user_name: String,
}

/// スラッシュコマンドへの返信。
#[derive(Debug, PartialEq, Serialize)]
pub struct SlashReply {
    response_type: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mrkdwn: Option<bool>,
}

impl SlashReply {
    /// チャンネル全体に見える売上の報告。
    pub fn report(text: String) -> Self {
        Self {
            response_type: "in_channel",
            text,
            username: Some(APPLICATION_NAME),
            mrkdwn: Some(true),
        }
    }

    /// チャンネル全体に見える返信。
    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            response_type: "in_channel",
            text: text.into(),
            username: None,
            mrkdwn: None,
        }
    }

    /// コマンドを送ったユーザーにだけ見える返信。
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: "ephemeral",
            text: text.into(),
            username: None,
            mrkdwn: None,
        }
    }
}

/// スラッシュコマンドの処理に必要な状態。
#[derive(Clone)]
pub struct AppState {
    pub mite: Arc<dyn MiteRepository>,
    pub verification_token: String,
    pub currency: String,
    pub feedback: Option<FeedbackSelector>,
    pub chance: Arc<dyn Chance>,
    pub http: Client,
}

impl AppState {
    /// 設定から新しい`AppState`を返す。
    pub fn new(config: &ServerConfig, mite: Arc<dyn MiteRepository>, chance: Arc<dyn Chance>) -> Self {
        Self {
            mite,
            verification_token: config.verification_token.clone(),
            currency: config.currency.clone(),
            feedback: config.feedback,
            chance,
            http: Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// スラッシュコマンドを受け付けるルーティングを返す。
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/slack/receive", post(slash_command_handler))
        .with_state(state)
}

/// スラッシュコマンドを受け付けるサーバーを起動する。
///
/// Ctrl-Cを受け取るまで処理を続ける。
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new(
        &config,
        Arc::new(MiteClient::new(&config.mite)),
        Arc::new(RandomChance),
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening for slash commands on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}

/// スラッシュコマンドを処理する。
///
/// - 検証トークンが一致しない場合は返信しない。
/// - `/revenue`以外のコマンドには分からない旨を返信する。
/// - `/revenue`に引数がある場合は返信しない。
/// - タイムエントリーの取得に失敗した場合は報告の代わりにエラーを返信する。
async fn slash_command_handler(
    State(state): State<AppState>,
    Form(command): Form<SlashCommand>,
) -> Response {
    if command.token != state.verification_token {
        warn!(
            "Ignoring {} with an invalid verification token",
            command.command
        );
        return StatusCode::OK.into_response();
    }
    info!(
        "Received {} \"{}\" from {}",
        command.command, command.text, command.user_name
    );

    if command.command != REVENUE_COMMAND {
        return Json(SlashReply::ephemeral(format!(
            "/shrug I am sorry, but I have no idea what this means {}",
            command.command
        )))
        .into_response();
    }
    if !command.text.is_empty() {
        debug!("Ignoring {} with arguments", command.command);
        return StatusCode::OK.into_response();
    }

    let now = datetime::now().with_timezone(&Local);
    let projection = match RevenueCommand::new(state.mite.as_ref()).run(&now).await {
        Ok(projection) => projection,
        Err(e) => {
            error!("Failed to calculate revenue: {:?}", e);
            return Json(SlashReply::ephemeral(FETCH_FAILED_MESSAGE)).into_response();
        }
    };
    let report = RevenueReport::from(&projection);
    info!("Revenue report: {:?}", report);

    if let Some(selector) = state.feedback {
        schedule_feedback(&state, &selector, report.yearly_in_thousands, command.response_url);
    }

    Json(SlashReply::report(report.to_markdown(&state.currency))).into_response()
}

/// 少し時間を置いてからフィードバックを送る。
fn schedule_feedback(
    state: &AppState,
    selector: &FeedbackSelector,
    yearly_in_thousands: i64,
    response_url: String,
) {
    if response_url.is_empty() {
        warn!("Skipping feedback because the command has no response_url");
        return;
    }
    let message = selector.feedback(yearly_in_thousands, state.chance.as_ref());
    // 報告の返信より後に届くよう、最短の待ち時間を下回らない。
    let delay = state.chance.delay(MIN_DELAY, MAX_DELAY).max(MIN_DELAY);
    let http = state.http.clone();
    debug!("Sending feedback in {:?}: {}", delay, message);

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = deliver_feedback(&http, &response_url, message).await {
            warn!("Failed to deliver feedback: {:?}", e);
        }
    });
}

/// フィードバックをスラッシュコマンドの`response_url`に送る。
///
/// # Arguments
///
/// * `http` - HTTPクライアント
/// * `response_url` - Slackから渡された返信先
/// * `message` - 送信するフィードバック
pub async fn deliver_feedback(http: &Client, response_url: &str, message: &str) -> Result<()> {
    http.post(response_url)
        .json(&SlashReply::in_channel(message))
        .send()
        .await
        .with_context(|| format!("Failed to send feedback to {}", response_url))?
        .error_for_status()
        .context("Feedback request returned an error status")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::anyhow;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use reqwest::Client;
    use rstest::rstest;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{deliver_feedback, router, AppState, FETCH_FAILED_MESSAGE};
    use crate::datetime::mock_datetime;
    use crate::feedback::tests::FixedChance;
    use crate::feedback::FeedbackSelector;
    use crate::mite::MockMiteRepository;

    const TOKEN: &str = "verification-token";

    fn state(mite: MockMiteRepository, feedback: Option<FeedbackSelector>) -> AppState {
        AppState {
            mite: Arc::new(mite),
            verification_token: TOKEN.to_string(),
            currency: "EUR".to_string(),
            feedback,
            chance: Arc::new(FixedChance {
                index: 0,
                delay: Duration::ZERO,
            }),
            http: Client::new(),
        }
    }

    fn no_entries() -> MockMiteRepository {
        let mut mite = MockMiteRepository::new();
        mite.expect_read_time_entries()
            .times(1)
            .returning(|_| Ok(vec![]));
        mite
    }

    fn never_called() -> MockMiteRepository {
        let mut mite = MockMiteRepository::new();
        mite.expect_read_time_entries().never();
        mite
    }

    fn slash_request(token: &str, command: &str, text: &str, response_url: &str) -> Request<Body> {
        let body = format!(
            "token={}&command={}&text={}&response_url={}&user_name=alice",
            token,
            command.replace('/', "%2F"),
            text,
            response_url
        );
        Request::builder()
            .method("POST")
            .uri("/slack/receive")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(state(never_called(), None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({"status": "healthy"})
        );
    }

    #[tokio::test]
    async fn test_revenue_report() {
        mock_datetime::set_mock_time(Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap());

        let request = slash_request(TOKEN, "/revenue", "", "");
        let (status, body) = send(state(no_entries(), None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({
                "response_type": "in_channel",
                "text": "Revenue: *EUR 0*\n\n_Projection_\nYear: *EUR 0K*\nLast Month: *EUR 0K*\nLast Week: *EUR 0K*",
                "username": "MiteRevenueReport4Slack",
                "mrkdwn": true,
            })
        );
        mock_datetime::clear_mock_time();
    }

    #[tokio::test]
    async fn test_invalid_token_is_dropped() {
        let request = slash_request("wrong", "/revenue", "", "");

        let (status, body) = send(state(never_called(), None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_is_dropped() {
        let request = Request::builder()
            .method("POST")
            .uri("/slack/receive")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("command=%2Frevenue&text="))
            .unwrap();

        let (status, body) = send(state(never_called(), None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let request = slash_request(TOKEN, "/profit", "", "");

        let (status, body) = send(state(never_called(), None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({
                "response_type": "ephemeral",
                "text": "/shrug I am sorry, but I have no idea what this means /profit",
            })
        );
    }

    #[rstest]
    #[case::argument("help")]
    #[case::whitespace("%20")]
    #[tokio::test]
    async fn test_revenue_with_text_is_ignored(#[case] text: &str) {
        let request = slash_request(TOKEN, "/revenue", text, "");

        let (status, body) = send(state(never_called(), None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_replies_fallback() {
        let mut mite = MockMiteRepository::new();
        mite.expect_read_time_entries()
            .times(1)
            .returning(|_| Err(anyhow!("mite is down")));
        let request = slash_request(TOKEN, "/revenue", "", "");

        let (status, body) = send(state(mite, None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({"response_type": "ephemeral", "text": FETCH_FAILED_MESSAGE})
        );
    }

    #[tokio::test]
    async fn test_feedback_is_delivered_after_report() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/1")
            .match_body(Matcher::Json(json!({
                "response_type": "in_channel",
                "text": "What's going on? Are you ok?",
            })))
            .with_status(200)
            .create_async()
            .await;
        let request = slash_request(
            TOKEN,
            "/revenue",
            "",
            &format!("{}/hooks/1", server.url()),
        );

        let (status, _) = send(
            state(no_entries(), Some(FeedbackSelector::new(10.0, 50.0))),
            request,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        // 待ち時間0を返すChanceでも、返信を受け取った時点ではまだ送られていない
        assert!(!mock.matched_async().await);
        for _ in 0..150 {
            if mock.matched_async().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_deliver_feedback() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/2")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "response_type": "in_channel",
                "text": "You rock!",
            })))
            .with_status(200)
            .create_async()
            .await;

        deliver_feedback(&Client::new(), &format!("{}/hooks/2", server.url()), "You rock!")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_deliver_feedback_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hooks/3")
            .with_status(404)
            .create_async()
            .await;

        let result =
            deliver_feedback(&Client::new(), &format!("{}/hooks/3", server.url()), "Nice job!").await;

        assert!(result.is_err());
    }
}
