//! HTTP client for the platform's web GraphQL API.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;

use crate::auth::Session;
use crate::config::MENTIONS_PAGE_SIZE;
use crate::error::{BotError, Result};

const NOTIFICATIONS_QUERY: &str = "l6ovGrjBwVobgU4puBCycg/NotificationsTimeline";
const TWEET_DETAIL_QUERY: &str = "oEUIqhz9YZjZVpE5i68Sfg/TweetDetail";
const CREATE_TWEET_QUERY_ID: &str = "a1p9RWpkYKBjWv_I3WzS-A";

/// Feature switches the web client sends with every timeline query.
const FEATURES: &str = r#"{"rweb_video_screen_enabled":false,"payments_enabled":false,"rweb_xchat_enabled":false,"profile_label_improvements_pcf_label_in_post_enabled":true,"rweb_tipjar_consumption_enabled":true,"verified_phone_label_enabled":false,"creator_subscriptions_tweet_preview_api_enabled":true,"responsive_web_graphql_timeline_navigation_enabled":true,"responsive_web_graphql_skip_user_profile_image_extensions_enabled":false,"premium_content_api_read_enabled":false,"communities_web_enable_tweet_community_results_fetch":true,"c9s_tweet_anatomy_moderator_badge_enabled":true,"responsive_web_grok_analyze_button_fetch_trends_enabled":false,"responsive_web_grok_analyze_post_followups_enabled":true,"responsive_web_jetfuel_frame":true,"responsive_web_grok_share_attachment_enabled":true,"articles_preview_enabled":true,"responsive_web_edit_tweet_api_enabled":true,"graphql_is_translatable_rweb_tweet_is_translatable_enabled":true,"view_counts_everywhere_api_enabled":true,"longform_notetweets_consumption_enabled":true,"responsive_web_twitter_article_tweet_consumption_enabled":true,"tweet_awards_web_tipping_enabled":false,"responsive_web_grok_show_grok_translated_post":false,"responsive_web_grok_analysis_button_from_backend":true,"creator_subscriptions_quote_tweet_preview_enabled":false,"freedom_of_speech_not_reach_fetch_enabled":true,"standardized_nudges_misinfo":true,"tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled":true,"longform_notetweets_rich_text_read_enabled":true,"longform_notetweets_inline_media_enabled":true,"responsive_web_grok_image_annotation_enabled":true,"responsive_web_grok_imagine_annotation_enabled":true,"responsive_web_grok_community_note_auto_translation_is_enabled":false,"responsive_web_enhance_cards_enabled":false}"#;

const DETAIL_FIELD_TOGGLES: &str = r#"{"withArticleRichContentState":true,"withArticlePlainText":false,"withGrokAnalyze":false,"withDisallowedReplyControls":false}"#;

/// Raw platform operations the pipeline depends on.
///
/// Implementations return the decoded JSON body; interpreting it is left to
/// the mention source, resolver and responder.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Fetch one page of the mentions timeline.
    async fn fetch_mentions(&self, cursor: Option<&str>) -> Result<Value>;

    /// Fetch the conversation view around a tweet.
    async fn fetch_tweet_detail(&self, tweet_id: &str) -> Result<Value>;

    /// Create a tweet replying to `in_reply_to`.
    async fn create_reply(&self, in_reply_to: &str, text: &str) -> Result<Value>;
}

/// Cookie-authenticated client for the web GraphQL endpoints.
pub struct TwitterClient {
    client: Client,
    session: Session,
    base_url: String,
    request_delay: Duration,
}

impl TwitterClient {
    /// Create a new client.
    pub fn new(
        session: Session,
        base_url: impl Into<String>,
        request_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_delay,
        })
    }

    fn graphql_url(&self, query: &str) -> String {
        format!("{}/graphql/{query}", self.base_url)
    }

    async fn get(&self, url: String) -> Result<Value> {
        tokio::time::sleep(self.request_delay).await;
        tracing::debug!(%url, "GET");
        let response = self.session.authorize(self.client.get(url)).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl TwitterApi for TwitterClient {
    async fn fetch_mentions(&self, cursor: Option<&str>) -> Result<Value> {
        let mut variables = json!({ "timeline_type": "Mentions", "count": MENTIONS_PAGE_SIZE });
        if let Some(cursor) = cursor {
            variables["cursor"] = json!(cursor);
        }
        let url = format!(
            "{}?variables={}&features={}",
            self.graphql_url(NOTIFICATIONS_QUERY),
            urlencoding::encode(&variables.to_string()),
            urlencoding::encode(FEATURES),
        );
        self.get(url).await
    }

    async fn fetch_tweet_detail(&self, tweet_id: &str) -> Result<Value> {
        let variables = json!({
            "focalTweetId": tweet_id,
            "referrer": "tweet",
            "with_rux_injections": false,
            "rankingMode": "Relevance",
            "includePromotedContent": true,
            "withCommunity": true,
            "withQuickPromoteEligibilityTweetFields": true,
            "withBirdwatchNotes": true,
            "withVoice": true,
        });
        let url = format!(
            "{}?variables={}&features={}&fieldToggles={}",
            self.graphql_url(TWEET_DETAIL_QUERY),
            urlencoding::encode(&variables.to_string()),
            urlencoding::encode(FEATURES),
            urlencoding::encode(DETAIL_FIELD_TOGGLES),
        );
        self.get(url).await
    }

    async fn create_reply(&self, in_reply_to: &str, text: &str) -> Result<Value> {
        tokio::time::sleep(self.request_delay).await;

        let features: Value = serde_json::from_str(FEATURES)?;
        let body = json!({
            "variables": {
                "tweet_text": text,
                "reply": {
                    "in_reply_to_tweet_id": in_reply_to,
                    "exclude_reply_user_ids": [],
                },
                "dark_request": false,
                "media": { "media_entities": [], "possibly_sensitive": false },
                "semantic_annotation_ids": [],
            },
            "features": features,
            "queryId": CREATE_TWEET_QUERY_ID,
        });

        let url = self.graphql_url(&format!("{CREATE_TWEET_QUERY_ID}/CreateTweet"));
        tracing::debug!(%url, in_reply_to, "POST");
        let response = self
            .session
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode(response: Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".into());
        return Err(BotError::Transport {
            service: "twitter",
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<Value>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TwitterClient {
        TwitterClient::new(
            Session::new("bearer", "auth", "csrf"),
            server.uri(),
            Duration::ZERO,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_mentions_sends_cursor_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/graphql/{NOTIFICATIONS_QUERY}")))
            .and(query_param(
                "variables",
                r#"{"count":20,"cursor":"abc","timeline_type":"Mentions"}"#,
            ))
            .and(header("authorization", "Bearer bearer"))
            .and(header("x-csrf-token", "csrf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(&server).fetch_mentions(Some("abc")).await.unwrap();
        assert_eq!(body, json!({ "data": {} }));
    }

    #[tokio::test]
    async fn test_fetch_tweet_detail_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/graphql/{TWEET_DETAIL_QUERY}")))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_tweet_detail("1").await.unwrap_err();
        assert!(matches!(err, BotError::Transport { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_create_reply_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/graphql/{CREATE_TWEET_QUERY_ID}/CreateTweet")))
            .and(body_partial_json(json!({
                "variables": {
                    "tweet_text": "Score: 100. ok",
                    "reply": { "in_reply_to_tweet_id": "77" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .create_reply("77", "Score: 100. ok")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_delay_precedes_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = TwitterClient::new(
            Session::new("b", "a", "c"),
            server.uri(),
            Duration::from_millis(50),
        )
        .unwrap();
        let start = std::time::Instant::now();
        client.fetch_tweet_detail("1").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
