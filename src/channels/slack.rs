use super::traits::Messenger;
use async_trait::async_trait;

pub const SLACK_API_URL: &str = "https://slack.com/api";

/// Slack Web API client used to post replies.
pub struct SlackMessenger {
    bot_token: String,
    api_url: String,
    client: reqwest::Client,
}

/// Who the bot token belongs to, as reported by `auth.test`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackIdentity {
    pub user_id: String,
    pub team: String,
}

impl SlackMessenger {
    pub fn new(bot_token: String, api_url: String, client: reqwest::Client) -> Self {
        Self {
            bot_token,
            api_url,
            client,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.api_url.trim_end_matches('/'))
    }

    /// Resolve the bot's own identity. Fails when the token is rejected.
    pub async fn auth_test(&self) -> anyhow::Result<SlackIdentity> {
        let resp = self
            .client
            .post(self.endpoint("auth.test"))
            .bearer_auth(&self.bot_token)
            .send()
            .await?;

        let data = Self::checked_body("auth.test", resp).await?;
        let field = |name: &str| {
            data.get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        Ok(SlackIdentity {
            user_id: field("user_id"),
            team: field("team"),
        })
    }

    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "channel": channel,
            "text": text,
        });

        let resp = self
            .client
            .post(self.endpoint("chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?;

        Self::checked_body("chat.postMessage", resp).await?;
        Ok(())
    }

    /// Slack returns 200 for most app-level errors; check the JSON `ok` field
    /// as well as the HTTP status.
    async fn checked_body(
        method: &str,
        resp: reqwest::Response,
    ) -> anyhow::Result<serde_json::Value> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));

        if !status.is_success() {
            anyhow::bail!("Slack {method} failed ({status}): {body}");
        }

        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        if parsed.get("ok") == Some(&serde_json::Value::Bool(false)) {
            let err = parsed
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown");
            anyhow::bail!("Slack {method} failed: {err}");
        }

        Ok(parsed)
    }
}

/// Escape the three characters Slack treats as control sequences.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

#[async_trait]
impl Messenger for SlackMessenger {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post_to_channel(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        self.post_message(channel, &escape_text(text)).await
    }

    /// Posting to a user ID lands in the app's DM with that user.
    async fn direct_message(&self, user: &str, text: &str) -> anyhow::Result<()> {
        self.post_message(user, &escape_text(text)).await
    }

    /// Sent unescaped so the `<@user>` mention renders.
    async fn reply_mentioning(&self, channel: &str, user: &str, text: &str) -> anyhow::Result<()> {
        self.post_message(channel, &format!("<@{user}> {text}"))
            .await
    }
}
