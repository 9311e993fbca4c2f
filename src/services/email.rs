use serde_json::json;
use thiserror::Error;

const DEFAULT_API_URL: &str = "https://api.resend.com";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email dispatch failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Sends the company-invite email through a Resend-style HTTP API. Callers
/// treat dispatch as fire-and-forget: the only observable outcome is
/// success or failure of the send itself.
#[derive(Clone)]
pub struct EmailService {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl EmailService {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    pub fn from_env() -> Self {
        let api_url =
            std::env::var("EMAIL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = std::env::var("RESEND_API_KEY").expect("RESEND_API_KEY missing");
        let from = std::env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Pulsato <onboarding@resend.dev>".to_string());
        Self::new(api_url, api_key, from)
    }

    pub async fn send_invite(
        &self,
        email: &str,
        company_name: &str,
        invite_link: &str,
    ) -> Result<(), EmailError> {
        let html = format!(
            r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h1>You've been invited to join {company_name}!</h1>
  <p>You've been invited to join {company_name} on Pulsato. Click the link below to accept the invitation:</p>
  <p style="margin: 24px 0;">
    <a href="{invite_link}" style="background-color: #7c3aed; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">Accept Invitation</a>
  </p>
  <p>If you didn't expect this invitation, you can safely ignore this email.</p>
</div>"#
        );

        self.http
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email],
                "subject": format!("Join {company_name} on Pulsato"),
                "html": html,
            }))
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(to = %email, company = %company_name, "invite email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_invite_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(body_partial_json(serde_json::json!({
                "to": ["new.hire@example.com"],
                "subject": "Join Acme on Pulsato",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let service = EmailService::new(server.uri(), "re_test", "Pulsato <hello@pulsato.app>");
        service
            .send_invite("new.hire@example.com", "Acme", "https://pulsato.app/auth?invite=abc")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_2xx_is_surfaced_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let service = EmailService::new(server.uri(), "re_test", "Pulsato <hello@pulsato.app>");
        let result = service
            .send_invite("broken@example.com", "Acme", "https://pulsato.app/auth?invite=abc")
            .await;
        assert!(result.is_err());
    }
}
