use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::error::StravaError;
use crate::models::{StravaActivity, StreamSet};

pub const OAUTH_BASE_URL: &str = "https://www.strava.com/oauth";
pub const API_BASE_URL: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost/exchange_token";
const MAX_PER_PAGE: usize = 200;

/// Strava API application credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StravaConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

/// Authenticated session. Created by [`StravaClient::exchange_code`] (or from a
/// known token) and passed explicitly to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StravaSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StravaSession {
    /// A session from a bare access token, without known expiry.
    pub fn from_token(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: None, expires_at: None }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

impl TokenResponse {
    fn into_session(self) -> Result<StravaSession, StravaError> {
        let access_token = self.access_token.ok_or(StravaError::MissingToken)?;
        Ok(StravaSession {
            access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at.and_then(|s| Utc.timestamp_opt(s, 0).single()),
        })
    }
}

/// Blocking Strava client (ureq).
pub struct StravaClient {
    agent: Agent,
    config: StravaConfig,
    oauth_base: String,
    api_base: String,
}

impl StravaClient {
    pub fn new(config: StravaConfig) -> Self {
        Self::with_base_urls(config, OAUTH_BASE_URL, API_BASE_URL)
    }

    pub fn with_base_urls(config: StravaConfig, oauth_base: &str, api_base: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();
        Self {
            agent,
            config,
            oauth_base: oauth_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// URL the athlete opens to grant `activity:read_all`.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}",
            self.oauth_base,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode("activity:read_all")
        )
    }

    /// Exchanges an authorization code for a session.
    pub fn exchange_code(&self, code: &str) -> Result<StravaSession, StravaError> {
        let resp = self.agent.post(&format!("{}/token", self.oauth_base)).send_form(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])?;
        let token: TokenResponse = resp.into_json()?;
        let session = token.into_session()?;
        info!("Strava session acquired (expires_at={:?})", session.expires_at);
        Ok(session)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        session: &StravaSession,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, StravaError> {
        if session.is_expired(Utc::now()) {
            return Err(StravaError::SessionExpired);
        }
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        let mut req = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", session.access_token));
        for (k, v) in query {
            req = req.query(k, v);
        }
        debug!("GET {url} {query:?}");
        Ok(req.call()?.into_json()?)
    }

    /// Most recent activities, newest first, up to `limit`.
    /// `per_page` stays fixed across pages; Strava offsets by `(page - 1) * per_page`.
    pub fn list_activities(&self, session: &StravaSession, limit: usize) -> Result<Vec<StravaActivity>, StravaError> {
        let mut out = Vec::new();
        let mut page = 1usize;
        let per_page = limit.min(MAX_PER_PAGE);
        while out.len() < limit {
            let batch: Vec<StravaActivity> = self.get_json(
                session,
                "athlete/activities",
                &[("page", page.to_string()), ("per_page", per_page.to_string())],
            )?;
            let done = batch.len() < per_page;
            out.extend(batch);
            if done {
                break;
            }
            page += 1;
        }
        out.truncate(limit);
        Ok(out)
    }

    /// Like [`Self::list_activities`], keeping only `type == "Run"`.
    pub fn list_run_activities(&self, session: &StravaSession, limit: usize) -> Result<Vec<StravaActivity>, StravaError> {
        let runs: Vec<StravaActivity> = self
            .list_activities(session, limit)?
            .into_iter()
            .filter(StravaActivity::is_run)
            .collect();
        info!("{} run activities among the last {limit}", runs.len());
        Ok(runs)
    }

    /// time / watts / heartrate streams of one activity.
    pub fn activity_streams(&self, session: &StravaSession, activity_id: u64) -> Result<StreamSet, StravaError> {
        self.get_json(
            session,
            &format!("activities/{activity_id}/streams"),
            &[("keys", "watts,heartrate,time".to_string()), ("key_by_type", "true".to_string())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn config() -> StravaConfig {
        StravaConfig {
            client_id: "4242".to_string(),
            client_secret: "s3cret".to_string(),
            redirect_uri: "http://localhost:8501".to_string(),
        }
    }

    #[test]
    fn authorize_url_requests_read_all() {
        let url = StravaClient::new(config()).authorize_url();
        assert_eq!(
            url,
            "https://www.strava.com/oauth/authorize?client_id=4242&response_type=code\
             &redirect_uri=http%3A%2F%2Flocalhost%3A8501&scope=activity%3Aread_all"
        );
    }

    #[test]
    fn authorize_url_encodes_redirect_query() {
        let cfg = StravaConfig {
            redirect_uri: "http://localhost:8501/cb?app=corsa&step=2".to_string(),
            ..config()
        };
        let url = StravaClient::new(cfg).authorize_url();
        assert!(url.contains("&redirect_uri=http%3A%2F%2Flocalhost%3A8501%2Fcb%3Fapp%3Dcorsa%26step%3D2&scope="));
        assert_eq!(url.matches('&').count(), 3);
        assert_eq!(url.matches('?').count(), 1);
    }

    #[test]
    fn session_expiry() {
        let now = Utc::now();
        let mut s = StravaSession::from_token("abc");
        assert!(!s.is_expired(now));
        s.expires_at = Some(now - ChronoDuration::seconds(1));
        assert!(s.is_expired(now));
        s.expires_at = Some(now + ChronoDuration::hours(6));
        assert!(!s.is_expired(now));
    }

    #[test]
    fn token_response_without_access_token_is_rejected() {
        let t: TokenResponse = serde_json::from_str(r#"{"message":"Bad Request"}"#).unwrap();
        assert!(matches!(t.into_session(), Err(StravaError::MissingToken)));

        let t: TokenResponse = serde_json::from_str(
            r#"{"token_type":"Bearer","access_token":"a1","refresh_token":"r1","expires_at":1700000000}"#,
        )
        .unwrap();
        let s = t.into_session().unwrap();
        assert_eq!(s.access_token, "a1");
        assert_eq!(s.expires_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn expired_session_short_circuits_before_http() {
        // Unroutable base URL: the request must never be attempted.
        let client = StravaClient::with_base_urls(config(), "http://127.0.0.1:9", "http://127.0.0.1:9");
        let session = StravaSession {
            access_token: "old".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() - ChronoDuration::minutes(5)),
        };
        let err = client.activity_streams(&session, 1).unwrap_err();
        assert!(matches!(err, StravaError::SessionExpired));
    }

    /// Serves `total` activities (ids 0..total) with Strava's page/per_page offsets
    /// and reports every request line it saw.
    fn serve_activities(total: u64) -> (String, std::sync::mpsc::Receiver<String>) {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                }

                let target = request_line.split_whitespace().nth(1).unwrap_or("").to_string();
                let param = |name: &str| -> u64 {
                    target
                        .split(['?', '&'])
                        .find_map(|kv| kv.strip_prefix(name).and_then(|v| v.strip_prefix('=')))
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0)
                };
                let (page, per_page) = (param("page"), param("per_page"));
                let start = (page.saturating_sub(1) * per_page).min(total);
                let end = (start + per_page).min(total);
                let body = serde_json::to_string(
                    &(start..end).map(|id| serde_json::json!({ "id": id, "type": "Run" })).collect::<Vec<_>>(),
                )
                .unwrap();

                let _ = tx.send(target);
                let _ = write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
            }
        });
        (base, rx)
    }

    #[test]
    fn pagination_never_repeats_activities() {
        let (base, requests) = serve_activities(1000);
        let client = StravaClient::with_base_urls(config(), &base, &base);
        let session = StravaSession::from_token("tok");

        let acts = client.list_activities(&session, 250).unwrap();
        let ids: Vec<u64> = acts.iter().map(|a| a.id).collect();
        assert_eq!(ids, (0..250).collect::<Vec<u64>>());

        let seen: Vec<String> = requests.try_iter().collect();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|t| t.contains("per_page=200")), "{seen:?}");
    }

    #[test]
    fn pagination_stops_on_short_page() {
        let (base, requests) = serve_activities(30);
        let client = StravaClient::with_base_urls(config(), &base, &base);
        let session = StravaSession::from_token("tok");

        let acts = client.list_activities(&session, 100).unwrap();
        assert_eq!(acts.len(), 30);
        assert_eq!(requests.try_iter().count(), 1);
    }
}
