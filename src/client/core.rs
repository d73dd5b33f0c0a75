// File: ./src/client/core.rs
// Portal session: login, cookie jar and the rate-limited fetch
use crate::client::cert::https_connector;
use crate::config::Config;
use crate::prompt::Credentials;
use anyhow::{Context, Result};
use http::header::{CONTENT_TYPE, COOKIE, LOCATION, RETRY_AFTER, SET_COOKIE};
use http::{HeaderMap, Method, Request, StatusCode, Uri};
use http_body_util::BodyExt;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracing::{debug, info, warn};

type HttpsClient =
    Client<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>, String>;

const MAX_LOGIN_REDIRECTS: usize = 5;

/// Result of a fetch that did not fail at the transport level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Ready(String),
    /// The portal refused or throttled twice; skip this unit of work.
    Unavailable(StatusCode),
}

impl Fetched {
    pub fn ready(self) -> Option<String> {
        match self {
            Fetched::Ready(body) => Some(body),
            Fetched::Unavailable(_) => None,
        }
    }
}

/// A portal request that can be sent again verbatim.
#[derive(Debug, Clone)]
pub struct PortalRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(&'static str, String)>,
    pub form: Option<Vec<(String, String)>>,
}

impl PortalRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            form: None,
        }
    }

    pub fn post_form(path: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            form: Some(form),
            ..Self::get(path)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        let sep = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.path, sep, encoded)
    }
}

struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

#[derive(Clone, Debug)]
pub struct PortalClient {
    http: HttpsClient,
    base_url: String,
    school_id: String,
    form_build_id: String,
    form_id: String,
    retry_margin: Duration,
    cookies: Vec<(String, String)>,
}

impl PortalClient {
    pub fn new(config: &Config) -> Result<Self> {
        let _: Uri = config
            .base_url
            .parse()
            .with_context(|| format!("Invalid base_url {:?}", config.base_url))?;

        let connector = https_connector(config.allow_insecure_certs)?;
        let http = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            school_id: config.school_id.clone(),
            form_build_id: config.form_build_id.clone(),
            form_id: config.form_id.clone(),
            retry_margin: config.retry_margin(),
            cookies: Vec::new(),
        })
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Posts the login form and keeps whatever session cookies come back.
    /// Whether the credentials were accepted only shows on the roster page.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        let form = vec![
            ("mail".to_string(), credentials.username.clone()),
            ("pass".to_string(), credentials.password.clone()),
            ("school_nid".to_string(), self.school_id.clone()),
            ("form_build_id".to_string(), self.form_build_id.clone()),
            ("form_id".to_string(), self.form_id.clone()),
        ];
        let path = format!("/login/ldap?&school={}", self.school_id);
        let mut response = self.send(&PortalRequest::post_form(path, form)).await?;
        self.store_cookies(&response.headers);

        let mut redirects = 0;
        while response.status.is_redirection() && redirects < MAX_LOGIN_REDIRECTS {
            let Some(location) = response
                .headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
            else {
                break;
            };
            debug!("Login redirect to {}", location);
            let url = if location.starts_with("http://") || location.starts_with("https://") {
                location.clone()
            } else {
                format!("{}{}", self.base_url, location)
            };
            response = self.send_url(&url, &PortalRequest::get(location)).await?;
            self.store_cookies(&response.headers);
            redirects += 1;
        }

        info!(
            "Login finished with status {} ({} session cookies)",
            response.status,
            self.cookies.len()
        );
        Ok(())
    }

    /// Sends `request`; on 429 waits Retry-After plus the safety margin and
    /// sends it once more. A second 429, or any status but 200, is
    /// `Unavailable`.
    pub async fn fetch(&self, request: &PortalRequest) -> Result<Fetched> {
        let first = self.send(request).await?;
        match first.status {
            StatusCode::OK => return Ok(Fetched::Ready(first.body)),
            StatusCode::TOO_MANY_REQUESTS => {}
            other => {
                debug!("{} {} -> {}", request.method, request.path, other);
                return Ok(Fetched::Unavailable(other));
            }
        }

        let wait = retry_after(&first.headers) + self.retry_margin;
        warn!(
            "Rate limited on {}, retrying in {} ms",
            request.path,
            wait.as_millis()
        );
        tokio::time::sleep(wait).await;

        let second = self.send(request).await?;
        Ok(match second.status {
            StatusCode::OK => Fetched::Ready(second.body),
            other => {
                warn!("{} still unavailable after retry: {}", request.path, other);
                Fetched::Unavailable(other)
            }
        })
    }

    pub async fn roster_landing(&self, group_id: &str) -> Result<Fetched> {
        self.fetch(&PortalRequest::get(format!("/group/{group_id}/members")))
            .await
    }

    pub async fn roster_page(&self, group_id: &str, page: u32) -> Result<Fetched> {
        let request =
            PortalRequest::get(format!("/enrollments/edit/members/group/{group_id}/ajax"))
                .query("ss", "")
                .query("p", page.to_string());
        self.fetch(&request).await
    }

    pub async fn course_list(&self, student_id: &str) -> Result<Fetched> {
        let destination = format!("{}/info", student_id.get(1..).unwrap_or_default());
        let request = PortalRequest::get(format!("/user/{student_id}/courses/list"))
            .query("destination", destination)
            .header("X-Drupal-Render-Mode", "json/popups");
        self.fetch(&request).await
    }

    async fn send(&self, request: &PortalRequest) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, request.path_and_query());
        self.send_url(&url, request).await
    }

    async fn send_url(&self, url: &str, request: &PortalRequest) -> Result<RawResponse> {
        let uri: Uri = url
            .parse()
            .with_context(|| format!("Invalid request URL {url}"))?;

        let mut builder = Request::builder().method(request.method.clone()).uri(uri);
        if !self.cookies.is_empty() {
            builder = builder.header(COOKIE, self.cookie_header());
        }
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        let body = match &request.form {
            Some(form) => {
                builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
                form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(form)
                    .finish()
            }
            None => String::new(),
        };
        let req = builder.body(body)?;

        let response = self
            .http
            .request(req)
            .await
            .with_context(|| format!("{} {} failed", request.method, request.path))?;
        let (parts, body) = response.into_parts();
        let bytes = body
            .collect()
            .await
            .with_context(|| format!("Reading body of {} failed", request.path))?
            .to_bytes();

        Ok(RawResponse {
            status: parts.status,
            headers: parts.headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn store_cookies(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let pair = raw.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let (name, value) = (name.trim().to_string(), value.trim().to_string());
            match self.cookies.iter_mut().find(|(k, _)| *k == name) {
                Some(existing) => existing.1 = value,
                None => self.cookies.push((name, value)),
            }
        }
    }
}

/// Retry-After in whole seconds; anything else counts as zero.
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), Duration::ZERO);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(retry_after(&headers), Duration::from_secs(2));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), Duration::ZERO);
    }

    #[test]
    fn query_is_encoded() {
        let req = PortalRequest::get("/user/101/courses/list").query("destination", "01/info");
        assert_eq!(
            req.path_and_query(),
            "/user/101/courses/list?destination=01%2Finfo"
        );
        let page = PortalRequest::get("/ajax").query("ss", "").query("p", "3");
        assert_eq!(page.path_and_query(), "/ajax?ss=&p=3");
        let login = PortalRequest::get("/login/ldap?&school=1").query("x", "y");
        assert_eq!(login.path_and_query(), "/login/ldap?&school=1&x=y");
    }
}
