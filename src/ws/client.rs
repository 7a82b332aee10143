//! Web-service client for the site REST endpoint

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{Result, WsError};
use super::models::{CourseSection, SiteInfo};
use crate::config::HttpConfig;
use crate::handlers::CourseId;

const REST_PATH: &str = "webservice/rest/server.php";

/// Site web-service client
///
/// Every call is a form POST to `{site}/webservice/rest/server.php`. Sites
/// report most failures as an HTTP 200 body carrying `exception` and
/// `errorcode`, which is mapped to [`WsError::Remote`].
#[derive(Clone)]
pub struct WsClient {
    client: Client,
    site_url: Url,
    endpoint: Url,
    token: Option<String>,
}

impl WsClient {
    pub fn new(site_url: &str, token: Option<String>, config: &HttpConfig) -> Result<Self> {
        let site_url = site_root(site_url)?;
        let endpoint = site_url
            .join(REST_PATH)
            .map_err(|e| WsError::InvalidUrl(e.to_string()))?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| WsError::Request(e.to_string()))?;

        Ok(Self {
            client,
            site_url,
            endpoint,
            token,
        })
    }

    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Call a web-service function and decode its reply
    pub async fn call<T: DeserializeOwned>(
        &self,
        function: &str,
        args: &[(String, String)],
    ) -> Result<T> {
        let mut form: Vec<(String, String)> = vec![
            ("wstoken".to_string(), self.token.clone().unwrap_or_default()),
            ("wsfunction".to_string(), function.to_string()),
            ("moodlewsrestformat".to_string(), "json".to_string()),
        ];
        form.extend(args.iter().cloned());

        debug!(function, "Calling web service");

        let response = self.client.post(self.endpoint.clone()).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(function, status = status.as_u16(), "Web service returned error status");
            return Err(WsError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body).map_err(|source| WsError::Decode {
            function: function.to_string(),
            source,
        })?;

        if let Some(error) = remote_error(function, &value) {
            debug!(function, error = %error, "Web service reported an exception");
            return Err(error);
        }

        serde_json::from_value(value).map_err(|source| WsError::Decode {
            function: function.to_string(),
            source,
        })
    }

    pub async fn get_site_info(&self) -> Result<SiteInfo> {
        self.call("core_webservice_get_site_info", &[]).await
    }

    pub async fn get_course_contents(&self, course_id: CourseId) -> Result<Vec<CourseSection>> {
        self.call(
            "core_course_get_contents",
            &[("courseid".to_string(), course_id.to_string())],
        )
        .await
    }
}

/// Normalise the site URL so relative joins keep any sub-path
fn site_root(site_url: &str) -> Result<Url> {
    let mut root = site_url.trim().to_string();
    if !root.ends_with('/') {
        root.push('/');
    }
    Url::parse(&root).map_err(|e| WsError::InvalidUrl(format!("{}: {}", site_url, e)))
}

fn remote_error(function: &str, value: &Value) -> Option<WsError> {
    let object = value.as_object()?;
    if !object.contains_key("exception") && !object.contains_key("errorcode") {
        return None;
    }

    let field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(WsError::Remote {
        function: function.to_string(),
        errorcode: field("errorcode"),
        message: field("message"),
    })
}
