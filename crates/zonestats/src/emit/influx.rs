//! InfluxDB `/write` delivery.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use zonestats_core::{Result, ZoneStatsError};

/// Content type of a line protocol body
const LINE_PROTOCOL: &str = "text/plain; charset=utf-8";

/// Request timeout for metric delivery
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Basic authentication pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub user: String,
    /// Password
    pub password: String,
}

/// Where metrics are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxTarget {
    /// `host` or `host:port` of the InfluxDB server
    pub server: String,
    /// Database name
    pub database: String,
    /// Optional basic authentication
    pub credentials: Option<Credentials>,
    /// Use https instead of http
    pub tls: bool,
}

impl InfluxTarget {
    const fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    /// The `/write?db=` endpoint
    pub fn write_url(&self) -> Result<Url> {
        if self.server.is_empty() {
            return Err(ZoneStatsError::Config("influx server not set".into()));
        }
        let mut url = Url::parse(&format!("{}://{}/write", self.scheme(), self.server))
            .map_err(|e| {
                ZoneStatsError::Config(format!("invalid influx server {}: {e}", self.server))
            })?;
        url.query_pairs_mut().append_pair("db", &self.database);
        Ok(url)
    }

    /// Value of the `Authorization` header, if credentials are configured
    #[must_use]
    pub fn authorization(&self) -> Option<String> {
        self.credentials.as_ref().map(|c| {
            let pair = format!("{}:{}", c.user, c.password);
            format!("Basic {}", B64.encode(pair))
        })
    }

    /// Human-readable rendering of the request that would deliver `body`.
    #[must_use]
    pub fn render_request(&self, body: &str) -> String {
        // A dry run may be configured without a server; show what we have.
        let url = self.write_url().map_or_else(
            |_| format!("{}://{}/write?db={}", self.scheme(), self.server, self.database),
            |url| url.to_string(),
        );

        let mut out = format!("POST {url}\n");
        out.push_str(&format!("{}: {LINE_PROTOCOL}\n", CONTENT_TYPE.as_str()));
        if let Some(auth) = self.authorization() {
            out.push_str(&format!("{}: {auth}\n", AUTHORIZATION.as_str()));
        }
        out.push('\n');
        out.push_str(body);
        out
    }
}

/// What an emitter did with the metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// Server accepted the write
    Delivered {
        /// HTTP status of the response
        status: u16,
    },
    /// Nothing was sent; the text describes the request that would have been
    DryRun(String),
}

/// Metrics sink.
#[derive(Debug, Clone)]
pub enum Emitter {
    /// Write to InfluxDB over HTTP
    Influx {
        /// Destination
        target: InfluxTarget,
        /// Shared HTTP client
        http: HttpClient,
    },
    /// Render the request instead of sending it
    DryRun {
        /// Destination as configured
        target: InfluxTarget,
    },
}

impl Emitter {
    /// Create an emitter delivering to `target`
    pub fn influx(target: InfluxTarget) -> Result<Self> {
        // Fail on a bad server before any work is done.
        target.write_url()?;

        let http = HttpClient::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("zonestats/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ZoneStatsError::Delivery(format!("cannot build HTTP client: {e}")))?;

        Ok(Self::Influx { target, http })
    }

    /// Create an emitter that never touches the network
    #[must_use]
    pub const fn dry_run(target: InfluxTarget) -> Self {
        Self::DryRun { target }
    }

    /// Deliver `body`, or describe the delivery in dry-run mode.
    pub async fn emit(&self, body: &str) -> Result<Emission> {
        match self {
            Self::DryRun { target } => Ok(Emission::DryRun(format!(
                "DRYRUN! No call to InfluxDB has been made. Without --dryrun this request would be sent:\n{}",
                target.render_request(body)
            ))),
            Self::Influx { target, http } => {
                let url = target.write_url()?;
                debug!(url = %url, bytes = body.len(), "POST request");

                let mut request = http
                    .post(url.clone())
                    .header(CONTENT_TYPE, LINE_PROTOCOL)
                    .body(body.to_string());
                if let Some(auth) = target.authorization() {
                    request = request.header(AUTHORIZATION, auth);
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| ZoneStatsError::Delivery(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(ZoneStatsError::Delivery(format!(
                        "{url} answered {status}: {}",
                        message.trim()
                    )));
                }

                info!(url = %url, status = status.as_u16(), "metrics delivered");
                Ok(Emission::Delivered {
                    status: status.as_u16(),
                })
            }
        }
    }
}
