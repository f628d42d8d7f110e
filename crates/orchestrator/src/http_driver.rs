//! Platform driver speaking JSON to the local automation bridge.
//!
//! The bridge owns the actual browser automation; this client only maps
//! HTTP outcomes onto the driver error taxonomy: throttling and server
//! hiccups are transient, a refused bridge is fatal, anything else the
//! bridge rejects is permanent for that target.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::driver::{DriverError, PlatformDriver, ProspectPage, ProspectRef};

pub struct HttpDriver {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    profile_url: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ConnectionPayload<'a> {
    profile_url: &'a str,
}

impl HttpDriver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn classify_status(status: StatusCode) -> DriverError {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            DriverError::transient(format!("bridge returned {}", status))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            DriverError::fatal(format!("bridge refused the request: {}", status))
        } else {
            DriverError::permanent(format!("bridge rejected the request: {}", status))
        }
    }

    fn classify_transport(err: reqwest::Error) -> DriverError {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            DriverError::transient(err.to_string())
        } else {
            DriverError::fatal(err.to_string())
        }
    }

    async fn post_action<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<(), DriverError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::classify_status(status));
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformDriver for HttpDriver {
    async fn fetch_prospect_page(
        &self,
        source_url: &str,
        page: i64,
    ) -> Result<ProspectPage, DriverError> {
        debug!(page = page, "Fetching prospect page via bridge");

        let page_param = page.to_string();
        let response = self
            .client
            .get(format!("{}/prospects", self.base_url))
            .query(&[("source_url", source_url), ("page", page_param.as_str())])
            .send()
            .await
            .map_err(Self::classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::classify_status(status));
        }

        response
            .json::<ProspectPage>()
            .await
            .map_err(|err| DriverError::fatal(format!("malformed bridge response: {}", err)))
    }

    async fn send_message(
        &self,
        prospect: &ProspectRef,
        content: &str,
    ) -> Result<(), DriverError> {
        debug!(prospect_id = %prospect.prospect_id, "Sending message via bridge");
        self.post_action(
            "/messages",
            &MessagePayload {
                profile_url: &prospect.profile_url,
                content,
            },
        )
        .await
    }

    async fn send_connection_request(&self, prospect: &ProspectRef) -> Result<(), DriverError> {
        debug!(prospect_id = %prospect.prospect_id, "Sending connection request via bridge");
        self.post_action(
            "/connections",
            &ConnectionPayload {
                profile_url: &prospect.profile_url,
            },
        )
        .await
    }
}
