use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{
    Gateway, NodeInformation, Target, TargetList, TargetRequest, Upstream, UpstreamRequest,
};
use crate::error::GatewayError;

/// HTTP client for the Kong admin API.
#[derive(Debug, Clone)]
pub struct KongClient {
    http: Client,
    base_url: Url,
}

/// Raw shape of `GET /upstreams/{name}/targets/active`.
///
/// Some Kong versions answer an empty list with `"data": {}` instead of
/// `[]`, so `data` is decoded loosely.
#[derive(Debug, Deserialize)]
struct RawTargetList {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    data: serde_json::Value,
}

impl KongClient {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        let parsed = Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl {
                url: base_url.to_string(),
                reason: "URL cannot be used as a base".into(),
            });
        }
        debug!("Kong client configured with endpoint {}", parsed);
        Ok(Self {
            http: Client::new(),
            base_url: parsed,
        })
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(segments))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(
        &self,
        request: RequestBuilder,
        context: impl FnOnce() -> String,
    ) -> Result<Response, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(GatewayError::status(status, context()));
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn decode_target_list(raw: RawTargetList) -> Result<TargetList, GatewayError> {
    // Kong renders an empty list as `{}`; anything else that is not an
    // array while targets are announced is a broken payload.
    let data: Vec<Target> = match raw.data {
        serde_json::Value::Array(_) => serde_json::from_value(raw.data)?,
        _ if raw.total.unwrap_or(0) == 0 => Vec::new(),
        other => serde_json::from_value(other)?,
    };
    Ok(TargetList {
        total: raw.total.unwrap_or(data.len() as u64),
        data,
    })
}

#[async_trait]
impl Gateway for KongClient {
    async fn node_information(&self) -> Result<NodeInformation, GatewayError> {
        let request = self.http.get(self.base_url.clone());
        let response = self
            .send(request, || "unable to retrieve server version".into())
            .await?;
        Self::decode(response).await
    }

    async fn get_upstream(&self, name: &str) -> Result<Option<Upstream>, GatewayError> {
        let response = self
            .request(Method::GET, &["upstreams", name])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("upstream={} not found in Kong", name);
            return Ok(None);
        }
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(GatewayError::status(
                status,
                format!("unable to retrieve upstream {}", name),
            ));
        }
        Self::decode(response).await.map(Some)
    }

    async fn create_upstream(&self, name: &str) -> Result<(), GatewayError> {
        let request = self
            .request(Method::POST, &["upstreams"])
            .json(&UpstreamRequest { name });
        self.send(request, || format!("unable to create upstream {}", name))
            .await?;
        Ok(())
    }

    async fn list_active_targets(&self, upstream: &str) -> Result<TargetList, GatewayError> {
        let request = self.request(Method::GET, &["upstreams", upstream, "targets", "active"]);
        let response = self
            .send(request, || {
                format!("unable to fetch targets of upstream {}", upstream)
            })
            .await?;
        decode_target_list(Self::decode(response).await?)
    }

    async fn add_target(
        &self,
        upstream: &str,
        target: &str,
        weight: u32,
    ) -> Result<Target, GatewayError> {
        let request = self
            .request(Method::POST, &["upstreams", upstream, "targets"])
            .json(&TargetRequest { target, weight });
        let response = self
            .send(request, || {
                format!("unable to add target {} to upstream {}", target, upstream)
            })
            .await?;
        Self::decode(response).await
    }

    async fn delete_target(&self, upstream: &str, id: &str) -> Result<(), GatewayError> {
        let response = self
            .request(Method::DELETE, &["upstreams", upstream, "targets", id])
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(
                "upstream={} target_id={} already deleted from Kong",
                upstream, id
            );
            return Ok(());
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(GatewayError::status(
                status,
                format!("unable to delete target {} from upstream {}", id, upstream),
            ));
        }
        Ok(())
    }
}
