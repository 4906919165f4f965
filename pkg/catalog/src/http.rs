use async_trait::async_trait;
use pkg_constants::mesh::{META_KEY_K8S_NAMESPACE, META_KEY_K8S_SERVICE_NAME};
use pkg_types::agent::AgentHandle;
use pkg_types::owner::OwnerKey;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::client::CatalogClient;
use crate::error::CatalogError;
use crate::model::{AgentInstance, CatalogRegistration, CheckUpdate};

/// reqwest-backed catalog client. One shared HTTP client with a
/// per-request timeout; the agent host varies per call, scheme and
/// port are fixed cluster-wide.
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    scheme: String,
    port: u16,
}

impl HttpCatalogClient {
    pub fn new(scheme: &str, port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            scheme: scheme.to_string(),
            port,
        })
    }

    fn base_url(&self, agent: &AgentHandle) -> String {
        agent.base_url(&self.scheme, self.port)
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(CatalogError::Status {
                code: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn register(
        &self,
        agent: &AgentHandle,
        registration: &CatalogRegistration,
    ) -> Result<(), CatalogError> {
        let url = format!("{}/v1/agent/service/register", self.base_url(agent));
        debug!("PUT {} ({})", url, registration.id);
        let resp = self.client.put(&url).json(registration).send().await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn deregister(
        &self,
        agent: &AgentHandle,
        service_id: &str,
        namespace: Option<&str>,
    ) -> Result<(), CatalogError> {
        let url = format!(
            "{}/v1/agent/service/deregister/{}",
            self.base_url(agent),
            service_id
        );
        debug!("PUT {}", url);
        let mut req = self.client.put(&url);
        if let Some(ns) = namespace {
            req = req.query(&[("ns", ns)]);
        }
        let resp = req.send().await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn list_by_owner(
        &self,
        agent: &AgentHandle,
        owner: &OwnerKey,
    ) -> Result<Vec<AgentInstance>, CatalogError> {
        let url = format!("{}/v1/agent/services", self.base_url(agent));
        let filter = format!(
            "Meta[\"{}\"] == \"{}\" and Meta[\"{}\"] == \"{}\"",
            META_KEY_K8S_SERVICE_NAME,
            owner.service_name,
            META_KEY_K8S_NAMESPACE,
            owner.namespace
        );
        let resp = self
            .client
            .get(&url)
            .query(&[("filter", filter.as_str())])
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let services: HashMap<String, AgentInstance> = resp
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;
        // Filter again locally; not every agent honors filter expressions.
        Ok(services
            .into_values()
            .filter(|svc| owner.matches(&svc.meta))
            .collect())
    }

    async fn set_health(
        &self,
        agent: &AgentHandle,
        check_id: &str,
        passing: bool,
        output: &str,
    ) -> Result<(), CatalogError> {
        let url = format!(
            "{}/v1/agent/check/update/{}",
            self.base_url(agent),
            check_id
        );
        let resp = self
            .client
            .put(&url)
            .json(&CheckUpdate::new(passing, output))
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_types::instance::InstancePair;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> (HttpCatalogClient, AgentHandle) {
        let port = server.address().port();
        let client = HttpCatalogClient::new("http", port, Duration::from_secs(2)).unwrap();
        let agent = AgentHandle::new("test-node", "127.0.0.1");
        (client, agent)
    }

    fn pair() -> InstancePair {
        InstancePair::new(
            "web",
            "pod1",
            &OwnerKey::new("web", "default"),
            "default",
            "1.2.3.4",
            80,
            vec![],
        )
    }

    #[tokio::test]
    async fn register_puts_to_agent() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (client, agent) = client_for(&server).await;
        let reg = CatalogRegistration::from_instance(&pair().primary, "default");
        client.register(&agent, &reg).await.unwrap();
    }

    #[tokio::test]
    async fn deregister_scopes_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/deregister/pod1-web"))
            .and(query_param("ns", "team-a"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (client, agent) = client_for(&server).await;
        client
            .deregister(&agent, "pod1-web", Some("team-a"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_status_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (client, agent) = client_for(&server).await;
        let reg = CatalogRegistration::from_instance(&pair().primary, "default");
        let err = client.register(&agent, &reg).await.unwrap_err();
        match err {
            CatalogError::Status { code, body } => {
                assert_eq!(code, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_by_owner_filters_foreign_instances() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "pod1-web": {
                "ID": "pod1-web",
                "Service": "web",
                "Address": "1.2.3.4",
                "Port": 80,
                "Meta": {"k8s-service-name": "web", "k8s-namespace": "default"}
            },
            "other-svc": {
                "ID": "other-svc",
                "Service": "other",
                "Address": "5.6.7.8",
                "Port": 81,
                "Meta": {"k8s-service-name": "other", "k8s-namespace": "default"}
            }
        });
        Mock::given(method("GET"))
            .and(path("/v1/agent/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let (client, agent) = client_for(&server).await;
        let owner = OwnerKey::new("web", "default");
        let instances = client.list_by_owner(&agent, &owner).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].id, "pod1-web");
    }

    #[tokio::test]
    async fn set_health_updates_check() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/check/update/default/pod1-web/kubernetes-health-check"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (client, agent) = client_for(&server).await;
        client
            .set_health(
                &agent,
                "default/pod1-web/kubernetes-health-check",
                true,
                "Kubernetes health checks passing",
            )
            .await
            .unwrap();
    }
}
