use super::AteraClient;
use crate::api::ApiError;
use crate::api::atera::types::{AgentsPage, RawDevice};
use reqwest::Method;
use secrecy::SecretString;
use tracing::{debug, info};

pub(crate) trait AgentsApi {
    async fn get_agents_page(&self, page: i64, items_in_page: u32) -> Result<AgentsPage, ApiError>;
    async fn fetch_all_agents(&self) -> Result<Vec<RawDevice>, ApiError>;
    async fn delete_agent(&self, agent_id: i64) -> Result<(), ApiError>;
    async fn validate_api_key(&self, api_key: SecretString) -> Result<(), ApiError>;
}

impl AgentsApi for AteraClient {
    async fn get_agents_page(&self, page: i64, items_in_page: u32) -> Result<AgentsPage, ApiError> {
        let query = [
            ("page", page.to_string()),
            ("itemsInPage", items_in_page.to_string()),
        ];
        let response = self.send(Method::GET, "agents", &query).await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            message: e.to_string(),
        })
    }

    /// Walks every page sequentially until `page > totalPages`.
    async fn fetch_all_agents(&self) -> Result<Vec<RawDevice>, ApiError> {
        let mut devices = Vec::new();
        let mut page = 1;
        let mut expected = None;

        loop {
            let data = self.get_agents_page(page, self.config.page_size).await?;
            let total_pages = data.total_pages.filter(|&t| t > 0).unwrap_or(1);
            expected = data.total_item_count.or(expected);
            let items = data.items.unwrap_or_default();
            debug!(page, total_pages, count = items.len(), "fetched agents page");
            devices.extend(items);

            page += 1;
            if page > total_pages {
                break;
            }
        }

        info!(count = devices.len(), ?expected, "fetched all agents");
        Ok(devices)
    }

    async fn delete_agent(&self, agent_id: i64) -> Result<(), ApiError> {
        self.send(Method::DELETE, &format!("agents/{agent_id}"), &[])
            .await?;
        info!(agent_id, "deleted agent");
        Ok(())
    }

    /// Checks the key against the listing endpoint with `api_key`; the client's own key is not changed.
    async fn validate_api_key(&self, api_key: SecretString) -> Result<(), ApiError> {
        let candidate = self.with_api_key(api_key);
        let data = candidate.get_agents_page(1, 1).await?;
        if data.items.is_none() {
            return Err(ApiError::Decode {
                message: "response has no items list".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::atera::tests::setup;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_page(server: &MockServer, page: i64, total_pages: i64, names: &[&str]) {
        let items: Vec<_> = names
            .iter()
            .map(|name| json!({ "AgentID": name.len(), "MachineName": name }))
            .collect();

        Mock::given(method("GET"))
            .and(path("/agents"))
            .and(query_param("page", page.to_string()))
            .and(query_param("itemsInPage", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": items,
                "page": page,
                "itemsInPage": names.len(),
                "totalItemCount": 3,
                "totalPages": total_pages
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetch_all_walks_every_page() {
        let (server, client) = setup().await;
        mount_page(&server, 1, 2, &["alpha", "beta"]).await;
        mount_page(&server, 2, 2, &["gamma"]).await;

        let devices = client.fetch_all_agents().await.unwrap();

        let names: Vec<_> = devices.iter().filter_map(|d| d.text("MachineName")).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn fetch_all_treats_missing_total_pages_as_one() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "AgentID": 1 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let devices = client.fetch_all_agents().await.unwrap();
        assert_eq!(devices.len(), 1);
    }

    #[tokio::test]
    async fn fetch_all_surfaces_unauthorized() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/agents"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let result = client.fetch_all_agents().await;
        assert!(matches!(result, Err(ApiError::CredentialInvalid)));
    }

    #[tokio::test]
    async fn fetch_all_reports_garbage_body() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = client.fetch_all_agents().await;
        assert!(matches!(result, Err(ApiError::Decode { .. })));
    }

    #[tokio::test]
    async fn delete_maps_not_found_and_forbidden() {
        let (server, client) = setup().await;

        Mock::given(method("DELETE"))
            .and(path("/agents/7"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/agents/8"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/agents/9"))
            .respond_with(ResponseTemplate::new(405))
            .expect(1)
            .mount(&server)
            .await;

        assert!(matches!(client.delete_agent(7).await, Err(ApiError::NotFound)));
        assert!(matches!(client.delete_agent(8).await, Err(ApiError::Forbidden)));
        assert!(matches!(client.delete_agent(9).await, Err(ApiError::Conflict)));
    }

    #[tokio::test]
    async fn delete_is_retried_on_server_error() {
        let (server, client) = setup().await;

        Mock::given(method("DELETE"))
            .and(path("/agents/11"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/agents/11"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client.delete_agent(11).await.unwrap();
    }

    #[tokio::test]
    async fn validate_uses_candidate_key() {
        let (server, client) = setup().await;
        let candidate = "candidate-key-0123456789";

        Mock::given(method("GET"))
            .and(path("/agents"))
            .and(header("X-API-KEY", candidate))
            .and(query_param("itemsInPage", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [],
                "page": 1,
                "totalPages": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        client
            .validate_api_key(SecretString::from(candidate))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn validate_rejects_response_without_items() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "page": 1 })))
            .mount(&server)
            .await;

        let result = client
            .validate_api_key(SecretString::from("candidate-key-0123456789"))
            .await;
        assert!(matches!(result, Err(ApiError::Decode { .. })));
    }

    #[tokio::test]
    async fn validate_reports_rejected_key() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/agents"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let result = client
            .validate_api_key(SecretString::from("candidate-key-0123456789"))
            .await;
        assert!(matches!(result, Err(ApiError::CredentialInvalid)));
    }
}
