use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::models::{
    CloneReportRequest, CreatedResource, DatasetInfo, ODataList, PostRowsRequest,
    RebindReportRequest,
};
use super::PowerBiError;
use crate::auth::AccessToken;
use crate::datasets::DatasetDefinition;

const PBIX_MIME: &str = "application/vnd.ms-powerbi.pbix";

/// Thin client over the Power BI REST API (`/v1.0/myorg`).
///
/// Every call takes the caller's token; the client itself holds no credentials.
#[derive(Debug, Clone)]
pub struct PowerBiClient {
    http: reqwest::Client,
    api_base: String,
}

fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

impl PowerBiClient {
    pub fn new(api_base: &str) -> Result<Self, PowerBiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| PowerBiError::Transport {
                operation: "build client",
                message: e.to_string(),
            })?;
        Ok(Self::with_http_client(http, api_base))
    }

    pub fn with_http_client(http: reqwest::Client, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn rows_path(workspace_id: &str, dataset_id: &str, table: &str) -> String {
        format!(
            "/groups/{}/datasets/{}/tables/{}/rows",
            segment(workspace_id),
            segment(dataset_id),
            segment(table)
        )
    }

    /// Send with the bearer token and turn non-2xx responses into [`PowerBiError::Rejected`].
    async fn send(
        &self,
        operation: &'static str,
        token: &AccessToken,
        request: RequestBuilder,
    ) -> Result<Response, PowerBiError> {
        let response = request
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| PowerBiError::Transport {
                operation,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(operation, status = status.as_u16(), "Power BI call succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(PowerBiError::Rejected {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T, PowerBiError> {
        response.json().await.map_err(|e| PowerBiError::Decode {
            operation,
            message: e.to_string(),
        })
    }

    /// POST `/groups/{ws}/datasets`; returns the new dataset id.
    pub async fn create_push_dataset(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        definition: &DatasetDefinition,
    ) -> Result<String, PowerBiError> {
        const OP: &str = "create dataset";
        let request = self
            .http
            .post(self.url(&format!("/groups/{}/datasets", segment(workspace_id))))
            .json(definition);
        let response = self.send(OP, token, request).await?;
        let created: CreatedResource = Self::json(OP, response).await?;
        Ok(created.id)
    }

    /// GET `/groups/{ws}/datasets`.
    pub async fn list_datasets(
        &self,
        token: &AccessToken,
        workspace_id: &str,
    ) -> Result<Vec<DatasetInfo>, PowerBiError> {
        const OP: &str = "list datasets";
        let request = self
            .http
            .get(self.url(&format!("/groups/{}/datasets", segment(workspace_id))));
        let response = self.send(OP, token, request).await?;
        let list: ODataList<DatasetInfo> = Self::json(OP, response).await?;
        Ok(list.value)
    }

    /// Upload a `.pbix` file as a multipart import, overwriting any dataset of the same name.
    ///
    /// The import is processed asynchronously by the service; returns the import id when the
    /// response carries one.
    pub async fn import_pbix(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        display_name: &str,
        pbix: Vec<u8>,
    ) -> Result<Option<String>, PowerBiError> {
        const OP: &str = "import report";
        let part = Part::bytes(pbix)
            .file_name(format!("{}.pbix", display_name))
            .mime_str(PBIX_MIME)
            .map_err(|e| PowerBiError::Transport {
                operation: OP,
                message: e.to_string(),
            })?;

        let request = self
            .http
            .post(self.url(&format!("/groups/{}/imports", segment(workspace_id))))
            .query(&[
                ("datasetDisplayName", display_name),
                ("nameConflict", "CreateOrOverwrite"),
            ])
            .multipart(Form::new().part("file", part));

        let response = self.send(OP, token, request).await?;
        let created: Option<CreatedResource> = response.json().await.ok();
        Ok(created.map(|c| c.id))
    }

    /// DELETE every row of a push dataset table.
    pub async fn delete_rows(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        dataset_id: &str,
        table: &str,
    ) -> Result<(), PowerBiError> {
        let request = self
            .http
            .delete(self.url(&Self::rows_path(workspace_id, dataset_id, table)));
        self.send("delete rows", token, request).await?;
        Ok(())
    }

    /// POST one batch of rows to a push dataset table.
    pub async fn post_rows(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        dataset_id: &str,
        table: &str,
        rows: &[Map<String, Value>],
    ) -> Result<(), PowerBiError> {
        let request = self
            .http
            .post(self.url(&Self::rows_path(workspace_id, dataset_id, table)))
            .json(&PostRowsRequest { rows });
        self.send("post rows", token, request).await?;
        Ok(())
    }

    /// Clone a template report into `request.target_workspace_id`; returns the new report id.
    pub async fn clone_report(
        &self,
        token: &AccessToken,
        template_workspace_id: &str,
        template_report_id: &str,
        request: &CloneReportRequest,
    ) -> Result<String, PowerBiError> {
        const OP: &str = "clone report";
        let builder = self
            .http
            .post(self.url(&format!(
                "/groups/{}/reports/{}/Clone",
                segment(template_workspace_id),
                segment(template_report_id)
            )))
            .json(request);
        let response = self.send(OP, token, builder).await?;
        let created: CreatedResource = Self::json(OP, response).await?;
        Ok(created.id)
    }

    /// Point a report at a different dataset.
    pub async fn rebind_report(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_id: &str,
        dataset_id: &str,
    ) -> Result<(), PowerBiError> {
        let request = self
            .http
            .post(self.url(&format!(
                "/groups/{}/reports/{}/Rebind",
                segment(workspace_id),
                segment(report_id)
            )))
            .json(&RebindReportRequest {
                dataset_id: dataset_id.to_string(),
            });
        self.send("rebind report", token, request).await?;
        Ok(())
    }
}
