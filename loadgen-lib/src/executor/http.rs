use rama::{
    error::BoxError,
    http::{
        BodyExtractExt as _, Request, Response, StatusCode, Uri,
        service::client::HttpClientExt as _,
    },
    rt::Executor,
    service::BoxService,
    telemetry::tracing,
};
use serde::Deserialize;
use tokio::time::Instant;

use crate::{config::RunConfig, outcome::RequestOutcome, payload::CreateOrderRequest};

use super::{REQUEST_TIMEOUT, RequestExecutor, new_web_client};

/// [`RequestExecutor`] sending the order as JSON
/// to the orders endpoint of the target service.
#[derive(Debug, Clone)]
pub struct HttpOrderExecutor {
    client: BoxService<Request, Response, BoxError>,
    endpoint: Uri,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedOrder {
    order_number: Option<String>,
}

impl HttpOrderExecutor {
    pub fn try_new(exec: Executor, cfg: &RunConfig) -> Result<Self, BoxError> {
        Ok(Self::new_with_client(
            new_web_client(exec)?,
            cfg.orders_endpoint().clone(),
        ))
    }

    pub fn new_with_client(client: BoxService<Request, Response, BoxError>, endpoint: Uri) -> Self {
        Self { client, endpoint }
    }

    async fn create_order(
        &self,
        customer_id: u32,
        order: &CreateOrderRequest,
        start: Instant,
    ) -> RequestOutcome {
        let resp = match self
            .client
            .post(self.endpoint.clone())
            .json(order)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!(
                    customer_id,
                    endpoint = %self.endpoint,
                    "order request failed: {err}"
                );
                return RequestOutcome::transport_failure(customer_id, start.elapsed(), err);
            }
        };

        let status = resp.status();
        if status == StatusCode::CREATED {
            let order_number = match resp.try_into_json::<CreatedOrder>().await {
                Ok(created) => created.order_number,
                Err(err) => {
                    tracing::debug!(customer_id, "order created but response is not usable: {err}");
                    None
                }
            };
            return RequestOutcome::responded(
                customer_id,
                status.as_u16(),
                start.elapsed(),
                order_number,
                None,
            );
        }

        let error = match resp.try_into_string().await {
            Ok(body) => body,
            Err(err) => format!("failed to read error body: {err}"),
        };
        tracing::debug!(customer_id, %status, "order request rejected");
        RequestOutcome::responded(
            customer_id,
            status.as_u16(),
            start.elapsed(),
            None,
            Some(&error),
        )
    }
}

impl RequestExecutor for HttpOrderExecutor {
    async fn execute(&self, customer_id: u32, order: CreateOrderRequest) -> RequestOutcome {
        let start = Instant::now();
        match tokio::time::timeout(REQUEST_TIMEOUT, self.create_order(customer_id, &order, start))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::debug!(customer_id, endpoint = %self.endpoint, "order request timed out");
                RequestOutcome::transport_failure(
                    customer_id,
                    start.elapsed(),
                    format_args!("request timed out after {REQUEST_TIMEOUT:?}"),
                )
            }
        }
    }
}
