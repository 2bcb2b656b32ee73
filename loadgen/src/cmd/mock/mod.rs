use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use rama::{
    Layer as _, Service,
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    http::{
        HeaderValue, Request, Response, StatusCode,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
        service::web::{
            Router,
            extract::{Json, State},
            response::IntoResponse,
        },
    },
    layer::TimeoutLayer,
    net::socket::Interface,
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

use clap::Args;
use order_loadgen_lib::{
    config::{self, ORDERS_PATH},
    payload::CreateOrderRequest,
    utils,
};
use rand::RngExt as _;

#[derive(Debug, Clone, Args)]
/// run a local mock order service, for dry runs of the load tests
pub struct MockCommand {
    /// network interface to bind to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "127.0.0.1:8080"
    )]
    pub bind: Interface,

    /// latency added to every response
    #[arg(long, value_name = "SECONDS", default_value_t = 0.05)]
    pub base_latency: f64,

    /// random latency in `[-jitter, +jitter]` added on top of the base latency
    #[arg(long, value_name = "SECONDS", default_value_t = 0.02)]
    pub jitter: f64,

    /// ratio of orders answered with an internal server error
    #[arg(long, default_value_t = 0.)]
    pub error_rate: f64,
}

pub async fn exec(guard: ShutdownGuard, args: MockCommand) -> Result<(), BoxError> {
    let state = MockOrderState::try_new(args.base_latency, args.jitter, args.error_rate)?;

    let exec = Executor::graceful(guard);
    let tcp_listener = TcpListener::bind(args.bind.clone(), exec.clone())
        .await
        .context("bind mock order service")?;

    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(utils::env::project_name())),
    )
        .into_layer(order_svc(state));

    let http_server = HttpServer::auto(exec).service(Arc::new(http_svc));
    let tcp_svc = TimeoutLayer::new(Duration::from_secs(60)).into_layer(http_server);

    let server_addr = tcp_listener
        .local_addr()
        .context("get bound address for mock order service")?;
    tracing::info!(
        %server_addr,
        base_latency = args.base_latency,
        jitter = args.jitter,
        error_rate = args.error_rate,
        "mock order service ready: POST http://{server_addr}{ORDERS_PATH}",
    );

    tcp_listener.serve(tcp_svc).await;

    Ok(())
}

fn order_svc(
    state: MockOrderState,
) -> impl Service<Request, Output = Response, Error = Infallible> + Clone {
    Arc::new(Router::new_with_state(state).with_post(ORDERS_PATH, create_order))
}

#[derive(Debug, Clone)]
struct MockOrderState {
    base_latency: f64,
    jitter: f64,
    error_rate: f64,
    order_counter: Arc<AtomicU64>,
}

impl MockOrderState {
    fn try_new(base_latency: f64, jitter: f64, error_rate: f64) -> Result<Self, BoxError> {
        if !(0.0..=1.0).contains(&error_rate) {
            return Err(BoxError::from(format!(
                "error rate has to be within [0, 1], got: {error_rate}"
            )));
        }
        if !base_latency.is_finite() || !jitter.is_finite() {
            return Err(BoxError::from("latency parameters have to be finite numbers"));
        }
        let (base_latency, jitter) = (base_latency.max(0.), jitter.max(0.));
        config::duration_from_secs(base_latency + jitter).with_context(|| {
            format!("mock latency of {base_latency}s with {jitter}s jitter is out of range")
        })?;

        Ok(Self {
            base_latency,
            jitter,
            error_rate,
            order_counter: Arc::default(),
        })
    }

    /// Bounded by `base_latency + jitter`, checked in [`Self::try_new`].
    fn compute_delay(&self) -> Duration {
        if self.jitter == 0. {
            return Duration::from_secs_f64(self.base_latency);
        }

        let delta = rand::rng().random_range(-self.jitter..=self.jitter);
        Duration::from_secs_f64((self.base_latency + delta).max(0.))
    }

    fn should_fail(&self) -> bool {
        self.error_rate > 0. && rand::rng().random_bool(self.error_rate)
    }
}

/// Reason an order is refused, `None` if it is acceptable.
fn validate_order(order: &CreateOrderRequest) -> Option<&'static str> {
    if order.customer_id == 0 {
        return Some("customerId is required");
    }
    if order.merchant_id == 0 {
        return Some("merchantId is required");
    }
    if order.delivery_address.trim().is_empty() {
        return Some("deliveryAddress is required");
    }
    if order.items.is_empty() {
        return Some("an order requires at least one item");
    }
    if order
        .items
        .iter()
        .any(|item| item.quantity == 0 || item.unit_price <= 0.)
    {
        return Some("items require a positive quantity and unit price");
    }
    None
}

async fn create_order(
    State(state): State<MockOrderState>,
    Json(order): Json<CreateOrderRequest>,
) -> Response {
    let delay = state.compute_delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    if let Some(reason) = validate_order(&order) {
        tracing::debug!(customer_id = order.customer_id, "refuse order: {reason}");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": reason })),
        )
            .into_response();
    }

    if state.should_fail() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "simulated failure" })),
        )
            .into_response();
    }

    let id = state.order_counter.fetch_add(1, Ordering::Relaxed) + 1;
    let total: f64 = order
        .items
        .iter()
        .map(|item| f64::from(item.quantity) * item.unit_price)
        .sum();

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "orderNumber": format!("ORD-{id:08}"),
            "customerId": order.customer_id,
            "merchantId": order.merchant_id,
            "status": "PENDING",
            "totalAmount": (total * 100.).round() / 100.,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use order_loadgen_lib::payload::{OrderGenerator as _, RandomOrderGenerator};
    use rama::http::{Body, BodyExtractExt as _, Method};

    use super::*;

    fn order_request(body: impl Into<Body>) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri(format!("http://localhost{ORDERS_PATH}"))
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    fn instant_state(error_rate: f64) -> MockOrderState {
        MockOrderState::try_new(0., 0., error_rate).unwrap()
    }

    #[tokio::test]
    async fn test_created_order() {
        let svc = order_svc(instant_state(0.));
        let order = RandomOrderGenerator::new().generate(42);

        let resp = svc
            .serve(order_request(serde_json::to_vec(&order).unwrap()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = resp.try_into_json().await.unwrap();
        assert_eq!(body["orderNumber"], "ORD-00000001");
        assert_eq!(body["customerId"], 42);
    }

    #[tokio::test]
    async fn test_invalid_order_is_refused() {
        let svc = order_svc(instant_state(0.));
        let mut order = RandomOrderGenerator::new().generate(7);
        order.items.clear();

        let resp = svc
            .serve(order_request(serde_json::to_vec(&order).unwrap()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_refused() {
        let svc = order_svc(instant_state(0.));
        let resp = svc.serve(order_request("{\"customerId\": ")).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_error_rate_one_always_fails() {
        let svc = order_svc(instant_state(1.));
        let order = RandomOrderGenerator::new().generate(1);

        let resp = svc
            .serve(order_request(serde_json::to_vec(&order).unwrap()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_state_rejects_invalid_error_rate() {
        for rate in [-0.1, 1.5, f64::NAN] {
            assert!(MockOrderState::try_new(0.05, 0.01, rate).is_err(), "{rate}");
        }
    }

    #[test]
    fn test_state_rejects_out_of_range_latency() {
        for (base_latency, jitter) in [
            (1e30, 0.),
            (0.05, 1e30),
            (f64::INFINITY, 0.),
            (0.05, f64::NAN),
        ] {
            assert!(
                MockOrderState::try_new(base_latency, jitter, 0.).is_err(),
                "base_latency = {base_latency}, jitter = {jitter}"
            );
        }
    }

    #[test]
    fn test_compute_delay_within_jitter() {
        let state = MockOrderState::try_new(0.05, 0.02, 0.).unwrap();
        for _ in 0..1_000 {
            let delay = state.compute_delay().as_secs_f64();
            assert!((0.03 - 1e-9..=0.07 + 1e-9).contains(&delay), "{delay}");
        }

        let state = MockOrderState::try_new(0.01, 0.05, 0.).unwrap();
        for _ in 0..1_000 {
            // never negative
            let _ = state.compute_delay();
        }
    }
}
