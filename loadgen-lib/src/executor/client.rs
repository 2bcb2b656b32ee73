use rama::{
    Layer as _, Service as _,
    error::{BoxError, ErrorContext as _},
    http::{
        HeaderValue, Request, Response,
        client::EasyHttpWebClient,
        layer::{
            map_request_body::MapRequestBodyLayer, map_response_body::MapResponseBodyLayer,
            required_header::AddRequiredRequestHeadersLayer,
        },
    },
    rt::Executor,
    service::BoxService,
};

use crate::utils::env::network_service_identifier;

/// Create the HTTP(S) client used to send order requests.
///
/// No retries are configured: every attempt is a measured
/// request of its own and a failure has to show up as such.
pub fn new_web_client(exec: Executor) -> Result<BoxService<Request, Response, BoxError>, BoxError> {
    let inner_https_client = EasyHttpWebClient::connector_builder()
        .with_default_transport_connector()
        .without_tls_proxy_support()
        .without_proxy_support()
        .with_tls_support_using_boringssl(None)
        .with_default_http_connector(exec)
        .try_with_default_connection_pool()
        .context("create connection pool for order web client")?
        .build_client();

    let client = (
        MapResponseBodyLayer::new_boxed_streaming_body(),
        AddRequiredRequestHeadersLayer::new()
            .with_user_agent_header_value(HeaderValue::from_static(network_service_identifier())),
        MapRequestBodyLayer::new_boxed_streaming_body(),
    )
        .into_layer(inner_https_client);

    Ok(client.boxed())
}
