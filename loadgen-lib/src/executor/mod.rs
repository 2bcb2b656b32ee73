//! Execution of a single order request.
//!
//! An executor never fails: whatever goes wrong while sending
//! the request or receiving its response is captured
//! in the returned [`RequestOutcome`].

use std::time::Duration;

use crate::{outcome::RequestOutcome, payload::CreateOrderRequest};

mod client;
mod http;

pub use self::{client::new_web_client, http::HttpOrderExecutor};

/// Upper bound for a single request, response body included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Issues one order request and records how it went.
pub trait RequestExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        customer_id: u32,
        order: CreateOrderRequest,
    ) -> impl Future<Output = RequestOutcome> + Send + '_;
}
