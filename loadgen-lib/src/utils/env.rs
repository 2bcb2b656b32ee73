/// Name used to identify this project towards the outside world,
/// e.g. as the `User-Agent` of the order requests we send.
#[inline(always)]
pub const fn project_name() -> &'static str {
    "order-loadgen"
}

/// Identifier including the version, used where a peer benefits
/// from knowing which build produced the traffic.
#[inline(always)]
pub const fn network_service_identifier() -> &'static str {
    concat!("order-loadgen/", env!("CARGO_PKG_VERSION"))
}
