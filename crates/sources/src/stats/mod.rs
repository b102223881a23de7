//! Interface statistics sampler
//!
//! Periodically queries the OS for a CAN interface's link, timing, error
//! state and counters, and publishes one `BusStatistics` per tick.

mod parser;
mod sampler;

pub use parser::parse_ip_link;
pub use sampler::{
    IpLinkProvider, StatsError, StatsProvider, StatsSampler, StatsSamplerMetricsHandle,
};
