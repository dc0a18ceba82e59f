//! Connectivity-aware retry, backoff and error classification for outbound
//! provider calls.

pub mod classifier;
pub mod connectivity;
pub mod retry;

pub use classifier::{classify, TransportFailure};
pub use connectivity::{
    ConnectionQuality, ConnectivityProbe, SharedConnectivity, StaticConnectivity, TimeoutPolicy,
};
pub use retry::{RetryError, RetryExecutor, RetryPolicy};
