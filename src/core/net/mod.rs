pub mod fetcher;
pub mod proxy;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::Fetcher;
pub use proxy::{parse_proxy, ProxyAddress, ProxyCandidate, ProxyKind, ProxyRoute, ProxySupplier};
