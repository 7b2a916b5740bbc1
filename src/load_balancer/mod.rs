// src/load_balancer/mod.rs
mod algorithm;
mod ip_hash;
mod round_robin;

pub use algorithm::LoadBalancer; // trait
pub use ip_hash::{fnv1a_32, IpHashBalancer};
pub use round_robin::RoundRobinBalancer;
pub use crate::config::LoadBalancerAlgorithm;

use std::sync::Arc;

/// Build the policy chosen at startup. It is fixed for the process lifetime.
pub fn create_load_balancer(algorithm: LoadBalancerAlgorithm) -> Arc<dyn LoadBalancer> {
    match algorithm {
        LoadBalancerAlgorithm::RoundRobin => Arc::new(RoundRobinBalancer::new()),
        LoadBalancerAlgorithm::IpHash => Arc::new(IpHashBalancer::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_matches_algorithm() {
        assert_eq!(create_load_balancer(LoadBalancerAlgorithm::RoundRobin).name(), "round_robin");
        assert_eq!(create_load_balancer(LoadBalancerAlgorithm::IpHash).name(), "ip_hash");
    }
}
