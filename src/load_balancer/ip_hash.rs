// src/load_balancer/ip_hash.rs
use crate::load_balancer::LoadBalancer;
use crate::proxy::{Backend, BackendRegistry};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Pins each client host to one backend by hashing its address.
///
/// Health is not consulted: a client whose backend is down keeps being sent
/// there until the backend recovers.
#[derive(Debug, Default)]
pub struct IpHashBalancer;

impl IpHashBalancer {
    pub fn new() -> Self {
        Self
    }

    /// Backend index for `host` among `total` backends.
    ///
    /// # Panics
    ///
    /// Panics if `total` is zero. A `BackendRegistry` is never empty, so
    /// `registry.len()` is always a valid argument.
    pub fn index_for_host(host: &str, total: usize) -> usize {
        assert!(total > 0, "index_for_host needs at least one backend");
        (fnv1a_32(host.as_bytes()) as usize) % total
    }
}

#[async_trait]
impl LoadBalancer for IpHashBalancer {
    async fn select_backend(
        &self,
        registry: &BackendRegistry,
        client_addr: Option<SocketAddr>,
    ) -> Arc<Backend> {
        let Some(addr) = client_addr else {
            error!("Client address unavailable for IP hashing, serving backend 0");
            return registry.get(0).clone();
        };

        // Port is dropped so every connection from one host lands together.
        let host = addr.ip().to_string();
        let index = Self::index_for_host(&host, registry.len());
        let backend = registry.get(index);
        debug!(
            client = %host,
            backend = %backend.id,
            index,
            algorithm = self.name(),
            "Selected backend"
        );
        backend.clone()
    }

    fn name(&self) -> &'static str {
        "ip_hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn registry(total: u16) -> BackendRegistry {
        let configs: Vec<_> = (0..total)
            .map(|i| BackendConfig::new("localhost", 8000 + i))
            .collect();
        BackendRegistry::new(&configs).unwrap()
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    #[should_panic(expected = "at least one backend")]
    fn test_zero_backends_is_rejected() {
        IpHashBalancer::index_for_host("10.0.0.1", 0);
    }

    #[tokio::test]
    async fn test_port_is_ignored() {
        let registry = registry(4);
        let lb = IpHashBalancer::new();

        let a = lb.select_backend(&registry, Some("10.1.2.3:40000".parse().unwrap())).await;
        let b = lb.select_backend(&registry, Some("10.1.2.3:51234".parse().unwrap())).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.port, 8000 + IpHashBalancer::index_for_host("10.1.2.3", 4) as u16);
    }

    #[tokio::test]
    async fn test_unhealthy_backend_is_not_skipped() {
        let registry = registry(3);
        let index = IpHashBalancer::index_for_host("192.168.0.7", 3);
        registry.set_health(registry.get(index), false).await;

        let lb = IpHashBalancer::new();
        let chosen = lb
            .select_backend(&registry, Some("192.168.0.7:9000".parse().unwrap()))
            .await;
        assert!(Arc::ptr_eq(&chosen, registry.get(index)));
    }

    #[tokio::test]
    async fn test_missing_address_falls_back_to_first_backend() {
        let registry = registry(3);
        let chosen = IpHashBalancer::new().select_backend(&registry, None).await;
        assert_eq!(chosen.port, 8000);
    }

    #[test]
    fn test_distribution_is_roughly_uniform() {
        let total = 4;
        let mut counts = vec![0usize; total];
        for a in 0..16u8 {
            for b in 0..64u8 {
                let host = format!("10.0.{a}.{b}");
                counts[IpHashBalancer::index_for_host(&host, total)] += 1;
            }
        }
        // 1024 hosts, 256 expected per backend.
        for count in counts {
            assert!((180..=332).contains(&count), "skewed distribution: {count}");
        }
    }
}
