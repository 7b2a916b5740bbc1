// tests/load_balancer_tests.rs
use proptest::prelude::*;
use std::collections::HashSet;
use std::net::SocketAddr;
use tcp_load_balancer::config::{BackendConfig, LoadBalancerAlgorithm};
use tcp_load_balancer::load_balancer::{create_load_balancer, IpHashBalancer, LoadBalancer, RoundRobinBalancer};
use tcp_load_balancer::proxy::BackendRegistry;

fn registry(health: &[bool]) -> BackendRegistry {
    let configs: Vec<_> = health
        .iter()
        .enumerate()
        .map(|(i, healthy)| BackendConfig::new("localhost", 8000 + i as u16).with_healthy(*healthy))
        .collect();
    BackendRegistry::new(&configs).unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_round_robin_skips_unhealthy_and_wraps() {
    let registry = registry(&[true, false, true, true]);
    let lb = RoundRobinBalancer::with_cursor(0);

    let first = lb.select_backend(&registry, None).await;
    let second = lb.select_backend(&registry, None).await;
    let third = lb.select_backend(&registry, None).await;

    assert_eq!(first.port, 8002);
    assert_eq!(second.port, 8003);
    assert_eq!(third.port, 8000);
}

#[tokio::test]
async fn test_round_robin_zero_healthy_still_returns_backend() {
    let registry = registry(&[false, false, false, false]);
    let lb = create_load_balancer(LoadBalancerAlgorithm::RoundRobin);

    for _ in 0..8 {
        let backend = lb.select_backend(&registry, None).await;
        assert!((8000..8004).contains(&backend.port));
    }
}

#[tokio::test]
async fn test_ip_hash_same_host_same_backend() {
    let registry = registry(&[true; 5]);
    let lb = create_load_balancer(LoadBalancerAlgorithm::IpHash);

    let addrs: Vec<SocketAddr> = (1000..1010)
        .map(|port| format!("172.16.4.20:{port}").parse().unwrap())
        .collect();
    let mut chosen = HashSet::new();
    for addr in addrs {
        chosen.insert(lb.select_backend(&registry, Some(addr)).await.port);
    }
    assert_eq!(chosen.len(), 1);
}

proptest! {
    #[test]
    fn prop_round_robin_visits_each_backend_once_per_cycle(total in 1usize..12, cursor in 0usize..12) {
        let cursor = cursor % total;
        let registry = registry(&vec![true; total]);
        let lb = RoundRobinBalancer::with_cursor(cursor);

        let ports = runtime().block_on(async {
            let mut ports = Vec::with_capacity(total);
            for _ in 0..total {
                ports.push(lb.select_backend(&registry, None).await.port);
            }
            ports
        });

        let expected: Vec<u16> = (1..=total)
            .map(|step| 8000 + ((cursor + step) % total) as u16)
            .collect();
        prop_assert_eq!(ports, expected);
    }

    #[test]
    fn prop_round_robin_single_healthy_backend_always_wins(
        total in 1usize..10,
        healthy in 0usize..10,
        cursor in 0usize..10,
    ) {
        let healthy = healthy % total;
        let health: Vec<bool> = (0..total).map(|i| i == healthy).collect();
        let registry = registry(&health);
        let lb = RoundRobinBalancer::with_cursor(cursor % total);

        let ports = runtime().block_on(async {
            let mut ports = Vec::new();
            for _ in 0..total + 2 {
                ports.push(lb.select_backend(&registry, None).await.port);
            }
            ports
        });

        prop_assert!(ports.iter().all(|port| *port == 8000 + healthy as u16));
    }

    #[test]
    fn prop_ip_hash_is_deterministic_and_in_range(host in "[a-z0-9.:]{1,40}", total in 1usize..64) {
        let index = IpHashBalancer::index_for_host(&host, total);
        prop_assert!(index < total);
        prop_assert_eq!(index, IpHashBalancer::index_for_host(&host, total));
    }
}
