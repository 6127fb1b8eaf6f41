use anyhow::{Context, bail};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Binds the first free port from `ports`, in order. Only "address in use"
/// moves on to the next candidate.
pub async fn bind_with_fallback(host: &str, ports: &[u16]) -> anyhow::Result<TcpListener> {
    for &port in ports {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                info!("🔌 Bound {}:{}", host, port);
                return Ok(listener);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                warn!("⚠️  Port {} is already in use, trying the next one", port);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("binding {}:{}", host, port));
            }
        }
    }

    bail!("No free port among {:?}", ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_busy_port_falls_through_to_next() {
        let taken = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let busy = taken.local_addr().unwrap().port();

        let listener = bind_with_fallback("127.0.0.1", &[busy, 0]).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), busy);
    }

    #[tokio::test]
    async fn test_all_ports_busy_is_an_error() {
        let taken = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let busy = taken.local_addr().unwrap().port();

        assert!(bind_with_fallback("127.0.0.1", &[busy]).await.is_err());
        assert!(bind_with_fallback("127.0.0.1", &[]).await.is_err());
    }
}
