//! Reachability check for the camera's TCP API.
//!
//! The camera's access point often comes up before its API socket does,
//! so callers probe a few times before starting a session.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::info;

use crate::network::transport::CameraEndpoint;

/// Try a plain TCP connect up to `attempts` times, `delay` apart.
///
/// Each attempt is bounded by `timeout`. Returns `true` on the first
/// successful connect; the socket is dropped immediately.
pub async fn probe(
    endpoint: &CameraEndpoint,
    attempts: u32,
    timeout: Duration,
    delay: Duration,
) -> bool {
    let addr = endpoint.control_addr();
    for attempt in 1..=attempts.max(1) {
        match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => {
                info!("camera reachable at {addr}");
                return true;
            }
            Ok(Err(e)) => info!("camera not reachable at {addr} (attempt {attempt}): {e}"),
            Err(_) => info!("camera not reachable at {addr} (attempt {attempt}): timed out"),
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn reachable_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = CameraEndpoint::new("127.0.0.1", port, 0);
        assert!(probe(&endpoint, 1, Duration::from_secs(2), Duration::ZERO).await);
    }

    #[tokio::test]
    async fn closed_port_retries_then_gives_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = CameraEndpoint::new("127.0.0.1", port, 0);
        let started = std::time::Instant::now();
        assert!(!probe(&endpoint, 3, Duration::from_secs(2), Duration::from_millis(20)).await);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
