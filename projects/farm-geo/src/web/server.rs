use crate::web::api::router;
use anyhow::Result;
use std::net::{IpAddr, SocketAddr, TcpListener};
use tracing::{info, warn};

pub async fn run_server(host: IpAddr, port: u16) -> Result<()> {
    let listener = bind_first_free(host, port)?;
    let app = router();

    let tokio_listener = tokio::net::TcpListener::from_std(listener)?;
    info!(
        "Farm geometry server started on http://{:?}",
        tokio_listener.local_addr()?
    );

    axum::serve(tokio_listener, app).await?;

    Ok(())
}

/// Bind to `port`, walking upward until a free port is found
fn bind_first_free(host: IpAddr, port: u16) -> Result<TcpListener> {
    let mut current_port = port;
    loop {
        let addr = SocketAddr::new(host, current_port);
        match TcpListener::bind(addr) {
            Ok(listener) => {
                // Tokio requires a non-blocking socket
                listener.set_nonblocking(true)?;
                info!("Successfully bound to {}", addr);
                return Ok(listener);
            }
            Err(e) => {
                warn!("Failed to bind to {}: {}. Trying next port...", addr, e);
                current_port = current_port
                    .checked_add(1)
                    .ok_or_else(|| anyhow::anyhow!("No available ports found"))?;
            }
        }
    }
}
