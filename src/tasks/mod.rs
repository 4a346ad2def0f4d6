//! Background scheduled tasks for the application.
//!
//! The only recurring job is the reservation sweeper, which deletes
//! expired seat holds so their capacity returns to the pool. Call
//! `spawn_all` once during startup to launch it.

use crate::services::RegistrationService;

/// Spawn all background tasks.
///
/// Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(registration_service: RegistrationService) {
    // Expired holds swept every minute
    {
        let svc = registration_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.sweep_expired().await {
                    Ok(n) if n > 0 => log::info!("Expired reservations swept: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to sweep reservations: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        });
    }
}
