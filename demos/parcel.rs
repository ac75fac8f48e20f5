//! Parcel service with logging and validation advice.
//!
//! Run with `cargo run --example parcel`. Set `RUST_LOG=trace` to also see the
//! interceptor's phase transitions.

use tracing_advice::parcel::{AdvisedParcelService, ParcelService, ParcelServiceImpl};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let service = match AdvisedParcelService::with_parcel_aspect(ParcelServiceImpl::default()) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("failed to set up parcel service: {}", e);
            std::process::exit(1);
        }
    };

    for (name, result) in [
        ("order_package(-34)", service.order_package(-34)),
        ("track_package(2)", service.track_package(2)),
    ] {
        match result {
            Ok(value) => tracing::info!(call = name, "{}", value),
            Err(e) => tracing::error!(call = name, error = %e, "call failed"),
        }
    }

    let snapshot = service.interceptor().metrics().snapshot();
    println!("\n=== Interception Metrics ===");
    println!("Invocations:     {}", snapshot.invocations);
    println!("Proceeded:       {}", snapshot.proceeded);
    println!("Short-circuited: {}", snapshot.short_circuited);
    println!("Advice failures: {}", snapshot.advice_failures);
}
