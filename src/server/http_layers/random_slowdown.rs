//! Random slowdown middleware, to exercise loading states and offline fallbacks in the UI.

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use rand_distr::{Distribution, Normal};

const MEAN_DELAY_MS: f64 = 1000.0;
const DELAY_STD_DEV_MS: f64 = 2000.0;

fn random_delay_ms() -> u64 {
    match Normal::new(MEAN_DELAY_MS, DELAY_STD_DEV_MS) {
        Ok(normal) => normal.sample(&mut rand::rng()).max(0.0) as u64,
        Err(_) => 0,
    }
}

pub async fn slowdown_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let delay = random_delay_ms();
    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    next.run(request).await
}
