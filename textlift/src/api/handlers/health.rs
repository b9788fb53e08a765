/// `GET /health`, polled by the hosting platform's liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}
