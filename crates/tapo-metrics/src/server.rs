//! `/metrics` 抓取端点

use crate::collector::TapoMetrics;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// 创建指标路由
pub fn router(metrics: Arc<TapoMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_check))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<TapoMetrics>>) -> Response {
    match metrics.export() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to export metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_check() -> &'static str {
    "ok"
}

/// 绑定监听地址；端口被占用时改用系统分配的端口
pub async fn bind(host: &str, port: u16) -> io::Result<TcpListener> {
    match TcpListener::bind((host, port)).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            warn!(host = %host, port, "Metrics port in use, falling back to a random port");
            TcpListener::bind((host, 0)).await
        }
        Err(e) => Err(e),
    }
}

/// 运行 HTTP 服务直到 `shutdown` 完成
pub async fn serve<F>(listener: TcpListener, metrics: Arc<TapoMetrics>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(address = %addr, "Metrics server listening");

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Metrics server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{DeviceLabels, MetricSink};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = Arc::new(TapoMetrics::new().unwrap());
        metrics
            .set_gauge("power_watts", &DeviceLabels::new("desk", "p115"), 12.0)
            .unwrap();
        let app = router(metrics);

        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#"tapo_power_watts{device_name="desk",device_type="p115"} 12"#));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router(Arc::new(TapoMetrics::new().unwrap()));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_bind_falls_back_when_port_in_use() {
        let taken = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let listener = bind("127.0.0.1", port).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = bind("127.0.0.1", 0).await.unwrap();
        let metrics = Arc::new(TapoMetrics::new().unwrap());

        serve(listener, metrics, async {}).await.unwrap();
    }
}
