use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use crate::delivery::Correlator;
use crate::health::{HealthCheckable, HealthStatus};
use crate::metrics::Metrics;

/// Shared state for every HTTP worker
#[derive(Clone)]
pub struct ApiState {
    pub correlator: Arc<Correlator>,
    pub metrics: Arc<Metrics>,
    pub health_checks: Vec<Arc<dyn HealthCheckable>>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/delivery/{order_id}/deliver", web::post().to(deliver_handler))
        .route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler));
}

pub async fn start_api_server(state: ApiState, port: u16) -> std::io::Result<()> {
    tracing::info!("Starting API server on http://0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn deliver_handler(state: web::Data<ApiState>, order_id: web::Path<String>) -> impl Responder {
    let order_id = order_id.into_inner();

    match state.correlator.deliver(&order_id).await {
        Ok(outcome) => HttpResponse::Ok().content_type("text/plain").body(outcome.message()),
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "Manual delivery failed");
            HttpResponse::BadGateway().content_type("text/plain").body(e.to_string())
        }
    }
}

async fn metrics_handler(state: web::Data<ApiState>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(state: web::Data<ApiState>) -> impl Responder {
    let mut components = Vec::with_capacity(state.health_checks.len());
    for check in &state.health_checks {
        components.push(check.check_health().await);
    }

    let overall = if components.iter().all(|c| c.status.is_healthy()) {
        HealthStatus::Healthy
    } else if components.iter().any(|c| matches!(c.status, HealthStatus::Unhealthy(_))) {
        HealthStatus::Unhealthy("component unhealthy".to_string())
    } else {
        HealthStatus::Degraded("component degraded".to_string())
    };

    let body = serde_json::json!({
        "status": overall.label(),
        "service": "delivery-service",
        "tracked_orders": state.correlator.store().len(),
        "components": components.iter().map(|c| c.to_json()).collect::<Vec<_>>(),
    });

    if matches!(overall, HealthStatus::Unhealthy(_)) {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::Ok().json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{PreparedFact, ReadyEmission};
    use crate::health::ComponentHealth;
    use crate::messaging::topics::ORDER_DELIVERED;
    use crate::messaging::InMemoryPublisher;
    use actix_web::{http::StatusCode, test};

    struct FixedHealth(HealthStatus);

    #[async_trait::async_trait]
    impl HealthCheckable for FixedHealth {
        async fn check_health(&self) -> ComponentHealth {
            ComponentHealth::new("fixed", self.0.clone())
        }
    }

    fn state(publisher: Arc<InMemoryPublisher>, health: HealthStatus) -> ApiState {
        let metrics = Arc::new(Metrics::new().unwrap());
        ApiState {
            correlator: Arc::new(Correlator::new(publisher, metrics.clone(), ReadyEmission::Once)),
            metrics,
            health_checks: vec![Arc::new(FixedHealth(health)) as Arc<dyn HealthCheckable>],
        }
    }

    #[actix_web::test]
    async fn test_deliver_unknown_order_returns_not_ready() {
        let publisher = Arc::new(InMemoryPublisher::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(publisher.clone(), HealthStatus::Healthy)))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/delivery/o1/deliver").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(body, "Order not ready for delivery yet");
        assert!(publisher.sent().is_empty());
    }

    #[actix_web::test]
    async fn test_deliver_ready_order() {
        let publisher = Arc::new(InMemoryPublisher::new());
        let api_state = state(publisher.clone(), HealthStatus::Healthy);
        api_state
            .correlator
            .record_prepared(
                "o3",
                PreparedFact {
                    user_id: "u3".to_string(),
                    item_type: "burger".to_string(),
                    address: "addr3".to_string(),
                    completed_time: chrono::Utc::now().naive_utc(),
                },
            )
            .join()
            .await
            .unwrap();
        api_state.correlator.record_payment("o3").join().await.unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(api_state.clone()))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/delivery/o3/deliver").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "Order delivered for orderId o3");
        assert_eq!(publisher.sent_to(ORDER_DELIVERED).len(), 1);

        let req = test::TestRequest::post().uri("/api/delivery/o3/deliver").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "Order not ready for delivery yet");
    }

    #[actix_web::test]
    async fn test_deliver_publish_failure_returns_bad_gateway() {
        let publisher = Arc::new(InMemoryPublisher::new());
        let api_state = state(publisher.clone(), HealthStatus::Healthy);
        api_state
            .correlator
            .record_prepared(
                "o9",
                PreparedFact {
                    user_id: "u9".to_string(),
                    item_type: "soup".to_string(),
                    address: "addr9".to_string(),
                    completed_time: chrono::Utc::now().naive_utc(),
                },
            )
            .join()
            .await
            .unwrap();
        api_state.correlator.record_payment("o9").join().await.unwrap();
        publisher.set_failing(true);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(api_state.clone()))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/delivery/o9/deliver").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let content_type = resp
            .headers()
            .get(actix_web::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert_eq!(content_type.as_deref(), Some("text/plain"));
        let body = test::read_body(resp).await;
        assert!(String::from_utf8(body.to_vec()).unwrap().contains(ORDER_DELIVERED));
        assert!(api_state.correlator.store().get("o9").is_none());

        publisher.set_failing(false);
        let req = test::TestRequest::post().uri("/api/delivery/o9/deliver").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "Order not ready for delivery yet");
    }

    #[actix_web::test]
    async fn test_health_reports_unhealthy_component() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(
                    Arc::new(InMemoryPublisher::new()),
                    HealthStatus::Unhealthy("down".to_string()),
                )))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["components"][0]["reason"], "down");
    }

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_counters() {
        let api_state = state(Arc::new(InMemoryPublisher::new()), HealthStatus::Healthy);
        api_state.correlator.deliver("nobody").await.unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(api_state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("delivery_not_ready_total 1"));
    }
}
