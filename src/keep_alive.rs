// Liveness endpoint for external uptime monitors.
use actix_web::{get, App, HttpResponse, HttpServer, Responder};
use tracing::{info, warn};

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body("rate-sniper is running")
}

#[get("/healthz")]
async fn healthz() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

/// Binds `addr` and serves in the background on the current runtime.
pub fn spawn(addr: &str) -> std::io::Result<()> {
    let server = HttpServer::new(|| App::new().service(index).service(healthz))
        .workers(1)
        .disable_signals()
        .bind(addr)?
        .run();
    info!("Keep-alive server listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = server.await {
            warn!("Keep-alive server stopped: {}", e);
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn routes_report_alive() {
        let app = test::init_service(App::new().service(index).service(healthz)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"rate-sniper is running");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/healthz").to_request()).await;
        assert!(resp.status().is_success());
    }
}
