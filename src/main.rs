use actix_web::{App, HttpResponse, HttpServer, web};
use serde::Deserialize;
use tweight_log::{CorrelationMiddleware, LogPipeline, LoggingConfig};

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

async fn login(pipeline: web::Data<LogPipeline>, body: web::Json<LoginRequest>) -> HttpResponse {
    // The password field never reaches any destination in the clear; the
    // masking stage redacts it by field name.
    pipeline
        .logger("auth")
        .info("user_login")
        .field("username", body.username.clone())
        .field("password", body.password.clone())
        .emit();

    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Internal pipeline diagnostics (processor faults, sink write failures)
    // go through tracing; everything else goes through the pipeline itself.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = LoggingConfig::from_env();
    let pipeline = LogPipeline::new(&config).map_err(std::io::Error::other)?;

    pipeline
        .logger("server")
        .info("server_started")
        .field("bind", "127.0.0.1:8080")
        .field("environment", config.environment.as_str())
        .emit();

    println!("Server running at http://127.0.0.1:8080");

    let app_pipeline = pipeline.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(CorrelationMiddleware::new(app_pipeline.clone()))
            .app_data(web::Data::new(app_pipeline.clone()))
            .service(web::resource("/api/health").route(web::get().to(health)))
            .service(web::resource("/api/login").route(web::post().to(login)))
    })
    .bind("127.0.0.1:8080")?
    .run()
    .await?;

    // Drain queued log lines before exiting
    pipeline.logger("server").info("server_stopped").emit();
    pipeline.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test, web};
    use tweight_log::{Environment, LogPipeline, LoggingConfig, MemoryDestination};

    #[actix_web::test]
    async fn test_health() {
        let app =
            test::init_service(App::new().route("/api/health", web::get().to(super::health)))
                .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body = test::read_body(resp).await;
        let body_str = std::str::from_utf8(&body).unwrap();
        assert!(body_str.contains("healthy"));
    }

    #[actix_web::test]
    async fn test_login_redacts_password() {
        let memory = MemoryDestination::new();
        let config = LoggingConfig {
            environment: Environment::Production,
            ..LoggingConfig::default()
        };
        let pipeline = LogPipeline::with_destinations(&config, vec![Box::new(memory.clone())]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline.clone()))
                .route("/api/login", web::post().to(super::login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({
                "username": "chris",
                "password": "super_secret_123"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        pipeline.shutdown();
        let lines = memory.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(r#""username":"chris""#));
        assert!(!lines[0].contains("super_secret_123"));
    }
}
