//! Anime recommendation service.
//!
//! Loads the embedding and metadata artifacts once at startup, then serves
//! the hybrid pipeline over HTTP. Artifact failures abort the process;
//! per-request lookup failures map to 404s.

use std::str::FromStr;
use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::Deserialize;
use tracing::info;

use anime_rec::{
    AnimeId, ArtifactPaths, ConfigLoader, EngineConfig, Error, RecommendationResponse,
    RecommenderEngine, ServiceSettings, UserId,
};

#[derive(Debug, Deserialize)]
struct RecommendQuery {
    user_weight: Option<f32>,
    content_weight: Option<f32>,
    top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SimilarQuery {
    n: Option<usize>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = ServiceSettings::from_env()?;
    settings.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from_str(&settings.log_level)?)
        .json()
        .init();

    let engine_config = EngineConfig::from_env()?;
    engine_config.validate()?;

    let paths = ArtifactPaths::from_env()?;
    paths.validate()?;

    info!(
        host = %settings.host,
        port = settings.port,
        "starting anime recommendation service"
    );

    let engine = web::Data::new(Arc::new(RecommenderEngine::load(&paths, engine_config)?));

    HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .route("/health", web::get().to(health_check))
            .route("/recommendations/{user_id}", web::get().to(recommendations))
            .route("/users/{user_id}/similar", web::get().to(similar_users))
            .route("/anime/{anime_id}/similar", web::get().to(similar_animes))
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "anime-rec",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn recommendations(
    engine: web::Data<Arc<RecommenderEngine>>,
    path: web::Path<UserId>,
    query: web::Query<RecommendQuery>,
) -> impl Responder {
    let user_id = path.into_inner();
    let config = engine.config();
    let user_weight = query.user_weight.unwrap_or(config.default_user_weight);
    let content_weight = query
        .content_weight
        .unwrap_or(config.default_content_weight);
    let top_k = query.top_k.unwrap_or(config.default_top_k);

    match engine.hybrid_recommendations(user_id, user_weight, content_weight, top_k) {
        Ok(recommendations) => HttpResponse::Ok().json(RecommendationResponse {
            user_id,
            recommendations,
            user_weight,
            content_weight,
            generated_at: chrono::Utc::now(),
        }),
        Err(err) => error_response(&err),
    }
}

async fn similar_users(
    engine: web::Data<Arc<RecommenderEngine>>,
    path: web::Path<UserId>,
    query: web::Query<SimilarQuery>,
) -> impl Responder {
    let user_id = path.into_inner();
    let n = query.n.unwrap_or(engine.config().similar_users);

    match engine.similar_users(user_id, n) {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(err) => error_response(&err),
    }
}

async fn similar_animes(
    engine: web::Data<Arc<RecommenderEngine>>,
    path: web::Path<AnimeId>,
    query: web::Query<SimilarQuery>,
) -> impl Responder {
    let anime_id = path.into_inner();
    let n = query.n.unwrap_or(engine.config().similar_animes);

    match engine.similar_animes(anime_id, n) {
        Ok(animes) => HttpResponse::Ok().json(animes),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &Error) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        Error::UserNotFound { .. }
        | Error::AnimeNotFound { .. }
        | Error::UnknownAnimeName { .. } => HttpResponse::NotFound().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}
