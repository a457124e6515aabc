mod broadcast;
mod context;
mod error;
mod handlers;
mod middlewares;
pub mod models;
pub mod request;
pub mod response;
mod tokener;

use actix_web::web::{get, post, put, resource, scope, Data};
use actix_web::HttpServer;
use sqlx::postgres::PgPoolOptions;

use broadcast::Broadcaster;
use middlewares::jwt::Jwt;

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    dotenv::dotenv().ok();
    std::env::set_var("RUST_LOG", "actix_web=info,rollcall=info");
    env_logger::init();
    let database_url = dotenv::var("DATABASE_URL").expect("environment variable DATABASE_URL not been set");
    let jwt_secret = dotenv::var("JWT_SECRET").expect("environment variable JWT_SECRET not been set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");
    sqlx::migrate!().run(&pool).await.expect("failed to run migrations");
    let broadcaster = Data::new(Broadcaster::new());
    let app_broadcaster = broadcaster.clone();
    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(Data::new(pool.clone()))
            .app_data(app_broadcaster.clone())
            .service(
                scope("")
                    .service(resource("signup").route(post().to(handlers::signup)))
                    .service(resource("login").route(post().to(handlers::login)))
                    .service(resource("logout").route(post().to(handlers::logout)))
                    .service(
                        scope("")
                            .wrap(Jwt::new(jwt_secret.as_bytes().to_owned()))
                            .service(resource("events").route(get().to(handlers::events::subscribe)))
                            .service(resource("me").route(get().to(handlers::user::me)))
                            .service(scope("users").route("", get().to(handlers::user::list)))
                            .service(
                                scope("polls")
                                    .route("", post().to(handlers::poll::create))
                                    .route("", get().to(handlers::poll::list))
                                    .service(
                                        scope("{poll_id}")
                                            .route("", get().to(handlers::poll::detail))
                                            .route("status", put().to(handlers::poll::set_status))
                                            .route("ballots", post().to(handlers::ballot::cast))
                                            .route("participation", get().to(handlers::poll::participation))
                                            .route("results", get().to(handlers::poll::results)),
                                    ),
                            )
                            .service(
                                scope("attendance_sessions")
                                    .route("", post().to(handlers::attendance::create))
                                    .route("", get().to(handlers::attendance::list))
                                    .service(
                                        scope("{session_id}")
                                            .route("", get().to(handlers::attendance::detail))
                                            .route("status", put().to(handlers::attendance::set_status))
                                            .route("records", put().to(handlers::attendance::mark))
                                            .route("summary", get().to(handlers::attendance::summary)),
                                    ),
                            ),
                    ),
            )
    })
    .bind(("0.0.0.0", 8000))?
    .run()
    .await?;
    broadcaster.close_all().await;
    Ok(())
}
