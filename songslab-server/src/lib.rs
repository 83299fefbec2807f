use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::routing::get;
use log::info;
use songslab_collab::{LogMailer, Songslab, SongslabConfig, SqliteDatabase};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod context;
mod discussions;
mod docs;
mod errors;
mod feedback;
mod members;
mod schemas;
mod serialized;
mod songs;

pub mod logging;

pub use context::ServerContext;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

/// The default database file, created next to the binary if absent
pub const DEFAULT_DATABASE_URL: &str = "sqlite://songslab.db";

pub type Router = axum::Router<ServerContext>;

/// Starts the songslab server
pub async fn run_server() {
    let port = env::var("SONGSLAB_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let database_url =
        env::var("SONGSLAB_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let database = SqliteDatabase::connect(&database_url)
        .await
        .expect("database connects");

    let songslab = Songslab::new(database, Arc::new(LogMailer), SongslabConfig::from_env());

    songslab.init().await.expect("songslab initializes");

    let context = ServerContext {
        songslab: Arc::new(songslab),
    };

    let songs_router = songs::router()
        .merge(discussions::songs_router())
        .merge(feedback::songs_router());

    let share_router = songs::share_router().merge(members::share_router());

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/songs", songs_router)
        .nest("/sounding-board", members::router())
        .nest("/feedback", feedback::router())
        .nest("/share/:token", share_router)
        .route("/feedback-topics", get(feedback::list_topics));

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}
