use std::{convert::Infallible, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use songslab_collab::{Songslab, SqliteDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub songslab: Arc<Songslab<SqliteDatabase>>,
}

// Lets handlers take the context directly instead of going through State
#[async_trait]
impl FromRequestParts<ServerContext> for ServerContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        Ok(state.clone())
    }
}
