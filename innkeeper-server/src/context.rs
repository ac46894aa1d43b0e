use std::sync::Arc;

use axum::extract::FromRef;
use innkeeper_core::{Innkeeper, PgDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub innkeeper: Arc<Innkeeper<PgDatabase>>,
}
