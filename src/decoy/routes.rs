//! Decoy route table
//!
//! Paths are relative to the `/api` mount point. Anything not listed here,
//! including a listed path hit with the wrong method, lands in the catch-all.

use axum::extract::State;
use axum::routing::{on, MethodFilter};
use axum::Router;

use super::DecoyState;
use crate::handlers::decoy::{catch_all, serve_trap};
use crate::middleware::inbound::InboundRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    Login,
    Register,
    TokenRefresh,
    Users,
    UserById,
    Profile,
    ProfileUpdate,
    Products,
    AdminConfig,
    AdminLogs,
    Subscription,
    Invoices,
    InternalHealth,
    FileUpload,
}

pub struct DecoyRoute {
    pub method: MethodFilter,
    pub path: &'static str,
    pub trap: Trap,
}

const fn route(method: MethodFilter, path: &'static str, trap: Trap) -> DecoyRoute {
    DecoyRoute { method, path, trap }
}

pub static DECOY_ROUTES: &[DecoyRoute] = &[
    // Authentication
    route(MethodFilter::POST, "/auth/login", Trap::Login),
    route(MethodFilter::POST, "/auth/register", Trap::Register),
    route(MethodFilter::POST, "/auth/token/refresh", Trap::TokenRefresh),
    // Users / profile
    route(MethodFilter::GET, "/users", Trap::Users),
    route(MethodFilter::GET, "/users/:id", Trap::UserById),
    route(MethodFilter::GET, "/profile/me", Trap::Profile),
    route(MethodFilter::POST, "/profile/update", Trap::ProfileUpdate),
    // Data
    route(MethodFilter::GET, "/products", Trap::Products),
    // Admin
    route(MethodFilter::POST, "/admin/config", Trap::AdminConfig),
    route(MethodFilter::GET, "/admin/logs", Trap::AdminLogs),
    // Billing
    route(MethodFilter::GET, "/billing/subscription", Trap::Subscription),
    route(MethodFilter::GET, "/billing/invoices", Trap::Invoices),
    // Infrastructure
    route(MethodFilter::GET, "/internal/health", Trap::InternalHealth),
    // Files
    route(MethodFilter::POST, "/upload/file", Trap::FileUpload),
];

/// Router for everything under `/api`
pub fn api_router() -> Router<DecoyState> {
    let mut router = Router::new();
    for entry in DECOY_ROUTES {
        let trap = entry.trap;
        let handler = move |State(state): State<DecoyState>, req: InboundRequest| serve_trap(trap, state, req);
        router = router.route(entry.path, on(entry.method, handler).fallback(catch_all));
    }

    router.fallback(catch_all)
}
