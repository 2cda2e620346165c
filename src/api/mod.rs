//! REST API endpoints.

use rocket::Route;

pub mod admin;
pub mod auth;
mod common;
pub mod public;
pub mod verify;
pub mod voting;

/// All the API routes.
pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(admin::routes());
    routes.extend(public::routes());
    routes.extend(verify::routes());
    routes.extend(voting::routes());
    routes
}
