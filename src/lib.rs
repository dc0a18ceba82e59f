// Library exports for testing and reusability

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod polyline;
pub mod resilience;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use error::{AppError, Result, RouteError};

// App state for sharing across the application
use resilience::SharedConnectivity;
use services::RouteResolver;
use std::sync::Arc;

pub struct AppState {
    pub resolver: RouteResolver,
    pub connectivity: Arc<SharedConnectivity>,
}
