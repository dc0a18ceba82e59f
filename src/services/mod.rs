pub mod google;
pub mod graphhopper;
pub mod mapbox;
pub mod provider;
pub mod route_resolver;

pub use provider::{
    DirectionsQuery, InstructionAnchor, ProviderClient, ProviderInstruction, ProviderRoute,
};
pub use route_resolver::RouteResolver;
