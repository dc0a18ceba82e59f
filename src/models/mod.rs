pub mod coordinates;
pub mod route;

pub use coordinates::Coordinate;
pub use route::{
    ProviderId, Route, RouteInstruction, RouteRequest, RouteSummary, TransportMode,
};
