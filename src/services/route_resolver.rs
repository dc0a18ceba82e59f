use crate::error::{AppError, ProviderFailure, Result, RouteError, RouteFailure};
use crate::models::{ProviderId, Route, RouteInstruction, RouteRequest, RouteSummary};
use crate::polyline;
use crate::resilience::{
    classify, ConnectionQuality, ConnectivityProbe, RetryError, RetryExecutor, RetryPolicy,
    TimeoutPolicy, TransportFailure,
};
use crate::services::provider::{DirectionsQuery, InstructionAnchor, ProviderClient, ProviderRoute};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

/// Resolves routes by trying each registered provider in order.
///
/// Built once at startup and shared; holds no mutable state.
pub struct RouteResolver {
    providers: Vec<Arc<dyn ProviderClient>>,
    executor: RetryExecutor,
    probe: Arc<dyn ConnectivityProbe>,
    timeouts: TimeoutPolicy,
}

impl RouteResolver {
    pub fn new(
        providers: Vec<Arc<dyn ProviderClient>>,
        retry_policy: RetryPolicy,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        RouteResolver {
            providers,
            executor: RetryExecutor::new(retry_policy, probe.clone()),
            probe,
            timeouts: TimeoutPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Registered providers in fallback order.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn connection_quality(&self) -> ConnectionQuality {
        self.probe.current_quality()
    }

    /// Best single route.
    pub async fn resolve_route(&self, request: &RouteRequest) -> Result<Route> {
        self.resolve_route_cancellable(request, &CancellationToken::new())
            .await
    }

    pub async fn resolve_route_cancellable(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> Result<Route> {
        let routes = self.resolve(request, false, cancel).await?;
        // resolve() never returns an empty Ok
        routes.into_iter().next().ok_or_else(|| {
            RouteError::Failed(RouteFailure {
                error: AppError::LocationNotFound,
                provider: None,
                attempts: Vec::new(),
            })
        })
    }

    /// Every route the first successful provider offers.
    pub async fn resolve_route_alternatives(&self, request: &RouteRequest) -> Result<Vec<Route>> {
        self.resolve_route_alternatives_cancellable(request, &CancellationToken::new())
            .await
    }

    pub async fn resolve_route_alternatives_cancellable(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Route>> {
        self.resolve(request, true, cancel).await
    }

    #[instrument(
        skip(self, request, cancel),
        fields(request_id = %Uuid::new_v4(), mode = %request.transport_mode)
    )]
    async fn resolve(
        &self,
        request: &RouteRequest,
        alternatives: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Route>> {
        let mut failures: Vec<ProviderFailure> = Vec::new();

        for provider in &self.providers {
            let provider_id = provider.id();

            match self
                .resolve_with_provider(provider.as_ref(), request, alternatives, cancel)
                .await
            {
                Ok(routes) => {
                    if !failures.is_empty() {
                        tracing::info!(
                            provider = %provider_id,
                            failed_providers = failures.len(),
                            "Route resolved by fallback provider {}",
                            provider_id
                        );
                    }
                    return Ok(routes);
                }
                Err(RetryError::Cancelled) => {
                    tracing::info!(provider = %provider_id, "Route resolution cancelled");
                    return Err(RouteError::Cancelled);
                }
                Err(RetryError::Failed(error)) => {
                    let retryable = error.is_retryable();
                    tracing::warn!(
                        provider = %provider_id,
                        code = error.code(),
                        retryable,
                        "Provider {} failed: {}",
                        provider_id,
                        error
                    );
                    failures.push(ProviderFailure {
                        provider: provider_id,
                        error,
                    });
                    if !retryable {
                        break;
                    }
                }
            }
        }

        let failure = match failures.last().cloned() {
            Some(last) => RouteFailure {
                error: last.error,
                provider: Some(last.provider),
                attempts: failures,
            },
            None => {
                tracing::error!("No routing providers configured");
                RouteFailure {
                    error: AppError::Unknown("no routing providers configured".to_string()),
                    provider: None,
                    attempts: Vec::new(),
                }
            }
        };

        Err(RouteError::Failed(failure))
    }

    async fn resolve_with_provider(
        &self,
        provider: &dyn ProviderClient,
        request: &RouteRequest,
        alternatives: bool,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Route>, RetryError> {
        let provider_id = provider.id();
        let query = DirectionsQuery::from_request(request, alternatives);
        let query = &query;
        let label = format!("{} directions", provider_id);

        let body = self
            .executor
            .execute(&label, cancel, move |attempt| {
                let quality = self.probe.current_quality();
                let timeout = self.timeouts.for_quality(quality);
                tracing::debug!(
                    provider = %provider_id,
                    attempt,
                    quality = %quality,
                    timeout_ms = timeout.as_millis() as u64,
                    "Requesting directions from {}",
                    provider_id
                );
                provider.fetch_directions(query, timeout)
            })
            .await?;

        let fail = |failure: TransportFailure| {
            RetryError::Failed(classify(&failure, self.probe.current_quality()))
        };

        let mut parsed = provider.parse_routes(&body, query).map_err(fail)?;
        if parsed.is_empty() {
            tracing::warn!(provider = %provider_id, "{} returned no usable route", provider_id);
            return Err(RetryError::Failed(AppError::LocationNotFound));
        }
        if !alternatives {
            parsed.truncate(1);
        }

        let routes = parsed
            .into_iter()
            .map(|raw| assemble_route(provider_id, raw))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|failure| {
                tracing::warn!(
                    provider = %provider_id,
                    "Discarding {} response: {}",
                    provider_id,
                    failure
                );
                fail(failure)
            })?;

        tracing::debug!(
            provider = %provider_id,
            routes = routes.len(),
            distance_km = %format!("{:.2}", routes[0].distance_km()),
            duration_min = routes[0].duration_minutes(),
            "{} returned {} route(s)",
            provider_id,
            routes.len()
        );

        Ok(routes)
    }
}

/// Decode a provider route's geometry and normalize it into a [`Route`].
fn assemble_route(
    provider: ProviderId,
    raw: ProviderRoute,
) -> std::result::Result<Route, TransportFailure> {
    let coordinates = polyline::decode(&raw.encoded_polyline)?;
    if coordinates.is_empty() {
        return Err(TransportFailure::Parse(format!(
            "{} route has no geometry",
            provider
        )));
    }

    let instructions = raw
        .instructions
        .into_iter()
        .map(|instruction| RouteInstruction {
            text: instruction.text,
            distance_meters: instruction.distance_meters,
            duration_seconds: instruction.duration_seconds,
            maneuver: instruction.maneuver,
            location: match instruction.anchor {
                Some(InstructionAnchor::Location(location)) => Some(location),
                Some(InstructionAnchor::PathIndex(index)) => coordinates.get(index).copied(),
                None => None,
            },
        })
        .collect();

    Ok(Route {
        coordinates,
        encoded_polyline: raw.encoded_polyline,
        distance_meters: raw.distance_meters.max(0.0),
        duration_seconds: raw.duration_seconds,
        summary: RouteSummary {
            start_address: raw.start_address,
            end_address: raw.end_address,
            instructions,
            traffic_enabled: raw.traffic_enabled,
        },
        provider,
    })
}
