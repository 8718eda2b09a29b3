//! Routes and handlers.

use super::error::{ApiError, ApiResponse};
use super::geojson::{datacenter_features, observation_features};
use super::AppState;
use crate::charts::StaticChartRenderer;
use crate::data::{
    markers_between, providers, state_water_table, DataCenterRow, DataProcessor, LegislationMarker,
    Observation, ObservationFilter, Pollutant, StateWater, LEGISLATION,
};
use crate::stats::{
    energy_by_scarcity, summarize_datacenters, CitySeries, DatacenterSummary, PollutantSummary,
    StatsCalculator,
};
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

const TIMELINE_SIZE: (u32, u32) = (1100, 600);
const BAR_CHART_SIZE: (u32, u32) = (900, 500);
const SVG: &str = "image/svg+xml";

#[derive(Debug, Default, Deserialize)]
pub struct ObservationQuery {
    pub year: Option<i32>,
    pub pollutant: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MapQuery {
    pub year: Option<i32>,
    pub pollutant: Option<String>,
}

/// `city` is a comma-separated list.
#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub pollutant: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProviderQuery {
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub pollutants: Vec<String>,
    pub cities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TimelineView {
    pub pollutant: String,
    pub unit: &'static str,
    pub series: Vec<CitySeries>,
    pub summary: PollutantSummary,
    pub legislation: Vec<&'static LegislationMarker>,
}

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/_stcore/health", get(health_check))
        // Pollution
        .route("/api/pollution/observations", get(list_observations))
        .route("/api/pollution/filters", get(filter_options))
        .route("/api/pollution/map", get(pollution_map))
        .route("/api/pollution/summary", get(pollution_summary))
        .route("/api/pollution/timeline", get(timeline))
        .route("/api/pollution/timeline.svg", get(timeline_svg))
        .route("/api/legislation", get(legislation))
        // Data centers
        .route("/api/datacenters", get(list_datacenters))
        .route("/api/datacenters/providers", get(list_providers))
        .route("/api/datacenters/summary", get(datacenter_summary))
        .route("/api/datacenters/map", get(datacenter_map))
        .route("/api/datacenters/energy-by-scarcity.svg", get(energy_by_scarcity_svg))
        .route("/api/water", get(water_by_state))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// Liveness only; never touches the tables.
async fn health_check() -> &'static str {
    "ok"
}

fn parse_pollutant(raw: Option<&str>) -> Result<Option<Pollutant>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => Ok(Some(name.parse()?)),
        None => Ok(None),
    }
}

fn parse_cities(raw: Option<&str>) -> Option<Vec<String>> {
    let cities: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    (!cities.is_empty()).then_some(cities)
}

async fn list_observations(
    State(state): State<AppState>,
    Query(query): Query<ObservationQuery>,
) -> ApiResult<Vec<Observation>> {
    let filter = ObservationFilter {
        year: query.year,
        pollutant: parse_pollutant(query.pollutant.as_deref())?,
        city: query.city.filter(|c| !c.trim().is_empty()),
    };
    let table = state.pollution.table().await?;
    let df = DataProcessor::filter(&table.df, &filter)?;
    Ok(Json(ApiResponse::ok(DataProcessor::from_frame(&df)?)))
}

async fn filter_options(State(state): State<AppState>) -> ApiResult<FilterOptions> {
    let table = state.pollution.table().await?;
    Ok(Json(ApiResponse::ok(FilterOptions {
        years: DataProcessor::get_years(&table.df),
        pollutants: DataProcessor::get_pollutants(&table.df),
        cities: DataProcessor::get_cities(&table.df),
    })))
}

/// Defaults to PM2.5 in the latest year that has it.
async fn pollution_map(
    State(state): State<AppState>,
    Query(query): Query<MapQuery>,
) -> ApiResult<Value> {
    let pollutant = parse_pollutant(query.pollutant.as_deref())?.unwrap_or(Pollutant::Pm25);
    let table = state.pollution.table().await?;
    let name = pollutant.name();

    let year = match query.year {
        Some(year) => year,
        None => table
            .observations
            .iter()
            .filter(|o| o.pollutant == name)
            .map(|o| o.year)
            .max()
            .ok_or_else(|| ApiError::NotFound(format!("No {} observations", pollutant)))?,
    };
    let rows: Vec<Observation> = table
        .observations
        .iter()
        .filter(|o| o.pollutant == name && o.year == year)
        .cloned()
        .collect();
    Ok(Json(ApiResponse::ok(observation_features(&rows))))
}

async fn pollution_summary(
    State(state): State<AppState>,
) -> ApiResult<BTreeMap<String, PollutantSummary>> {
    let table = state.pollution.table().await?;
    let pollutants = DataProcessor::get_pollutants(&table.df);
    Ok(Json(ApiResponse::ok(StatsCalculator::summarize_all_parallel(
        &table.observations,
        &pollutants,
    ))))
}

async fn build_timeline(state: &AppState, query: &TimelineQuery) -> Result<TimelineView, ApiError> {
    let pollutant = parse_pollutant(query.pollutant.as_deref())?.unwrap_or(Pollutant::Pm25);
    let cities = parse_cities(query.city.as_deref());
    let table = state.pollution.table().await?;

    let series = StatsCalculator::city_series(&table.observations, pollutant.name(), cities.as_deref());
    let years = series.iter().flat_map(|s| s.points.iter().map(|(year, _)| *year));
    let (first, last) = years.fold((i32::MAX, i32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if first > last {
        return Err(ApiError::NotFound(format!("No {} observations", pollutant)));
    }

    Ok(TimelineView {
        pollutant: pollutant.name().to_string(),
        unit: pollutant.unit(),
        summary: StatsCalculator::summarize_pollutant(&table.observations, pollutant.name()),
        legislation: markers_between(first, last),
        series,
    })
}

async fn timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<TimelineView> {
    Ok(Json(ApiResponse::ok(build_timeline(&state, &query).await?)))
}

async fn timeline_svg(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> Result<Response, ApiError> {
    let view = build_timeline(&state, &query).await?;
    let title = format!("{} Annual Mean Concentration by City", view.pollutant);
    let svg = StaticChartRenderer::timeline_svg(
        &title,
        view.unit,
        &view.series,
        &view.legislation,
        TIMELINE_SIZE,
    )?;
    Ok(([(header::CONTENT_TYPE, SVG)], svg).into_response())
}

async fn legislation() -> ApiResult<Vec<LegislationMarker>> {
    Ok(Json(ApiResponse::ok(LEGISLATION.to_vec())))
}

fn select_datacenters(rows: &[DataCenterRow], provider: Option<&str>) -> Result<Vec<DataCenterRow>, ApiError> {
    let Some(provider) = provider.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(rows.to_vec());
    };
    let selected: Vec<DataCenterRow> = rows
        .iter()
        .filter(|r| r.facility.provider.eq_ignore_ascii_case(provider))
        .cloned()
        .collect();
    if selected.is_empty() {
        return Err(ApiError::NotFound(format!("Unknown provider: {}", provider)));
    }
    Ok(selected)
}

async fn list_datacenters(
    State(state): State<AppState>,
    Query(query): Query<ProviderQuery>,
) -> ApiResult<Vec<DataCenterRow>> {
    let rows = select_datacenters(&state.datacenters, query.provider.as_deref())?;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn list_providers(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(ApiResponse::ok(providers(&state.datacenters))))
}

async fn datacenter_summary(State(state): State<AppState>) -> ApiResult<DatacenterSummary> {
    Ok(Json(ApiResponse::ok(summarize_datacenters(&state.datacenters))))
}

async fn datacenter_map(
    State(state): State<AppState>,
    Query(query): Query<ProviderQuery>,
) -> ApiResult<Value> {
    let rows = select_datacenters(&state.datacenters, query.provider.as_deref())?;
    Ok(Json(ApiResponse::ok(datacenter_features(&rows))))
}

async fn energy_by_scarcity_svg(State(state): State<AppState>) -> Result<Response, ApiError> {
    let levels = energy_by_scarcity(&state.datacenters);
    let svg = StaticChartRenderer::energy_by_scarcity_svg(&levels, BAR_CHART_SIZE)?;
    Ok(([(header::CONTENT_TYPE, SVG)], svg).into_response())
}

/// State choropleth data; static, so it never touches the loaders.
async fn water_by_state() -> ApiResult<Vec<StateWater>> {
    Ok(Json(ApiResponse::ok(state_water_table())))
}
