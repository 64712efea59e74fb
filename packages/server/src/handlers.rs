//! HTTP handler functions for the heritage map API.

use std::collections::{BTreeMap, BTreeSet};
use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, HttpResponse, web};
use unesco_map_database::{CategoryStore as _, ItineraryStore as _, SiteStore as _};
use unesco_map_database_models::{PageRequest, SiteQuery};
use unesco_map_server_models::{
    ApiBooking, ApiCategory, ApiError, ApiFollowStatus, ApiHealth, ApiItineraryDetail,
    ApiItineraryList, ApiItinerarySummary, BookingForm, ItineraryListParams,
};

use crate::AppState;
use crate::geojson::{site_collection, stop_collection};

/// Header carrying the user authenticated by the fronting proxy.
pub const REMOTE_USER_HEADER: &str = "X-Remote-User";

/// The requesting user, `None` when anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub Option<String>);

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get(REMOTE_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        ready(Ok(Self(user)))
    }
}

fn internal_error(context: &str, e: &impl std::fmt::Display) -> HttpResponse {
    log::error!("{context}: {e}");
    HttpResponse::InternalServerError().json(ApiError::new(context))
}

fn itinerary_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiError::new("Itinerary not found"))
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/categories`
pub async fn categories(state: web::Data<AppState>) -> HttpResponse {
    match state.store.list_categories().await {
        Ok(categories) => HttpResponse::Ok().json(
            categories
                .into_iter()
                .map(ApiCategory::from)
                .collect::<Vec<_>>(),
        ),
        Err(e) => internal_error("Failed to list categories", &e),
    }
}

/// `GET /api/sites.geojson`
///
/// Filters sites by the query string and returns one page as a
/// `FeatureCollection`. Unknown or malformed parameters are ignored.
pub async fn sites_geojson(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let params = web::Query::<BTreeMap<String, String>>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();
    let query = SiteQuery::from_params(&params);

    match state.store.query_sites(&query).await {
        Ok(page) => HttpResponse::Ok().json(site_collection(&page)),
        Err(e) => internal_error("Failed to query sites", &e),
    }
}

/// `GET /api/itinerario/{id}.geojson`
pub async fn itinerary_geojson(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();

    match state.store.get_itinerary(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return itinerary_not_found(),
        Err(e) => return internal_error("Failed to load itinerary", &e),
    }

    match state.store.itinerary_stops(id).await {
        Ok(stops) => HttpResponse::Ok().json(stop_collection(&stops)),
        Err(e) => internal_error("Failed to load itinerary stops", &e),
    }
}

/// `GET /api/itinerari`
///
/// Lists itineraries by name, a page at a time, with the accessibility
/// features offered along each one.
pub async fn list_itineraries(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: HttpRequest,
) -> HttpResponse {
    let params = web::Query::<ItineraryListParams>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();
    let request = PageRequest::from_param(params.page.as_deref());

    let page = match state.store.list_itineraries(request).await {
        Ok(page) => page,
        Err(e) => return internal_error("Failed to list itineraries", &e),
    };

    let followed = match user.0 {
        Some(user) => {
            let ids: Vec<i64> = page.items.iter().map(|s| s.itinerary.id).collect();
            match state.store.followed_itineraries(&user, &ids).await {
                Ok(followed) => followed,
                Err(e) => return internal_error("Failed to load followed itineraries", &e),
            }
        }
        None => BTreeSet::new(),
    };

    let num_pages = request.num_pages(page.total);
    let items = page
        .items
        .into_iter()
        .map(|summary| {
            let is_followed = followed.contains(&summary.itinerary.id);
            ApiItinerarySummary::new(summary, is_followed)
        })
        .collect();

    HttpResponse::Ok().json(ApiItineraryList {
        items,
        total: page.total,
        page: request.page,
        num_pages,
    })
}

/// `GET /api/itinerari/{id}`
pub async fn itinerary_detail(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> HttpResponse {
    let id = path.into_inner();

    let itinerary = match state.store.get_itinerary(id).await {
        Ok(Some(itinerary)) => itinerary,
        Ok(None) => return itinerary_not_found(),
        Err(e) => return internal_error("Failed to load itinerary", &e),
    };

    let stops = match state.store.itinerary_stops(id).await {
        Ok(stops) => stops,
        Err(e) => return internal_error("Failed to load itinerary stops", &e),
    };

    let is_followed = match user.0 {
        Some(user) => match state.store.followed_itineraries(&user, &[id]).await {
            Ok(followed) => followed.contains(&id),
            Err(e) => return internal_error("Failed to load followed itineraries", &e),
        },
        None => false,
    };

    HttpResponse::Ok().json(ApiItineraryDetail::new(itinerary, stops, is_followed))
}

/// `POST /api/itinerari/{id}/toggle-prenota`
///
/// Follows the itinerary, or unfollows it if already followed.
pub async fn toggle_follow(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> HttpResponse {
    let Some(user) = user.0 else {
        return HttpResponse::Unauthorized().json(ApiError::new("Login required"));
    };
    let id = path.into_inner();

    match state.store.get_itinerary(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return itinerary_not_found(),
        Err(e) => return internal_error("Failed to load itinerary", &e),
    }

    match state.store.toggle_follow(&user, id).await {
        Ok(status) => {
            log::debug!("User {user:?} {status} itinerary {id}");
            HttpResponse::Ok().json(ApiFollowStatus { status })
        }
        Err(e) => internal_error("Failed to toggle follow", &e),
    }
}

/// `POST /api/itinerari/{id}/prenota`
///
/// Validates a booking form and stores it.
pub async fn create_booking(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Json<BookingForm>,
) -> HttpResponse {
    let id = path.into_inner();

    match state.store.get_itinerary(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return itinerary_not_found(),
        Err(e) => return internal_error("Failed to load itinerary", &e),
    }

    let today = chrono::Local::now().date_naive();
    let booking = match form.into_inner().into_new_booking(id, today) {
        Ok(booking) => booking,
        Err(fields) => return HttpResponse::BadRequest().json(ApiError::invalid(fields)),
    };

    match state.store.create_booking(&booking).await {
        Ok(booking) => {
            log::info!("Booking {} created for itinerary {id}", booking.id);
            HttpResponse::Created().json(ApiBooking::from(booking))
        }
        Err(e) => internal_error("Failed to create booking", &e),
    }
}
