use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
    Json,
};
use innkeeper_core::{NewHotel, RoomFilter, UpdatedHotel};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{HotelFilterSchema, NewHotelSchema, UpdateHotelSchema, ValidatedJson},
    serialized::{Hotel, Room, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/hotels",
    tag = "hotels",
    params(HotelFilterSchema),
    responses(
        (status = 200, body = Vec<Hotel>)
    )
)]
pub(crate) async fn list_hotels(
    State(context): State<ServerContext>,
    Query(filter): Query<HotelFilterSchema>,
) -> ServerResult<Json<Vec<Hotel>>> {
    let hotels = context.innkeeper.catalog.hotels(&filter.into()).await?;

    Ok(Json(hotels.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/hotels/cities",
    tag = "hotels",
    responses(
        (status = 200, body = Vec<String>)
    )
)]
pub(crate) async fn list_cities(State(context): State<ServerContext>) -> ServerResult<Json<Vec<String>>> {
    let cities = context.innkeeper.catalog.cities().await?;

    Ok(Json(cities))
}

#[utoipa::path(
    get,
    path = "/v1/hotels/{id}",
    tag = "hotels",
    responses(
        (status = 200, body = Hotel)
    )
)]
pub(crate) async fn hotel(
    State(context): State<ServerContext>,
    Path(hotel_id): Path<i32>,
) -> ServerResult<Json<Hotel>> {
    let hotel = context.innkeeper.catalog.hotel_by_id(hotel_id).await?;

    Ok(Json(hotel.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/hotels/{id}/rooms",
    tag = "hotels",
    responses(
        (status = 200, body = Vec<Room>)
    )
)]
pub(crate) async fn hotel_rooms(
    State(context): State<ServerContext>,
    Path(hotel_id): Path<i32>,
) -> ServerResult<Json<Vec<Room>>> {
    let filter = RoomFilter {
        hotel_id: Some(hotel_id),
        ..Default::default()
    };

    let rooms = context.innkeeper.catalog.rooms(&filter).await?;

    Ok(Json(rooms.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/hotels",
    tag = "hotels",
    request_body = NewHotelSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Hotel),
        (status = 403, description = "Requesting user is not an admin")
    )
)]
pub(crate) async fn create_hotel(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewHotelSchema>,
) -> ServerResult<Json<Hotel>> {
    let hotel = context
        .innkeeper
        .catalog
        .create_hotel(
            session.user().id,
            NewHotel {
                name: body.name,
                description: body.description,
                address: body.address,
                city: body.city,
                country: body.country,
                star_rating: body.star_rating,
                image_url: body.image_url,
                amenities: body.amenities,
                check_in_time: body.check_in_time,
                check_out_time: body.check_out_time,
            },
        )
        .await?;

    Ok(Json(hotel.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/hotels/{id}",
    tag = "hotels",
    request_body = UpdateHotelSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Hotel),
        (status = 403, description = "Requesting user is not an admin")
    )
)]
pub(crate) async fn update_hotel(
    session: Session,
    State(context): State<ServerContext>,
    Path(hotel_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateHotelSchema>,
) -> ServerResult<Json<Hotel>> {
    let hotel = context
        .innkeeper
        .catalog
        .update_hotel(
            session.user().id,
            UpdatedHotel {
                id: hotel_id,
                name: body.name,
                description: body.description,
                star_rating: body.star_rating,
                active: body.active,
            },
        )
        .await?;

    Ok(Json(hotel.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/hotels/{id}",
    tag = "hotels",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Hotel, its rooms, and their bookings were deleted"),
        (status = 403, description = "Requesting user is not an admin")
    )
)]
pub(crate) async fn delete_hotel(
    session: Session,
    State(context): State<ServerContext>,
    Path(hotel_id): Path<i32>,
) -> ServerResult<()> {
    context
        .innkeeper
        .catalog
        .delete_hotel(session.user().id, hotel_id)
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_hotels))
        .route("/", post(create_hotel))
        .route("/cities", get(list_cities))
        .route("/:id", get(hotel))
        .route("/:id", patch(update_hotel))
        .route("/:id", delete(delete_hotel))
        .route("/:id/rooms", get(hotel_rooms))
}
