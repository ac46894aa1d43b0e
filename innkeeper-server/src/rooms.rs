use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
    Json,
};
use innkeeper_core::{NewRoom, UpdatedRoom};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewRoomSchema, RoomFilterSchema, UpdateRoomSchema, ValidatedJson},
    serialized::{Room, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/rooms",
    tag = "rooms",
    params(RoomFilterSchema),
    responses(
        (status = 200, body = Vec<Room>)
    )
)]
pub(crate) async fn list_rooms(
    State(context): State<ServerContext>,
    Query(filter): Query<RoomFilterSchema>,
) -> ServerResult<Json<Vec<Room>>> {
    let rooms = context.innkeeper.catalog.rooms(&filter.into()).await?;

    Ok(Json(rooms.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/types",
    tag = "rooms",
    responses(
        (status = 200, body = Vec<String>)
    )
)]
pub(crate) async fn list_room_types(State(context): State<ServerContext>) -> ServerResult<Json<Vec<String>>> {
    let types = context.innkeeper.catalog.room_types().await?;

    Ok(Json(types))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{id}",
    tag = "rooms",
    responses(
        (status = 200, body = Room)
    )
)]
pub(crate) async fn room(
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
) -> ServerResult<Json<Room>> {
    let room = context.innkeeper.catalog.room_by_id(room_id).await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms",
    tag = "rooms",
    request_body = NewRoomSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room),
        (status = 403, description = "Requesting user is not an admin"),
        (status = 409, description = "Room number is taken within the hotel")
    )
)]
pub(crate) async fn create_room(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewRoomSchema>,
) -> ServerResult<Json<Room>> {
    let room = context
        .innkeeper
        .catalog
        .create_room(
            session.user().id,
            NewRoom {
                hotel_id: body.hotel_id,
                room_number: body.room_number,
                room_type: body.room_type,
                description: body.description,
                price_per_night: body.price_per_night,
                capacity: body.capacity,
                image_url: body.image_url,
                amenities: body.amenities,
            },
        )
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/rooms/{id}",
    tag = "rooms",
    request_body = UpdateRoomSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room),
        (status = 403, description = "Requesting user is not an admin")
    )
)]
pub(crate) async fn update_room(
    session: Session,
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateRoomSchema>,
) -> ServerResult<Json<Room>> {
    let room = context
        .innkeeper
        .catalog
        .update_room(
            session.user().id,
            UpdatedRoom {
                id: room_id,
                description: body.description,
                price_per_night: body.price_per_night,
                available: body.available,
            },
        )
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/rooms/{id}",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Room and its bookings were deleted"),
        (status = 403, description = "Requesting user is not an admin")
    )
)]
pub(crate) async fn delete_room(
    session: Session,
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
) -> ServerResult<()> {
    context
        .innkeeper
        .catalog
        .delete_room(session.user().id, room_id)
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_rooms))
        .route("/", post(create_room))
        .route("/types", get(list_room_types))
        .route("/:id", get(room))
        .route("/:id", patch(update_room))
        .route("/:id", delete(delete_room))
}
