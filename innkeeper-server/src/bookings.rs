use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};
use innkeeper_core::NewBookingRequest;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{AvailabilitySchema, NewBookingSchema, ValidatedJson},
    serialized::{Availability, Booking, BookingStats, Overview, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/bookings",
    tag = "bookings",
    request_body = NewBookingSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 409, description = "Room is not available for the selected dates"),
        (status = 422, description = "Dates or guest details are invalid")
    )
)]
pub(crate) async fn create_booking(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewBookingSchema>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .innkeeper
        .bookings
        .create(
            session.user().id,
            NewBookingRequest {
                room_id: body.room_id,
                check_in_date: body.check_in_date,
                check_out_date: body.check_out_date,
                guest_name: body.guest_name,
                guest_email: body.guest_email,
                guest_phone: body.guest_phone,
                number_of_guests: body.number_of_guests,
                special_requests: body.special_requests,
            },
        )
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/bookings",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
pub(crate) async fn list_bookings(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Booking>>> {
    let bookings = context
        .innkeeper
        .bookings
        .bookings_for_user(session.user().id)
        .await?;

    Ok(Json(bookings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/bookings/stats",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = BookingStats)
    )
)]
pub(crate) async fn booking_stats(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<BookingStats>> {
    let stats = context
        .innkeeper
        .bookings
        .stats_for_user(session.user().id)
        .await?;

    Ok(Json(stats.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/bookings/availability",
    tag = "bookings",
    request_body = AvailabilitySchema,
    responses(
        (status = 200, body = Availability),
        (status = 422, description = "Date range is invalid")
    )
)]
pub(crate) async fn check_availability(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<AvailabilitySchema>,
) -> ServerResult<Json<Availability>> {
    let available = context
        .innkeeper
        .bookings
        .is_available(body.room_id, body.check_in_date, body.check_out_date)
        .await?;

    Ok(Json(Availability { available }))
}

#[utoipa::path(
    get,
    path = "/v1/bookings/{id}",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 403, description = "Booking belongs to another user")
    )
)]
pub(crate) async fn booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .innkeeper
        .bookings
        .booking_by_id(booking_id, session.user().id)
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/bookings/{id}/confirm",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 409, description = "Booking is not pending")
    )
)]
pub(crate) async fn confirm_booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .innkeeper
        .bookings
        .confirm(booking_id, session.user().id)
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/bookings/{id}/cancel",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 409, description = "Booking is already completed or cancelled")
    )
)]
pub(crate) async fn cancel_booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .innkeeper
        .bookings
        .cancel(booking_id, session.user().id)
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/bookings/{id}/complete",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 409, description = "Booking is not confirmed")
    )
)]
pub(crate) async fn complete_booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .innkeeper
        .bookings
        .complete(booking_id, session.user().id)
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/admin/overview",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Overview),
        (status = 403, description = "Requesting user is not an admin")
    )
)]
pub(crate) async fn overview(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Overview>> {
    let overview = context
        .innkeeper
        .catalog
        .overview(session.user().id)
        .await?;

    Ok(Json(overview.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_booking))
        .route("/", get(list_bookings))
        .route("/stats", get(booking_stats))
        .route("/availability", post(check_availability))
        .route("/:id", get(booking))
        .route("/:id/confirm", post(confirm_booking))
        .route("/:id/cancel", post(cancel_booking))
        .route("/:id/complete", post(complete_booking))
}

pub fn admin_router() -> Router {
    Router::new().route("/overview", get(overview))
}
