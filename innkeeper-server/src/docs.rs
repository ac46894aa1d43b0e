use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, bookings, hotels, rooms, schemas, serialized};

#[derive(OpenApi)]
#[openapi(
    modifiers(&Security),
    info(
        description = "innkeeper-server exposes endpoints to interact with this innkeeper instance"
    ),
    paths(
        auth::register,
        auth::register_admin,
        auth::login,
        auth::logout,
        auth::user,
        auth::update_profile,
        hotels::list_hotels,
        hotels::list_cities,
        hotels::hotel,
        hotels::hotel_rooms,
        hotels::create_hotel,
        hotels::update_hotel,
        hotels::delete_hotel,
        rooms::list_rooms,
        rooms::list_room_types,
        rooms::room,
        rooms::create_room,
        rooms::update_room,
        rooms::delete_room,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::booking_stats,
        bookings::check_availability,
        bookings::booking,
        bookings::confirm_booking,
        bookings::cancel_booking,
        bookings::complete_booking,
        bookings::overview,
    ),
    components(schemas(
        schemas::LoginSchema,
        schemas::RegisterSchema,
        schemas::UpdateProfileSchema,
        schemas::NewHotelSchema,
        schemas::UpdateHotelSchema,
        schemas::NewRoomSchema,
        schemas::UpdateRoomSchema,
        schemas::NewBookingSchema,
        schemas::AvailabilitySchema,
        serialized::User,
        serialized::LoginResult,
        serialized::Hotel,
        serialized::Room,
        serialized::Booking,
        serialized::BookingStats,
        serialized::Overview,
        serialized::Availability,
    ))
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
