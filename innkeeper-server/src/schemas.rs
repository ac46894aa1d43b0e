//! Request bodies and query parameters accepted by the endpoints

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use innkeeper_core::{HotelFilter, PrimaryKey, RoomFilter};

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub username: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(min = 3, max = 128))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 64))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileSchema {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    #[validate(length(min = 6, max = 64))]
    pub password: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewHotelSchema {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[validate(range(min = 1, max = 5))]
    #[serde(default = "default_star_rating")]
    pub star_rating: i32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default = "default_check_in_time")]
    pub check_in_time: String,
    #[serde(default = "default_check_out_time")]
    pub check_out_time: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateHotelSchema {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub star_rating: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRoomSchema {
    pub hotel_id: PrimaryKey,
    #[validate(length(min = 1, max = 20))]
    pub room_number: String,
    #[validate(length(min = 1, max = 50))]
    pub room_type: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub price_per_night: f64,
    #[validate(range(min = 1))]
    #[serde(default = "default_capacity")]
    pub capacity: i32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRoomSchema {
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub price_per_night: Option<f64>,
    pub available: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBookingSchema {
    pub room_id: PrimaryKey,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    #[validate(length(min = 1, max = 100))]
    pub guest_name: String,
    #[validate(email)]
    pub guest_email: String,
    pub guest_phone: Option<String>,
    /// Defaults to a single guest when omitted
    #[validate(range(min = 1))]
    #[serde(default = "default_number_of_guests")]
    pub number_of_guests: i32,
    pub special_requests: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AvailabilitySchema {
    pub room_id: PrimaryKey,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
}

#[derive(Debug, IntoParams, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelFilterSchema {
    pub city: Option<String>,
    pub min_rating: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, IntoParams, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomFilterSchema {
    pub hotel_id: Option<PrimaryKey>,
    pub room_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_capacity: Option<i32>,
}

impl From<HotelFilterSchema> for HotelFilter {
    fn from(value: HotelFilterSchema) -> Self {
        Self {
            city: value.city,
            min_rating: value.min_rating,
            search: value.search,
        }
    }
}

impl From<RoomFilterSchema> for RoomFilter {
    fn from(value: RoomFilterSchema) -> Self {
        Self {
            hotel_id: value.hotel_id,
            room_type: value.room_type,
            min_price: value.min_price,
            max_price: value.max_price,
            min_capacity: value.min_capacity,
        }
    }
}

fn default_star_rating() -> i32 {
    3
}

fn default_check_in_time() -> String {
    "14:00".to_string()
}

fn default_check_out_time() -> String {
    "11:00".to_string()
}

fn default_capacity() -> i32 {
    2
}

fn default_number_of_guests() -> i32 {
    1
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
