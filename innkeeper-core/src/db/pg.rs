use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Error as SqlxError, PgPool, Postgres, QueryBuilder, Row};

use super::{
    BookingData, BookingStatus, Database, DatabaseError, DatabaseResult, HotelData, HotelFilter,
    IntoDatabaseError, NewBooking, NewHotel, NewRoom, NewSession, NewUser, PrimaryKey, Result,
    RoomData, RoomFilter, SessionData, UpdatedHotel, UpdatedRoom, UpdatedUser, UserData,
};

/// A postgres database implementation for innkeeper
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

fn decode_amenities(raw: Option<String>) -> Vec<String> {
    raw.and_then(|x| serde_json::from_str(&x).ok())
        .unwrap_or_default()
}

fn encode_amenities(amenities: &[String]) -> String {
    serde_json::to_string(amenities).unwrap_or_else(|_| "[]".to_string())
}

fn user_from_row(row: &PgRow) -> Result<UserData> {
    Ok(UserData {
        id: row.try_get("id").map_err(|e| e.any())?,
        username: row.try_get("username").map_err(|e| e.any())?,
        email: row.try_get("email").map_err(|e| e.any())?,
        password: row.try_get("password").map_err(|e| e.any())?,
        first_name: row.try_get("first_name").map_err(|e| e.any())?,
        last_name: row.try_get("last_name").map_err(|e| e.any())?,
        phone: row.try_get("phone").map_err(|e| e.any())?,
        admin: row.try_get("admin").map_err(|e| e.any())?,
        active: row.try_get("active").map_err(|e| e.any())?,
        created_at: row.try_get("created_at").map_err(|e| e.any())?,
    })
}

fn hotel_from_row(row: &PgRow) -> Result<HotelData> {
    Ok(HotelData {
        id: row.try_get("id").map_err(|e| e.any())?,
        name: row.try_get("name").map_err(|e| e.any())?,
        description: row.try_get("description").map_err(|e| e.any())?,
        address: row.try_get("address").map_err(|e| e.any())?,
        city: row.try_get("city").map_err(|e| e.any())?,
        country: row.try_get("country").map_err(|e| e.any())?,
        star_rating: row.try_get("star_rating").map_err(|e| e.any())?,
        image_url: row.try_get("image_url").map_err(|e| e.any())?,
        amenities: decode_amenities(row.try_get("amenities").map_err(|e| e.any())?),
        check_in_time: row.try_get("check_in_time").map_err(|e| e.any())?,
        check_out_time: row.try_get("check_out_time").map_err(|e| e.any())?,
        active: row.try_get("active").map_err(|e| e.any())?,
        created_at: row.try_get("created_at").map_err(|e| e.any())?,
    })
}

fn room_from_row(row: &PgRow) -> Result<RoomData> {
    Ok(RoomData {
        id: row.try_get("id").map_err(|e| e.any())?,
        hotel_id: row.try_get("hotel_id").map_err(|e| e.any())?,
        room_number: row.try_get("room_number").map_err(|e| e.any())?,
        room_type: row.try_get("room_type").map_err(|e| e.any())?,
        description: row.try_get("description").map_err(|e| e.any())?,
        price_per_night: row.try_get("price_per_night").map_err(|e| e.any())?,
        capacity: row.try_get("capacity").map_err(|e| e.any())?,
        image_url: row.try_get("image_url").map_err(|e| e.any())?,
        amenities: decode_amenities(row.try_get("amenities").map_err(|e| e.any())?),
        available: row.try_get("available").map_err(|e| e.any())?,
        created_at: row.try_get("created_at").map_err(|e| e.any())?,
    })
}

fn status_from_row(row: &PgRow) -> Result<BookingStatus> {
    let raw: String = row.try_get("status").map_err(|e| e.any())?;
    raw.parse().map_err(|e: String| DatabaseError::Internal(e.into()))
}

impl PgDatabase {
    async fn assemble_booking(&self, row: &PgRow) -> Result<BookingData> {
        let hotel_id: PrimaryKey = row.try_get("hotel_id").map_err(|e| e.any())?;
        let room_id: PrimaryKey = row.try_get("room_id").map_err(|e| e.any())?;

        Ok(BookingData {
            id: row.try_get("id").map_err(|e| e.any())?,
            user_id: row.try_get("user_id").map_err(|e| e.any())?,
            check_in_date: row.try_get("check_in_date").map_err(|e| e.any())?,
            check_out_date: row.try_get("check_out_date").map_err(|e| e.any())?,
            guest_name: row.try_get("guest_name").map_err(|e| e.any())?,
            guest_email: row.try_get("guest_email").map_err(|e| e.any())?,
            guest_phone: row.try_get("guest_phone").map_err(|e| e.any())?,
            number_of_guests: row.try_get("number_of_guests").map_err(|e| e.any())?,
            special_requests: row.try_get("special_requests").map_err(|e| e.any())?,
            total_price: row.try_get("total_price").map_err(|e| e.any())?,
            status: status_from_row(row)?,
            created_at: row.try_get("created_at").map_err(|e| e.any())?,
            updated_at: row.try_get("updated_at").map_err(|e| e.any())?,
            hotel: self.hotel_by_id(hotel_id).await?,
            room: self.room_by_id(room_id).await?,
        })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn check_for_admin(&self) -> Result<bool> {
        let result = sqlx::query("SELECT id FROM users WHERE admin = true LIMIT 1")
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SqlxError::RowNotFound) => Ok(false),
            Err(e) => Err(e.any()),
        }
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?;

        user_from_row(&row)
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "username"))?;

        user_from_row(&row)
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))?;

        user_from_row(&row)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        let row = sqlx::query(
            "INSERT INTO users (username, email, password, first_name, last_name, phone, admin)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone)
        .bind(new_user.admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        user_from_row(&row)
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;

        sqlx::query(
            "UPDATE users SET
                first_name = $1,
                last_name = $2,
                phone = $3,
                password = $4,
                active = $5
            WHERE id = $6",
        )
        .bind(updated_user.first_name.or(user.first_name))
        .bind(updated_user.last_name.or(user.last_name))
        .bind(updated_user.phone.or(user.phone))
        .bind(updated_user.password.unwrap_or(user.password))
        .bind(updated_user.active.unwrap_or(user.active))
        .bind(updated_user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        // Sessions and bookings are removed by ON DELETE CASCADE
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn count_users(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row = sqlx::query("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "token"))?;

        let user_id: PrimaryKey = row.try_get("user_id").map_err(|e| e.any())?;

        Ok(SessionData {
            id: row.try_get("id").map_err(|e| e.any())?,
            token: row.try_get("token").map_err(|e| e.any())?,
            expires_at: row.try_get("expires_at").map_err(|e| e.any())?,
            user: self.user_by_id(user_id).await?,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        let row = sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3) RETURNING token",
        )
        .bind(&new_session.token)
        .bind(new_session.user_id)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let token: String = row.try_get("token").map_err(|e| e.any())?;
        self.session_by_token(&token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at < timezone('UTC', now())")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn hotel_by_id(&self, hotel_id: PrimaryKey) -> Result<HotelData> {
        let row = sqlx::query("SELECT * FROM hotels WHERE id = $1")
            .bind(hotel_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("hotel", "id"))?;

        hotel_from_row(&row)
    }

    async fn create_hotel(&self, new_hotel: NewHotel) -> Result<HotelData> {
        let row = sqlx::query(
            "INSERT INTO hotels
                (name, description, address, city, country, star_rating,
                 image_url, amenities, check_in_time, check_out_time)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(&new_hotel.name)
        .bind(&new_hotel.description)
        .bind(&new_hotel.address)
        .bind(&new_hotel.city)
        .bind(&new_hotel.country)
        .bind(new_hotel.star_rating)
        .bind(&new_hotel.image_url)
        .bind(encode_amenities(&new_hotel.amenities))
        .bind(&new_hotel.check_in_time)
        .bind(&new_hotel.check_out_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        hotel_from_row(&row)
    }

    async fn update_hotel(&self, updated_hotel: UpdatedHotel) -> Result<HotelData> {
        let hotel = self.hotel_by_id(updated_hotel.id).await?;

        sqlx::query(
            "UPDATE hotels SET
                name = $1,
                description = $2,
                star_rating = $3,
                active = $4
            WHERE id = $5",
        )
        .bind(updated_hotel.name.unwrap_or(hotel.name))
        .bind(updated_hotel.description.or(hotel.description))
        .bind(updated_hotel.star_rating.unwrap_or(hotel.star_rating))
        .bind(updated_hotel.active.unwrap_or(hotel.active))
        .bind(updated_hotel.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.hotel_by_id(updated_hotel.id).await
    }

    async fn delete_hotel(&self, hotel_id: PrimaryKey) -> Result<()> {
        // Ensure hotel exists
        let _ = self.hotel_by_id(hotel_id).await?;

        // Rooms and bookings are removed by ON DELETE CASCADE
        sqlx::query("DELETE FROM hotels WHERE id = $1")
            .bind(hotel_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn list_hotels(&self, filter: &HotelFilter) -> Result<Vec<HotelData>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM hotels WHERE active = true");

        if let Some(city) = &filter.city {
            query.push(" AND city ILIKE ");
            query.push_bind(format!("%{city}%"));
        }

        if let Some(min_rating) = filter.min_rating {
            query.push(" AND star_rating >= ");
            query.push_bind(min_rating);
        }

        if let Some(search) = &filter.search {
            query.push(" AND name ILIKE ");
            query.push_bind(format!("%{search}%"));
        }

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        rows.iter().map(hotel_from_row).collect()
    }

    async fn list_cities(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT city FROM hotels
             WHERE active = true AND city IS NOT NULL
             ORDER BY city",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn count_hotels(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM hotels")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        let row = sqlx::query("SELECT * FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("room", "id"))?;

        room_from_row(&row)
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        // Ensure the hotel exists
        let _ = self.hotel_by_id(new_room.hotel_id).await?;

        // Ensure the room number isn't taken within the hotel
        sqlx::query("SELECT id FROM rooms WHERE hotel_id = $1 AND room_number = $2")
            .bind(new_room.hotel_id)
            .bind(&new_room.room_number)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("room", "hotel:room_number"))
            .map(|_| ())
            .conflict_or_ok(
                "room",
                "hotel:room_number",
                format!("{}:{}", new_room.hotel_id, new_room.room_number).as_str(),
            )?;

        let row = sqlx::query(
            "INSERT INTO rooms
                (hotel_id, room_number, room_type, description,
                 price_per_night, capacity, image_url, amenities)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(new_room.hotel_id)
        .bind(&new_room.room_number)
        .bind(&new_room.room_type)
        .bind(&new_room.description)
        .bind(new_room.price_per_night)
        .bind(new_room.capacity)
        .bind(&new_room.image_url)
        .bind(encode_amenities(&new_room.amenities))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        room_from_row(&row)
    }

    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData> {
        let room = self.room_by_id(updated_room.id).await?;

        sqlx::query(
            "UPDATE rooms SET
                description = $1,
                price_per_night = $2,
                available = $3
            WHERE id = $4",
        )
        .bind(updated_room.description.or(room.description))
        .bind(updated_room.price_per_night.unwrap_or(room.price_per_night))
        .bind(updated_room.available.unwrap_or(room.available))
        .bind(updated_room.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.room_by_id(updated_room.id).await
    }

    async fn delete_room(&self, room_id: PrimaryKey) -> Result<()> {
        // Ensure room exists
        let _ = self.room_by_id(room_id).await?;

        // Bookings are removed by ON DELETE CASCADE
        sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomData>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM rooms WHERE available = true");

        if let Some(hotel_id) = filter.hotel_id {
            query.push(" AND hotel_id = ");
            query.push_bind(hotel_id);
        }

        if let Some(room_type) = &filter.room_type {
            query.push(" AND room_type = ");
            query.push_bind(room_type.clone());
        }

        if let Some(min_price) = filter.min_price {
            query.push(" AND price_per_night >= ");
            query.push_bind(min_price);
        }

        if let Some(max_price) = filter.max_price {
            query.push(" AND price_per_night <= ");
            query.push_bind(max_price);
        }

        if let Some(min_capacity) = filter.min_capacity {
            query.push(" AND capacity >= ");
            query.push_bind(min_capacity);
        }

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        rows.iter().map(room_from_row).collect()
    }

    async fn list_room_types(&self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT DISTINCT room_type FROM rooms ORDER BY room_type")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn count_rooms(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("booking", "id"))?;

        self.assemble_booking(&row).await
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // Lock the room row so racing creates for the same room serialize
        let room_row = sqlx::query("SELECT * FROM rooms WHERE id = $1 FOR UPDATE")
            .bind(new_booking.room_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.not_found_or("room", "id"))?;

        let room = room_from_row(&room_row)?;

        let conflict: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE room_id = $1
                  AND status IN ('pending', 'confirmed')
                  AND check_in_date < $2
                  AND check_out_date > $3
            )",
        )
        .bind(room.id)
        .bind(new_booking.check_out_date)
        .bind(new_booking.check_in_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        if conflict {
            // Dropping the transaction rolls it back
            return Err(DatabaseError::Conflict {
                resource: "booking",
                field: "room:dates",
                value: format!(
                    "{}:{}..{}",
                    room.id, new_booking.check_in_date, new_booking.check_out_date
                ),
            });
        }

        let row = sqlx::query(
            "INSERT INTO bookings
                (user_id, hotel_id, room_id, check_in_date, check_out_date,
                 guest_name, guest_email, guest_phone, number_of_guests,
                 special_requests, total_price, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending')
             RETURNING id",
        )
        .bind(new_booking.user_id)
        .bind(room.hotel_id)
        .bind(room.id)
        .bind(new_booking.check_in_date)
        .bind(new_booking.check_out_date)
        .bind(&new_booking.guest_name)
        .bind(&new_booking.guest_email)
        .bind(&new_booking.guest_phone)
        .bind(new_booking.number_of_guests)
        .bind(&new_booking.special_requests)
        .bind(new_booking.total_price)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        let booking_id: PrimaryKey = row.try_get("id").map_err(|e| e.any())?;
        self.booking_by_id(booking_id).await
    }

    async fn update_booking_status(
        &self,
        booking_id: PrimaryKey,
        status: BookingStatus,
    ) -> Result<BookingData> {
        // Ensure booking exists
        let _ = self.booking_by_id(booking_id).await?;

        sqlx::query(
            "UPDATE bookings SET status = $1, updated_at = timezone('UTC', now()) WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(booking_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.booking_by_id(booking_id).await
    }

    async fn bookings_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let rows = sqlx::query(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut bookings = Vec::with_capacity(rows.len());

        for row in &rows {
            bookings.push(self.assemble_booking(row).await?);
        }

        Ok(bookings)
    }

    async fn recent_bookings(&self, limit: i64) -> Result<Vec<BookingData>> {
        let rows = sqlx::query("SELECT * FROM bookings ORDER BY created_at DESC, id DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let mut bookings = Vec::with_capacity(rows.len());

        for row in &rows {
            bookings.push(self.assemble_booking(row).await?);
        }

        Ok(bookings)
    }

    async fn has_booking_conflict(
        &self,
        room_id: PrimaryKey,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool> {
        // Ensure room exists
        let _ = self.room_by_id(room_id).await?;

        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE room_id = $1
                  AND status IN ('pending', 'confirmed')
                  AND check_in_date < $2
                  AND check_out_date > $3
            )",
        )
        .bind(room_id)
        .bind(check_out)
        .bind(check_in)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn count_bookings(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
