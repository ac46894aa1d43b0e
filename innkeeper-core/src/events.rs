use crossbeam::channel::{Receiver, Sender};

use crate::{BookingStatus, PrimaryKey};

pub type EventSender = Sender<InnkeeperEvent>;
pub type EventReceiver = Receiver<InnkeeperEvent>;

/// Events emitted by the booking system
#[derive(Debug, Clone)]
pub enum InnkeeperEvent {
    /// A new account registered
    UserRegistered { user_id: PrimaryKey },
    /// A hotel was added to the catalog
    HotelCreated { hotel_id: PrimaryKey },
    /// A room was added to a hotel
    RoomCreated {
        hotel_id: PrimaryKey,
        room_id: PrimaryKey,
    },
    /// A booking was created in pending state
    BookingCreated {
        booking_id: PrimaryKey,
        room_id: PrimaryKey,
        user_id: PrimaryKey,
    },
    /// A booking moved to a new lifecycle state
    BookingStatusChanged {
        booking_id: PrimaryKey,
        new_status: BookingStatus,
    },
}
