//! Domain model (categories, payload types, ids, errors).
//!
//! I/O を持たない値型だけを置きます。

pub mod category;
pub mod errors;
pub mod ids;
pub mod payload;

pub use self::category::{Category, HandlerKind};
pub use self::errors::{DeliveryError, RegistrationError};
pub use self::ids::SessionId;
pub use self::payload::{AnyPayload, BinaryStream, Payload, PayloadType, PongMessage, TextStream};
