//! Внутрипроцессная подсистема Publish–Subscribe.
//!
//! - `broker`: регистрация каналов и шаблонов, доставка сообщений.
//! - `intern` (приватный): пул имён каналов.
//! - `message`: сообщение, которое брокер доставляет подписчику.
//! - `subscriber`: подписки на канал и на glob-шаблон.

pub mod broker;
mod intern;
pub mod message;
pub mod subscriber;

pub use broker::*;
pub(crate) use intern::intern_channel;
pub use message::*;
pub use subscriber::*;
