//! Ядро ретранслятора.
//!
//! Поток управления:
//! `PublishLoop` → `BrokerConnection::publish` → брокер → задача
//! диспетчеризации `SubscriptionManager` → `ListenerAdapter` →
//! `NotificationHandler`. Цикл публикации опрашивает счётчик обработчика,
//! чтобы решить, когда остановиться.

pub mod adapter;
pub mod bootstrap;
pub mod container;
pub mod handler;
pub mod publisher;
pub mod shutdown;

pub use adapter::ListenerAdapter;
pub use bootstrap::Relay;
pub use container::{DispatchStats, SubscriptionManager, DEFAULT_DRAIN_TIMEOUT};
pub use handler::{MessageListener, NotificationHandler};
pub use publisher::{LoopOutcome, PublishConfig, PublishLoop, CANCELLED_EXIT_CODE, DEFAULT_INTERVAL};
pub use shutdown::{Shutdown, ShutdownListener};
