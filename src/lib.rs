/// Broker port: the capability set the relay needs from a pub/sub broker.
pub mod application;
/// Relay settings loading.
pub mod config;
/// Common error types: broker connection, subscription, payload extraction.
pub mod error;
/// Logging setup (formatting, filters, sinks).
pub mod logging;
/// In-process Pub/Sub: Broker, Subscription, Message.
pub mod pubsub;
/// Relay core: handler, listener adapter, subscription manager, publish loop.
pub mod relay;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Broker connection port.
pub use application::BrokerConnection;
/// Settings.
pub use config::{greeting, Settings};
/// Operation errors.
pub use error::{
    ConnectionError, PayloadExtractionError, RecvError, RelayError, SubscriptionError,
    TryRecvError,
};
/// Logging entry points.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Pub/Sub API.
pub use pubsub::{Broker, Message, PatternSubscription, Subscription};
/// Relay components.
pub use relay::{
    ListenerAdapter, LoopOutcome, MessageListener, NotificationHandler, PublishConfig,
    PublishLoop, Relay, Shutdown, SubscriptionManager,
};
