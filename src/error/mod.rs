pub mod pubsub;
pub mod relay;

pub use pubsub::{RecvError, TryRecvError};
pub use relay::{ConnectionError, PayloadExtractionError, RelayError, SubscriptionError};
