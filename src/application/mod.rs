pub mod broker_port;

pub use broker_port::BrokerConnection;
