pub mod settings;

pub use settings::{greeting, Settings};
