//! Tool plugins the model can call

pub mod weather;

pub use weather::{WeatherClient, WeatherPlugin};
