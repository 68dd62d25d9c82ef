#[cfg(test)]
pub mod memory;
pub mod mqtt;
pub mod traits;

pub use mqtt::MqttPublisher;
pub use traits::Publisher;
