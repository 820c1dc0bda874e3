pub mod expressions;
pub mod flow;
pub mod invoice;
pub mod locator;
pub mod logger;
pub mod notify;
pub mod platform;
pub mod settings;
pub mod sleep;
pub mod types;
pub mod wait;
