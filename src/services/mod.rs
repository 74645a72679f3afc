pub mod connector;
pub mod credentials;
pub mod locator;
pub mod storage;
pub mod transfer;
