pub mod completion;
pub mod pdf;
pub mod proxy_client;
