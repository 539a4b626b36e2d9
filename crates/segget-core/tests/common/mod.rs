pub mod range_server;
pub mod scripted_client;
