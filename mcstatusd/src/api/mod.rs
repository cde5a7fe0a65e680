pub mod access_log;
pub mod routes;
