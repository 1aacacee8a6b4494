pub mod assets;
pub mod db;
pub mod errors;
pub mod form;
pub mod helpers;
pub mod query_params;
pub mod ratelimit;
pub mod resource;
pub mod store;
