//! Aurora visibility scoring for a fixed set of viewing sites.
//!
//! Space weather from NOAA SWPC, cloud cover from the National Weather
//! Service and local sun and moon geometry are combined into a 0-100 score,
//! a rating and a one-paragraph summary per location.
pub mod astronomy;
pub mod clients;
pub mod clouds;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod locations;
pub mod routes;
pub mod scoring;
pub mod services;
pub mod summary;
pub mod utils;
