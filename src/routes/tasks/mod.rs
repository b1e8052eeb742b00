pub mod dto;
pub mod model;
pub mod queries;
pub mod routes;
pub mod shaper;
