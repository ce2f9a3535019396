// System services

pub mod net;
