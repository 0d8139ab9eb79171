#![forbid(unsafe_code)]

pub mod clat_service_impl;
pub mod hook;
pub mod map_ports;
pub mod policy_service_impl;
pub mod socket_service_impl;
pub mod tag_service_impl;
pub mod traffic_service_impl;
