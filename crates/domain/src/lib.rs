#![forbid(unsafe_code)]

pub mod accounting;
pub mod clat;
pub mod common;
pub mod firewall;
pub mod packet;
pub mod tagging;
