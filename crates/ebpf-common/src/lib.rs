#![cfg_attr(not(feature = "std"), no_std)]

pub mod clat;
pub mod config;
pub mod firewall;
pub mod net;
pub mod stats;
pub mod trace;
pub mod uid;
