#![deny(unsafe_code)]

pub mod ebpf;
pub mod maps;
pub mod socket;
