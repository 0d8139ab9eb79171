use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use domain::tagging::entity::SocketInfo;
use ports::secondary::socket_info_port::SocketInfoPort;

/// Open sockets by descriptor, with kernel-style unique cookies.
pub struct SocketTable {
    sockets: RwLock<HashMap<i32, SocketInfo>>,
    next_cookie: AtomicU64,
}

impl SocketTable {
    pub fn new() -> Self {
        Self {
            sockets: RwLock::new(HashMap::new()),
            next_cookie: AtomicU64::new(1),
        }
    }

    /// Register a socket on `fd` and return its cookie.
    pub fn open(&self, fd: i32, family: u16, protocol: u16) -> u64 {
        let cookie = self.next_cookie.fetch_add(1, Ordering::Relaxed);
        self.sockets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                fd,
                SocketInfo {
                    cookie,
                    family,
                    protocol,
                },
            );
        cookie
    }

    pub fn close(&self, fd: i32) -> Option<SocketInfo> {
        self.sockets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fd)
    }
}

impl Default for SocketTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketInfoPort for SocketTable {
    fn socket_info(&self, fd: i32) -> Option<SocketInfo> {
        self.sockets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&fd)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebpf_common::net::{AF_INET6, IPPROTO_TCP};

    #[test]
    fn cookies_are_unique_and_nonzero() {
        let t = SocketTable::new();
        let a = t.open(3, AF_INET6, u16::from(IPPROTO_TCP));
        let b = t.open(4, AF_INET6, u16::from(IPPROTO_TCP));
        assert_ne!(a, 0);
        assert_ne!(a, b);
        assert_eq!(t.socket_info(3).unwrap().cookie, a);
    }

    #[test]
    fn closed_socket_is_gone() {
        let t = SocketTable::new();
        t.open(3, AF_INET6, 17);
        assert!(t.close(3).is_some());
        assert!(t.socket_info(3).is_none());
    }
}
