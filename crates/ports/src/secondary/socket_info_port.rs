use domain::tagging::entity::SocketInfo;

/// Secondary port resolving a file descriptor to its socket.
pub trait SocketInfoPort: Send + Sync {
    /// `None` when `fd` is not an open socket.
    fn socket_info(&self, fd: i32) -> Option<SocketInfo>;
}
