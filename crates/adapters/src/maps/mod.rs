//! Fixed-capacity tables with kernel map semantics: inserts past capacity
//! fail instead of evicting, and every operation is safe to call from many
//! threads at once.

pub mod array_map;
pub mod bounded_hash;
pub mod lpm_trie;
pub mod ring_buf;

/// `BPF_NOEXIST` / `BPF_EXIST` / `BPF_ANY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    NoExist,
    Exist,
    Any,
}
