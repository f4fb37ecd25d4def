use derive_more::Display;

use crate::geometry::{INODES_MAX, INODES_MIN, SIZE_KIB_MAX, SIZE_KIB_MIN, SIZE_KIB_STEP};

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum Error {
    #[display(
        fmt = "--size-kib must be between {} and {} and a multiple of {}, got {}",
        SIZE_KIB_MIN,
        SIZE_KIB_MAX,
        SIZE_KIB_STEP,
        _0
    )]
    InvalidSize(u64),

    #[display(
        fmt = "--inodes must be between {} and {}, got {}",
        INODES_MIN,
        INODES_MAX,
        _0
    )]
    InvalidInodeCount(u64),

    #[display(fmt = "image truncated: need {} bytes, found {}", expected, actual)]
    TruncatedImage { expected: u64, actual: u64 },

    #[display(fmt = "bad magic: {:#010x}", _0)]
    BadMagic(u32),

    #[display(fmt = "corrupt superblock geometry: {}", _0)]
    CorruptGeometry(&'static str),

    #[display(fmt = "file too large: {} bytes, max {} bytes", size, max)]
    FileTooLarge { size: usize, max: usize },

    #[display(fmt = "no free inode available")]
    NoFreeInode,

    #[display(
        fmt = "not enough free data blocks ({} available, {} needed)",
        available,
        needed
    )]
    NotEnoughDataBlocks { available: usize, needed: usize },

    #[display(fmt = "root has no data block")]
    RootHasNoDataBlock,

    #[display(fmt = "no free directory entry in root")]
    NoFreeDirEntry,

    #[display(fmt = "inode {} out of range", _0)]
    InvalidInode(u32),

    #[display(fmt = "checksum mismatch in {} #{}", structure, index)]
    ChecksumMismatch {
        structure: &'static str,
        index: usize,
    },
}

pub type Result<T> = core::result::Result<T, Error>;
