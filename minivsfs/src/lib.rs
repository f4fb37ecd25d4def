#![no_std]

extern crate alloc;

/* minivsfs 的整体架构，自上而下 */

// 镜像层：格式化新镜像、向已有镜像添加文件
mod vsfs;

// 布局推导：镜像大小与 inode 数量 -> 各区域的块号
mod geometry;

// 磁盘数据结构层：超级块、inode、目录项与位图的字节编码
pub mod layout;

// 校验层：CRC-32 与异或校验
pub mod checksum;

mod error;

pub use self::{
    error::{Error, Result},
    geometry::Geometry,
    layout::{Bitmap, DirEntry, DirEntryKind, DiskInode, FileType, Permission, SuperBlock},
    vsfs::{AddedFile, MiniVsfs},
};

pub const MAGIC: u32 = 0x4D56_5346;
pub const VERSION: u32 = 1;
pub const BLOCK_SIZE: usize = 4096;
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;

pub const INODE_SIZE: usize = 128;
pub const DIR_ENTRY_SIZE: usize = 64;
/// 每个 inode 的直接索引数量，不存在间接索引
pub const DIRECT_COUNT: usize = 12;
/// 单个文件的最大字节数
pub const MAX_FILE_SIZE: usize = DIRECT_COUNT * BLOCK_SIZE;

/// 根目录的 inode 编号，位于 inode 表的 0 号槽
pub const ROOT_INODE: u32 = 1;
pub const PROJECT_ID: u32 = 8;

type DataBlock = [u8; BLOCK_SIZE];
