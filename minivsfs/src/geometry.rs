//! 由镜像大小与 inode 数量推导磁盘布局：
//!
//! 超级块 | inode 位图 | 数据块位图 | inode 表 | 数据区

use crate::{BLOCK_SIZE, Error, INODE_SIZE, Result};

pub const SIZE_KIB_MIN: u64 = 180;
pub const SIZE_KIB_MAX: u64 = 4096;
pub const SIZE_KIB_STEP: u64 = 4;
pub const INODES_MIN: u64 = 128;
pub const INODES_MAX: u64 = 512;

pub const INODE_BITMAP_START: u64 = 1;
pub const DATA_BITMAP_START: u64 = 2;
pub const INODE_TABLE_START: u64 = 3;

/// 已校验过的格式化参数及其推导出的各区域位置。
///
/// 字段只读，只能经由 [`Geometry::new`] 得到：
///
/// ```compile_fail
/// let geometry = minivsfs::Geometry {
///     total_blocks: 5,
///     inode_count: 128,
///     inode_table_blocks: 4,
///     data_region_start: 7,
///     data_region_blocks: 0,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    total_blocks: u64,
    inode_count: u64,
    inode_table_blocks: u64,
    data_region_start: u64,
    data_region_blocks: u64,
}

impl Geometry {
    pub fn new(size_kib: u64, inode_count: u64) -> Result<Self> {
        if !(SIZE_KIB_MIN..=SIZE_KIB_MAX).contains(&size_kib) || size_kib % SIZE_KIB_STEP != 0 {
            return Err(Error::InvalidSize(size_kib));
        }
        if !(INODES_MIN..=INODES_MAX).contains(&inode_count) {
            return Err(Error::InvalidInodeCount(inode_count));
        }

        let total_blocks = size_kib * 1024 / BLOCK_SIZE as u64;
        let inode_table_blocks = (inode_count * INODE_SIZE as u64).div_ceil(BLOCK_SIZE as u64);
        let data_region_start = INODE_TABLE_START + inode_table_blocks;

        Ok(Self {
            total_blocks,
            inode_count,
            inode_table_blocks,
            data_region_start,
            data_region_blocks: total_blocks - data_region_start,
        })
    }

    #[inline]
    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    #[inline]
    pub fn inode_count(&self) -> u64 {
        self.inode_count
    }

    #[inline]
    pub fn inode_table_blocks(&self) -> u64 {
        self.inode_table_blocks
    }

    /// 数据区首块的绝对块号
    #[inline]
    pub fn data_region_start(&self) -> u64 {
        self.data_region_start
    }

    #[inline]
    pub fn data_region_blocks(&self) -> u64 {
        self.data_region_blocks
    }

    /// 镜像的字节数
    #[inline]
    pub fn image_len(&self) -> usize {
        self.total_blocks as usize * BLOCK_SIZE
    }
}
