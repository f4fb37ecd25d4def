use super::{get_u32, get_u64, put_u32, put_u64};
use crate::checksum::crc32;
use crate::geometry::{DATA_BITMAP_START, INODE_BITMAP_START, INODE_TABLE_START};
use crate::{BLOCK_SIZE, DataBlock, Geometry, MAGIC, ROOT_INODE, VERSION};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 定位其它连续区域
///
/// 独占 0 号块，编码后占 116 字节，块内其余部分为 0。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    pub magic: u32,
    pub version: u32,
    pub block_size: u32,
    /// 文件系统占据块数
    pub total_blocks: u64,
    pub inode_count: u64,
    pub inode_bitmap_start: u64,
    pub inode_bitmap_blocks: u64,
    pub data_bitmap_start: u64,
    pub data_bitmap_blocks: u64,
    pub inode_table_start: u64,
    pub inode_table_blocks: u64,
    pub data_region_start: u64,
    pub data_region_blocks: u64,
    pub root_inode: u64,
    /// 创建时间
    pub mtime_epoch: u64,
    pub flags: u32,
    /// CRC-32，覆盖整块除最后 4 字节外的内容，计算时本字段置 0
    pub checksum: u32,
}

impl SuperBlock {
    /// 编码后的有效长度
    pub const SIZE: usize = 116;
    const CHECKSUM_OFFSET: usize = 112;
    /// 校验覆盖的范围：整块除去最后 4 字节
    const COVERED: usize = BLOCK_SIZE - 4;

    /// 按几何参数填好全部字段，校验值留待 [`SuperBlock::finalize_checksum`]
    pub fn new(geometry: &Geometry, now: u64) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            block_size: BLOCK_SIZE as u32,
            total_blocks: geometry.total_blocks(),
            inode_count: geometry.inode_count(),
            inode_bitmap_start: INODE_BITMAP_START,
            inode_bitmap_blocks: 1,
            data_bitmap_start: DATA_BITMAP_START,
            data_bitmap_blocks: 1,
            inode_table_start: INODE_TABLE_START,
            inode_table_blocks: geometry.inode_table_blocks(),
            data_region_start: geometry.data_region_start(),
            data_region_blocks: geometry.data_region_blocks(),
            root_inode: ROOT_INODE as u64,
            mtime_epoch: now,
            flags: 0,
            checksum: 0,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn decode(block: &[u8]) -> Self {
        Self {
            magic: get_u32(block, 0),
            version: get_u32(block, 4),
            block_size: get_u32(block, 8),
            total_blocks: get_u64(block, 12),
            inode_count: get_u64(block, 20),
            inode_bitmap_start: get_u64(block, 28),
            inode_bitmap_blocks: get_u64(block, 36),
            data_bitmap_start: get_u64(block, 44),
            data_bitmap_blocks: get_u64(block, 52),
            inode_table_start: get_u64(block, 60),
            inode_table_blocks: get_u64(block, 68),
            data_region_start: get_u64(block, 76),
            data_region_blocks: get_u64(block, 84),
            root_inode: get_u64(block, 92),
            mtime_epoch: get_u64(block, 100),
            flags: get_u32(block, 108),
            checksum: get_u32(block, Self::CHECKSUM_OFFSET),
        }
    }

    /// 写入整块：先清零，再逐字段编码
    pub fn encode(&self, block: &mut [u8]) {
        block[..BLOCK_SIZE].fill(0);
        put_u32(block, 0, self.magic);
        put_u32(block, 4, self.version);
        put_u32(block, 8, self.block_size);
        put_u64(block, 12, self.total_blocks);
        put_u64(block, 20, self.inode_count);
        put_u64(block, 28, self.inode_bitmap_start);
        put_u64(block, 36, self.inode_bitmap_blocks);
        put_u64(block, 44, self.data_bitmap_start);
        put_u64(block, 52, self.data_bitmap_blocks);
        put_u64(block, 60, self.inode_table_start);
        put_u64(block, 68, self.inode_table_blocks);
        put_u64(block, 76, self.data_region_start);
        put_u64(block, 84, self.data_region_blocks);
        put_u64(block, 92, self.root_inode);
        put_u64(block, 100, self.mtime_epoch);
        put_u32(block, 108, self.flags);
        put_u32(block, Self::CHECKSUM_OFFSET, self.checksum);
    }

    /// 只能在其余字段全部确定之后调用
    pub fn finalize_checksum(&mut self) -> u32 {
        let mut block: DataBlock = [0; BLOCK_SIZE];
        self.checksum = 0;
        self.encode(&mut block);
        self.checksum = crc32(&block[..Self::COVERED]);
        self.checksum
    }

    /// 按磁盘上的原样内容重新计算校验，与存储值比较
    pub fn verify(block: &[u8]) -> bool {
        let mut copy: DataBlock = [0; BLOCK_SIZE];
        copy.copy_from_slice(&block[..BLOCK_SIZE]);
        let stored = get_u32(&copy, Self::CHECKSUM_OFFSET);
        put_u32(&mut copy, Self::CHECKSUM_OFFSET, 0);
        crc32(&copy[..Self::COVERED]) == stored
    }
}
