//! 磁盘 inode：128 字节定长记录，只有直接索引。
//!
//! 目录的空间用于存放子项的元信息；
//! 文件的空间用于存放它的数据。

use enumflags2::{BitFlags, bitflags};

use super::{get_u16, get_u32, get_u64, put_u16, put_u32, put_u64};
use crate::checksum::crc32;
use crate::{BLOCK_SIZE, DIR_ENTRY_SIZE, DIRECT_COUNT, INODE_SIZE, PROJECT_ID};

/// 校验覆盖 `[0, 120)`，校验字段本身位于 `[120, 128)`
const CHECKSUM_OFFSET: usize = 120;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiskInode {
    /// `st_mode` 的类型字段
    pub file_type: FileType,
    /// `st_mode` 的低 12 位
    pub permissions: BitFlags<Permission>,
    /// 硬链接个数
    pub links: u16,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
    /// 直接索引，存放数据块的绝对块号，0 表示未使用
    pub direct: [u32; DIRECT_COUNT],
    /// 必须为 0
    pub reserved: [u32; 3],
    pub proj_id: u32,
    pub uid16_gid16: u32,
    pub xattr_ptr: u64,
    /// 低 32 位存放 CRC-32，高 32 位为 0
    pub checksum: u64,
}

/// `st_mode` 中文件类型所占的位
pub const S_IFMT: u16 = 0o170000;

/// 文件类型是 `S_IFMT` 内的一个取值，不能按位组合
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// 空槽
    #[default]
    None,
    Directory,
    Regular,
    /// 本格式不会写出的其他类型，原样保留
    Other(u16),
}

impl FileType {
    pub fn from_mode(mode: u16) -> Self {
        match mode & S_IFMT {
            0 => Self::None,
            0o040000 => Self::Directory,
            0o100000 => Self::Regular,
            other => Self::Other(other),
        }
    }

    #[inline]
    pub fn bits(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Directory => 0o040000,
            Self::Regular => 0o100000,
            Self::Other(bits) => bits & S_IFMT,
        }
    }
}

/// 权限位，新建的 inode 不设置任何一位
#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    OtherExec = 0o1,
    OtherWrite = 0o2,
    OtherRead = 0o4,
    GroupExec = 0o10,
    GroupWrite = 0o20,
    GroupRead = 0o40,
    OwnerExec = 0o100,
    OwnerWrite = 0o200,
    OwnerRead = 0o400,
    Sticky = 0o1000,
    SetGid = 0o2000,
    SetUid = 0o4000,
}

impl DiskInode {
    /// 根目录：`.` 与 `..` 两个目录项存放在 `data_block` 中
    pub fn new_root(data_block: u32, now: u64) -> Self {
        let mut direct = [0; DIRECT_COUNT];
        direct[0] = data_block;

        Self {
            file_type: FileType::Directory,
            links: 2,
            size: 2 * DIR_ENTRY_SIZE as u64,
            atime: now,
            mtime: now,
            ctime: now,
            direct,
            proj_id: PROJECT_ID,
            ..Default::default()
        }
    }

    /// 普通文件，`blocks` 为按分配顺序排列的绝对块号
    pub fn new_file(size: u64, blocks: &[u32], now: u64) -> Self {
        let mut direct = [0; DIRECT_COUNT];
        direct[..blocks.len()].copy_from_slice(blocks);

        Self {
            file_type: FileType::Regular,
            links: 1,
            size,
            atime: now,
            mtime: now,
            ctime: now,
            direct,
            proj_id: PROJECT_ID,
            ..Default::default()
        }
    }

    /// 完整的 16 位 `st_mode`
    #[inline]
    pub fn mode(&self) -> u16 {
        self.file_type.bits() | self.permissions.bits()
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// 数据所占的块数
    #[inline]
    pub fn count_data_block(&self) -> usize {
        (self.size as usize).div_ceil(BLOCK_SIZE).min(DIRECT_COUNT)
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mode = get_u16(buf, 0);
        let mut direct = [0; DIRECT_COUNT];
        for (i, block) in direct.iter_mut().enumerate() {
            *block = get_u32(buf, 44 + 4 * i);
        }

        Self {
            file_type: FileType::from_mode(mode),
            permissions: BitFlags::from_bits_truncate(mode),
            links: get_u16(buf, 2),
            uid: get_u32(buf, 4),
            gid: get_u32(buf, 8),
            size: get_u64(buf, 12),
            atime: get_u64(buf, 20),
            mtime: get_u64(buf, 28),
            ctime: get_u64(buf, 36),
            direct,
            reserved: [get_u32(buf, 92), get_u32(buf, 96), get_u32(buf, 100)],
            proj_id: get_u32(buf, 104),
            uid16_gid16: get_u32(buf, 108),
            xattr_ptr: get_u64(buf, 112),
            checksum: get_u64(buf, CHECKSUM_OFFSET),
        }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.mode());
        put_u16(buf, 2, self.links);
        put_u32(buf, 4, self.uid);
        put_u32(buf, 8, self.gid);
        put_u64(buf, 12, self.size);
        put_u64(buf, 20, self.atime);
        put_u64(buf, 28, self.mtime);
        put_u64(buf, 36, self.ctime);
        for (i, &block) in self.direct.iter().enumerate() {
            put_u32(buf, 44 + 4 * i, block);
        }
        for (i, &reserved) in self.reserved.iter().enumerate() {
            put_u32(buf, 92 + 4 * i, reserved);
        }
        put_u32(buf, 104, self.proj_id);
        put_u32(buf, 108, self.uid16_gid16);
        put_u64(buf, 112, self.xattr_ptr);
        put_u64(buf, CHECKSUM_OFFSET, self.checksum);
    }

    /// 只能在其余字段全部确定之后调用
    pub fn finalize_checksum(&mut self) -> u32 {
        let mut buf = [0; INODE_SIZE];
        self.checksum = 0;
        self.encode(&mut buf);
        let crc = crc32(&buf[..CHECKSUM_OFFSET]);
        self.checksum = crc as u64;
        crc
    }

    pub fn verify(&self) -> bool {
        let mut copy = self.clone();
        copy.finalize_checksum();
        copy.checksum == self.checksum
    }
}
