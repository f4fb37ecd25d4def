use super::{get_u32, put_u32};
use crate::DIR_ENTRY_SIZE;
use crate::checksum::xor8;

/// 名字字段的宽度，最后一字节留给 \0
pub const NAME_CAP: usize = 58;
const NAME_MAX_LEN: usize = NAME_CAP - 1;
const CHECKSUM_OFFSET: usize = DIR_ENTRY_SIZE - 1;

/// 文件系统项的元信息，64 字节定长
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// 0 表示空闲槽
    pub inode_no: u32,
    pub kind: u8,
    name: [u8; NAME_CAP],
    /// 前 63 字节的异或
    pub checksum: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DirEntryKind {
    File = 1,
    Directory = 2,
}

impl DirEntry {
    /// 超出 [`NAME_CAP`] - 1 字节的名字会被截断
    pub fn new(name: &[u8], inode_no: u32, kind: DirEntryKind) -> Self {
        let len = name.len().min(NAME_MAX_LEN);
        let mut buf = [0; NAME_CAP];
        buf[..len].copy_from_slice(&name[..len]);

        Self {
            inode_no,
            kind: kind as u8,
            name: buf,
            checksum: 0,
        }
    }

    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().position(|&c| c == 0).unwrap_or(NAME_CAP);
        &self.name[..len]
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.inode_no == 0
    }

    pub fn kind(&self) -> Option<DirEntryKind> {
        match self.kind {
            1 => Some(DirEntryKind::File),
            2 => Some(DirEntryKind::Directory),
            _ => None,
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut name = [0; NAME_CAP];
        name.copy_from_slice(&buf[5..5 + NAME_CAP]);

        Self {
            inode_no: get_u32(buf, 0),
            kind: buf[4],
            name,
            checksum: buf[CHECKSUM_OFFSET],
        }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        put_u32(buf, 0, self.inode_no);
        buf[4] = self.kind;
        buf[5..5 + NAME_CAP].copy_from_slice(&self.name);
        buf[CHECKSUM_OFFSET] = self.checksum;
    }

    /// 只能在其余字段全部确定之后调用
    pub fn finalize_checksum(&mut self) -> u8 {
        let mut buf = [0; DIR_ENTRY_SIZE];
        self.encode(&mut buf);
        self.checksum = xor8(&buf[..CHECKSUM_OFFSET]);
        self.checksum
    }

    pub fn verify(&self) -> bool {
        let mut buf = [0; DIR_ENTRY_SIZE];
        self.encode(&mut buf);
        xor8(&buf[..CHECKSUM_OFFSET]) == self.checksum
    }
}
