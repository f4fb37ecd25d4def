//! # 镜像层
//!
//! 整个镜像以一份内存副本的形式存在：格式化时从零构建，
//! 添加文件时先完成全部检查，再一次性修改副本。
//! 写回磁盘由调用方负责，本层不做任何 I/O。

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use crate::layout::*;
use crate::{
    BLOCK_BITS, BLOCK_SIZE, DIR_ENTRY_SIZE, Error, Geometry, INODE_SIZE, MAX_FILE_SIZE,
    ROOT_INODE, Result,
};

const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

#[derive(Debug, Clone)]
pub struct MiniVsfs {
    image: Vec<u8>,
    super_block: SuperBlock,
}

/// 一次成功添加的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedFile {
    pub inode_no: u32,
    /// 占用的数据块数
    pub blocks: usize,
}

impl MiniVsfs {
    /// 构建一个只含根目录的全新镜像
    pub fn format(geometry: &Geometry, now: u64) -> Self {
        let mut fs = Self {
            image: vec![0; geometry.image_len()],
            super_block: SuperBlock::new(geometry, now),
        };
        log::debug!("format: {geometry:?}");

        // 根目录占用数据区的第一块
        let root_block = fs.super_block.data_region_start as u32;
        let mut root = DiskInode::new_root(root_block, now);
        root.finalize_checksum();
        fs.write_inode_slot(0, &root);

        fs.inode_bitmap_mut().set(0);
        fs.data_bitmap_mut().set(0);

        for (slot, name) in [&b"."[..], &b".."[..]].into_iter().enumerate() {
            let mut dir_entry = DirEntry::new(name, ROOT_INODE, DirEntryKind::Directory);
            dir_entry.finalize_checksum();
            fs.write_dir_entry(root_block, slot, &dir_entry);
        }

        // 超级块的校验必须最后计算
        fs.flush_super_block();

        log::info!(
            "formatted {} blocks, {} inodes, data region {}+{}",
            geometry.total_blocks(),
            geometry.inode_count(),
            geometry.data_region_start(),
            geometry.data_region_blocks()
        );
        fs
    }

    /// 载入已有镜像，只检查魔数与各区域是否落在镜像之内。
    ///
    /// 超级块中存储的校验值不在此处强制，见 [`MiniVsfs::verify_checksums`]。
    pub fn open(mut image: Vec<u8>) -> Result<Self> {
        if image.len() < BLOCK_SIZE {
            return Err(Error::TruncatedImage {
                expected: BLOCK_SIZE as u64,
                actual: image.len() as u64,
            });
        }

        let super_block = SuperBlock::decode(&image[..BLOCK_SIZE]);
        if !super_block.is_valid() {
            return Err(Error::BadMagic(super_block.magic));
        }

        let expected = super_block
            .total_blocks
            .checked_mul(BLOCK_SIZE as u64)
            .ok_or(Error::CorruptGeometry("total block count overflows"))?;
        if (image.len() as u64) < expected {
            return Err(Error::TruncatedImage {
                expected,
                actual: image.len() as u64,
            });
        }
        check_geometry(&super_block)?;

        // 只保留超级块所描述的部分
        image.truncate(expected as usize);
        log::debug!("open: {super_block:?}");

        Ok(Self { image, super_block })
    }

    /// 向根目录添加一个文件。
    ///
    /// 所有可能失败的检查都先于任何修改完成，失败时镜像保持原样。
    pub fn add_file(&mut self, name: &[u8], data: &[u8], now: u64) -> Result<AddedFile> {
        if data.len() > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge {
                size: data.len(),
                max: MAX_FILE_SIZE,
            });
        }

        let slot = self
            .inode_bitmap()
            .find_first_free()
            .ok_or(Error::NoFreeInode)?;
        let inode_no = slot as u32 + 1;

        // 空文件也占一块
        let needed = data.len().div_ceil(BLOCK_SIZE).max(1);
        let free_blocks: Vec<usize> = self.data_bitmap().free_indices().take(needed).collect();
        if free_blocks.len() < needed {
            return Err(Error::NotEnoughDataBlocks {
                available: self.data_bitmap().count_free(),
                needed,
            });
        }

        let mut root = self.read_inode_slot(0);
        let root_block = root.direct[0];
        if root_block == 0 {
            return Err(Error::RootHasNoDataBlock);
        }
        if root_block as u64 >= self.super_block.total_blocks {
            return Err(Error::CorruptGeometry("root data block out of range"));
        }
        let dir_slot = self
            .find_free_dir_slot(root_block)
            .ok_or(Error::NoFreeDirEntry)?;

        log::debug!(
            "add: inode #{inode_no} (slot {slot}), data blocks {free_blocks:?}, dirent slot {dir_slot}"
        );

        /******************** 提交 ********************/
        let data_region_start = self.super_block.data_region_start;
        let blocks: Vec<u32> = free_blocks
            .iter()
            .map(|&index| (data_region_start + index as u64) as u32)
            .collect();

        for (i, &block) in blocks.iter().enumerate() {
            let start = i * BLOCK_SIZE;
            let end = (start + BLOCK_SIZE).min(data.len());
            let src = &data[start..end];
            let dest = self.block_mut(block as u64);
            dest[..src.len()].copy_from_slice(src);
            dest[src.len()..].fill(0);
        }

        let mut data_bitmap = self.data_bitmap_mut();
        for &index in &free_blocks {
            data_bitmap.set(index);
        }
        self.inode_bitmap_mut().set(slot);

        let mut inode = DiskInode::new_file(data.len() as u64, &blocks, now);
        inode.finalize_checksum();
        self.write_inode_slot(slot, &inode);

        let mut dir_entry = DirEntry::new(name, inode_no, DirEntryKind::File);
        dir_entry.finalize_checksum();
        self.write_dir_entry(root_block, dir_slot, &dir_entry);

        root.size += DIR_ENTRY_SIZE as u64;
        root.links += 1;
        root.mtime = now;
        root.ctime = now;
        root.finalize_checksum();
        self.write_inode_slot(0, &root);

        self.flush_super_block();
        /******************** END ********************/

        log::info!("added inode #{inode_no} using {needed} blocks");
        Ok(AddedFile {
            inode_no,
            blocks: needed,
        })
    }

    #[inline]
    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.image
    }

    #[inline]
    pub fn into_image(self) -> Vec<u8> {
        self.image
    }

    /// 通过 inode 编号（从 1 开始）读出 inode
    pub fn inode(&self, inode_no: u32) -> Result<DiskInode> {
        if inode_no == 0 || inode_no as u64 > self.super_block.inode_count {
            return Err(Error::InvalidInode(inode_no));
        }
        Ok(self.read_inode_slot(inode_no as usize - 1))
    }

    /// 根目录首块中所有在用的目录项，按槽位顺序
    pub fn root_entries(&self) -> Vec<DirEntry> {
        let root_block = self.read_inode_slot(0).direct[0];
        if root_block == 0 || root_block as u64 >= self.super_block.total_blocks {
            return Vec::new();
        }

        (0..DIR_ENTRIES_PER_BLOCK)
            .map(|slot| self.read_dir_entry(root_block, slot))
            .filter(|dir_entry| !dir_entry.is_free())
            .collect()
    }

    /// 按直接索引依次读出文件内容，截断到 inode 记录的大小
    pub fn read_file(&self, inode: &DiskInode) -> Vec<u8> {
        let mut data = Vec::with_capacity(inode.count_data_block() * BLOCK_SIZE);
        for &block in &inode.direct[..inode.count_data_block()] {
            if block == 0 || block as u64 >= self.super_block.total_blocks {
                break;
            }
            data.extend_from_slice(self.block(block as u64));
        }
        data.truncate(inode.size as usize);
        data
    }

    /// 检查超级块、所有已分配 inode 及根目录在用目录项的校验值
    pub fn verify_checksums(&self) -> Result<()> {
        if !SuperBlock::verify(self.block(0)) {
            return Err(Error::ChecksumMismatch {
                structure: "superblock",
                index: 0,
            });
        }

        let inode_bitmap = self.inode_bitmap();
        for slot in (0..inode_bitmap.capacity()).filter(|&slot| inode_bitmap.is_set(slot)) {
            if !self.read_inode_slot(slot).verify() {
                return Err(Error::ChecksumMismatch {
                    structure: "inode",
                    index: slot + 1,
                });
            }
        }

        let root_block = self.read_inode_slot(0).direct[0];
        if root_block != 0 && (root_block as u64) < self.super_block.total_blocks {
            for slot in 0..DIR_ENTRIES_PER_BLOCK {
                let dir_entry = self.read_dir_entry(root_block, slot);
                if !dir_entry.is_free() && !dir_entry.verify() {
                    return Err(Error::ChecksumMismatch {
                        structure: "dir entry",
                        index: slot,
                    });
                }
            }
        }

        Ok(())
    }

    /* 以下为块级读写 */

    #[inline]
    fn block_range(block: u64) -> Range<usize> {
        let start = block as usize * BLOCK_SIZE;
        start..start + BLOCK_SIZE
    }

    #[inline]
    fn block(&self, block: u64) -> &[u8] {
        &self.image[Self::block_range(block)]
    }

    #[inline]
    fn block_mut(&mut self, block: u64) -> &mut [u8] {
        &mut self.image[Self::block_range(block)]
    }

    #[inline]
    fn region(start: u64, blocks: u64) -> Range<usize> {
        let start = start as usize * BLOCK_SIZE;
        start..start + blocks as usize * BLOCK_SIZE
    }

    fn inode_bitmap(&self) -> Bitmap<&[u8]> {
        let sb = &self.super_block;
        let range = Self::region(sb.inode_bitmap_start, sb.inode_bitmap_blocks);
        Bitmap::new(&self.image[range], sb.inode_count as usize)
    }

    fn inode_bitmap_mut(&mut self) -> Bitmap<&mut [u8]> {
        let sb = &self.super_block;
        let range = Self::region(sb.inode_bitmap_start, sb.inode_bitmap_blocks);
        let capacity = sb.inode_count as usize;
        Bitmap::new(&mut self.image[range], capacity)
    }

    fn data_bitmap(&self) -> Bitmap<&[u8]> {
        let sb = &self.super_block;
        let range = Self::region(sb.data_bitmap_start, sb.data_bitmap_blocks);
        Bitmap::new(&self.image[range], sb.data_region_blocks as usize)
    }

    fn data_bitmap_mut(&mut self) -> Bitmap<&mut [u8]> {
        let sb = &self.super_block;
        let range = Self::region(sb.data_bitmap_start, sb.data_bitmap_blocks);
        let capacity = sb.data_region_blocks as usize;
        Bitmap::new(&mut self.image[range], capacity)
    }

    /// inode 槽在镜像中的字节偏移
    #[inline]
    fn disk_inode_pos(&self, slot: usize) -> usize {
        self.super_block.inode_table_start as usize * BLOCK_SIZE + slot * INODE_SIZE
    }

    fn read_inode_slot(&self, slot: usize) -> DiskInode {
        let pos = self.disk_inode_pos(slot);
        DiskInode::decode(&self.image[pos..pos + INODE_SIZE])
    }

    fn write_inode_slot(&mut self, slot: usize, inode: &DiskInode) {
        let pos = self.disk_inode_pos(slot);
        inode.encode(&mut self.image[pos..pos + INODE_SIZE]);
    }

    #[inline]
    fn dir_entry_pos(block: u32, slot: usize) -> usize {
        block as usize * BLOCK_SIZE + slot * DIR_ENTRY_SIZE
    }

    fn read_dir_entry(&self, block: u32, slot: usize) -> DirEntry {
        let pos = Self::dir_entry_pos(block, slot);
        DirEntry::decode(&self.image[pos..pos + DIR_ENTRY_SIZE])
    }

    fn write_dir_entry(&mut self, block: u32, slot: usize, dir_entry: &DirEntry) {
        let pos = Self::dir_entry_pos(block, slot);
        dir_entry.encode(&mut self.image[pos..pos + DIR_ENTRY_SIZE]);
    }

    fn find_free_dir_slot(&self, block: u32) -> Option<usize> {
        (0..DIR_ENTRIES_PER_BLOCK).find(|&slot| self.read_dir_entry(block, slot).is_free())
    }

    /// 重新计算超级块校验并写回 0 号块
    fn flush_super_block(&mut self) {
        self.super_block.finalize_checksum();
        let super_block = self.super_block.clone();
        super_block.encode(self.block_mut(0));
    }
}

/// 各区域必须落在镜像之内，位图与 inode 表必须容得下其记录的数量
fn check_geometry(sb: &SuperBlock) -> Result<()> {
    let regions = [
        (sb.inode_bitmap_start, sb.inode_bitmap_blocks, "inode bitmap"),
        (sb.data_bitmap_start, sb.data_bitmap_blocks, "data bitmap"),
        (sb.inode_table_start, sb.inode_table_blocks, "inode table"),
        (sb.data_region_start, sb.data_region_blocks, "data region"),
    ];
    for (start, blocks, name) in regions {
        let in_bounds = start >= 1
            && blocks >= 1
            && start
                .checked_add(blocks)
                .is_some_and(|end| end <= sb.total_blocks);
        if !in_bounds {
            log::debug!("{name} [{start}, +{blocks}) outside {} blocks", sb.total_blocks);
            return Err(Error::CorruptGeometry("region outside image"));
        }
    }

    if sb.total_blocks > u32::MAX as u64 {
        return Err(Error::CorruptGeometry("block numbers exceed 32 bits"));
    }
    if sb.inode_count == 0 || sb.inode_count > sb.inode_bitmap_blocks * BLOCK_BITS as u64 {
        return Err(Error::CorruptGeometry("inode bitmap too small"));
    }
    if sb.inode_count * INODE_SIZE as u64 > sb.inode_table_blocks * BLOCK_SIZE as u64 {
        return Err(Error::CorruptGeometry("inode table too small"));
    }
    if sb.data_region_blocks > sb.data_bitmap_blocks * BLOCK_BITS as u64 {
        return Err(Error::CorruptGeometry("data bitmap too small"));
    }

    Ok(())
}
