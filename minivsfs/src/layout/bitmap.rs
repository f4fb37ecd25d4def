/// 位图，记录其指示区域（inode 槽或数据块）的分配情况。
///
/// 第 `i` 位位于第 `i / 8` 字节的第 `i % 8` 位（低位在前）。
/// 只有前 `capacity` 位有意义，其后的填充位恒为 0。
#[derive(Debug)]
pub struct Bitmap<T> {
    bits: T,
    /// 位图所指示区域的总数
    capacity: usize,
}

impl<T: AsRef<[u8]>> Bitmap<T> {
    #[inline]
    pub fn new(bits: T, capacity: usize) -> Self {
        debug_assert!(capacity <= bits.as_ref().len() * 8);
        Self { bits, capacity }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_set(&self, index: usize) -> bool {
        self.bits.as_ref()[index / 8] & (1 << (index % 8)) != 0
    }

    /// 首次适配：返回编号最小的空闲位。
    /// 先跳过全满的字节，再在字节内逐位查找，越过 `capacity` 即停止。
    pub fn find_first_free(&self) -> Option<usize> {
        let bytes = self.capacity.div_ceil(8);
        let (byte_index, &byte) = self.bits.as_ref()[..bytes]
            .iter()
            .enumerate()
            .find(|&(_, &byte)| byte != u8::MAX)?;

        let index = byte_index * 8 + byte.trailing_ones() as usize;
        (index < self.capacity).then_some(index)
    }

    /// 按编号升序列出所有空闲位
    pub fn free_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.capacity).filter(|&index| !self.is_set(index))
    }

    pub fn count_free(&self) -> usize {
        self.free_indices().count()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Bitmap<T> {
    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.capacity);
        self.bits.as_mut()[index / 8] |= 1 << (index % 8);
    }
}
