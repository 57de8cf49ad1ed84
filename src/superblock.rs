use core::fmt;

use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::inode::Inode;

/// On-disk superblock record.
///
/// See <https://www.nongnu.org/ext2-doc/ext2.html#superblock>. The feature
/// flag words are carried as raw `u32`s; this crate never interprets them.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, FromZeroes, FromBytes, AsBytes)]
pub struct Superblock {
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub reserved_blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    pub first_data_block: BlockAddress,
    pub log_block_size: u32,
    pub log_frag_size: u32,
    pub blocks_per_group: u32,
    pub frags_per_group: u32,
    pub inodes_per_group: u32,
    pub mount_time: u32,
    pub write_time: u32,
    pub mount_count: u16,
    pub max_mount_count: u16,
    pub magic: u16,
    pub state: u16,
    pub errors: u16,
    pub minor_rev_level: u16,
    pub lastcheck: u32,
    pub checkinterval: u32,
    pub creator_os: u32,
    pub rev_level: u32,
    pub def_resuid: u16,
    pub def_resgid: u16,

    // EXT2_DYNAMIC_REV specific
    pub first_ino: u32,
    pub inode_size: u16,
    pub block_group_nr: u16,
    pub feature_compat: u32,
    pub feature_incompat: u32,
    pub feature_ro_compat: u32,
    pub uuid: [u8; 16],
    pub volume_name: [u8; 16],
    pub last_mounted: [u8; 64],
    pub algo_bitmap: u32,
}

impl Superblock {
    /// The superblock always occupies the second kilobyte of the image,
    /// whatever the filesystem's own block size turns out to be. Expressed in
    /// 1 KiB logical blocks, that is block 1.
    pub const BOOTSTRAP_BLOCK_SIZE: u32 = 1024;
    pub const LOCATION: BlockAddress = BlockAddress(1);

    /// 16bit value identifying the file system as ext2, fixed to 0xEF53.
    /// <https://www.nongnu.org/ext2-doc/ext2.html#s-magic>
    pub const MAGIC: u16 = 0xEF53;

    pub fn magic_valid(&self) -> bool {
        self.magic == Self::MAGIC
    }

    /// ```text
    /// block size = 1024 << s_log_block_size;
    /// ```
    pub fn block_size(&self) -> u32 {
        1024 << self.log_block_size
    }

    /// The group descriptor table occupies the block right after the
    /// superblock: block 2 for 1 KiB filesystems, where the superblock is
    /// block 1; block 1 otherwise.
    pub fn descriptor_table_block(&self) -> BlockAddress {
        BlockAddress(self.first_data_block.0 + 1)
    }

    pub fn num_block_groups(&self) -> usize {
        let blocks_count = self.blocks_count as usize;
        let blocks_per_group = self.blocks_per_group as usize;
        blocks_count.div_ceil(blocks_per_group)
    }

    /// Splits a global inode number into the block group holding it and its
    /// index within that group's inode table. Inode numbers are 1-based.
    pub fn inode_location(&self, inode_number: InodeNumber) -> (BlockGroupIndex, LocalInodeIndex) {
        let inode_index = inode_number.0 - 1;
        let group = BlockGroupIndex(inode_index / self.inodes_per_group);
        let local_index = LocalInodeIndex(inode_index % self.inodes_per_group);
        (group, local_index)
    }

    /// Byte size of the file or directory described by `inode`.
    pub fn file_size(&self, inode: &Inode) -> u64 {
        // In revision 0, sizes are 32-bit only.
        if self.rev_level == 0 {
            return u64::from(inode.size_low);
        }

        (u64::from(inode.size_high) << 32) | u64::from(inode.size_low)
    }

    /// Volume label, truncated at the first NUL.
    pub fn volume_label(&self) -> String {
        let bytes = self.volume_name;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }
}

/// Address of a logical block in the filesystem.
#[repr(transparent)]
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, FromZeroes, FromBytes, AsBytes,
)]
pub struct BlockAddress(pub u32);

/// Global, 1-based inode number.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromZeroes, FromBytes, AsBytes)]
pub struct InodeNumber(pub u32);

/// The root directory of the filesystem is always inode 2.
pub const ROOT_DIRECTORY: InodeNumber = InodeNumber(2);

/// An inode's index within one block group's inode table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LocalInodeIndex(pub u32);

/// Index for a given block group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockGroupIndex(pub u32);

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
