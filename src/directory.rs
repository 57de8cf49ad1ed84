use std::borrow::Cow;

use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::superblock::InodeNumber;

/// Fixed 8-byte header of an on-disk directory record. The record's name
/// bytes follow immediately, `name_len` of them, not NUL-terminated; the
/// record as a whole spans `rec_len` bytes, which locates the next record.
///
/// See <https://www.nongnu.org/ext2-doc/ext2.html#linked-directory-entry-structure>
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, FromZeroes, FromBytes, AsBytes)]
pub struct DirectoryEntryHeader {
    pub inode: InodeNumber,
    pub rec_len: u16,
    pub name_len: u8,
    pub file_type: u8,
}

/// An owned directory entry, detached from the block it was read out of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub inode: InodeNumber,
    /// Length-delimited name bytes; not guaranteed to be UTF-8.
    pub name: Vec<u8>,
}

impl DirectoryEntry {
    /// Builds an entry from a full record: the 8-byte header plus at least
    /// `name_len` name bytes.
    pub fn from_record(record: &[u8]) -> Option<Self> {
        let header = DirectoryEntryHeader::read_from_prefix(record)?;
        let name_start = core::mem::size_of::<DirectoryEntryHeader>();
        let name_end = name_start + header.name_len as usize;
        let name = record.get(name_start..name_end)?.to_vec();
        Some(Self {
            inode: header.inode,
            name,
        })
    }

    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}
