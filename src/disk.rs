use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::superblock::BlockAddress;

/// Sector size of the backing medium. The lowest-level read never assumes any
/// unit larger than this.
pub const SECTOR_SIZE: usize = 512;

/// Something that can read bytes from a sector-addressable medium.
pub trait SectorRead {
    /// Read `len` bytes starting `offset` bytes into the given sector.
    ///
    /// `offset` addresses within one sector and must be below [`SECTOR_SIZE`];
    /// a larger offset is a caller bug, not bad filesystem data, and aborts
    /// the process. Callers holding a block-relative offset go through
    /// [`read_block`], which folds the overflow into the sector number first.
    fn read(&mut self, sector: u64, offset: usize, len: usize) -> Vec<u8>;
}

/// A disk image backed by an ordinary file.
///
/// Every call seeks and reads the file directly; nothing is cached or
/// buffered across calls. I/O is local and assumed reliable, so a failed
/// seek or a short read aborts rather than propagating.
#[derive(Debug)]
pub struct FileDisk {
    file: File,
}

impl FileDisk {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self { file })
    }
}

impl SectorRead for FileDisk {
    fn read(&mut self, sector: u64, offset: usize, len: usize) -> Vec<u8> {
        assert!(
            offset < SECTOR_SIZE,
            "sector byte offset {offset} out of range"
        );

        let position = sector * SECTOR_SIZE as u64 + offset as u64;
        self.file
            .seek(SeekFrom::Start(position))
            .expect("failed to seek in image");

        let mut buf = vec![0; len];
        self.file
            .read_exact(&mut buf)
            .expect("failed to read from image");
        buf
    }
}

/// Read `len` bytes starting `offset` bytes into the given logical filesystem
/// block.
///
/// `block_size` is the filesystem's logical block size, a multiple of
/// [`SECTOR_SIZE`]. Unlike [`SectorRead::read`], `offset` here may exceed one
/// sector (an inode table index, for example, can point thousands of bytes
/// past the table's first block); whole sectors are carried out of the offset
/// and into the sector number before the single sector-domain read is issued.
pub fn read_block<D: SectorRead>(
    disk: &mut D,
    block_size: u32,
    block: BlockAddress,
    offset: usize,
    len: usize,
) -> Vec<u8> {
    assert!(
        block_size as usize % SECTOR_SIZE == 0,
        "block size {block_size} is not a multiple of the sector size"
    );

    let sectors_per_block = u64::from(block_size) / SECTOR_SIZE as u64;
    let sector = u64::from(block.0) * sectors_per_block + (offset / SECTOR_SIZE) as u64;
    disk.read(sector, offset % SECTOR_SIZE, len)
}
