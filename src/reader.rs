use std::cmp::min;
use std::mem;

use zerocopy::FromBytes;

use crate::block_group::{BlockBitmap, BlockGroupDescriptor};
use crate::directory::{DirectoryEntry, DirectoryEntryHeader};
use crate::disk::{read_block, SectorRead};
use crate::inode::{Inode, DIRECT_BLOCK_COUNT};
use crate::superblock::{BlockAddress, InodeNumber, Superblock, ROOT_DIRECTORY};

/// In-memory handle on an ext2 image: the superblock and group descriptor
/// table, bootstrapped once, plus the disk they came from. Everything else
/// is read on demand and nothing is cached across calls.
#[derive(Debug)]
pub struct FilesystemReader<D> {
    superblock: Superblock,
    group_descriptors: Vec<BlockGroupDescriptor>,
    disk: D,
}

impl<D: SectorRead> FilesystemReader<D> {
    /// Bootstraps the filesystem: superblock from its fixed location, then
    /// one block's worth of group descriptors from the block after it.
    /// Returns `None` if the image does not carry the ext2 magic.
    pub fn load(mut disk: D) -> Option<Self> {
        let buf = read_block(
            &mut disk,
            Superblock::BOOTSTRAP_BLOCK_SIZE,
            Superblock::LOCATION,
            0,
            mem::size_of::<Superblock>(),
        );
        let superblock = Superblock::read_from(buf.as_slice())?;
        if !superblock.magic_valid() {
            let magic = superblock.magic;
            log::error!("no ext2 superblock found; magic value was {magic:#06x}");
            return None;
        }
        assert!(
            superblock.inodes_per_group > 0 && superblock.blocks_per_group > 0,
            "superblock declares an empty block group"
        );

        let block_size = superblock.block_size();
        let table = read_block(
            &mut disk,
            block_size,
            superblock.descriptor_table_block(),
            0,
            block_size as usize,
        );

        let descriptor_size = mem::size_of::<BlockGroupDescriptor>();
        let groups = superblock.num_block_groups();
        let capacity = block_size as usize / descriptor_size;
        if groups > capacity {
            log::warn!(
                "descriptor table spans more than one block; \
                 only the first {capacity} of {groups} groups are addressable"
            );
        }
        let group_descriptors: Vec<BlockGroupDescriptor> = table
            .chunks_exact(descriptor_size)
            .take(min(groups, capacity))
            .map(|chunk| {
                BlockGroupDescriptor::read_from(chunk)
                    .expect("descriptor chunk width matches the record")
            })
            .collect();

        log::debug!(
            "loaded superblock: volume {:?}, block size {block_size}, {groups} block group(s)",
            superblock.volume_label()
        );

        Some(Self {
            superblock,
            group_descriptors,
            disk,
        })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn read_root(&mut self) -> Inode {
        self.read_inode(ROOT_DIRECTORY)
            .expect("could not read the root directory inode")
    }

    /// Resolves an inode number to a copy of its on-disk record.
    ///
    /// Returns `None` for inode number 0, numbers past the filesystem's
    /// inode count, and group indices past the descriptor table, rather than
    /// reading whatever bytes the out-of-range arithmetic would land on.
    pub fn read_inode(&mut self, inode_number: InodeNumber) -> Option<Inode> {
        if inode_number.0 == 0 || inode_number.0 > self.superblock.inodes_count {
            log::warn!("inode number {inode_number} is outside the filesystem");
            return None;
        }

        let (group, local_index) = self.superblock.inode_location(inode_number);
        let descriptor = *self.group_descriptors.get(group.0 as usize)?;
        let offset = local_index.0 as usize * mem::size_of::<Inode>();
        let buf = self.read_fs_block(descriptor.inode_table, offset, mem::size_of::<Inode>());
        Inode::read_from(buf.as_slice())
    }

    /// Walks a directory inode's entries in on-disk order, calling `func`
    /// for each one until it returns `false` or the directory ends.
    ///
    /// Loop invariant: the block bound is checked at loop entry and one
    /// probe header is read per iteration, so the final used block is still
    /// read and enumeration ends through the zero-inode terminator record
    /// rather than the bound. `Inode::blocks` counts 512-byte units, which
    /// makes the bound loose; the terminator is what actually stops the walk
    /// on a well-formed directory.
    pub fn walk_directory<F>(&mut self, inode: &Inode, mut func: F)
    where
        F: FnMut(DirectoryEntry) -> bool,
    {
        assert!(inode.is_dir(), "walked an inode that is not a directory");

        let block_size = self.superblock.block_size() as usize;
        let header_size = mem::size_of::<DirectoryEntryHeader>();
        let declared_blocks = inode.blocks as usize;
        let direct = inode.direct_blocks;

        let mut block_index = 0;
        let mut offset = 0;
        while block_index < declared_blocks {
            // Directories never spill into indirect blocks; a zero pointer
            // means the entry chain ended at a block boundary.
            let Some(block) = direct.get(block_index) else {
                break;
            };
            if block.0 == 0 {
                break;
            }

            let probe = self.read_fs_block(block, offset, header_size);
            let Some(header) = DirectoryEntryHeader::read_from(probe.as_slice()) else {
                break;
            };
            if header.inode.0 == 0 {
                // Terminator record padding out the rest of the block.
                break;
            }
            let rec_len = header.rec_len;
            if (rec_len as usize) < header_size {
                log::error!(
                    "corrupt record length {rec_len} in directory block {}",
                    block.0
                );
                break;
            }

            let record = self.read_fs_block(block, offset, header_size + header.name_len as usize);
            if let Some(entry) = DirectoryEntry::from_record(&record) {
                if !func(entry) {
                    return;
                }
            }

            offset += rec_len as usize;
            if offset >= block_size {
                offset = 0;
                block_index += 1;
            }
        }
    }

    /// All entries of the directory, sorted by byte-wise name comparison
    /// (ties keep on-disk order), each paired with its resolved inode.
    pub fn list_directory(&mut self, inode: &Inode) -> Vec<(DirectoryEntry, Inode)> {
        let mut entries = Vec::new();
        self.walk_directory(inode, |entry| {
            entries.push(entry);
            true
        });
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut listing = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(entry_inode) = self.read_inode(entry.inode) else {
                log::warn!(
                    "directory entry {:?} points at unreadable inode {}",
                    entry.name_lossy(),
                    entry.inode
                );
                continue;
            };
            listing.push((entry, entry_inode));
        }
        listing
    }

    /// Finds `name` in the directory: the same walk as enumeration, without
    /// sorting, first match wins. Matching is exact length-and-content byte
    /// equality.
    pub fn lookup(&mut self, directory: &Inode, name: &[u8]) -> Option<Inode> {
        let mut found = None;
        self.walk_directory(directory, |entry| {
            if entry.name == name {
                found = Some(entry.inode);
                false
            } else {
                true
            }
        });
        self.read_inode(found?)
    }

    /// Resolves a slash-separated path from the root directory. Empty
    /// segments are skipped, so `/`, `//a`, and `a/` behave as expected. A
    /// missing segment or a non-directory in the middle of the path is
    /// terminal; there is no backtracking.
    pub fn resolve_path(&mut self, path: &str) -> Option<Inode> {
        let mut inode = self.read_root();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            if !inode.is_dir() {
                return None;
            }
            inode = self.lookup(&inode, segment.as_bytes())?;
        }
        Some(inode)
    }

    /// Streams the file's bytes through `func` in chunks of at most one
    /// block, walking the direct pointers, then the singly-indirect block,
    /// then the doubly-indirect block. Exactly the declared file size is
    /// emitted: the byte budget clamps the final chunk mid-block.
    pub fn iter_file_blocks<F>(&mut self, inode: &Inode, mut func: F)
    where
        F: FnMut(&[u8]),
    {
        let block_size = self.superblock.block_size() as usize;
        let mut remaining = self.superblock.file_size(inode);

        let direct = inode.direct_blocks;
        for slot in 0..DIRECT_BLOCK_COUNT {
            if remaining == 0 {
                return;
            }
            self.emit_data_block(direct.0[slot], block_size, &mut remaining, &mut func);
        }

        if remaining > 0 {
            let single = inode.singly_indirect_block;
            self.emit_indirect_block(single, block_size, &mut remaining, &mut func);
        }

        if remaining > 0 {
            let double = inode.doubly_indirect_block;
            for pointer in self.read_pointer_block(double, block_size) {
                if remaining == 0 {
                    break;
                }
                self.emit_indirect_block(pointer, block_size, &mut remaining, &mut func);
            }
        }

        if remaining > 0 {
            log::warn!(
                "file extends into the triply-indirect block, which is not \
                 supported; output is {remaining} bytes short"
            );
        }
    }

    /// Materializes the whole file in memory.
    pub fn read_file(&mut self, inode: &Inode) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.superblock.file_size(inode) as usize);
        self.iter_file_blocks(inode, |chunk| data.extend_from_slice(chunk));
        data
    }

    /// Whether the block is marked allocated in its group's block bitmap.
    pub fn block_is_used(&mut self, block: BlockAddress) -> Option<bool> {
        let group = block.0 / self.superblock.blocks_per_group;
        let index = block.0 % self.superblock.blocks_per_group;
        let descriptor = *self.group_descriptors.get(group as usize)?;
        let block_size = self.superblock.block_size() as usize;
        let bitmap = self.read_fs_block(descriptor.block_bitmap, 0, block_size);
        BlockBitmap(&bitmap).is_used(index)
    }

    /// Expands one indirect block: each pointer in it names a data block.
    fn emit_indirect_block<F>(
        &mut self,
        block: BlockAddress,
        block_size: usize,
        remaining: &mut u64,
        func: &mut F,
    ) where
        F: FnMut(&[u8]),
    {
        for pointer in self.read_pointer_block(block, block_size) {
            if *remaining == 0 {
                return;
            }
            self.emit_data_block(pointer, block_size, remaining, func);
        }
    }

    /// Emits one data block's bytes, clamped to the remaining budget. A zero
    /// pointer is an unallocated hole; its span is emitted as zero bytes.
    fn emit_data_block<F>(
        &mut self,
        block: BlockAddress,
        block_size: usize,
        remaining: &mut u64,
        func: &mut F,
    ) where
        F: FnMut(&[u8]),
    {
        let take = min(*remaining, block_size as u64) as usize;
        if block.0 == 0 {
            log::warn!("unallocated block inside a file; emitting {take} zero bytes");
            func(&vec![0; take]);
        } else {
            let buf = self.read_fs_block(block, 0, take);
            func(&buf);
        }
        *remaining -= take as u64;
    }

    /// Reads an indirect block as an array of little-endian block pointers.
    /// A zero indirect pointer expands to a block's worth of holes.
    fn read_pointer_block(&mut self, block: BlockAddress, block_size: usize) -> Vec<BlockAddress> {
        let pointer_size = mem::size_of::<BlockAddress>();
        if block.0 == 0 {
            return vec![BlockAddress(0); block_size / pointer_size];
        }
        let buf = self.read_fs_block(block, 0, block_size);
        buf.chunks_exact(pointer_size)
            .map(|chunk| {
                let word = chunk.try_into().expect("chunk width matches the pointer");
                BlockAddress(u32::from_le_bytes(word))
            })
            .collect()
    }

    fn read_fs_block(&mut self, block: BlockAddress, offset: usize, len: usize) -> Vec<u8> {
        read_block(
            &mut self.disk,
            self.superblock.block_size(),
            block,
            offset,
            len,
        )
    }
}
