//! Read-only interpreter for ext2 filesystem images.
//!
//! Given a raw image file, this crate can resolve slash-separated paths to
//! inodes, enumerate directories, and materialize file contents through the
//! direct/single-indirect/double-indirect block pointer chain. There is no
//! mount, no write path, and no journal handling; the intended use is offline
//! inspection of an image.
//!
//! # Resources
//!
//! - <https://wiki.osdev.org/Ext2>
//! - <https://www.nongnu.org/ext2-doc/ext2.html>
//! - <https://en.wikipedia.org/wiki/Ext2>

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod block_group;
pub mod directory;
pub mod disk;
pub mod inode;
pub mod reader;
pub mod superblock;

pub use block_group::*;
pub use directory::*;
pub use disk::*;
pub use inode::*;
pub use reader::*;
pub use superblock::*;
