use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ext2_reader::{FileDisk, FilesystemReader, Inode, SectorRead};

/// Offline ext2 image inspector: list a directory inside the image, or dump
/// a file's contents byte-for-byte.
#[derive(Parser)]
#[command(name = "ext2reader")]
struct Args {
    /// Print the contents of the file at PATH instead of listing a directory
    #[arg(short = 'l', requires = "path")]
    print_file: bool,

    /// Path to the ext2 image
    image: PathBuf,

    /// Slash-separated path inside the image; the root directory if omitted
    path: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let disk = match FileDisk::open(&args.image) {
        Ok(disk) => disk,
        Err(err) => {
            eprintln!("Cannot open {}: {err}", args.image.display());
            return ExitCode::FAILURE;
        }
    };
    let Some(mut reader) = FilesystemReader::load(disk) else {
        eprintln!("{} is not an ext2 image", args.image.display());
        return ExitCode::FAILURE;
    };

    // A path that cannot be resolved is reported, not fatal.
    let path = args.path.as_deref().unwrap_or("/");
    let Some(inode) = reader.resolve_path(path) else {
        eprintln!("{path} does not exist!");
        return ExitCode::SUCCESS;
    };

    if args.print_file {
        print_file(&mut reader, &inode, path)
    } else {
        list_directory(&mut reader, &inode, path)
    }
}

fn print_file<D: SectorRead>(
    reader: &mut FilesystemReader<D>,
    inode: &Inode,
    path: &str,
) -> ExitCode {
    if !inode.is_regular_file() {
        eprintln!("{path} is not a regular file!");
        return ExitCode::SUCCESS;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    reader.iter_file_blocks(inode, |chunk| {
        out.write_all(chunk).expect("failed to write to stdout");
    });
    ExitCode::SUCCESS
}

fn list_directory<D: SectorRead>(
    reader: &mut FilesystemReader<D>,
    inode: &Inode,
    path: &str,
) -> ExitCode {
    if !inode.is_dir() {
        eprintln!("{path} is not a directory!");
        return ExitCode::SUCCESS;
    }

    println!("{}", "-".repeat(40));
    println!("{:<20}{:<15}{:<5}", "Name", "Size", "Type");
    println!("{}", "-".repeat(40));
    for (entry, entry_inode) in reader.list_directory(inode) {
        // Directories list as size 0; anything that is neither a directory
        // nor a regular file gets a "?" tag.
        let (size, tag) = if entry_inode.is_dir() {
            (0, "D")
        } else if entry_inode.is_regular_file() {
            (reader.superblock().file_size(&entry_inode), "F")
        } else {
            (0, "?")
        };
        println!("{:<20}{size:<15}{tag:<5}", entry.name_lossy());
    }
    ExitCode::SUCCESS
}
