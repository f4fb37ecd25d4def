use std::fs;
use std::path::PathBuf;

use clap::Parser;
use minivsfs::{BLOCK_SIZE, MAX_FILE_SIZE, MiniVsfs};

use crate::{Error, add_file_to_image, format_image, parse_args_from, usage_exit_status};

const NOW: u64 = 1_700_000_000;

/// 每个测试独占的临时目录
struct Scratch(PathBuf);

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("minivsfs-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

#[test]
fn format_writes_whole_image() {
    let scratch = Scratch::new("format");
    let image = scratch.path("fs.img");

    let geometry = format_image(&image, 1024, 256, NOW).unwrap();
    let bytes = fs::read(&image).unwrap();
    assert_eq!(bytes.len(), geometry.image_len());
    assert_eq!(bytes.len(), 1024 * 1024);

    let vsfs = MiniVsfs::open(bytes).unwrap();
    vsfs.verify_checksums().unwrap();
}

#[test]
fn format_rejects_bad_arguments_before_io() {
    let scratch = Scratch::new("format-bad");
    let image = scratch.path("fs.img");

    assert!(matches!(
        format_image(&image, 181, 128, NOW),
        Err(Error::Fs(minivsfs::Error::InvalidSize(181)))
    ));
    assert!(matches!(
        format_image(&image, 180, 1024, NOW),
        Err(Error::Fs(minivsfs::Error::InvalidInodeCount(1024)))
    ));
    assert!(!image.exists());
}

#[test]
fn add_strips_host_directories() {
    let scratch = Scratch::new("add");
    let image = scratch.path("fs.img");
    let out = scratch.path("out.img");
    fs::create_dir_all(scratch.path("nested/dir")).unwrap();
    let host = scratch.path("nested/dir/hello.txt");
    fs::write(&host, b"hello, world").unwrap();

    format_image(&image, 180, 128, NOW).unwrap();
    let added = add_file_to_image(&image, &out, &host, NOW).unwrap();
    assert_eq!(added.inode_no, 2);
    assert_eq!(added.blocks, 1);

    let vsfs = MiniVsfs::open(fs::read(&out).unwrap()).unwrap();
    vsfs.verify_checksums().unwrap();
    let entries = vsfs.root_entries();
    assert_eq!(entries[2].name(), b"hello.txt");
    let inode = vsfs.inode(entries[2].inode_no).unwrap();
    assert_eq!(vsfs.read_file(&inode), b"hello, world");

    // 输入镜像保持原样
    assert_eq!(fs::metadata(&image).unwrap().len(), 45 * BLOCK_SIZE as u64);
    assert_eq!(MiniVsfs::open(fs::read(&image).unwrap()).unwrap().root_entries().len(), 2);
}

#[cfg(unix)]
#[test]
fn entry_name_keeps_raw_bytes() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let scratch = Scratch::new("raw-name");
    let image = scratch.path("fs.img");
    let host = scratch.0.join(OsStr::from_bytes(b"caf\xe9.txt"));
    fs::write(&host, b"latin-1").unwrap();

    format_image(&image, 180, 128, NOW).unwrap();
    add_file_to_image(&image, &image, &host, NOW).unwrap();

    let vsfs = MiniVsfs::open(fs::read(&image).unwrap()).unwrap();
    vsfs.verify_checksums().unwrap();
    assert_eq!(vsfs.root_entries()[2].name(), b"caf\xe9.txt");
}

#[test]
fn oversized_file_leaves_destination_absent() {
    let scratch = Scratch::new("oversized");
    let image = scratch.path("fs.img");
    let out = scratch.path("out.img");
    let host = scratch.path("big.bin");

    format_image(&image, 180, 128, NOW).unwrap();

    fs::write(&host, vec![7u8; MAX_FILE_SIZE]).unwrap();
    let added = add_file_to_image(&image, &out, &host, NOW).unwrap();
    assert_eq!(added.blocks, 12);
    fs::remove_file(&out).unwrap();

    fs::write(&host, vec![7u8; MAX_FILE_SIZE + 1]).unwrap();
    assert!(matches!(
        add_file_to_image(&image, &out, &host, NOW),
        Err(Error::Fs(minivsfs::Error::FileTooLarge { .. }))
    ));
    assert!(!out.exists());
}

#[test]
fn exhaustion_keeps_previous_output() {
    let scratch = Scratch::new("exhaustion");
    let image = scratch.path("fs.img");
    let host = scratch.path("full.bin");

    format_image(&image, 180, 128, NOW).unwrap();
    fs::write(&host, vec![1u8; MAX_FILE_SIZE]).unwrap();

    // 原地更新：输入与输出是同一个文件
    for _ in 0..3 {
        add_file_to_image(&image, &image, &host, NOW).unwrap();
    }
    let before = fs::read(&image).unwrap();

    let err = add_file_to_image(&image, &image, &host, NOW).unwrap_err();
    assert!(matches!(
        err,
        Error::Fs(minivsfs::Error::NotEnoughDataBlocks {
            available: 1,
            needed: 12
        })
    ));
    assert_eq!(err.to_string(), "not enough free data blocks (1 available, 12 needed)");
    assert_eq!(fs::read(&image).unwrap(), before);
}

#[test]
fn bad_magic_and_missing_files() {
    let scratch = Scratch::new("bad-input");
    let image = scratch.path("fs.img");
    let out = scratch.path("out.img");
    let host = scratch.path("a.txt");
    fs::write(&host, b"a").unwrap();

    fs::write(&image, vec![0u8; 45 * BLOCK_SIZE]).unwrap();
    assert!(matches!(
        add_file_to_image(&image, &out, &host, NOW),
        Err(Error::Fs(minivsfs::Error::BadMagic(0)))
    ));

    let missing = scratch.path("missing.img");
    let err = add_file_to_image(&missing, &out, &host, NOW).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(err.to_string().starts_with(&missing.display().to_string()));

    format_image(&image, 180, 128, NOW).unwrap();
    let err = add_file_to_image(&image, &out, &scratch.path("nope"), NOW).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(!out.exists());
}

#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(long)]
    image: PathBuf,
}

#[test]
fn usage_errors_exit_with_failure() {
    let args: Args = parse_args_from(["mkfs-builder", "--image", "fs.img"]).unwrap();
    assert_eq!(args.image, PathBuf::from("fs.img"));

    let err = Args::try_parse_from(["mkfs-builder"]).unwrap_err();
    assert_eq!(usage_exit_status(&err), 1);
    let err = Args::try_parse_from(["mkfs-builder", "--image", "a", "--bogus"]).unwrap_err();
    assert_eq!(usage_exit_status(&err), 1);
    assert!(parse_args_from::<Args, _, _>(["mkfs-builder"]).is_err());
}

#[test]
fn help_and_version_exit_with_success() {
    for flag in ["--help", "--version"] {
        let err = Args::try_parse_from(["mkfs-builder", flag]).unwrap_err();
        assert_eq!(usage_exit_status(&err), 0);
    }
}
