#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use derive_more::Display;
use minivsfs::{AddedFile, Geometry, MiniVsfs};

#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "{}: {}", path, source)]
    Io { path: String, source: io::Error },

    #[display(fmt = "{}", _0)]
    Fs(minivsfs::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Fs(_) => None,
        }
    }
}

impl From<minivsfs::Error> for Error {
    fn from(err: minivsfs::Error) -> Self {
        Self::Fs(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.display().to_string(),
        source,
    }
}

/// 解析进程的命令行
#[inline]
pub fn parse_args<C: Parser>() -> std::result::Result<C, ExitCode> {
    parse_args_from(std::env::args_os())
}

/// 解析失败时打印 clap 的输出，并给出进程应当使用的退出码
pub fn parse_args_from<C, I, T>(args: I) -> std::result::Result<C, ExitCode>
where
    C: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    C::try_parse_from(args).map_err(|err| {
        if let Err(io) = err.print() {
            log::error!("failed to print usage: {io}");
        }
        ExitCode::from(usage_exit_status(&err))
    })
}

/// `--help` 与 `--version` 以 0 退出，其余解析错误以 1 退出
pub fn usage_exit_status(err: &clap::Error) -> u8 {
    if err.use_stderr() { 1 } else { 0 }
}

/// 自 Unix 纪元起的秒数
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// 参数校验先于任何 I/O；镜像在内存中构建完毕后顺序写出
pub fn format_image(image: &Path, size_kib: u64, inodes: u64, now: u64) -> Result<Geometry> {
    let geometry = Geometry::new(size_kib, inodes)?;
    let vsfs = MiniVsfs::format(&geometry, now);

    let mut fd = File::create(image).map_err(io_error(image))?;
    fd.write_all(vsfs.as_bytes()).map_err(io_error(image))?;
    fd.flush().map_err(io_error(image))?;

    Ok(geometry)
}

/// 只有在内存中的修改全部成功后才会打开 `output`，
/// 因此结构或容量错误不会碰到目标文件。
pub fn add_file_to_image(
    input: &Path,
    output: &Path,
    host_file: &Path,
    now: u64,
) -> Result<AddedFile> {
    let image = fs::read(input).map_err(io_error(input))?;
    let mut vsfs = MiniVsfs::open(image)?;
    if let Err(err) = vsfs.verify_checksums() {
        log::warn!("{}: {err}, continuing anyway", input.display());
    }

    let data = fs::read(host_file).map_err(io_error(host_file))?;
    let added = vsfs.add_file(&entry_name(host_file), &data, now)?;

    fs::write(output, vsfs.as_bytes()).map_err(io_error(output))?;
    Ok(added)
}

/// 去掉目录部分，只保留文件名的原始字节
fn entry_name(host_file: &Path) -> Vec<u8> {
    host_file
        .file_name()
        .unwrap_or(host_file.as_os_str())
        .as_encoded_bytes()
        .to_vec()
}
