mod cli;

use std::process::ExitCode;

use cli::Cli;
use minivsfs_fuse::{format_image, parse_args, unix_now};

fn main() -> ExitCode {
    env_logger::init();
    let cli: Cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    log::info!("image={:?}", cli.image);

    match format_image(&cli.image, cli.size_kib, cli.inodes, unix_now()) {
        Ok(geometry) => {
            log::info!("{geometry:?}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
