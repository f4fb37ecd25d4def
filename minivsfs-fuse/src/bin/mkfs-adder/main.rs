mod cli;

use std::process::ExitCode;

use cli::Cli;
use minivsfs_fuse::{add_file_to_image, parse_args, unix_now};

fn main() -> ExitCode {
    env_logger::init();
    let cli: Cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    log::info!("input={:?}\noutput={:?}", cli.input, cli.output);

    match add_file_to_image(&cli.input, &cli.output, &cli.file, unix_now()) {
        Ok(added) => {
            println!(
                "Added file '{}' as inode {} using {} blocks.",
                cli.file.display(),
                added.inode_no,
                added.blocks
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
