use std::path::PathBuf;

use srh_cli::publish::PublishedOutput;

#[derive(Debug)]
pub struct RunResult {
    pub output_dir: PathBuf,
    pub outputs: Vec<PublishedOutput>,
    pub dry_run: bool,
}
