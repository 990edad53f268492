use clap::Parser;
use phylomap::app::{run_alignment, AlignConfig};

fn main() {
    let _ = env_logger::builder().format_timestamp(None).try_init();

    let config = AlignConfig::parse();
    if let Err(err) = run_alignment(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
