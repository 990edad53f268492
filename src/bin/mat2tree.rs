use clap::Parser;
use phylomap::app::{run_matrix, MatrixConfig};

fn main() {
    let _ = env_logger::builder().format_timestamp(None).try_init();

    let config = MatrixConfig::parse();
    if let Err(err) = run_matrix(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
