use std::process;

fn main() {
    if let Err(err) = shardwatch::app::run() {
        eprintln!("fatal: {err:#}");
        process::exit(1);
    }
}
