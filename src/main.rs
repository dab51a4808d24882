fn main() {
    if let Err(err) = mortality_stats::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
