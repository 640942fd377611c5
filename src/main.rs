fn main() {
    if let Err(err) = csv_crossmatch::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
