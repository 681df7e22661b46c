fn main() {
    if let Err(e) = labsight::run() {
        eprintln!("labsight: {e}");
        std::process::exit(1);
    }
}
