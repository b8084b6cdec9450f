fn main() {
    if let Err(err) = lesson_docs::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
