fn main() {
    umbra::cli::run();
}
