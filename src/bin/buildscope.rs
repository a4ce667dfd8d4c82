fn main() {
    buildscope::cli::run();
}
