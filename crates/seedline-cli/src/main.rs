use std::process;

#[tokio::main]
async fn main() {
    process::exit(seedline_cli::run());
}
