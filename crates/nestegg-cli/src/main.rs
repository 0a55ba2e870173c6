use std::process;

#[tokio::main]
async fn main() {
    process::exit(nestegg_cli::run().await);
}
