#[tokio::main]
async fn main() {
    if let Err(e) = taxonomy_import::run().await {
        eprintln!("taxonomy-import: {}", e);
        std::process::exit(1);
    }
}
