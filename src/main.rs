#[tokio::main]
async fn main() {
    if let Err(e) = orchestrator_backend::run().await {
        eprintln!("orchestrator-backend failed to start: {}", e);
        std::process::exit(1);
    }
}
