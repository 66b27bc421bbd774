use tsuga_provider::{init_logging, serve, TsugaProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(TsugaProvider::new()).await
}
