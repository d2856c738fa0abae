use palisade::logging::init_logging;
use palisade::App;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let app = App::new().await?;
    app.run().await
}
