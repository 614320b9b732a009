use collector::runtime::{boot, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (config, store) = boot::boot()?;
    serve::serve(config, store).await?;
    Ok(())
}
