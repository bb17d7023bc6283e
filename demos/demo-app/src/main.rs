use demo_app::state::Services;
use lumen::plugins::Tracing;
use lumen::LumenConfig;

#[tokio::main]
async fn main() {
    lumen::init_tracing();

    // load() succeeds without any YAML file present; only malformed files fail.
    let config = match LumenConfig::load("dev") {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "falling back to default configuration");
            LumenConfig::empty()
        }
    };

    let addr = std::env::var("DEMO_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let app = demo_app::app(config, Services::default()).with(Tracing);
    if let Err(err) = app.serve(&addr).await {
        tracing::error!(error = %err, "server failed");
        std::process::exit(1);
    }
}
