use anyhow::Result;
use exam_voice_practice::orchestrator::App;
use exam_voice_practice::utils::logging;
use exam_voice_practice::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（config.toml 优先，没有则回退环境变量）
    let config = if std::path::Path::new("config.toml").exists() {
        Config::from_file("config.toml")?
    } else {
        Config::from_env()
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let mut app = App::initialize(config).await?;
    app.run().await?;

    Ok(())
}
