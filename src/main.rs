use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use docs_builder::cli::Cli;
use docs_builder::orchestrator::{check_config, list_versions, App};
use docs_builder::utils::logging;
use docs_builder::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 加载配置（命令行参数优先）
    let config = cli.apply(Config::from_env());

    // 初始化日志
    logging::init(config.verbose_logging);

    if cli.list_versions {
        return match list_versions(&config).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!("❌ {}", e);
                ExitCode::FAILURE
            }
        };
    }
    if cli.check_config {
        return if check_config(&config).await {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    // 初始化并运行应用
    let result = match App::initialize(config).await {
        Ok(app) => app.run(cli.clean).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(summary) if summary.all_published() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("❌ 构建中止: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
