use std::path::PathBuf;

use autolight_config::{AppConfig, ConfigError};
use autolight_core::report::ReportKind;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "autolight")]
#[command(about = "CAD 图纸照明分析：灯具识别、照度计算与报表生成")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认读取 AUTOLIGHT_CONFIG 或 ./config/default.toml）
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 灯具目录管理
    Catalog {
        #[command(subcommand)]
        action: CatalogCommand,
    },
    /// 上传并处理一张 DXF / DWG 图纸
    Process {
        file: PathBuf,
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value = "local")]
        owner: String,
        /// 图例文件：JSON 对象，块名 → 目录符号名
        #[arg(long, value_name = "FILE")]
        legend: Option<PathBuf>,
    },
    /// 显示图纸的房间、照度与灯具
    Show {
        drawing: i64,
        /// 以 JSON 输出房间分析结果
        #[arg(long)]
        json: bool,
    },
    /// 生成 PDF 或 CSV 报表
    Report {
        drawing: i64,
        #[arg(long, default_value = "pdf")]
        kind: ReportKind,
    },
    /// 将已安装灯具替换为另一个目录条目
    SwapFixture { fixture: i64, symbol: String },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// 写入内置的示例目录
    Seed,
    /// 列出目录条目
    List {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        min_lumens: Option<u32>,
        #[arg(long)]
        max_lumens: Option<u32>,
    },
    /// 从 JSON 数组导入目录条目
    Import { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let config = load_configuration(cli.config.clone());
    init_logging(&config);
    info!("启动 AutoLight");

    if let Err(err) = commands::run(cli.command, &config) {
        error!(error = %err, "命令执行失败");
        eprintln!("错误: {err:#}");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Invalid { .. } | ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 标准输出留给命令结果
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
