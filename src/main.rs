use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use flyer_studio::models::DEFAULT_VIBE;
use flyer_studio::utils::logging;
use flyer_studio::{App, Config, FlyerBrief, GenerateOptions, Mode};

#[derive(Parser)]
#[command(name = "flyer_studio")]
#[command(about = "夜店海报生成工作室")]
#[command(version)]
struct Cli {
    /// TOML 配置文件（环境变量会覆盖其中的值）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动工作室 HTTP 服务
    Serve {
        /// 监听地址，如 127.0.0.1:3000
        #[arg(long)]
        addr: Option<String>,
    },
    /// 提交一次海报生成
    Generate(GenerateArgs),
    /// 查看本周剩余生成次数
    Quota,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    subtitle: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    venue: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    cta: Option<String>,

    /// 风格描述
    #[arg(long, default_value = DEFAULT_VIBE)]
    vibe: String,

    /// fast 或 premium
    #[arg(long, default_value_t = Mode::Fast)]
    mode: Mode,

    /// 导出第一张图为帖子 / 快拍尺寸
    #[arg(long)]
    export: bool,

    /// 工作室服务地址
    #[arg(long, env = "STUDIO_BASE_URL")]
    studio_url: Option<String>,
}

impl GenerateArgs {
    /// 未指定的字段使用默认文案
    fn brief(&self) -> FlyerBrief {
        let defaults = FlyerBrief::default();
        let pick = |value: &Option<String>, fallback: String| value.clone().unwrap_or(fallback);
        FlyerBrief {
            title: pick(&self.title, defaults.title),
            subtitle: pick(&self.subtitle, defaults.subtitle),
            date: pick(&self.date, defaults.date),
            time: pick(&self.time, defaults.time),
            venue: pick(&self.venue, defaults.venue),
            city: pick(&self.city, defaults.city),
            price: pick(&self.price, defaults.price),
            cta: pick(&self.cta, defaults.cta),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::load(cli.config.as_deref()).context("加载配置失败")?;
    if cli.verbose {
        config.verbose_logging = true;
    }

    // 初始化日志
    logging::init(config.verbose_logging);

    match cli.command {
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                config.bind_addr = addr;
            }
            App::new(config).serve().await?;
        }
        Commands::Generate(args) => {
            if let Some(url) = &args.studio_url {
                config.studio_base_url = url.clone();
            }
            let options = GenerateOptions {
                brief: args.brief(),
                vibe: args.vibe.clone(),
                mode: args.mode,
                export: args.export,
            };
            App::new(config).generate(options).await?;
        }
        Commands::Quota => {
            let report = App::new(config).quota_report();
            info!(
                "📉 本周剩余生成次数: {}/{} (本周起点: {})",
                report.remaining,
                report.limit,
                report.week_start.format("%Y-%m-%d %H:%M %Z")
            );
        }
    }

    Ok(())
}
