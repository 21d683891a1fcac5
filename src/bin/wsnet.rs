//! WSNet 配置装配器
//!
//! 读取配置文件并装配仿真；可选导出装配结果为 JSON，或驱动出生事件直到仿真时长结束。

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use wsnet_rs::assemble::Configurator;
use wsnet_rs::sim::Simulator;

#[derive(Debug, Parser)]
#[command(name = "wsnet", about = "WSNet 配置装配：解析 XML 配置并构建仿真对象图")]
struct Args {
    /// XML 配置文件
    #[arg(long)]
    config: PathBuf,
    /// schema 文件（可选）
    #[arg(long)]
    schema: Option<PathBuf>,
    /// 系统模块目录，可重复给出
    #[arg(long = "modules-dir")]
    modules_dir: Vec<PathBuf>,
    /// 随机出生时间的种子
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// 把装配结果写成 JSON
    #[arg(long)]
    dump_json: Option<PathBuf>,
    /// 装配后运行出生事件直到仿真时长
    #[arg(long)]
    run: bool,
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut configurator = Configurator::from_env();
    configurator.set_config_file(&args.config);
    if let Some(schema) = &args.schema {
        configurator.set_schema_file(schema);
    }
    for dir in &args.modules_dir {
        configurator.set_module_dir(dir);
    }
    configurator.set_seed(args.seed);

    let mut simulation = match configurator.run_configuration() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("配置失败: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.dump_json {
        let json = match serde_json::to_string_pretty(&simulation.summary()) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("序列化装配结果失败: {e}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = fs::write(path, json) {
            eprintln!("写入 {} 失败: {e}", path.display());
            return ExitCode::FAILURE;
        }
    }

    let mut executed = 0;
    if args.run {
        let mut sim = Simulator::default();
        simulation.schedule_births(&mut sim);
        executed = sim.run(&mut simulation);
    }

    println!(
        "assembled classes={}, mediums={}, environments={}, nodes={}, groups={}, events={}",
        simulation.classes().len(),
        simulation.mediums().len(),
        simulation.environments().len(),
        simulation.nodes().len(),
        simulation.groups().len(),
        executed
    );

    let report = simulation.teardown();
    println!(
        "teardown unbound={}, destroyed={}, failures={}",
        report.unbound,
        report.classes_destroyed,
        report.failures.len()
    );
    ExitCode::SUCCESS
}
