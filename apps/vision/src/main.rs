//! # Rover Processor
//!
//! 处理端：接收采集端的帧，运行目标检测，把导航指令上报给控制服务器。
//!
//! ```bash
//! # 监听 0.0.0.0:8000，上报到 http://127.0.0.1/command/
//! rover-processor
//!
//! # 指定控制服务器，关闭每周期日志，并把标注帧写到文件
//! rover-processor -s http://192.168.1.10:8080 -n --snapshot public/car_cam_post.jpeg
//! ```
//!
//! 第一次 Ctrl+C 请求在下一帧之前停止；第二次立即退出。

use anyhow::{Context, Result};
use clap::Parser;
use rover_control::{ControlLoop, CycleReport, HttpControlClient, LoopExit};
use rover_protocol::{DetectorTag, ProcessingMode};
use rover_stream::FrameServer;
use rover_tools::{ColorRangeSpec, DetectorsConfig, RoverConfig};
use rover_vision::{ColorRange, ColorRangeDetector, DetectionEngine};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Rover 处理端
#[derive(Parser, Debug)]
#[command(name = "rover-processor")]
#[command(about = "Processing node: receives frames, detects targets, reports commands")]
#[command(long_about = None)]
#[command(version)]
struct Args {
    /// 控制服务器地址
    ///
    /// 默认: http://127.0.0.1
    #[arg(short, long)]
    server: Option<String>,

    /// 图传监听端口
    ///
    /// 默认: 8000
    #[arg(short, long)]
    port: Option<u16>,

    /// 不输出每周期摘要
    #[arg(short = 'n', long)]
    no_display: bool,

    /// 每周期写入标注帧的文件
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// TOML 配置文件
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    /// 命令行参数覆盖配置文件
    fn apply(&self, config: &mut RoverConfig) {
        if let Some(ref server) = self.server {
            config.control.server_address = server.clone();
        }
        if let Some(port) = self.port {
            config.stream.port = port;
        }
        if self.no_display {
            config.control.display = false;
        }
        if let Some(ref snapshot) = self.snapshot {
            config.control.snapshot = Some(snapshot.clone());
        }
    }
}

fn load_config(args: &Args) -> Result<RoverConfig> {
    let mut config = match args.config {
        Some(ref path) => RoverConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RoverConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn color_detector(spec: &ColorRangeSpec) -> ColorRangeDetector {
    ColorRangeDetector::new(
        DetectorTag::new(spec.name.clone(), spec.color),
        ColorRange::new(spec.min, spec.max),
        spec.min_pixels,
    )
}

/// 按配置注册检测器（数组顺序即优先级）
fn build_engine(detectors: &DetectorsConfig) -> DetectionEngine {
    let mut engine = DetectionEngine::new();
    for mode in [ProcessingMode::Face, ProcessingMode::Red] {
        for spec in detectors.for_mode(mode) {
            engine.register(mode, color_detector(spec));
        }
    }
    engine
}

/// 每周期回调：摘要日志 + 快照文件
struct CycleObserver {
    display: bool,
    snapshot: Option<PathBuf>,
}

impl CycleObserver {
    fn observe(&self, report: &CycleReport) {
        if self.display {
            let commands: Vec<String> = report.commands.iter().map(|c| c.to_string()).collect();
            info!(
                "#{} [{}] {} detection(s) -> {} (sent {}, failed {})",
                report.cycle,
                report.mode,
                report.detections.len(),
                commands.join(", "),
                report.outcome.sent,
                report.outcome.failed
            );
        }

        if let Some(ref path) = self.snapshot
            && let Err(e) = write_snapshot(path, &report.image)
        {
            warn!("Failed to write snapshot {}: {}", path.display(), e);
        }
    }
}

/// 先写临时文件再重命名，避免读者看到半张图
fn write_snapshot(path: &Path, image: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, image)?;
    std::fs::rename(&tmp, path)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    // 第一次 Ctrl+C 置位停止标志，第二次直接退出
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        if handler_stop.swap(true, Ordering::SeqCst) {
            eprintln!("\nReceived second interrupt signal. Exiting...");
            process::exit(130);
        }
        eprintln!("\nReceived interrupt signal. Stopping after the current frame...");
    })
    .context("Failed to set signal handler")?;

    let engine = build_engine(&config.detectors);
    let client = HttpControlClient::new(
        &config.control.server_address,
        config.control.command_prefix.clone(),
        config.control.timeout(),
    );
    info!(
        "Reporting to {} (prefix '{}', timeout {:?})",
        client.endpoint(),
        client.prefix(),
        config.control.timeout()
    );

    let port = config.stream.port;
    let frames = FrameServer::listen(port)
        .with_context(|| format!("Failed to accept a capture node on port {}", port))?;

    let observer = CycleObserver {
        display: config.control.display,
        snapshot: config.control.snapshot.clone(),
    };

    let mut control = ControlLoop::new(frames, engine, client)
        .with_mode(config.control.initial_mode)
        .with_stop_flag(stop)
        .with_jpeg_quality(config.control.jpeg_quality);

    match control.run(|report| observer.observe(report))? {
        LoopExit::Stopped => info!("Stopped after {} cycles", control.cycles()),
        LoopExit::ConnectionClosed => {
            info!("Capture node disconnected after {} cycles", control.cycles())
        },
    }
    Ok(())
}

fn main() {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "rover_processor=info,rover_stream=info,rover_control=info,rover_vision=info",
                )
            }),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "rover-processor",
            "-s",
            "http://10.0.0.2:8080",
            "-p",
            "9000",
            "-n",
            "--snapshot",
            "out.jpeg",
        ]);
        let mut config = RoverConfig::default();
        args.apply(&mut config);

        assert_eq!(config.control.server_address, "http://10.0.0.2:8080");
        assert_eq!(config.stream.port, 9000);
        assert!(!config.control.display);
        assert_eq!(config.control.snapshot, Some(PathBuf::from("out.jpeg")));
    }

    #[test]
    fn test_defaults_keep_config() {
        let args = Args::parse_from(["rover-processor"]);
        let mut config = RoverConfig::default();
        args.apply(&mut config);
        assert_eq!(config, RoverConfig::default());
    }

    #[test]
    fn test_engine_follows_detector_order() {
        let mut detectors = DetectorsConfig::default();
        detectors.red.push(ColorRangeSpec {
            name: "orange".to_string(),
            color: [255, 128, 0],
            min: [200, 100, 0],
            max: [255, 160, 60],
            min_pixels: 16,
        });

        let engine = build_engine(&detectors);
        let red: Vec<&str> = engine
            .detectors(ProcessingMode::Red)
            .iter()
            .map(|d| d.tag().name.as_str())
            .collect();
        assert_eq!(red, vec!["red", "orange"]);
        assert_eq!(engine.detectors(ProcessingMode::Face).len(), 1);
        assert!(engine.detectors(ProcessingMode::Idle).is_empty());
    }

    #[test]
    fn test_snapshot_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpeg");

        write_snapshot(&path, &[1, 2, 3]).unwrap();
        write_snapshot(&path, &[4, 5]).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![4, 5]);
        assert!(!path.with_extension("tmp").exists());
    }
}
