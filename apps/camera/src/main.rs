//! # Rover Camera
//!
//! 采集端：打开相机，按会话把 JPEG 帧写入 TCP 连接。
//!
//! ```bash
//! # 默认：测试图案 → 127.0.0.1:8000
//! rover-camera
//!
//! # 树莓派相机，发送到处理端
//! rover-camera -s 192.168.1.20 --source command -x 640 -y 480
//!
//! # 循环发送目录中的图片
//! rover-camera --config rover.toml --source directory
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use rover_stream::{
    CaptureDevice, CommandCamera, FrameProducer, ImageDirectoryCamera, TestPatternCamera, connect,
};
use rover_tools::{CameraConfig, CameraSource, RoverConfig};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

/// Rover 采集端
#[derive(Parser, Debug)]
#[command(name = "rover-camera")]
#[command(about = "Capture node: streams length-prefixed JPEG frames over TCP", long_about = None)]
#[command(version)]
struct Args {
    /// 处理端主机
    ///
    /// 默认: 配置文件中的 stream.host（127.0.0.1）
    #[arg(short, long)]
    server: Option<String>,

    /// 处理端端口
    ///
    /// 默认: 8000
    #[arg(short, long)]
    port: Option<u16>,

    /// 帧宽度（像素）
    #[arg(short = 'x', long)]
    width: Option<u32>,

    /// 帧高度（像素）
    #[arg(short = 'y', long)]
    height: Option<u32>,

    /// 采集源：test-pattern | directory | command
    #[arg(long)]
    source: Option<CameraSource>,

    /// TOML 配置文件
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    /// 命令行参数覆盖配置文件
    fn apply(&self, config: &mut RoverConfig) {
        if let Some(ref host) = self.server {
            config.stream.host = host.clone();
        }
        if let Some(port) = self.port {
            config.stream.port = port;
        }
        if let Some(width) = self.width {
            config.camera.width = width;
        }
        if let Some(height) = self.height {
            config.camera.height = height;
        }
        if let Some(source) = self.source {
            config.camera.source = source;
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

/// 按配置构造采集设备
fn open_device(camera: &CameraConfig) -> Result<Box<dyn CaptureDevice>> {
    let device: Box<dyn CaptureDevice> = match camera.source {
        CameraSource::TestPattern => Box::new(
            TestPatternCamera::new()
                .with_quality(camera.jpeg_quality)
                .with_frame_interval(camera.frame_interval()),
        ),
        CameraSource::Directory => {
            let Some(ref directory) = camera.directory else {
                bail!("camera.directory is required for source = \"directory\"");
            };
            Box::new(
                ImageDirectoryCamera::new(directory).with_frame_interval(camera.frame_interval()),
            )
        },
        CameraSource::Command => Box::new(
            CommandCamera::from_argv(&camera.command).context("Invalid camera.command")?,
        ),
    };
    Ok(device)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let device = open_device(&config.camera)?;
    let resolution = config.camera.resolution();

    info!(
        "Streaming {} at {} to {}:{} (session budget {:?})",
        device.name(),
        resolution,
        config.stream.host,
        config.stream.port,
        config.camera.session_budget()
    );

    let connection = connect(&config.stream.host, config.stream.port).with_context(|| {
        format!(
            "Failed to connect to {}:{}",
            config.stream.host, config.stream.port
        )
    })?;

    let mut producer =
        FrameProducer::new(device).with_session_budget(config.camera.session_budget());

    // 正常情况下永不返回
    let Err(e) = producer.run(connection, resolution);
    Err(e).context("Frame producer stopped")
}

fn main() {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("rover_camera=info,rover_stream=info")
            }),
        )
        .init();

    let args = Args::parse();

    // Ctrl+C：采集端没有需要收尾的状态，直接退出
    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!("\nReceived interrupt signal. Shutting down...");
        process::exit(0);
    }) {
        error!("Failed to set signal handler: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(args) {
        error!("{:#}", e);
        process::exit(1);
    }
}
