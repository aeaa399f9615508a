//! 处理端控制循环
//!
//! ```text
//! WaitingFrame ──帧──▶ Detecting ──▶ Planning ──▶ Reporting ──┐
//!      ▲  │                                                 │
//!      │  └─会话边界（无副作用）                               │
//!      └────────────────────────────────────────────────────┘
//! 任意状态 ──停止信号 / 致命 IO 错误──▶ Terminated
//! ```
//!
//! 严格串行：读帧 → 检测 → 规划 → 上报，不预读下一帧。
//! 检测失败与上报失败均不终止循环。

use crate::client::{ReportOutcome, Reporter, report_all};
use crate::error::ControlError;
use crate::planner::{Commands, Planner};
use rover_protocol::status::fields;
use rover_protocol::{ProcessingMode, RobotStatus};
use rover_stream::{FrameReader, NextFrame};
use rover_tools::local_datetime_string;
use rover_vision::{DetectionEngine, Detections, VisionError, annotate, decode_frame, encode_jpeg};
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// 标注帧默认 JPEG 质量
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// 循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    WaitingFrame,
    Detecting,
    Planning,
    Reporting,
    Terminated,
}

/// `run()` 的正常退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// 收到停止信号
    Stopped,
    /// 采集端关闭连接
    ConnectionClosed,
}

/// 单个周期的结果（每周期新建，不跨周期累积）
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 周期序号（从 1 开始）
    pub cycle: u64,
    /// 本周期使用的处理模式
    pub mode: ProcessingMode,
    pub detections: Detections,
    /// 检测是否失败（解码错误或检测器错误）
    pub detection_failed: bool,
    pub commands: Commands,
    pub status: RobotStatus,
    /// 上报的图像（标注后的 JPEG；检测失败时为原始帧）
    pub image: Vec<u8>,
    pub outcome: ReportOutcome,
    /// 上报后生效的处理模式
    pub next_mode: ProcessingMode,
}

/// `step()` 的结果
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// 完成一个处理周期
    Cycle(Box<CycleReport>),
    /// 采集端会话边界，没有副作用
    EndOfSession,
    /// 收到停止信号
    Stopped,
}

/// 检测阶段的产物
struct Perception {
    detections: Detections,
    frame_width: u32,
    image: Vec<u8>,
    failed: bool,
}

/// 控制循环
pub struct ControlLoop<S: Read, R: Reporter> {
    frames: FrameReader<S>,
    engine: DetectionEngine,
    planner: Planner,
    reporter: R,
    mode: ProcessingMode,
    state: LoopState,
    stop: Arc<AtomicBool>,
    jpeg_quality: u8,
    cycles: u64,
}

impl<S: Read, R: Reporter> ControlLoop<S, R> {
    pub fn new(frames: FrameReader<S>, engine: DetectionEngine, reporter: R) -> Self {
        Self {
            frames,
            engine,
            planner: Planner::default(),
            reporter,
            mode: ProcessingMode::default(),
            state: LoopState::WaitingFrame,
            stop: Arc::new(AtomicBool::new(false)),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            cycles: 0,
        }
    }

    pub fn with_planner(mut self, planner: Planner) -> Self {
        self.planner = planner;
        self
    }

    /// 初始处理模式
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// 使用外部停止标志（如 Ctrl-C 处理器设置的标志）
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// 停止标志；置位后循环在下一次读帧之前退出
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// 运行一个周期
    ///
    /// 图传链路错误（包括对端关闭）是致命的，返回后状态为 `Terminated`。
    pub fn step(&mut self) -> Result<StepOutcome, ControlError> {
        if self.stop.load(Ordering::Relaxed) {
            self.transition(LoopState::Terminated);
            return Ok(StepOutcome::Stopped);
        }

        self.transition(LoopState::WaitingFrame);
        let frame = match self.frames.next_frame() {
            Ok(NextFrame::Frame(bytes)) => bytes,
            Ok(NextFrame::EndOfSession) => {
                debug!("Capture session boundary");
                return Ok(StepOutcome::EndOfSession);
            },
            Err(e) => {
                self.transition(LoopState::Terminated);
                return Err(e.into());
            },
        };

        let mode = self.mode;

        // ---- Detecting ----
        self.transition(LoopState::Detecting);
        let perception = self.perceive(mode, frame);

        // ---- Planning ----
        self.transition(LoopState::Planning);
        let plan = self
            .planner
            .plan(perception.detections.primary(), perception.frame_width);

        let mut status = RobotStatus::new();
        status.insert(fields::TIMESTAMP, local_datetime_string());
        status.insert(fields::HAS_CAMERA, "true");
        status.extend(plan.status);

        // ---- Reporting ----
        self.transition(LoopState::Reporting);
        let outcome = report_all(&mut self.reporter, &plan.commands, &status, &perception.image);
        if let Some(next) = outcome.mode {
            if next != self.mode {
                info!("Processing mode changed: {} -> {}", self.mode, next);
                self.mode = next;
            }
        }

        self.cycles += 1;
        self.transition(LoopState::WaitingFrame);

        Ok(StepOutcome::Cycle(Box::new(CycleReport {
            cycle: self.cycles,
            mode,
            detections: perception.detections,
            detection_failed: perception.failed,
            commands: plan.commands,
            status,
            image: perception.image,
            outcome,
            next_mode: self.mode,
        })))
    }

    /// 循环运行直到停止信号或连接关闭
    ///
    /// 每个处理周期结束后调用 `observer`。
    pub fn run<F>(&mut self, mut observer: F) -> Result<LoopExit, ControlError>
    where
        F: FnMut(&CycleReport),
    {
        loop {
            match self.step() {
                Ok(StepOutcome::Cycle(report)) => observer(&report),
                Ok(StepOutcome::EndOfSession) => continue,
                Ok(StepOutcome::Stopped) => {
                    info!("Control loop stopped after {} cycles", self.cycles);
                    return Ok(LoopExit::Stopped);
                },
                Err(e) if e.is_connection_closed() => {
                    info!("Frame connection closed after {} cycles", self.cycles);
                    return Ok(LoopExit::ConnectionClosed);
                },
                Err(e) => {
                    error!("Control loop terminated: {}", e);
                    return Err(e);
                },
            }
        }
    }

    /// 检测阶段：解码 → 检测 → 标注 → 编码
    ///
    /// `Idle` 模式不运行检测，原样上报帧数据。
    /// 检测失败时按无目标处理，同样上报原始帧。
    fn perceive(&self, mode: ProcessingMode, frame: Vec<u8>) -> Perception {
        if !mode.runs_detection() {
            return Perception {
                detections: Detections::default(),
                frame_width: 0,
                image: frame,
                failed: false,
            };
        }

        let detected = decode_frame(&frame).and_then(|image| {
            let detections = self.engine.detect(mode, &image)?;
            Ok::<_, VisionError>((image, detections))
        });

        match detected {
            Ok((mut image, detections)) => {
                let frame_width = image.width();
                annotate(&mut image, &detections);
                let image = match encode_jpeg(&image, self.jpeg_quality) {
                    Ok(jpeg) => jpeg,
                    Err(e) => {
                        warn!("Failed to encode annotated frame, reporting raw frame: {}", e);
                        frame
                    },
                };
                Perception {
                    detections,
                    frame_width,
                    image,
                    failed: false,
                }
            },
            Err(e) => {
                warn!("Detection failed, planning without a target: {}", e);
                Perception {
                    detections: Detections::default(),
                    frame_width: 0,
                    image: frame,
                    failed: true,
                }
            },
        }
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            debug!("Control loop: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use rover_protocol::{Command, DetectorTag};
    use rover_stream::{write_frame, write_session_boundary};
    use rover_vision::{ColorRange, ColorRangeDetector, RgbImage};
    use std::io::Cursor;

    #[derive(Default)]
    struct RecordingReporter {
        requests: Vec<(Command, RobotStatus, Vec<u8>)>,
        reply: Option<ProcessingMode>,
        fail: bool,
    }

    impl Reporter for RecordingReporter {
        fn report(
            &mut self,
            command: Command,
            status: &RobotStatus,
            image: &[u8],
        ) -> Result<Option<ProcessingMode>, ReportError> {
            self.requests.push((command, status.clone(), image.to_vec()));
            if self.fail {
                return Err(ReportError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )));
            }
            Ok(self.reply)
        }
    }

    fn red_engine() -> DetectionEngine {
        DetectionEngine::new().with_detector(
            ProcessingMode::Red,
            ColorRangeDetector::new(
                DetectorTag::new("red", [255, 0, 0]),
                ColorRange::new([150, 0, 0], [255, 90, 90]),
                16,
            ),
        )
    }

    fn red_square_png() -> Vec<u8> {
        let mut frame = RgbImage::from_pixel(320, 240, image::Rgb([128, 128, 128]));
        for y in 50..110 {
            for x in 100..160 {
                frame.put_pixel(x, y, image::Rgb([230, 20, 20]));
            }
        }
        let mut bytes = Vec::new();
        frame
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn stream(frames: &[&[u8]]) -> FrameReader<Cursor<Vec<u8>>> {
        let mut out = Vec::new();
        for frame in frames {
            if frame.is_empty() {
                write_session_boundary(&mut out).unwrap();
            } else {
                write_frame(&mut out, frame).unwrap();
            }
        }
        FrameReader::new(Cursor::new(out))
    }

    fn expect_cycle(outcome: StepOutcome) -> CycleReport {
        match outcome {
            StepOutcome::Cycle(report) => *report,
            other => panic!("Expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_detection_cycle() {
        let png = red_square_png();
        let mut control = ControlLoop::new(
            stream(&[png.as_slice()]),
            red_engine(),
            RecordingReporter::default(),
        )
        .with_mode(ProcessingMode::Red);

        let report = expect_cycle(control.step().unwrap());
        assert_eq!(report.cycle, 1);
        assert!(!report.detection_failed);
        assert_eq!(
            report.commands.as_slice(),
            &[Command::Turn(60.9375), Command::ThrottleForward(10)]
        );
        assert_eq!(report.status.keys().next(), Some(fields::TIMESTAMP));
        assert_eq!(report.status.get(fields::HAS_CAMERA), Some("true"));
        assert_eq!(report.status.get(fields::GENERAL), Some("Face found"));
        // 上报的是重新编码的 JPEG
        assert_eq!(&report.image[..2], &[0xFF, 0xD8]);

        let requests = &control.reporter().requests;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1, requests[1].1);
        assert_eq!(control.state(), LoopState::WaitingFrame);
    }

    #[test]
    fn test_session_boundary_has_no_side_effects() {
        let mut control =
            ControlLoop::new(stream(&[&[]]), red_engine(), RecordingReporter::default());
        assert!(matches!(control.step().unwrap(), StepOutcome::EndOfSession));
        assert!(control.reporter().requests.is_empty());
        assert_eq!(control.cycles(), 0);
    }

    #[test]
    fn test_undecodable_frame_stops_throttle() {
        let mut control = ControlLoop::new(
            stream(&[b"not a jpeg".as_slice()]),
            red_engine(),
            RecordingReporter::default(),
        )
        .with_mode(ProcessingMode::Red);

        let report = expect_cycle(control.step().unwrap());
        assert!(report.detection_failed);
        assert_eq!(report.commands.as_slice(), &[Command::ThrottleStop]);
        assert_eq!(report.status.get(fields::GENERAL), Some("No face found"));
        // 原始帧照常上报
        assert_eq!(control.reporter().requests[0].2, b"not a jpeg".to_vec());
    }

    #[test]
    fn test_idle_mode_skips_detection() {
        let png = red_square_png();
        let mut control = ControlLoop::new(
            stream(&[png.as_slice()]),
            red_engine(),
            RecordingReporter::default(),
        )
        .with_mode(ProcessingMode::Idle);

        let report = expect_cycle(control.step().unwrap());
        assert!(report.detections.is_empty());
        assert!(!report.detection_failed);
        assert_eq!(report.commands.as_slice(), &[Command::ThrottleStop]);
        assert_eq!(report.image, png);
    }

    #[test]
    fn test_mode_hint_applies_to_next_cycle() {
        let png = red_square_png();
        let reporter = RecordingReporter {
            reply: Some(ProcessingMode::Red),
            ..Default::default()
        };
        let frames = stream(&[png.as_slice(), png.as_slice()]);
        let mut control = ControlLoop::new(frames, red_engine(), reporter);
        assert_eq!(control.mode(), ProcessingMode::Face);

        // 第一帧在 Face 模式下处理（没有 face 检测器 → 无目标）
        let first = expect_cycle(control.step().unwrap());
        assert_eq!(first.mode, ProcessingMode::Face);
        assert_eq!(first.commands.as_slice(), &[Command::ThrottleStop]);
        assert_eq!(first.next_mode, ProcessingMode::Red);

        let second = expect_cycle(control.step().unwrap());
        assert_eq!(second.mode, ProcessingMode::Red);
        assert_eq!(second.commands.len(), 2);
    }

    #[test]
    fn test_report_failure_is_not_fatal() {
        let png = red_square_png();
        let reporter = RecordingReporter {
            fail: true,
            ..Default::default()
        };
        let frames = stream(&[png.as_slice(), png.as_slice()]);
        let mut control =
            ControlLoop::new(frames, red_engine(), reporter).with_mode(ProcessingMode::Red);

        let report = expect_cycle(control.step().unwrap());
        assert_eq!(report.outcome.failed, 2);
        assert_eq!(report.outcome.sent, 0);
        assert_eq!(control.mode(), ProcessingMode::Red);
        assert!(matches!(control.step().unwrap(), StepOutcome::Cycle(_)));
    }

    #[test]
    fn test_run_until_connection_closed() {
        let png = red_square_png();
        let mut control = ControlLoop::new(
            stream(&[png.as_slice(), &[], png.as_slice()]),
            red_engine(),
            RecordingReporter::default(),
        );

        let mut cycles = Vec::new();
        let exit = control.run(|report| cycles.push(report.cycle)).unwrap();
        assert_eq!(exit, LoopExit::ConnectionClosed);
        assert_eq!(cycles, vec![1, 2]);
        assert_eq!(control.state(), LoopState::Terminated);
    }

    #[test]
    fn test_stop_flag() {
        let png = red_square_png();
        let mut control =
            ControlLoop::new(stream(&[png.as_slice()]), red_engine(), RecordingReporter::default());
        control.stop_handle().store(true, Ordering::Relaxed);

        let exit = control.run(|_| panic!("no cycle expected")).unwrap();
        assert_eq!(exit, LoopExit::Stopped);
        assert!(control.reporter().requests.is_empty());
    }

    #[test]
    fn test_truncated_stream_is_fatal_for_step() {
        let mut bytes = vec![100, 0, 0, 0];
        bytes.extend_from_slice(&[0u8; 10]);
        let mut control = ControlLoop::new(
            FrameReader::new(Cursor::new(bytes)),
            red_engine(),
            RecordingReporter::default(),
        );
        let err = control.step().unwrap_err();
        assert!(err.is_connection_closed());
        assert_eq!(control.state(), LoopState::Terminated);
    }
}
