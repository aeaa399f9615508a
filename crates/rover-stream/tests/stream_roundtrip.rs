//! 采集端 → TCP → 服务端 集成测试

use rover_stream::{
    CaptureDevice, CaptureError, CaptureSession, FrameProducer, FrameServer, NextFrame,
    Resolution, TestPatternCamera, connect,
};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

/// 每次采集返回递增编号的设备
struct CountingDevice {
    next: u8,
}

impl CaptureDevice for CountingDevice {
    fn name(&self) -> &str {
        "counting"
    }

    fn open(&mut self, _resolution: Resolution) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let start = self.next;
        self.next = self.next.wrapping_add(100);
        Ok(Box::new(CountingSession { next: start }))
    }
}

struct CountingSession {
    next: u8,
}

impl CaptureSession for CountingSession {
    fn capture(&mut self, buf: &mut Vec<u8>) -> Result<(), CaptureError> {
        buf.clear();
        buf.extend_from_slice(&[self.next; 16]);
        self.next = self.next.wrapping_add(1);
        Ok(())
    }
}

#[test]
fn producer_sessions_arrive_in_order() {
    let server = FrameServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();

    let producer = thread::spawn(move || {
        let mut connection = connect("127.0.0.1", addr.port()).unwrap();
        let mut producer =
            FrameProducer::new(CountingDevice { next: 0 }).with_session_budget(Duration::ZERO);
        let first = producer
            .run_session(&mut connection, Resolution::default())
            .unwrap();
        let second = producer
            .run_session(&mut connection, Resolution::default())
            .unwrap();
        (first, second)
    });

    let mut reader = server.accept_one().unwrap();
    assert_eq!(reader.next_frame().unwrap(), NextFrame::Frame(vec![0; 16]));
    assert_eq!(reader.next_frame().unwrap(), NextFrame::EndOfSession);
    // 同一连接上的第二个会话
    assert_eq!(reader.next_frame().unwrap(), NextFrame::Frame(vec![100; 16]));
    assert_eq!(reader.next_frame().unwrap(), NextFrame::EndOfSession);

    let (first, second) = producer.join().unwrap();
    assert_eq!(first.frames, 1);
    assert_eq!(second.frames, 1);

    // 生产者线程结束后连接关闭
    assert!(reader.next_frame().unwrap_err().is_connection_closed());
    assert_eq!(reader.frames_received(), 2);
    assert_eq!(reader.sessions_completed(), 2);
}

#[test]
fn test_pattern_frames_decode_on_server() {
    let server = FrameServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();

    let producer = thread::spawn(move || {
        let mut connection = connect("127.0.0.1", addr.port()).unwrap();
        let camera = TestPatternCamera::new().with_frame_interval(Duration::from_millis(5));
        let mut producer =
            FrameProducer::new(camera).with_session_budget(Duration::from_millis(30));
        producer
            .run_session(&mut connection, Resolution::new(160, 120))
            .unwrap()
    });

    let mut reader = server.accept_one().unwrap();
    let mut frames = 0;
    loop {
        match reader.next_frame().unwrap() {
            NextFrame::Frame(bytes) => {
                let image = image::load_from_memory(&bytes).unwrap();
                assert_eq!((image.width(), image.height()), (160, 120));
                frames += 1;
            },
            NextFrame::EndOfSession => break,
        }
    }

    let report = producer.join().unwrap();
    assert!(frames >= 1);
    assert_eq!(report.frames, frames);
}

#[test]
fn second_connection_is_refused() {
    let server = FrameServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();

    let first = thread::spawn(move || TcpStream::connect(addr).unwrap());
    let reader = server.accept_one().unwrap();
    let _first = first.join().unwrap();

    // accept_one 之后监听 socket 已关闭
    assert!(TcpStream::connect(addr).is_err());
    drop(reader);
}
