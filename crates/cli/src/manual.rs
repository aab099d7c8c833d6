//! 手动驾驶 (stdin)
//!
//! 每行输入表示此后一直按住的键，直到下一行：
//! - `w` 油门，`s` 刹车，`a` / `d` 转向，空格手刹
//! - `q` 切换倒车，`r` 重新开始，`x` 退出
//!
//! 空行松开全部按键。

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};
use vehicle::{ControlOutcome, KeyEvent, KeyState, KeyboardController, SimulatedVehicle};

/// 控制帧间隔
const FRAME: Duration = Duration::from_millis(50);

/// 解析一行输入
pub fn parse_line(line: &str) -> (KeyState, Vec<KeyEvent>) {
    let mut keys = KeyState::default();
    let mut events = Vec::new();
    for c in line.trim_end_matches(['\r', '\n']).chars() {
        match c.to_ascii_lowercase() {
            'w' => keys.throttle = true,
            's' => keys.brake = true,
            'a' => keys.left = true,
            'd' => keys.right = true,
            ' ' => keys.hand_brake = true,
            'q' => events.push(KeyEvent::ToggleReverse),
            'r' => events.push(KeyEvent::Restart),
            'x' => events.push(KeyEvent::Quit),
            _ => {}
        }
    }
    (keys, events)
}

/// 启动手动驾驶任务
///
/// 返回的 receiver 在用户请求退出时完成。
pub fn spawn(vehicle: Arc<SimulatedVehicle>) -> (JoinHandle<()>, oneshot::Receiver<()>) {
    let (line_tx, line_rx) = mpsc::channel::<String>(16);
    let (quit_tx, quit_rx) = oneshot::channel();

    let reader = std::thread::Builder::new()
        .name("manual-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = reader {
        warn!(error = %e, "Failed to spawn stdin reader");
    }

    let handle = tokio::spawn(drive(vehicle, line_rx, quit_tx));
    (handle, quit_rx)
}

async fn drive(
    vehicle: Arc<SimulatedVehicle>,
    mut line_rx: mpsc::Receiver<String>,
    quit_tx: oneshot::Sender<()>,
) {
    let mut controller = match KeyboardController::new(vehicle.as_ref()) {
        Ok(controller) => controller,
        Err(e) => {
            warn!(error = %e, "Manual control unavailable");
            return;
        }
    };
    info!("Manual control enabled: w/a/s/d, space, q (reverse), r (restart), x (quit)");

    let mut ticker = tokio::time::interval(FRAME);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut keys = KeyState::default();
    let mut last = Instant::now();

    loop {
        ticker.tick().await;
        let mut events = Vec::new();
        while let Ok(line) = line_rx.try_recv() {
            let (held, pressed) = parse_line(&line);
            keys = held;
            events.extend(pressed);
        }

        let frame_ms = last.elapsed().as_millis() as u64;
        last = Instant::now();

        match controller.tick(&events, &keys, frame_ms, vehicle.as_ref()) {
            Ok(ControlOutcome::Continue) => {}
            Ok(ControlOutcome::Restart) => {
                vehicle.restart();
                keys = KeyState::default();
                match KeyboardController::new(vehicle.as_ref()) {
                    Ok(fresh) => controller = fresh,
                    Err(e) => warn!(error = %e, "Failed to reset manual control"),
                }
            }
            Ok(ControlOutcome::Quit) => {
                info!("Quit requested from manual control");
                let _ = quit_tx.send(());
                return;
            }
            Err(e) => warn!(error = %e, "Failed to apply manual control"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_held_keys() {
        let (keys, events) = parse_line("wd\n");
        assert!(keys.throttle && keys.right);
        assert!(!keys.brake && !keys.left && !keys.hand_brake);
        assert!(events.is_empty());
    }

    #[test]
    fn test_parse_events_and_space() {
        let (keys, events) = parse_line("S QR");
        assert!(keys.brake && keys.hand_brake);
        assert_eq!(events, vec![KeyEvent::ToggleReverse, KeyEvent::Restart]);
    }

    #[test]
    fn test_empty_line_releases() {
        let (keys, events) = parse_line("");
        assert_eq!(keys, KeyState::default());
        assert!(events.is_empty());
        assert_eq!(parse_line("x").1, vec![KeyEvent::Quit]);
    }
}
