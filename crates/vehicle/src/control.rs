//! 键盘手动控制状态机
//!
//! 每帧输入当前按键状态与离散事件，输出 `VehicleControl`，并维护
//! 刹车灯 / 倒车灯位。灯光状态仅在变化时下发。

use contracts::{ContractError, VehicleActuator, VehicleControl, VehicleLightState};
use tracing::{debug, instrument};

/// 每帧油门增量
pub const THROTTLE_STEP: f64 = 0.05;
/// 每帧刹车增量
pub const BRAKE_STEP: f64 = 0.1;
/// 每毫秒转向增量
pub const STEER_RATE_PER_MS: f64 = 5e-4;
/// 转向上限
pub const STEER_LIMIT: f64 = 0.7;

/// 当前帧按住的键
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    /// W / ↑
    pub throttle: bool,
    /// S / ↓
    pub brake: bool,
    /// A / ←
    pub left: bool,
    /// D / →
    pub right: bool,
    /// Space
    pub hand_brake: bool,
}

/// 松键事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Q: 前进 / 倒车切换
    ToggleReverse,
    /// R: 重新开始
    Restart,
    /// 关闭窗口 / 退出
    Quit,
}

/// 一帧处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Continue,
    /// 调用方应重置车辆
    Restart,
    /// 调用方应退出，本帧未下发控制
    Quit,
}

/// 键盘控制器
#[derive(Debug)]
pub struct KeyboardController {
    control: VehicleControl,
    lights: VehicleLightState,
    steer_cache: f64,
}

impl KeyboardController {
    /// 创建控制器并熄灭所有车灯
    pub fn new(actuator: &dyn VehicleActuator) -> Result<Self, ContractError> {
        actuator.set_light_state(VehicleLightState::NONE)?;
        Ok(Self {
            control: VehicleControl::default(),
            lights: VehicleLightState::NONE,
            steer_cache: 0.0,
        })
    }

    pub fn control(&self) -> &VehicleControl {
        &self.control
    }

    pub fn lights(&self) -> VehicleLightState {
        self.lights
    }

    /// 处理一帧
    ///
    /// `frame_ms` 为上一帧耗时，决定转向增量。
    #[instrument(name = "keyboard_tick", skip(self, keys, actuator), level = "trace")]
    pub fn tick(
        &mut self,
        events: &[KeyEvent],
        keys: &KeyState,
        frame_ms: u64,
        actuator: &dyn VehicleActuator,
    ) -> Result<ControlOutcome, ContractError> {
        let mut outcome = ControlOutcome::Continue;
        for event in events {
            match event {
                KeyEvent::Quit => return Ok(ControlOutcome::Quit),
                KeyEvent::Restart => {
                    debug!("restart requested");
                    outcome = ControlOutcome::Restart;
                }
                KeyEvent::ToggleReverse => {
                    self.control.gear = if self.control.reverse { 1 } else { -1 };
                    debug!(gear = self.control.gear, "gear toggled");
                }
            }
        }

        self.apply_keys(keys, frame_ms);
        self.control.reverse = self.control.gear < 0;

        let mut lights = self.lights;
        lights.set(VehicleLightState::BRAKE, self.control.brake > 0.0);
        lights.set(VehicleLightState::REVERSE, self.control.reverse);
        if lights != self.lights {
            actuator.set_light_state(lights)?;
            self.lights = lights;
        }

        actuator.apply_control(&self.control)?;
        Ok(outcome)
    }

    fn apply_keys(&mut self, keys: &KeyState, frame_ms: u64) {
        self.control.throttle = if keys.throttle {
            (self.control.throttle + THROTTLE_STEP).min(1.0)
        } else {
            0.0
        };

        self.control.brake = if keys.brake {
            (self.control.brake + BRAKE_STEP).min(1.0)
        } else {
            0.0
        };

        let steer_increment = STEER_RATE_PER_MS * frame_ms as f64;
        if keys.left {
            if self.steer_cache > 0.0 {
                self.steer_cache = 0.0;
            } else {
                self.steer_cache -= steer_increment;
            }
        } else if keys.right {
            if self.steer_cache < 0.0 {
                self.steer_cache = 0.0;
            } else {
                self.steer_cache += steer_increment;
            }
        } else {
            self.steer_cache = 0.0;
        }

        self.steer_cache = self.steer_cache.clamp(-STEER_LIMIT, STEER_LIMIT);
        self.control.steer = (self.steer_cache * 10.0).round() / 10.0;
        self.control.hand_brake = keys.hand_brake;
    }
}
