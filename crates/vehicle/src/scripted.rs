//! Scripted vehicle
//!
//! 用于单元测试的车辆实现，支持注入失败与查询延迟。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use contracts::{
    ContractError, VehicleActuator, VehicleControl, VehicleKinematics, VehicleLightState,
    VehicleStateSource,
};

#[derive(Debug, Default)]
struct Script {
    kinematics: VehicleKinematics,
    /// 接下来失败的查询次数
    fail_next: u32,
    /// 持续失败
    failing: bool,
    /// 每次查询的阻塞时长
    delay: Duration,
    control: Option<VehicleControl>,
    lights: VehicleLightState,
    light_updates: u64,
}

/// Scripted vehicle
pub struct ScriptedVehicle {
    id: String,
    script: Mutex<Script>,
    polls: AtomicU64,
}

impl ScriptedVehicle {
    pub fn new(id: impl Into<String>, kinematics: VehicleKinematics) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(Script {
                kinematics,
                ..Default::default()
            }),
            polls: AtomicU64::new(0),
        }
    }

    pub fn set_kinematics(&self, kinematics: VehicleKinematics) {
        self.lock().kinematics = kinematics;
    }

    /// 接下来 `n` 次查询失败
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// 模拟慢速查询
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay;
    }

    /// 已处理的查询次数 (含失败)
    pub fn poll_count(&self) -> u64 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn last_control(&self) -> Option<VehicleControl> {
        self.lock().control
    }

    pub fn light_state(&self) -> VehicleLightState {
        self.lock().lights
    }

    /// `set_light_state` 调用次数
    pub fn light_updates(&self) -> u64 {
        self.lock().light_updates
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VehicleStateSource for ScriptedVehicle {
    fn vehicle_id(&self) -> &str {
        &self.id
    }

    fn kinematics(&self) -> Result<VehicleKinematics, ContractError> {
        let delay = self.lock().delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.polls.fetch_add(1, Ordering::SeqCst);

        let mut script = self.lock();
        if script.failing {
            return Err(ContractError::simulator_query(&self.id, "scripted failure"));
        }
        if script.fail_next > 0 {
            script.fail_next -= 1;
            return Err(ContractError::simulator_query(&self.id, "scripted failure"));
        }
        Ok(script.kinematics)
    }
}

impl VehicleActuator for ScriptedVehicle {
    fn apply_control(&self, control: &VehicleControl) -> Result<(), ContractError> {
        self.lock().control = Some(*control);
        Ok(())
    }

    fn set_light_state(&self, lights: VehicleLightState) -> Result<(), ContractError> {
        let mut script = self.lock();
        script.lights = lights;
        script.light_updates += 1;
        Ok(())
    }
}
