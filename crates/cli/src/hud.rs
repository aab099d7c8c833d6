//! HUD status line for the ego vehicle

use std::sync::Arc;
use std::time::Duration;

use contracts::{VehicleControl, VehicleKinematics, VehicleStateSource};
use fusion::speed_magnitude;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use vehicle::SimulatedVehicle;

/// Speed, location, height and the last applied control
pub fn status_line(kinematics: &VehicleKinematics, control: &VehicleControl) -> String {
    let speed_kmh = 3.6 * speed_magnitude(&kinematics.velocity);
    let location = kinematics.location();
    format!(
        "Speed: {:>6.1} km/h | Location: ({:>6.1}, {:>6.1}) | Height: {:>4.0} m | \
         Throttle: {:.2} | Steer: {:+.2} | Brake: {:.2} | Reverse: {} | \
         Hand brake: {} | Manual: {} | Gear: {}",
        speed_kmh,
        location.x,
        location.y,
        location.z,
        control.throttle,
        control.steer,
        control.brake,
        control.reverse,
        control.hand_brake,
        control.manual_gear_shift,
        gear_label(control.gear)
    )
}

/// R / N for reverse and neutral, the number otherwise
fn gear_label(gear: i32) -> String {
    match gear {
        -1 => "R".to_string(),
        0 => "N".to_string(),
        n => n.to_string(),
    }
}

/// Log a status line every `interval` until aborted
pub fn spawn(vehicle: Arc<SimulatedVehicle>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let source = Arc::clone(&vehicle);
            match tokio::task::spawn_blocking(move || source.kinematics()).await {
                Ok(Ok(kinematics)) => {
                    let line = status_line(&kinematics, &vehicle.last_control());
                    info!(vehicle = %vehicle.vehicle_id(), "{}", line);
                }
                Ok(Err(e)) => debug!(error = %e, "HUD query failed"),
                Err(_) => break,
            }
        }
    })
}
