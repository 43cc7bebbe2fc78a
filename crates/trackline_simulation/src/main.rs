//! Headless симуляция TRACKLINE
//!
//! Спавнит First Train, даёт полный газ и печатает позу каждые 20 тиков

use bevy::math::DVec3;
use trackline_simulation::{
    create_headless_app, logger, run_ticks, MotivePower, SimulationPlugin, TransportSpawn, TransportState,
    TransportWorldExt,
};

fn main() {
    let seed = 42;
    println!("Starting TRACKLINE headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin);

    let request = TransportSpawn::new("entityfirsttrain", DVec3::ZERO).with_yaw(30.0);
    let train = match app.world_mut().spawn_transport(request) {
        Ok(train) => train,
        Err(err) => {
            logger::log_error(&format!("Failed to spawn train: {}", err));
            return;
        }
    };

    if let Some(mut drive) = app.world_mut().get_mut::<MotivePower>(train) {
        drive.set_throttle(1.0);
    }

    for tick in 0..200 {
        run_ticks(&mut app, 1);

        if tick % 20 == 0 {
            let Some(state) = app.world().get::<TransportState>(train) else {
                println!("Tick {}: train removed", tick);
                break;
            };
            println!(
                "Tick {}: pos=({:.3}, {:.3}, {:.3}) yaw={:.2} pitch={:.2}",
                tick, state.pose.position.x, state.pose.position.y, state.pose.position.z, state.pose.yaw, state.pose.pitch
            );
        }
    }

    println!("Simulation complete!");
}
