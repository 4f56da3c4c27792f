use std::sync::mpsc;

use spacemouse_driver::{Button, DriverManager};

fn main() {
    let manager = DriverManager::new().expect("failed to initialize HID backend");
    let driver = manager.create_driver();

    driver.register_stick_callback(|stick| {
        let a = stick.axes;
        println!(
            "stick: x={:+.3} y={:+.3} z={:+.3} rx={:+.3} ry={:+.3} rz={:+.3}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        );
    });
    driver.register_button_callback(Button::Button1, |pressed| {
        println!("button 1 {}", if pressed { "pressed" } else { "released" });
    });
    driver.register_button_callback(Button::Button2, |pressed| {
        println!("button 2 {}", if pressed { "pressed" } else { "released" });
    });

    let events = driver.subscribe();
    std::thread::spawn(move || {
        for event in events {
            println!("connection: {event:?}");
        }
    });

    driver.run();
    println!("watching for SpaceMouse devices, press Ctrl+C to exit");

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .expect("failed to set Ctrl+C handler");
    let _ = stop_rx.recv();

    driver.stop();
}
