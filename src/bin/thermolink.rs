use clap::{App, Arg};
use colored::*;
use thermolink::bus::mock::{MockCanBus, MockSensorBus};
use thermolink::bus::SensorAddress;
use thermolink::{BridgeConfig, TelemetryBridge};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("thermolink")
        .version("0.1.0")
        .author("Vehicle Telemetry Team")
        .about("🌡️  Temperature-to-CAN telemetry bridge (simulated hardware)")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("cycles")
                .long("cycles")
                .value_name("COUNT")
                .help("Telemetry cycles to run (0 = run forever)")
                .takes_value(true)
                .default_value("50"),
        )
        .arg(
            Arg::with_name("sensors")
                .long("sensors")
                .value_name("COUNT")
                .help("Simulated sensors to attach to the bus")
                .takes_value(true)
                .default_value("1"),
        )
        .arg(
            Arg::with_name("capacity")
                .long("capacity")
                .value_name("N")
                .help("Registry capacity (overrides the config file)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("temperature")
                .long("temperature")
                .value_name("CELSIUS")
                .help("Reading reported by every simulated sensor")
                .takes_value(true)
                .default_value("21.0"),
        )
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => BridgeConfig::from_json_file(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(capacity) = matches.value_of("capacity") {
        config.sensor_capacity = capacity.parse()?;
    }
    config.validate()?;

    let cycles: u64 = matches.value_of("cycles").unwrap_or("50").parse()?;
    let sensors: u8 = matches.value_of("sensors").unwrap_or("1").parse()?;
    let temperature: f32 = matches.value_of("temperature").unwrap_or("21.0").parse()?;

    println!("{}", "🌡️  Thermolink Telemetry Bridge".bold());
    println!("================================");
    println!(
        "   Sensor bus: pin {} ({} simulated sensor(s) at {:.2} °C)",
        config.one_wire_pin, sensors, temperature
    );
    println!(
        "   CAN bus: {} bit/s, CS pin {}, INT pin {}",
        config.can_bitrate, config.spi_cs_pin, config.can_int_pin
    );
    println!("   Cycle period: {} ms", config.cycle_period_ms);

    let mut sensor_bus = MockSensorBus::new();
    for tail in 1..=sensors {
        sensor_bus.add_device(SensorAddress([0x28, 0, 0, 0, 0, 0, 0, tail]), temperature);
    }

    let mut bridge = TelemetryBridge::new(config, sensor_bus, MockCanBus::new());
    if cycles == 0 {
        info!("running until interrupted");
        bridge.run()?;
    } else {
        bridge.run_cycles(cycles)?;
    }

    let stats = bridge.stats();
    println!();
    println!("{}", "Session summary".bold());
    println!("   cycles:             {}", stats.cycles);
    println!("   frames sent:        {}", format!("{}", stats.frames_sent).green());
    println!("   send failures:      {}", stats.send_failures);
    println!("   encode failures:    {}", stats.encode_failures);
    println!("   disconnected reads: {}", stats.disconnected_reads);
    if let Some(frame) = bridge.can_bus().sent().last() {
        println!("   last frame:         {:02X?}", frame.data);
    }

    Ok(())
}
