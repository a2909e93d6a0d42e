//! Command line tool for B-Fox beacons
//!
//! Lists and tracks beacons in range, and reads or changes a beacon's
//! setting over BLE.

use bfox_ble_controller::ble;
use bfox_mcu::display::beacon_line;
use bfox_mcu::registry::DEFAULT_EXPIRY_MS;
use bfox_proto::SettingsPayload;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bfox-ble")]
#[command(about = "BLE tool for B-Fox beacons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for B-Fox beacons
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
        /// List every BLE device, not just beacons
        #[arg(short, long)]
        all: bool,
    },
    /// Show the beacons of one major, strongest first, like a receiver does
    Track {
        /// Major of the beacon group
        #[arg(short, long)]
        major: u16,
        /// Tracking duration in seconds
        #[arg(short, long, default_value = "30")]
        duration: u64,
        /// Forget a beacon after this many milliseconds without a sighting
        #[arg(short, long, default_value_t = DEFAULT_EXPIRY_MS)]
        expiry: u64,
    },
    /// Read a beacon's setting
    Get {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Change a beacon's setting (unset fields keep their current value)
    Set {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
        /// New advertised device name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        major: Option<u16>,
        #[arg(long)]
        minor: Option<u16>,
        /// Calibrated RSSI at 1m, in dBm
        #[arg(long, allow_hyphen_values = true)]
        measured_power: Option<i16>,
        /// Transmit power in dBm
        #[arg(long, allow_hyphen_values = true)]
        tx_power: Option<i16>,
        /// Advertising interval in milliseconds
        #[arg(long)]
        interval: Option<u16>,
    },
    /// Put a beacon into deep sleep
    Sleep {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Read a beacon's battery voltage
    Voltage {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { duration, all } => {
            scan_beacons(duration, all).await?;
        }
        Commands::Track {
            major,
            duration,
            expiry,
        } => {
            track_beacons(major, duration, expiry).await?;
        }
        Commands::Get { device } => {
            println!("Reading setting...");
            let setting = ble::read_settings(device.as_deref()).await?;
            print_setting(&setting);
        }
        Commands::Set {
            device,
            name,
            major,
            minor,
            measured_power,
            tx_power,
            interval,
        } => {
            println!("Reading current setting...");
            let mut setting = ble::read_settings(device.as_deref()).await?;
            if let Some(name) = name {
                setting.device_name = name;
            }
            setting.major = major.unwrap_or(setting.major);
            setting.minor = minor.unwrap_or(setting.minor);
            setting.measured_power = measured_power.unwrap_or(setting.measured_power);
            setting.tx_power = tx_power.unwrap_or(setting.tx_power);
            if interval.is_some() {
                setting.adv_interval_ms = interval;
            }

            println!("Sending setting...");
            print_setting(&setting);
            ble::write_settings(device.as_deref(), &setting).await?;
            println!("Setting sent! Beacon will restart to apply it.");
        }
        Commands::Sleep { device } => {
            println!("Sending deep sleep command...");
            ble::deep_sleep(device.as_deref()).await?;
            println!("Beacon is going to sleep. Press its button to wake it.");
        }
        Commands::Voltage { device } => {
            let volts = ble::read_voltage(device.as_deref()).await?;
            println!("Battery: {:.2} V", volts);
        }
    }

    Ok(())
}

async fn scan_beacons(duration: u64, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for B-Fox beacons ({} seconds)...", duration);

    let devices: Vec<_> = ble::scan(duration)
        .await?
        .into_iter()
        .filter(|d| all || d.is_bfox())
        .collect();

    println!("\nFound {} devices:", devices.len());
    for device in devices {
        let rssi = device
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());
        let beacon = match device.beacon.filter(|_| device.is_bfox()) {
            Some(b) => format!(
                " [BFOX major:{} minor:{} power:{}]",
                b.major, b.minor, b.measured_power
            ),
            None => String::new(),
        };
        println!("  {} ({}) RSSI: {}{}", device.name, device.address, rssi, beacon);
    }

    Ok(())
}

async fn track_beacons(
    major: u16,
    duration: u64,
    expiry: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Tracking major {} ({} seconds)...", major, duration);

    ble::track(major, duration, expiry, |sightings| {
        if sightings.is_empty() {
            println!("NO SIGNAL");
            return;
        }
        let lines: Vec<String> = sightings.iter().map(beacon_line).collect();
        println!("{}", lines.join("  "));
    })
    .await
}

fn print_setting(setting: &SettingsPayload) {
    println!("  Name:           {}", setting.device_name);
    println!("  Major:          {}", setting.major);
    println!("  Minor:          {}", setting.minor);
    println!("  Measured power: {} dBm", setting.measured_power);
    println!("  Tx power:       {} dBm", setting.tx_power);
    match setting.adv_interval_ms {
        Some(ms) => println!("  Interval:       {} ms", ms),
        None => println!("  Interval:       (not supported)"),
    }
}
