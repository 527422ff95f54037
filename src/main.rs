#![allow(clippy::redundant_clone)]

use embedded_hal::digital::v2::OutputPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::Hertz;
use esp_idf_hal::serial;
use esp_idf_svc::{netif::EspNetifStack, nvs::EspDefaultNvs, sysloop::EspSysLoopStack};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

mod bridge;
mod bus;
mod idf_mqtt;

use bus::BusPort;
use esp_idf_svc::mqtt::client::MqttClientConfiguration;
use p1p2_aux_control::control::Controller;
use p1p2_aux_control::model::HvacModel;

#[macro_use]
extern crate dotenv_codegen;

// Secrets from .env file
const MQTT_ADDR: &str = dotenv!("MQTT_ADDR");
const MQTT_USERNAME: &str = dotenv!("MQTT_USERNAME");
const MQTT_PASSWORD: &str = dotenv!("MQTT_PASSWORD");
const MQTT_CLIENT_ID: &str = dotenv!("MQTT_CLIENT_ID");
const MQTT_TOPIC_NAME: &str = dotenv!("MQTT_TOPIC_NAME");
const MQTT_PUBLISH_PERIOD: Duration = Duration::from_secs(10);
const BUS_READ_TIMEOUT: Duration = Duration::from_millis(250);

const VERSION: &str = dotenv!("CARGO_PKG_VERSION");

// Which unit family this controller is wired up for. Picking this at
// compile time keeps the response engine free of runtime model-detection
// logic, which the protocol itself gives no reliable way to do.
const HVAC_MODEL: HvacModel = HvacModel::P;

fn main() -> anyhow::Result<()> {
    // Temporary. Will disappear once ESP-IDF 4.4 is released, but for now it is necessary to call this function once,
    // or else some patches to the runtime implemented by esp-idf-sys might not link properly.
    esp_idf_sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    // Network bring-up (WiFi association, NVS-stored credentials) is an
    // external collaborator's responsibility; these stacks are still
    // constructed here since the MQTT client needs them.
    #[allow(unused)]
    let netif_stack = Arc::new(EspNetifStack::new()?);
    #[allow(unused)]
    let sys_loop_stack = Arc::new(EspSysLoopStack::new()?);
    #[allow(unused)]
    let default_nvs = Arc::new(EspDefaultNvs::new()?);

    // GPIO setup ****************************
    let peripherals = Peripherals::take().expect("Problem aquiring Peripherals::take()");

    // +3v3 for RS485 tranceiver**************
    let mut powerpin = peripherals.pins.gpio6.into_output()?;
    powerpin.set_drive_strength(esp_idf_hal::gpio::DriveStrength::I40mA)?;
    powerpin.set_high()?; // power to RS485

    // For UART 1 ****************************
    let config = serial::config::Config::default().baudrate(Hertz(9_600));
    let userial: serial::Serial<serial::UART1, _, _> = serial::Serial::new(
        peripherals.uart1,
        serial::Pins {
            tx: peripherals.pins.gpio5,
            rx: peripherals.pins.gpio4,
            cts: None,
            rts: None,
        },
        config,
    )
    .unwrap();

    // Get MAC address - janky + unsafe
    let mut mac: [u8; 6] = [0; 6];
    esp_idf_sys::esp!(unsafe {
        esp_idf_sys::esp_read_mac(
            mac.as_mut_ptr() as *mut _,
            esp_idf_sys::esp_mac_type_t_ESP_MAC_WIFI_STA,
        )
    })?;

    // MQTT unique client_id
    let client_id = &format!("{}{:?}", MQTT_CLIENT_ID, mac);
    let conf = MqttClientConfiguration {
        client_id: Some(client_id),
        username: Some(MQTT_USERNAME),
        password: Some(MQTT_PASSWORD),
        ..Default::default()
    };
    let mut mqttclient = idf_mqtt::mqtt_client(
        MQTT_ADDR.to_string(),
        vec![format!("{}/cmd", MQTT_TOPIC_NAME)],
        Some(client_id),
        MQTT_TOPIC_NAME.to_string(),
        conf,
    )?;

    let controller = Arc::new(Controller::new(HVAC_MODEL));

    let (tx, rx) = userial.split();
    let mut bus_port = BusPort::new(rx, tx, BUS_READ_TIMEOUT, HVAC_MODEL);

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let command_controller = controller.clone();
    thread::spawn(move || bridge::command_task(command_controller, cmd_rx));
    // `cmd_tx` would be handed to whatever decodes inbound MQTT command
    // messages into `Command` values; that framing is outside this crate's
    // scope, so it's just kept alive here to hold the channel open.
    let _cmd_tx = cmd_tx;

    let bus_controller = controller.clone();
    let bus_thread = thread::spawn(move || loop {
        match bus_port.read_packet() {
            Ok(pkt) if pkt.has_error() => {
                log::warn!("bus packet dropped: CRC/framing error");
            }
            Ok(pkt) => {
                if let Some(resp) = bus_controller.on_packet(&pkt) {
                    if let Err(e) = bus_port.write_packet(&resp) {
                        log::warn!("bus write error: {:?}", e);
                    }
                }
            }
            Err(e) => log::warn!("bus read error: {:?}", e),
        }
    });

    println!("FW version: {}", VERSION);

    loop {
        bridge::publish_snapshot(&controller, &mut mqttclient, MQTT_TOPIC_NAME);
        thread::sleep(MQTT_PUBLISH_PERIOD);
        if bus_thread.is_finished() {
            return Err(anyhow::anyhow!("bus thread exited"));
        }
    }
}
