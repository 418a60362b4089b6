//! Example that runs on Linux using a serial-USB-adapter.
use std::{
    env,
    io::{self, Read, Write},
    thread,
    time::{Duration, Instant},
};

use esp_at_http::{
    adapter::Adapter,
    timer::SysTimer,
    transport::{Readiness, Transport},
    wifi::WifiAdapter,
};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

// Capacity of the response buffer in bytes. Data exceeding the capacity gets dropped.
const RX_SIZE: usize = 4096;

// Timer frequency in Hz
const TIMER_HZ: u32 = 1000;

// Poll interval while waiting for serial data
const POLL_INTERVAL: Duration = Duration::from_millis(1);

fn main() {
    env_logger::init();

    // Parse args
    let args: Vec<String> = env::args().collect();
    if args.len() != 5 {
        println!("Usage: {} <path-to-serial> <baudrate> <ssid> <psk>", args[0]);
        println!("Example: {} /dev/ttyUSB0 115200 mywifi hellopasswd123", args[0]);
        println!("\nNote: To run the example with debug logging, run it like this:");
        println!("\n  RUST_LOG=trace cargo run --example linux --features std -- /dev/ttyUSB0 115200 mywifi hellopasswd123");
        std::process::exit(1);
    }
    let dev = &args[1];
    let baud_rate: u32 = args[2].parse().expect("Invalid baud rate");
    let ssid = &args[3];
    let psk = &args[4];

    println!("Starting (dev={}, baud={:?})...", dev, baud_rate);

    // Open serial port
    let port = serialport::new(dev, baud_rate)
        .data_bits(DataBits::Eight)
        .flow_control(FlowControl::None)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(500))
        .open()
        .expect("Could not open serial port");

    // ESP AT adapter
    let mut adapter: Adapter<_, _, TIMER_HZ, RX_SIZE> = Adapter::new(SerialTransport { port }, SysTimer::new());

    // Join WIFI access point
    println!("Join WiFi \"{}\"...", ssid);
    adapter.join(ssid, psk).expect("Joining WIFI failed");

    let address = adapter.get_address().expect("Could not read local address");
    println!("Joined, local address: {:?} ({:?})", address.ipv4, address.mac);

    // Send HTTP request
    let remote_host = "ifconfig.net";
    println!("Requesting http://{}/ ...", remote_host);
    let response = adapter.http_get(remote_host, 80, "/").expect("HTTP request failed");

    match response.status_code() {
        Some(200) => {}
        Some(code) => panic!("Bad HTTP response code, expected 200 but found {}", code),
        None => panic!("Could not parse HTTP response:\n---\n{}\n---", String::from_utf8_lossy(response.raw())),
    }

    if response.is_truncated() {
        println!("Note: Response exceeded {} bytes and was truncated", RX_SIZE);
    }

    let body = response.body().unwrap_or_default();
    println!(
        "Your public IP, as returned by {}: {}",
        remote_host,
        String::from_utf8_lossy(body).trim()
    );
}

/// Serial port connected to the ESP-AT modem
struct SerialTransport {
    port: Box<dyn SerialPort>,
}

/// Serial I/O failure
#[derive(Debug)]
struct SerialError(io::ErrorKind);

impl embedded_io::Error for SerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0 {
            io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl From<io::Error> for SerialError {
    fn from(error: io::Error) -> Self {
        Self(error.kind())
    }
}

impl From<serialport::Error> for SerialError {
    fn from(error: serialport::Error) -> Self {
        Self(io::Error::from(error).kind())
    }
}

impl embedded_io::ErrorType for SerialTransport {
    type Error = SerialError;
}

impl Transport for SerialTransport {
    fn discard(&mut self) -> Result<(), Self::Error> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn transmit(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> nb::Result<usize, Self::Error> {
        let available = self.port.bytes_to_read().map_err(|error| nb::Error::Other(error.into()))?;
        if available == 0 {
            return Err(nb::Error::WouldBlock);
        }

        let length = buffer.len().min(available as usize);
        match self.port.read(&mut buffer[..length]) {
            Ok(length) => Ok(length),
            Err(e) => match e.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Err(nb::Error::WouldBlock),
                _ => Err(nb::Error::Other(e.into())),
            },
        }
    }

    /// Polls the pending byte count, as `serialport` offers no readiness notification.
    /// Transports with access to the file descriptor should use `poll`/`select` instead.
    fn wait_readable(&mut self, timeout_ms: u32) -> Result<Readiness, Self::Error> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));

        loop {
            if self.port.bytes_to_read()? > 0 {
                return Ok(Readiness::Ready);
            }

            if Instant::now() >= deadline {
                return Ok(Readiness::TimedOut);
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}
